//! # Processed-Marker Module
//!
//! Questo modulo decide se un file è già stato compresso da questo sistema
//! e applica il marker alle immagini appena compresse.
//!
//! ## Responsabilità:
//! - Legge il tag container `comment` dei video via ffprobe
//! - Legge EXIF `ImageDescription` (JPEG/TIFF) e `Comment` (PNG) via exiftool
//! - Stampa il marker sulle immagini compresse (i video lo ricevono
//!   direttamente dall'invocazione ffmpeg con `-metadata`)
//!
//! ## Semantica fail-open:
//! Qualsiasi errore di lettura/parsing viene loggato e trattato come
//! "non processato": un file illeggibile resta sempre candidato alla
//! (ri)compressione, mai silenziosamente saltato.
//!
//! ## Persistenza PNG:
//! exiftool scrive il campo `Comment` come chunk tEXt reale, quindi il
//! marker sopravvive a save/reload e il round-trip è garantito dalla
//! stessa coppia di comandi usata per leggere e scrivere.

use crate::catalog::MediaKind;
use crate::config::{IMAGE_PROCESSED_TAG, VIDEO_PROCESSED_COMMENT};
use crate::error::CompressionError;
use crate::platform::PlatformCommands;
use crate::probe;
use std::path::Path;
use tracing::{debug, error, warn};

/// Decides whether a media file already carries the processed marker
#[derive(Debug, Default, Clone)]
pub struct MarkerOracle;

impl MarkerOracle {
    pub fn new() -> Self {
        Self
    }

    /// Check whether a file was already processed by this system.
    ///
    /// Fails open: any probe error logs and returns `false` so the file is
    /// (re)processed rather than skipped.
    pub async fn is_processed(&self, path: &Path, kind: MediaKind) -> bool {
        let result = match kind {
            MediaKind::Video | MediaKind::IncompatibleVideo => self.video_marker(path).await,
            MediaKind::Image => self.image_marker(path).await,
        };

        match result {
            Ok(processed) => processed,
            Err(e) => {
                error!(
                    "Error while parsing metadata for {}. ERROR MESSAGE: {}",
                    path.display(),
                    e
                );
                false
            }
        }
    }

    async fn video_marker(&self, path: &Path) -> Result<bool, CompressionError> {
        let format = probe::probe_format(path).await?;
        Ok(format.tag("comment") == Some(VIDEO_PROCESSED_COMMENT))
    }

    async fn image_marker(&self, path: &Path) -> Result<bool, CompressionError> {
        let report = self.read_image_tags(path).await?;
        Ok(image_marker_in_report(&report, is_png(path)))
    }

    async fn read_image_tags(&self, path: &Path) -> Result<serde_json::Value, CompressionError> {
        let platform = PlatformCommands::instance();
        let exiftool_cmd = platform.get_command("exiftool");

        let output = tokio::process::Command::new(exiftool_cmd)
            .args(["-json", "-ImageDescription", "-Comment"])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                CompressionError::Probe(format!("Failed to execute {}: {}", exiftool_cmd, e))
            })?;

        if !output.status.success() {
            return Err(CompressionError::Probe(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }

        // exiftool -json emits one object per input file
        let parsed: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| CompressionError::Probe(format!("Invalid exiftool output: {}", e)))?;
        parsed
            .get(0)
            .cloned()
            .ok_or_else(|| CompressionError::Probe("Empty exiftool report".to_string()))
    }

    /// Stamp the processed marker onto a freshly compressed image.
    ///
    /// Runs as an independent step after the resized file is saved; callers
    /// treat a failure here as log-and-continue, never as a reason to undo
    /// the resize.
    pub async fn stamp_image(&self, path: &Path) -> Result<(), CompressionError> {
        let platform = PlatformCommands::instance();
        let exiftool_cmd = platform.get_command("exiftool");

        let tag_arg = if is_png(path) {
            format!("-Comment={}", IMAGE_PROCESSED_TAG)
        } else {
            format!("-ImageDescription={}", IMAGE_PROCESSED_TAG)
        };

        let output = tokio::process::Command::new(exiftool_cmd)
            .args([tag_arg.as_str(), "-overwrite_original"])
            .arg(path)
            .output()
            .await
            .map_err(|e| {
                CompressionError::Metadata(format!("Failed to execute {}: {}", exiftool_cmd, e))
            })?;

        if !output.status.success() {
            return Err(CompressionError::Metadata(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }

        debug!("Stamped processed marker on {}", path.display());
        Ok(())
    }

    /// Warn once at startup when exiftool is missing: image markers then
    /// fail open and every image gets reprocessed on reruns.
    pub async fn check_image_marker_support(&self) {
        let platform = PlatformCommands::instance();
        if !platform.is_command_available("exiftool").await {
            warn!("exiftool not found: image processed-markers are disabled, reruns will recompress images");
        }
    }
}

/// Marker check over one exiftool report object.
///
/// PNG uses the `Comment` field with an exact match; the EXIF family uses
/// `ImageDescription` with a substring match, tolerating descriptions that
/// carry extra text around the marker.
fn image_marker_in_report(report: &serde_json::Value, is_png: bool) -> bool {
    if is_png {
        report
            .get("Comment")
            .and_then(|v| v.as_str())
            .map(|c| c == IMAGE_PROCESSED_TAG)
            .unwrap_or(false)
    } else {
        report
            .get("ImageDescription")
            .and_then(|v| v.as_str())
            .map(|d| d.contains(IMAGE_PROCESSED_TAG))
            .unwrap_or(false)
    }
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("png"))
        .unwrap_or(false)
}
