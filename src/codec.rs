//! # Codec Selection Module
//!
//! Questo modulo sceglie il miglior encoder video disponibile.
//!
//! ## Responsabilità:
//! - Interroga `ffmpeg -hide_banner -encoders` (probe dry-run: nessun
//!   frame viene codificato) una volta per chiamata
//! - Scorre la lista di candidati in ordine di priorità fissa
//!   (codec hardware prima del fallback software) e ritorna il primo
//!   presente nel listing
//! - Se nessun candidato è utilizzabile la selezione fallisce con
//!   `NoCodec`: senza codec l'intero pass video viene abortito, non è un
//!   errore recuperabile per-file
//!
//! La disponibilità non viene mai cachata tra un run e l'altro: ogni pass
//! video riesegue il probe.

use crate::error::CompressionError;
use crate::platform::PlatformCommands;
use tracing::{debug, error};

/// Picks the first usable encoder out of a fixed priority list
pub struct CodecSelector {
    candidates: Vec<String>,
}

impl CodecSelector {
    pub fn new(candidates: Vec<String>) -> Self {
        Self { candidates }
    }

    /// Select the best available codec.
    ///
    /// Probes the encoder listing once and walks the candidate list in
    /// order. Fails with [`CompressionError::NoCodec`] when no candidate is
    /// usable (including when ffmpeg itself cannot be spawned).
    pub async fn select_best_codec(&self) -> Result<String, CompressionError> {
        let listing = match self.encoder_listing().await {
            Ok(listing) => listing,
            Err(e) => {
                error!("Error while listing encoders. ERROR MESSAGE: {}", e);
                return Err(CompressionError::NoCodec);
            }
        };

        match self.first_available(&listing) {
            Some(codec) => {
                debug!("Selected video codec: {}", codec);
                Ok(codec)
            }
            None => Err(CompressionError::NoCodec),
        }
    }

    /// First candidate present in an `ffmpeg -encoders` listing.
    ///
    /// Each listing line is `<flags> <name> <description>`; the name is
    /// matched as a whole token so `libx264` does not match `libx264rgb`.
    fn first_available(&self, listing: &str) -> Option<String> {
        self.candidates
            .iter()
            .find(|codec| {
                listing
                    .lines()
                    .any(|line| line.split_whitespace().nth(1) == Some(codec.as_str()))
            })
            .cloned()
    }

    async fn encoder_listing(&self) -> Result<String, CompressionError> {
        let platform = PlatformCommands::instance();
        let ffmpeg_cmd = platform.get_command("ffmpeg");

        let output = tokio::process::Command::new(ffmpeg_cmd)
            .args(["-hide_banner", "-encoders"])
            .output()
            .await
            .map_err(|e| {
                CompressionError::Ffmpeg(format!("Failed to execute {}: {}", ffmpeg_cmd, e))
            })?;

        if !output.status.success() {
            return Err(CompressionError::Ffmpeg(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
Encoders:
 V..... = Video
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC
 V....D libx264rgb           libx264 H.264 / AVC (RGB)
 V..... h264_qsv             H.264 / AVC (Intel Quick Sync Video)
 A....D aac                  AAC (Advanced Audio Coding)";

    fn selector(candidates: &[&str]) -> CodecSelector {
        CodecSelector::new(candidates.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_first_available_respects_priority_order() {
        let s = selector(&["h264_qsv", "libx264"]);
        assert_eq!(s.first_available(LISTING), Some("h264_qsv".to_string()));

        let s = selector(&["libx264", "h264_qsv"]);
        assert_eq!(s.first_available(LISTING), Some("libx264".to_string()));
    }

    #[test]
    fn test_first_available_falls_back_to_software() {
        let listing_without_qsv = "Encoders:\n V....D libx264              libx264 H.264";
        let s = selector(&["h264_qsv", "libx264"]);
        assert_eq!(
            s.first_available(listing_without_qsv),
            Some("libx264".to_string())
        );
    }

    #[test]
    fn test_no_candidate_available() {
        let s = selector(&["h264_videotoolbox"]);
        assert_eq!(s.first_available(LISTING), None);
    }

    #[test]
    fn test_whole_token_match_only() {
        // "libx264" must not be found via the libx264rgb row
        let listing = " V....D libx264rgb           libx264 H.264 / AVC (RGB)";
        let s = selector(&["libx264"]);
        assert_eq!(s.first_available(listing), None);
    }
}
