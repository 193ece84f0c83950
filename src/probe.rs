//! # Container Metadata Probe Module
//!
//! Wrapper read-only attorno a `ffprobe` per leggere i metadata a livello
//! di container (bitrate totale e tag `comment`) in formato JSON.

use crate::error::CompressionError;
use crate::platform::PlatformCommands;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Top-level ffprobe JSON document
#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
}

/// The `format` section of an ffprobe report
#[derive(Debug, Default, Deserialize)]
pub struct ProbeFormat {
    /// Total container bit rate in bits per second, as reported by ffprobe
    pub bit_rate: Option<String>,
    /// Container-level tags (comment, title, ...)
    pub tags: Option<HashMap<String, String>>,
}

impl ProbeFormat {
    /// Container tag value, if present
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.as_ref().and_then(|t| t.get(name)).map(|s| s.as_str())
    }

    /// Container bit rate parsed to bits per second
    pub fn bit_rate_bps(&self) -> Option<u64> {
        self.bit_rate.as_deref().and_then(|b| b.parse().ok())
    }
}

/// Run a read-only metadata probe against a media file.
///
/// Only the `format` section is requested; stream-level data is not needed
/// anywhere in the compression pipeline.
pub async fn probe_format(path: &Path) -> Result<ProbeFormat, CompressionError> {
    let platform = PlatformCommands::instance();
    let ffprobe_cmd = platform.get_command("ffprobe");

    let output = tokio::process::Command::new(ffprobe_cmd)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
        ])
        .arg(path)
        .output()
        .await
        .map_err(|e| CompressionError::Probe(format!("Failed to execute {}: {}", ffprobe_cmd, e)))?;

    if !output.status.success() {
        return Err(CompressionError::Probe(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    let parsed: ProbeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| CompressionError::Probe(format!("Invalid ffprobe output: {}", e)))?;

    Ok(parsed.format.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_section_parsing() {
        let raw = r#"{
            "format": {
                "filename": "a.mp4",
                "bit_rate": "5000000",
                "tags": { "comment": "compressed" }
            }
        }"#;
        let parsed: ProbeOutput = serde_json::from_str(raw).unwrap();
        let format = parsed.format.unwrap();

        assert_eq!(format.bit_rate_bps(), Some(5_000_000));
        assert_eq!(format.tag("comment"), Some("compressed"));
        assert_eq!(format.tag("title"), None);
    }

    #[test]
    fn test_missing_fields_parse_to_none() {
        let parsed: ProbeOutput = serde_json::from_str(r#"{"format": {}}"#).unwrap();
        let format = parsed.format.unwrap();

        assert_eq!(format.bit_rate_bps(), None);
        assert_eq!(format.tag("comment"), None);
    }

    #[tokio::test]
    async fn test_probe_nonexistent_file_is_an_error() {
        let result = probe_format(Path::new("/definitely/not/here.mp4")).await;
        assert!(result.is_err());
    }
}
