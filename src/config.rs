//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` con tutti i parametri di compressione
//! - Fornisce validazione robusta dei parametri di input
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default sensati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `video_filetypes`: Estensioni video compatibili (default: 16 formati)
//! - `incompatible_filetypes`: Estensioni da convertire a MP4 (default: .h264)
//! - `image_filetypes`: Estensioni immagine (default: jpg/jpeg/png/tiff)
//! - `codec_priority`: Codec candidati in ordine di preferenza
//!   (hardware prima del software, default: h264_qsv poi libx264)
//! - `framerate`: Frame rate di output (default: 30)
//! - `image_quality`: Qualità JPEG di output (1-100, default: 85)
//! - `conversion_crf`: CRF per la conversione dei formati incompatibili
//!   (0-51, default: 23)
//!
//! ## Validazione:
//! - Controlla che image_quality sia 1-100
//! - Controlla che conversion_crf sia 0-51
//! - Controlla che framerate sia positivo
//! - Controlla che le tabelle estensioni usino suffissi con il punto
//! - Controlla che la lista codec non sia vuota

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Encoder id that takes the hardware path (gets `-preset medium`)
pub const HARDWARE_CODEC: &str = "h264_qsv";

/// Marker value written into the container `comment` tag of compressed videos
pub const VIDEO_PROCESSED_COMMENT: &str = "compressed";

/// Marker value written into image metadata (EXIF ImageDescription / PNG Comment)
pub const IMAGE_PROCESSED_TAG: &str = "Processed";

/// Configuration for media compression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Video extensions eligible for the compression pass (with leading dot)
    pub video_filetypes: Vec<String>,
    /// Extensions re-encoded into a normalized MP4 container
    pub incompatible_filetypes: Vec<String>,
    /// Image extensions eligible for the resize pass
    pub image_filetypes: Vec<String>,
    /// Candidate encoders, probed in order; first available wins
    pub codec_priority: Vec<String>,
    /// Output frame rate for compressed videos
    pub framerate: f64,
    /// JPEG quality for resized images (1-100)
    pub image_quality: u8,
    /// CRF used when converting incompatible formats (0-51)
    pub conversion_crf: u8,
    /// Container extension forced on converted incompatible files
    pub converted_extension: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            video_filetypes: [
                ".mp4", ".avi", ".mkv", ".mov", ".wmv", ".flv", ".webm", ".mpeg", ".3gp", ".ogv",
                ".m4v", ".ts", ".vob", ".asf", ".rm", ".mts",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            incompatible_filetypes: vec![".h264".to_string()],
            image_filetypes: [".jpg", ".jpeg", ".png", ".tiff"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            codec_priority: vec![HARDWARE_CODEC.to_string(), "libx264".to_string()],
            framerate: 30.0,
            image_quality: 85,
            conversion_crf: 23,
            converted_extension: "mp4".to_string(),
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.image_quality == 0 || self.image_quality > 100 {
            return Err(anyhow::anyhow!("Image quality must be between 1 and 100"));
        }

        if self.conversion_crf > 51 {
            return Err(anyhow::anyhow!("Conversion CRF must be between 0 and 51"));
        }

        if !self.framerate.is_finite() || self.framerate <= 0.0 {
            return Err(anyhow::anyhow!("Framerate must be a positive number"));
        }

        if self.codec_priority.is_empty() {
            return Err(anyhow::anyhow!("Codec priority list must not be empty"));
        }

        for table in [
            &self.video_filetypes,
            &self.incompatible_filetypes,
            &self.image_filetypes,
        ] {
            if let Some(ext) = table.iter().find(|e| !e.starts_with('.')) {
                return Err(anyhow::anyhow!(
                    "Filetype entries must start with a dot, got: {}",
                    ext
                ));
            }
        }

        if self.converted_extension.starts_with('.') || self.converted_extension.is_empty() {
            return Err(anyhow::anyhow!(
                "Converted extension must be a bare extension like 'mp4'"
            ));
        }

        Ok(())
    }

    /// Frame rate rendered the way ffmpeg expects it ("30", not "30.0")
    pub fn framerate_arg(&self) -> String {
        if self.framerate.fract() == 0.0 {
            format!("{}", self.framerate as u64)
        } else {
            format!("{}", self.framerate)
        }
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &PathBuf) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.image_quality = 0;
        assert!(config.validate().is_err());

        config.image_quality = 85;
        config.conversion_crf = 52;
        assert!(config.validate().is_err());

        config.conversion_crf = 23;
        config.framerate = 0.0;
        assert!(config.validate().is_err());

        config.framerate = 30.0;
        config.video_filetypes.push("mp4".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.video_filetypes.len(), 16);
        assert_eq!(config.incompatible_filetypes, vec![".h264"]);
        assert_eq!(config.codec_priority, vec!["h264_qsv", "libx264"]);
        assert_eq!(config.framerate, 30.0);
        assert_eq!(config.image_quality, 85);
        assert_eq!(config.conversion_crf, 23);
    }

    #[test]
    fn test_framerate_arg() {
        let mut config = Config::default();
        assert_eq!(config.framerate_arg(), "30");

        config.framerate = 29.97;
        assert_eq!(config.framerate_arg(), "29.97");
    }

    #[tokio::test]
    async fn test_config_save_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let original_config = Config {
            framerate: 25.0,
            image_quality: 70,
            conversion_crf: 28,
            ..Default::default()
        };

        original_config.save_to_file(&config_path).await.unwrap();
        let loaded_config = Config::from_file(&config_path).await.unwrap();

        assert_eq!(loaded_config.framerate, 25.0);
        assert_eq!(loaded_config.image_quality, 70);
        assert_eq!(loaded_config.conversion_crf, 28);
        assert_eq!(loaded_config.codec_priority, vec!["h264_qsv", "libx264"]);
    }

    #[tokio::test]
    async fn test_config_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::from_file(&temp_dir.path().join("nope.json"))
            .await
            .unwrap();
        assert_eq!(config.image_quality, 85);
    }
}
