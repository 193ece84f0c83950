//! # Image Compression Module
//!
//! Questo modulo gestisce la compressione delle immagini in-process.
//!
//! ## Responsabilità:
//! - Dimezza le dimensioni dell'immagine (arrotondando, minimo 1px per lato)
//! - Resampling di alta qualità con filtro Lanczos
//! - Salvataggio JPEG a qualità fissa (default 85); PNG e TIFF passano
//!   dall'encoder di default del formato
//! - Stamping del marker "Processed" come secondo step indipendente:
//!   un fallimento del marker viene loggato ma non annulla il resize
//!
//! ## Pipeline per immagine:
//! 1. Decodifica con la crate `image`
//! 2. `resize_exact` a (round(w/2), round(h/2)) con Lanczos3
//! 3. Encoding sul path di output mirrorato
//! 4. Marker EXIF `ImageDescription` (JPEG/TIFF) o `Comment` (PNG)

use crate::config::Config;
use crate::error::CompressionError;
use crate::markers::MarkerOracle;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resizes and re-encodes images, then stamps the processed marker
pub struct ImageCompressor {
    config: Arc<Config>,
    markers: MarkerOracle,
}

impl ImageCompressor {
    pub fn new(config: Arc<Config>, markers: MarkerOracle) -> Self {
        Self { config, markers }
    }

    /// Output dimensions: half the input, rounded, clamped to 1px per side
    pub fn halved_dimensions(width: u32, height: u32) -> (u32, u32) {
        (((width + 1) / 2).max(1), ((height + 1) / 2).max(1))
    }

    /// Compress one image into `output`.
    ///
    /// Decode and save errors are per-file failures for the orchestrator;
    /// a marker-stamping failure only logs.
    pub async fn compress(&self, input: &Path, output: &Path) -> Result<(), CompressionError> {
        debug!("Compressing image: {}", input.display());

        let img = image::open(input)?;
        let (new_width, new_height) = Self::halved_dimensions(img.width(), img.height());
        let resized = img.resize_exact(new_width, new_height, FilterType::Lanczos3);

        self.save(&resized, output)?;
        info!(
            "Image {} saved successfully to: {}",
            input.display(),
            output.display()
        );

        // Marker stamping is deliberately decoupled from the resize: the
        // compressed output stays in place even when tagging fails.
        if let Err(e) = self.markers.stamp_image(output).await {
            warn!(
                "Failed to stamp processed marker on {}: {}",
                output.display(),
                e
            );
        }

        Ok(())
    }

    fn save(&self, img: &DynamicImage, output: &Path) -> Result<(), CompressionError> {
        let ext = output
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "jpg" | "jpeg" => {
                let file = File::create(output)?;
                let mut writer = BufWriter::new(file);
                let mut encoder = JpegEncoder::new_with_quality(&mut writer, self.config.image_quality);
                // JPEG has no alpha channel
                encoder.encode_image(&img.to_rgb8())?;
            }
            _ => {
                img.save(output)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use tempfile::TempDir;

    fn compressor() -> ImageCompressor {
        ImageCompressor::new(Arc::new(Config::default()), MarkerOracle::new())
    }

    fn write_test_image(path: &Path, width: u32, height: u32) {
        let img = ImageBuffer::from_pixel(width, height, Rgb::<u8>([120, 80, 40]));
        img.save(path).unwrap();
    }

    #[test]
    fn test_halved_dimensions() {
        assert_eq!(ImageCompressor::halved_dimensions(800, 600), (400, 300));
        assert_eq!(ImageCompressor::halved_dimensions(9, 7), (5, 4));
        assert_eq!(ImageCompressor::halved_dimensions(1, 1), (1, 1));
    }

    #[tokio::test]
    async fn test_compress_png_halves_dimensions() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("out.png");
        write_test_image(&input, 8, 6);

        compressor().compress(&input, &output).await.unwrap();

        let result = image::open(&output).unwrap();
        assert_eq!((result.width(), result.height()), (4, 3));
    }

    #[tokio::test]
    async fn test_compress_jpeg_uses_quality_encoder() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in.jpg");
        let output = dir.path().join("out.jpg");
        write_test_image(&input, 9, 7);

        compressor().compress(&input, &output).await.unwrap();

        let result = image::open(&output).unwrap();
        assert_eq!((result.width(), result.height()), (5, 4));
    }

    #[tokio::test]
    async fn test_compress_unreadable_input_is_an_error() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("broken.jpg");
        let output = dir.path().join("out.jpg");
        std::fs::write(&input, b"definitely not a jpeg").unwrap();

        let result = compressor().compress(&input, &output).await;
        assert!(result.is_err());
        assert!(!output.exists());
    }
}
