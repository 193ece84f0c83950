//! # Compression Orchestrator Module
//!
//! Questo è il modulo principale che orchestra tutto il processo di
//! compressione.
//!
//! ## Responsabilità:
//! - Coordinamento di tutti gli altri moduli
//! - Macchina a stati per run: Init → Scan → {CompressVideo} →
//!   {CompressImage} → {ConvertIncompatible} → Done
//! - Creazione della directory di output timestampata, una per run,
//!   condivisa dai tre pass
//! - Isolamento dei fallimenti per-file: un file rotto non interrompe
//!   mai il batch, l'errore finisce nella lista fallimenti del pass
//! - Progress sweep pesato sui byte, resettato a ogni pass
//! - Cancellazione cooperativa controllata tra un file e l'altro
//! - Report finale con dimensioni aggregate input/output
//!
//! ## Processing pipeline per pass:
//! 1. Selezione codec (solo pass video; fallimento = pass abortito)
//! 2. Discovery candidati via catalog + marker oracle
//! 3. Loop strettamente sequenziale: progress → mirror path → transcode
//! 4. Sentinel di progress finale, sempre, anche con errori
//!
//! ## Error handling:
//! - `NoCodec` abortisce entrambi i pass video e viene registrato nel
//!   report; il pass immagini viene comunque eseguito
//! - `Cancelled` interrompe l'intero run
//! - Ogni altro errore è confinato al singolo file

use crate::bitrate;
use crate::catalog::{tree_size, MediaCatalog, MediaFile, MediaKind};
use crate::codec::CodecSelector;
use crate::config::Config;
use crate::error::CompressionError;
use crate::image_compressor::ImageCompressor;
use crate::markers::MarkerOracle;
use crate::platform::PlatformCommands;
use crate::progress::{PassProgress, ProgressCallback};
use crate::video_compressor::VideoCompressor;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Which passes to run
#[derive(Debug, Clone, Copy)]
pub struct CompressionOptions {
    pub process_video: bool,
    pub process_image: bool,
    pub convert_incompatible: bool,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            process_video: true,
            process_image: true,
            convert_incompatible: true,
        }
    }
}

/// One per-file failure recorded during a pass
#[derive(Debug, Clone)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of a full run
#[derive(Debug, Default)]
pub struct RunReport {
    /// Total size of the input tree (the run's own output excluded)
    pub original_size: u64,
    /// Total size of the freshly written output tree
    pub compressed_size: u64,
    /// Timestamped directory all passes wrote into
    pub output_directory: PathBuf,
    pub video_failures: Vec<FileFailure>,
    pub image_failures: Vec<FileFailure>,
    pub conversion_failures: Vec<FileFailure>,
    /// Set when no usable codec was found; both video passes were aborted
    pub codec_failure: Option<String>,
}

impl RunReport {
    /// Aggregate sizes as an `(original, compressed)` pair
    pub fn sizes(&self) -> (u64, u64) {
        (self.original_size, self.compressed_size)
    }
}

/// Main compression orchestrator
pub struct CompressionHandler {
    config: Arc<Config>,
    catalog: MediaCatalog,
    markers: MarkerOracle,
    stop_receiver: Option<broadcast::Receiver<()>>,
}

impl CompressionHandler {
    /// Create a new handler for one run
    pub fn new(config: Config) -> Result<Self, CompressionError> {
        config
            .validate()
            .map_err(|e| CompressionError::Validation(e.to_string()))?;

        let config = Arc::new(config);
        let markers = MarkerOracle::new();
        let catalog = MediaCatalog::new(config.clone(), markers.clone());

        Ok(Self {
            config,
            catalog,
            markers,
            stop_receiver: None,
        })
    }

    /// Attach a cooperative stop channel, checked between files and raced
    /// against in-flight encoder processes.
    pub fn with_cancellation(mut self, stop_receiver: broadcast::Receiver<()>) -> Self {
        self.stop_receiver = Some(stop_receiver);
        self
    }

    /// Run the enabled passes over `input` (a directory or a single file).
    ///
    /// Returns the aggregate size report plus the per-stage failure lists.
    /// Per-file errors never abort the run; `NoCodec` aborts only the two
    /// video passes; cancellation aborts everything.
    pub async fn start_compression(
        &mut self,
        input: &Path,
        options: CompressionOptions,
        progress: ProgressCallback,
    ) -> Result<RunReport, CompressionError> {
        if !input.exists() {
            return Err(CompressionError::Validation(format!(
                "Input path does not exist: {}",
                input.display()
            )));
        }

        info!("Starting compression run on: {}", input.display());
        self.preflight(&options).await;

        let output_root = self.create_output_root(input).await?;
        let mut report = RunReport {
            output_directory: output_root.clone(),
            ..Default::default()
        };

        if options.process_video {
            match self
                .compress_videos_in_directory(input, &output_root, &progress)
                .await
            {
                Ok(failures) => report.video_failures = failures,
                Err(CompressionError::NoCodec) => {
                    error!("{}", CompressionError::NoCodec);
                    report.codec_failure = Some(CompressionError::NoCodec.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        if options.process_image {
            report.image_failures = self
                .compress_images_in_directory(input, &output_root, &progress)
                .await?;
        }

        if options.convert_incompatible {
            if report.codec_failure.is_some() {
                warn!("Skipping incompatible-format conversion: no usable codec");
            } else {
                match self
                    .convert_incompatible_in_directory(input, &output_root, &progress)
                    .await
                {
                    Ok(failures) => report.conversion_failures = failures,
                    Err(CompressionError::NoCodec) => {
                        error!("{}", CompressionError::NoCodec);
                        report.codec_failure = Some(CompressionError::NoCodec.to_string());
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        report.original_size = tree_size(input, Some(&output_root));
        report.compressed_size = tree_size(&output_root, None);

        info!(
            "Compression run finished: {} -> {} bytes, output in {}",
            report.original_size,
            report.compressed_size,
            output_root.display()
        );
        Ok(report)
    }

    /// Video compression pass: codec selection, then one encoder
    /// invocation per candidate at the derived target bitrate.
    async fn compress_videos_in_directory(
        &mut self,
        root: &Path,
        output_root: &Path,
        progress: &ProgressCallback,
    ) -> Result<Vec<FileFailure>, CompressionError> {
        let selector = CodecSelector::new(self.config.codec_priority.clone());
        let codec = selector.select_best_codec().await?;
        info!(
            "Started compressing videos in directory: {} (codec: {})",
            root.display(),
            codec
        );

        let files = self.catalog.collect(root, MediaKind::Video).await?;
        let mut compressor = self.video_compressor();
        let mut sweep = PassProgress::new(&files);
        let mut failures = Vec::new();

        for (completed, file) in files.iter().enumerate() {
            self.ensure_not_cancelled()?;
            sweep.report_current(progress, &file.path, completed);

            let result = self
                .compress_one_video(&mut compressor, file, root, output_root, &codec)
                .await;
            if let Err(e) = result {
                if matches!(e, CompressionError::Cancelled) {
                    return Err(e);
                }
                error!(
                    "An error occurred while encoding: {}. ERROR MESSAGE: {}",
                    file.path.display(),
                    e
                );
                failures.push(FileFailure {
                    path: file.path.clone(),
                    error: e.to_string(),
                });
            }
            sweep.file_done(file.size);
        }

        sweep.finish(progress);
        info!("Finished compressing videos in directory: {}", root.display());
        Ok(failures)
    }

    async fn compress_one_video(
        &self,
        compressor: &mut VideoCompressor,
        file: &MediaFile,
        root: &Path,
        output_root: &Path,
        codec: &str,
    ) -> Result<(), CompressionError> {
        let output = mirrored_output_path(root, &file.path, output_root, None)?;
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Bitrate derivation failure is a hard error for this file only
        let bitrate = bitrate::bitrate_for(&file.path).await?;
        debug!("Target bitrate for {}: {}", file.path.display(), bitrate);

        compressor.compress(&file.path, &output, &bitrate, codec).await
    }

    /// Image compression pass: in-process resize plus marker stamping
    async fn compress_images_in_directory(
        &mut self,
        root: &Path,
        output_root: &Path,
        progress: &ProgressCallback,
    ) -> Result<Vec<FileFailure>, CompressionError> {
        info!("Started compressing images in directory: {}", root.display());

        let files = self.catalog.collect(root, MediaKind::Image).await?;
        let compressor = ImageCompressor::new(self.config.clone(), self.markers.clone());
        let mut sweep = PassProgress::new(&files);
        let mut failures = Vec::new();

        for (completed, file) in files.iter().enumerate() {
            self.ensure_not_cancelled()?;
            sweep.report_current(progress, &file.path, completed);

            let result = self
                .compress_one_image(&compressor, file, root, output_root)
                .await;
            if let Err(e) = result {
                if matches!(e, CompressionError::Cancelled) {
                    return Err(e);
                }
                error!(
                    "Uncaught error occurred while compressing image: {}. ERROR MESSAGE: {}",
                    file.path.display(),
                    e
                );
                failures.push(FileFailure {
                    path: file.path.clone(),
                    error: e.to_string(),
                });
            }
            sweep.file_done(file.size);
        }

        sweep.finish(progress);
        info!("Finished compressing images in directory: {}", root.display());
        Ok(failures)
    }

    async fn compress_one_image(
        &self,
        compressor: &ImageCompressor,
        file: &MediaFile,
        root: &Path,
        output_root: &Path,
    ) -> Result<(), CompressionError> {
        let output = mirrored_output_path(root, &file.path, output_root, None)?;
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        compressor.compress(&file.path, &output).await
    }

    /// Incompatible-format pass: normalize raw streams into MP4.
    ///
    /// Codec availability gates this stage like the video pass even though
    /// the conversion command pins libx264.
    async fn convert_incompatible_in_directory(
        &mut self,
        root: &Path,
        output_root: &Path,
        progress: &ProgressCallback,
    ) -> Result<Vec<FileFailure>, CompressionError> {
        let selector = CodecSelector::new(self.config.codec_priority.clone());
        selector.select_best_codec().await?;
        info!(
            "Started converting incompatible formats in directory: {}",
            root.display()
        );

        let files = self.catalog.collect(root, MediaKind::IncompatibleVideo).await?;
        let mut compressor = self.video_compressor();
        let mut sweep = PassProgress::new(&files);
        let mut failures = Vec::new();

        let forced_ext = self.config.converted_extension.clone();
        for (completed, file) in files.iter().enumerate() {
            self.ensure_not_cancelled()?;
            sweep.report_current(progress, &file.path, completed);

            let result = async {
                let output =
                    mirrored_output_path(root, &file.path, output_root, Some(&forced_ext))?;
                if let Some(parent) = output.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                compressor.convert_incompatible(&file.path, &output).await
            }
            .await;

            if let Err(e) = result {
                if matches!(e, CompressionError::Cancelled) {
                    return Err(e);
                }
                error!(
                    "An error occurred while converting: {}. ERROR MESSAGE: {}",
                    file.path.display(),
                    e
                );
                failures.push(FileFailure {
                    path: file.path.clone(),
                    error: e.to_string(),
                });
            }
            sweep.file_done(file.size);
        }

        sweep.finish(progress);
        info!(
            "Finished converting incompatible formats in directory: {}",
            root.display()
        );
        Ok(failures)
    }

    fn video_compressor(&self) -> VideoCompressor {
        match self.stop_receiver {
            Some(ref receiver) => {
                VideoCompressor::new_with_cancellation(self.config.clone(), receiver.resubscribe())
            }
            None => VideoCompressor::new(self.config.clone()),
        }
    }

    /// Cooperative stop check between files
    fn ensure_not_cancelled(&mut self) -> Result<(), CompressionError> {
        if let Some(ref mut receiver) = self.stop_receiver {
            match receiver.try_recv() {
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => {
                    return Err(CompressionError::Cancelled);
                }
                Err(broadcast::error::TryRecvError::Empty)
                | Err(broadcast::error::TryRecvError::Closed) => {}
            }
        }
        Ok(())
    }

    async fn create_output_root(&self, input: &Path) -> Result<PathBuf, CompressionError> {
        let base = if input.is_dir() {
            input.to_path_buf()
        } else {
            input.parent().unwrap_or(Path::new(".")).to_path_buf()
        };

        let timestamp = Local::now().format("%d-%m-%Y_%H-%M-%S");
        let output_root = base.join(format!("output_{}", timestamp));
        tokio::fs::create_dir_all(&output_root).await?;
        debug!("Created output directory: {}", output_root.display());
        Ok(output_root)
    }

    /// Log missing external tools up front instead of failing one file at
    /// a time deep inside a pass.
    async fn preflight(&self, options: &CompressionOptions) {
        let platform = PlatformCommands::instance();

        if options.process_video || options.convert_incompatible {
            for tool in ["ffmpeg", "ffprobe"] {
                if !platform.is_command_available(tool).await {
                    warn!("{} not found: video passes will not be able to proceed", tool);
                }
            }
        }

        if options.process_image {
            self.markers.check_image_marker_support().await;
        }
    }
}

/// Output path mirroring the input's location relative to the scan root,
/// rooted under the run's output directory. A single-file scan root maps
/// to just the file name.
fn mirrored_output_path(
    scan_root: &Path,
    input: &Path,
    output_root: &Path,
    forced_extension: Option<&str>,
) -> Result<PathBuf, CompressionError> {
    let file_name = input.file_name().ok_or_else(|| {
        CompressionError::Unsupported(format!("Path has no file name: {}", input.display()))
    })?;

    let relative: PathBuf = if scan_root.is_dir() {
        match input.strip_prefix(scan_root) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => PathBuf::from(file_name),
        }
    } else {
        PathBuf::from(file_name)
    };

    let mut output = output_root.join(relative);
    if let Some(ext) = forced_extension {
        output.set_extension(ext);
    }
    Ok(output)
}
