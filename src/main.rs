//! # Media Compressor - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing`
//! - Validazione degli input dell'utente
//! - Wiring della cancellazione cooperativa su Ctrl-C
//! - Resa del progress e report finale con dimensioni risparmiate
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (input, pass da saltare, framerate, quality)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose)
//! 3. Carica la configurazione (file JSON opzionale + override CLI)
//! 4. Istanzia CompressionHandler e avvia i pass abilitati
//! 5. Stampa il riepilogo: dimensione originale, compressa, % risparmiata
//!
//! ## Esempio di utilizzo:
//! ```bash
//! media-compressor /path/to/media --skip-incompatible --framerate 30
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

use media_compressor::progress::{ProgressCallback, ProgressRenderer};
use media_compressor::utils;
use media_compressor::{CompressionError, CompressionHandler, CompressionOptions, Config};

#[derive(Parser)]
#[command(name = "media-compressor")]
#[command(about = "Compress videos and images in a directory tree, skipping already-processed files")]
struct Args {
    /// Directory (or single file) containing media to compress
    input: PathBuf,

    /// Skip the video compression pass
    #[arg(long)]
    skip_videos: bool,

    /// Skip the image compression pass
    #[arg(long)]
    skip_images: bool,

    /// Skip converting incompatible formats to MP4
    #[arg(long)]
    skip_incompatible: bool,

    /// Output frame rate for compressed videos
    #[arg(short, long, default_value = "30")]
    framerate: f64,

    /// JPEG quality for resized images (1-100)
    #[arg(short, long, default_value = "85")]
    quality: u8,

    /// Optional JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Validate arguments
    if !args.input.exists() {
        return Err(anyhow::anyhow!(
            "Input path does not exist: {}",
            args.input.display()
        ));
    }

    let mut config = match args.config {
        Some(ref path) => Config::from_file(path).await?,
        None => Config::default(),
    };
    config.framerate = args.framerate;
    config.image_quality = args.quality;
    config.validate()?;

    let options = CompressionOptions {
        process_video: !args.skip_videos,
        process_image: !args.skip_images,
        convert_incompatible: !args.skip_incompatible,
    };

    // Ctrl-C requests a cooperative stop: the current encoder process is
    // killed and the run ends between files.
    let (stop_sender, stop_receiver) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n🛑 Stopping compression...");
            let _ = stop_sender.send(());
        }
    });

    let renderer = ProgressRenderer::new();
    let progress_renderer = renderer.clone();
    let callback: ProgressCallback = Arc::new(move |ratio, current, index, total| {
        progress_renderer.update(ratio, current, index, total);
    });

    info!("Starting media compression in: {}", args.input.display());
    let mut handler = CompressionHandler::new(config)?.with_cancellation(stop_receiver);

    match handler.start_compression(&args.input, options, callback).await {
        Ok(report) => {
            renderer.finish("done");

            let (original, compressed) = report.sizes();
            let failures = report.video_failures.len()
                + report.image_failures.len()
                + report.conversion_failures.len();

            eprintln!("✅ Operation Completed Successfully!");
            eprintln!("   Original size: {}", utils::format_size(original));
            eprintln!("   Compressed size: {}", utils::format_size(compressed));
            eprintln!(
                "   Space saved: {}%",
                utils::savings_percent(original, compressed).round()
            );
            eprintln!("   Output directory: {}", report.output_directory.display());
            if failures > 0 {
                eprintln!("⚠️  {} file(s) failed, see the log for details", failures);
            }

            if let Some(message) = report.codec_failure {
                return Err(anyhow::anyhow!(message));
            }
            Ok(())
        }
        Err(CompressionError::Cancelled) => {
            renderer.finish("stopped");
            eprintln!("The operation has been stopped.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
