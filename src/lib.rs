//! # Media Compressor Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione (tabelle estensioni, codec, qualità)
//! - `error`: Tipi di errore custom per diverse operazioni
//! - `platform`: Risoluzione cross-platform dei comandi esterni
//! - `probe`: Probe read-only dei metadata container via ffprobe
//! - `markers`: Rilevazione e stamping del marker "processed"
//! - `catalog`: Classificazione e discovery dei file media
//! - `codec`: Selezione dell'encoder con fallback ordinato
//! - `bitrate`: Derivazione del bitrate target dal sorgente
//! - `video_compressor`: Invocazioni dell'encoder esterno
//! - `image_compressor`: Resize e re-encoding immagini in-process
//! - `progress`: Progress pesato sui byte e resa CLI
//! - `handler`: Orchestratore dei tre pass di compressione
//!
//! ## Utilizzo:
//! ```rust,no_run
//! use media_compressor::{
//!     CompressionHandler, CompressionOptions, Config, ProgressCallback,
//! };
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), media_compressor::CompressionError> {
//! let progress: ProgressCallback = Arc::new(|_ratio, _file, _index, _total| {});
//! let mut handler = CompressionHandler::new(Config::default())?;
//! let report = handler
//!     .start_compression(Path::new("/media"), CompressionOptions::default(), progress)
//!     .await?;
//! let (original, compressed) = report.sizes();
//! # let _ = (original, compressed);
//! # Ok(())
//! # }
//! ```

pub mod bitrate;
pub mod catalog;
pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod image_compressor;
pub mod markers;
pub mod platform;
pub mod probe;
pub mod progress;
pub mod utils;
pub mod video_compressor;

pub use catalog::{MediaCatalog, MediaFile, MediaKind};
pub use config::Config;
pub use error::CompressionError;
pub use handler::{CompressionHandler, CompressionOptions, FileFailure, RunReport};
pub use progress::ProgressCallback;
