//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `CompressionError` enum per categorizzare tutti gli errori possibili
//! - Fornisce messaggi di errore descrittivi e strutturati
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O (file non trovati, permessi, etc.)
//! - `Image`: Errori di decodifica/encoding immagini
//! - `Ffmpeg`: Encoder esterno terminato con exit code non-zero
//! - `Probe`: Errori del probe read-only dei metadata (ffprobe)
//! - `Bitrate`: Bitrate sorgente mancante o non parsabile
//! - `Metadata`: Errori di stamping del marker "processed"
//! - `NoCodec`: Nessun codec video utilizzabile (fatale per i pass video)
//! - `Cancelled`: Operazione interrotta dall'utente

/// Custom error types for media compression
#[derive(thiserror::Error, Debug)]
pub enum CompressionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    #[error("Metadata probe error: {0}")]
    Probe(String),

    #[error("Bitrate calculation error: {0}")]
    Bitrate(String),

    #[error("Metadata tagging error: {0}")]
    Metadata(String),

    #[error("No supported video codec is available.")]
    NoCodec,

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Unsupported file format: {0}")]
    Unsupported(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Validation(String),
}
