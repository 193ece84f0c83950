//! # Video Compression Module
//!
//! Questo modulo costruisce ed esegue le invocazioni dell'encoder esterno.
//!
//! ## Responsabilità:
//! - Costruisce il contratto di argomenti ffmpeg per la compressione video
//!   (bitrate target, codec selezionato, framerate, marker `comment`)
//! - Percorso hardware (h264_qsv): aggiunge `-preset medium`
//! - Conversione dei formati incompatibili a container normalizzato
//!   (libx264, CRF fisso, marker `comment`)
//! - Esecuzione del processo con cattura dello stream di errore
//! - Cancellazione cooperativa: un segnale di stop termina esplicitamente
//!   il processo encoder in corso
//!
//! ## Contratto di invocazione (compressione):
//! ```text
//! ffmpeg -i <input> -b:v <bitrate> -vcodec <codec> -r <framerate>
//!        -metadata comment=compressed [-preset medium] -loglevel error <output>
//! ```
//!
//! Un exit code non-zero è un fallimento per-file: viene loggato con lo
//! stderr catturato e non interrompe mai il batch.

use crate::args;
use crate::config::{Config, HARDWARE_CODEC, VIDEO_PROCESSED_COMMENT};
use crate::error::CompressionError;
use crate::platform::PlatformCommands;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Runs the external encoder for compression and conversion jobs
pub struct VideoCompressor {
    config: Arc<Config>,
    stop_receiver: Option<broadcast::Receiver<()>>,
}

impl VideoCompressor {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            stop_receiver: None,
        }
    }

    /// Create a compressor whose in-flight encoder process is killed when
    /// the stop channel fires.
    pub fn new_with_cancellation(config: Arc<Config>, stop_receiver: broadcast::Receiver<()>) -> Self {
        Self {
            config,
            stop_receiver: Some(stop_receiver),
        }
    }

    /// Argument list for one video compression invocation.
    ///
    /// The hardware codec additionally gets `-preset medium`; everything
    /// else is shared between the hardware and software paths.
    pub fn compress_args(
        input: &Path,
        output: &Path,
        bitrate: &str,
        codec: &str,
        framerate: &str,
    ) -> Vec<String> {
        let mut argv = args![
            "-i",
            input.display(),
            "-b:v",
            bitrate,
            "-vcodec",
            codec,
            "-r",
            framerate,
            "-metadata",
            format!("comment={}", VIDEO_PROCESSED_COMMENT),
        ];
        if codec == HARDWARE_CODEC {
            argv.extend(args!["-preset", "medium"]);
        }
        argv.extend(args!["-loglevel", "error", output.display()]);
        argv
    }

    /// Argument list for normalizing an incompatible format to MP4
    pub fn convert_args(input: &Path, output: &Path, crf: u8) -> Vec<String> {
        args![
            "-i",
            input.display(),
            "-c:v",
            "libx264",
            "-crf",
            crf,
            "-metadata",
            format!("comment={}", VIDEO_PROCESSED_COMMENT),
            "-preset",
            "medium",
            output.display(),
        ]
    }

    /// Compress one video to the target bitrate with the chosen codec
    pub async fn compress(
        &mut self,
        input: &Path,
        output: &Path,
        bitrate: &str,
        codec: &str,
    ) -> Result<(), CompressionError> {
        let framerate = self.config.framerate_arg();
        let argv = Self::compress_args(input, output, bitrate, codec, &framerate);
        self.run_ffmpeg(argv).await?;
        info!("Compressed video: {} to {}", input.display(), output.display());
        Ok(())
    }

    /// Re-encode an incompatible format into the normalized container
    pub async fn convert_incompatible(
        &mut self,
        input: &Path,
        output: &Path,
    ) -> Result<(), CompressionError> {
        let argv = Self::convert_args(input, output, self.config.conversion_crf);
        self.run_ffmpeg(argv).await?;
        info!("Converted video: {} to {}", input.display(), output.display());
        Ok(())
    }

    async fn run_ffmpeg(&mut self, argv: Vec<String>) -> Result<(), CompressionError> {
        let platform = PlatformCommands::instance();
        let ffmpeg_cmd = platform.get_command("ffmpeg");
        debug!("Running {} {}", ffmpeg_cmd, argv.join(" "));

        let mut child = tokio::process::Command::new(ffmpeg_cmd)
            .args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                CompressionError::Ffmpeg(format!("Failed to execute {}: {}", ffmpeg_cmd, e))
            })?;

        // Drain stderr concurrently so a chatty encoder can't fill the pipe
        let stderr_pipe = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            if let Some(mut pipe) = stderr_pipe {
                let _ = pipe.read_to_string(&mut buf).await;
            }
            buf
        });

        let status = match self.stop_receiver.as_mut() {
            Some(stop) => {
                tokio::select! {
                    status = child.wait() => status?,
                    res = stop.recv() => match res {
                        // A closed channel means no stop can ever arrive
                        Err(broadcast::error::RecvError::Closed) => child.wait().await?,
                        _ => {
                            let _ = child.kill().await;
                            stderr_task.abort();
                            return Err(CompressionError::Cancelled);
                        }
                    },
                }
            }
            None => child.wait().await?,
        };

        let stderr_text = stderr_task.await.unwrap_or_default();
        if !status.success() {
            return Err(CompressionError::Ffmpeg(stderr_text));
        }
        Ok(())
    }
}
