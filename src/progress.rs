//! # Progress Tracking Module
//!
//! Questo modulo gestisce il progress reporting pesato sui byte.
//!
//! ## Responsabilità:
//! - `PassProgress`: accumulatore per un singolo pass (video, immagini o
//!   conversioni), resettato all'inizio di ogni pass
//! - Ratio = byte completati / byte totali del candidate set, così i file
//!   grandi dominano la barra invece del conteggio file
//! - Emissione della callback prima di ogni file e del sentinel finale
//!   `(1.0, "", total, total)` a fine pass, errori inclusi
//! - `ProgressRenderer`: resa visuale con `indicatif` per la CLI
//!
//! ## Visual feedback:
//! ```text
//! ⠋ [00:02:15] [========================>---------------] 62% 🎬 video.mp4 (3/7)
//! ```

use crate::catalog::MediaFile;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Callback invoked before each file and once after a pass completes:
/// `(ratio in [0,1], current file, files completed, total files)`
pub type ProgressCallback = Arc<dyn Fn(f64, &Path, usize, usize) + Send + Sync>;

/// Byte-weighted progress state for one compression pass
pub struct PassProgress {
    processed_bytes: u64,
    total_bytes: u64,
    total_files: usize,
}

impl PassProgress {
    /// Start a fresh sweep over the given candidate set
    pub fn new(files: &[MediaFile]) -> Self {
        Self {
            processed_bytes: 0,
            total_bytes: files.iter().map(|f| f.size).sum(),
            total_files: files.len(),
        }
    }

    /// Current byte-weighted completion ratio; 0 for an empty set
    pub fn ratio(&self) -> f64 {
        if self.total_bytes == 0 {
            0.0
        } else {
            self.processed_bytes as f64 / self.total_bytes as f64
        }
    }

    /// Announce the file about to be processed.
    ///
    /// `completed` is the number of files already finished in this pass,
    /// so the very first emission carries index 0.
    pub fn report_current(&self, callback: &ProgressCallback, current: &Path, completed: usize) {
        callback(self.ratio(), current, completed, self.total_files);
    }

    /// Record a finished file (successful or failed) by its byte weight
    pub fn file_done(&mut self, size: u64) {
        self.processed_bytes += size;
    }

    /// Emit the final sentinel, always ratio 1.0 regardless of errors
    pub fn finish(&self, callback: &ProgressCallback) {
        callback(1.0, Path::new(""), self.total_files, self.total_files);
    }
}

/// Renders progress callbacks as an indicatif bar.
///
/// The steady tick keeps the elapsed-time display moving independently of
/// file completions.
#[derive(Clone)]
pub struct ProgressRenderer {
    bar: ProgressBar,
}

/// Bar resolution: ratios in [0,1] map to positions 0..=1000
const BAR_SCALE: u64 = 1000;

impl ProgressRenderer {
    pub fn new() -> Self {
        let bar = ProgressBar::new(BAR_SCALE);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")
                .unwrap()
                .progress_chars("=>-"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Map one progress callback emission onto the bar
    pub fn update(&self, ratio: f64, current: &Path, completed: usize, total: usize) {
        self.bar.set_position((ratio * BAR_SCALE as f64) as u64);
        if current.as_os_str().is_empty() {
            self.bar.set_message(format!("({}/{})", completed, total));
        } else {
            let name = current.file_name().unwrap_or_default().to_string_lossy().to_string();
            self.bar.set_message(format!("{} ({}/{})", name, completed, total));
        }
    }

    /// Finish with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

impl Default for ProgressRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MediaKind;
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn candidate(name: &str, size: u64) -> MediaFile {
        MediaFile {
            path: PathBuf::from(name),
            kind: MediaKind::Video,
            size,
        }
    }

    fn recording_callback() -> (ProgressCallback, Arc<Mutex<Vec<(f64, String, usize, usize)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: ProgressCallback = Arc::new(move |ratio, path, index, total| {
            sink.lock()
                .unwrap()
                .push((ratio, path.display().to_string(), index, total));
        });
        (callback, seen)
    }

    #[test]
    fn test_byte_weighted_sweep() {
        let files = vec![candidate("big.mp4", 300), candidate("small.mp4", 100)];
        let (callback, seen) = recording_callback();

        let mut progress = PassProgress::new(&files);
        for (idx, file) in files.iter().enumerate() {
            progress.report_current(&callback, &file.path, idx);
            progress.file_done(file.size);
        }
        progress.finish(&callback);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], (0.0, "big.mp4".to_string(), 0, 2));
        assert_eq!(seen[1], (0.75, "small.mp4".to_string(), 1, 2));
        assert_eq!(seen[2], (1.0, "".to_string(), 2, 2));
    }

    #[test]
    fn test_ratios_are_monotonic_and_end_at_one() {
        let files: Vec<_> = (0..5u64)
            .map(|i| candidate(&format!("f{}.mp4", i), 10 * (i + 1)))
            .collect();
        let (callback, seen) = recording_callback();

        let mut progress = PassProgress::new(&files);
        for (idx, file) in files.iter().enumerate() {
            progress.report_current(&callback, &file.path, idx);
            progress.file_done(file.size);
        }
        progress.finish(&callback);

        let seen = seen.lock().unwrap();
        let ratios: Vec<f64> = seen.iter().map(|(r, _, _, _)| *r).collect();
        assert!(ratios.windows(2).all(|w| w[0] <= w[1]));
        assert!(ratios[0] >= 0.0);
        assert_eq!(*ratios.last().unwrap(), 1.0);
        assert_eq!(seen.last().unwrap().2, 5);
        assert_eq!(seen.last().unwrap().3, 5);
    }

    #[test]
    fn test_empty_set_reports_zero_ratio_then_finishes() {
        let (callback, seen) = recording_callback();

        let progress = PassProgress::new(&[]);
        assert_eq!(progress.ratio(), 0.0);
        progress.finish(&callback);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[(1.0, "".to_string(), 0, 0)]);
    }

    #[test]
    fn test_zero_byte_files_never_divide_by_zero() {
        let files = vec![candidate("empty.mp4", 0)];
        let mut progress = PassProgress::new(&files);
        assert_eq!(progress.ratio(), 0.0);
        progress.file_done(0);
        assert_eq!(progress.ratio(), 0.0);
    }
}
