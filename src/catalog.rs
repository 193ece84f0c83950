//! # Media Catalog Module
//!
//! Questo modulo gestisce la discovery dei file media e la loro
//! classificazione per estensione.
//!
//! ## Responsabilità:
//! - Classifica i file in {video, video incompatibile, immagine} tramite
//!   le tabelle estensioni della configurazione (match case-insensitive)
//! - Walk ricorsivo di un albero di directory, oppure degradazione a
//!   risultato zero-o-uno per un singolo file di input
//! - Filtra i candidati già processati tramite il `MarkerOracle`
//! - Registra la dimensione in byte di ogni candidato (i symlink non
//!   contribuiscono al conteggio byte)
//! - Misura la dimensione complessiva di un albero per il report finale
//!
//! Ogni chiamata a `collect` è un re-walk completo: non esiste stato tra
//! una scansione e l'altra.

use crate::config::Config;
use crate::error::CompressionError;
use crate::markers::MarkerOracle;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use walkdir::WalkDir;

/// Media category a file belongs to, decided purely by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    IncompatibleVideo,
    Image,
}

/// One candidate file produced by a scan
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub path: PathBuf,
    pub kind: MediaKind,
    pub size: u64,
}

/// Classifies and enumerates media files beneath a scan root
pub struct MediaCatalog {
    config: Arc<Config>,
    markers: MarkerOracle,
}

impl MediaCatalog {
    pub fn new(config: Arc<Config>, markers: MarkerOracle) -> Self {
        Self { config, markers }
    }

    /// Classify a path by its extension, case-insensitively
    pub fn classify(&self, path: &Path) -> Option<MediaKind> {
        let ext = extension_key(path)?;

        if self.config.video_filetypes.contains(&ext) {
            Some(MediaKind::Video)
        } else if self.config.incompatible_filetypes.contains(&ext) {
            Some(MediaKind::IncompatibleVideo)
        } else if self.config.image_filetypes.contains(&ext) {
            Some(MediaKind::Image)
        } else {
            None
        }
    }

    /// Gather the candidate files of one kind beneath `root`.
    ///
    /// A file is a candidate iff its extension matches the kind's table and
    /// its processed marker is absent. `root` may also be a single file, in
    /// which case the same filters apply to a zero-or-one-element result.
    pub async fn collect(
        &self,
        root: &Path,
        kind: MediaKind,
    ) -> Result<Vec<MediaFile>, CompressionError> {
        if root.is_file() {
            return Ok(self.single_candidate(root, kind).await.into_iter().collect());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            if self.classify(path) != Some(kind) {
                continue;
            }
            if self.markers.is_processed(path, kind).await {
                debug!("Skipping already processed file: {}", path.display());
                continue;
            }

            // Symlinked entries are enumerated but carry no byte weight
            let size = if entry.path_is_symlink() {
                0
            } else {
                entry.metadata().map(|m| m.len()).unwrap_or(0)
            };

            files.push(MediaFile {
                path: path.to_path_buf(),
                kind,
                size,
            });
        }

        Ok(files)
    }

    async fn single_candidate(&self, path: &Path, kind: MediaKind) -> Option<MediaFile> {
        if self.classify(path) != Some(kind) {
            return None;
        }
        if self.markers.is_processed(path, kind).await {
            debug!("Skipping already processed file: {}", path.display());
            return None;
        }

        let size = tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0);
        Some(MediaFile {
            path: path.to_path_buf(),
            kind,
            size,
        })
    }
}

/// Total size in bytes of all regular files under `root`, optionally
/// skipping one subtree (the run's own output directory).
pub fn tree_size(root: &Path, exclude: Option<&Path>) -> u64 {
    if root.is_file() {
        return std::fs::metadata(root).map(|m| m.len()).unwrap_or(0);
    }

    WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| exclude.map(|x| e.path() != x).unwrap_or(true))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && !e.path_is_symlink())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

fn extension_key(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn catalog() -> MediaCatalog {
        MediaCatalog::new(Arc::new(Config::default()), MarkerOracle::new())
    }

    #[test]
    fn test_classify_by_extension() {
        let catalog = catalog();

        assert_eq!(catalog.classify(Path::new("a.mp4")), Some(MediaKind::Video));
        assert_eq!(catalog.classify(Path::new("b.MKV")), Some(MediaKind::Video));
        assert_eq!(
            catalog.classify(Path::new("raw.h264")),
            Some(MediaKind::IncompatibleVideo)
        );
        assert_eq!(catalog.classify(Path::new("c.JPeG")), Some(MediaKind::Image));
        assert_eq!(catalog.classify(Path::new("d.txt")), None);
        assert_eq!(catalog.classify(Path::new("noext")), None);
    }

    #[tokio::test]
    async fn test_collect_filters_by_kind_and_mirrors_tree() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("sub")).unwrap();
        std::fs::write(root.join("a.mp4"), vec![0u8; 100]).unwrap();
        std::fs::write(root.join("sub/b.avi"), vec![0u8; 50]).unwrap();
        std::fs::write(root.join("c.png"), vec![0u8; 10]).unwrap();
        std::fs::write(root.join("notes.txt"), b"hi").unwrap();

        let catalog = catalog();
        let mut videos = catalog.collect(root, MediaKind::Video).await.unwrap();
        videos.sort_by(|a, b| a.path.cmp(&b.path));

        let names: Vec<_> = videos
            .iter()
            .map(|f| f.path.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(names, vec![PathBuf::from("a.mp4"), PathBuf::from("sub/b.avi")]);
        assert_eq!(videos.iter().map(|f| f.size).sum::<u64>(), 150);

        let images = catalog.collect(root, MediaKind::Image).await.unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].size, 10);
    }

    #[tokio::test]
    async fn test_collect_single_file_root() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("clip.mp4");
        std::fs::write(&file, vec![0u8; 42]).unwrap();

        let catalog = catalog();
        let videos = catalog.collect(&file, MediaKind::Video).await.unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].size, 42);

        // Kind mismatch degrades to an empty result
        let images = catalog.collect(&file, MediaKind::Image).await.unwrap();
        assert!(images.is_empty());
    }

    #[test]
    fn test_tree_size_with_exclusion() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("output_x")).unwrap();
        std::fs::write(root.join("a.bin"), vec![0u8; 100]).unwrap();
        std::fs::write(root.join("output_x/b.bin"), vec![0u8; 40]).unwrap();

        assert_eq!(tree_size(root, None), 140);
        let excluded = root.join("output_x");
        assert_eq!(tree_size(root, Some(&excluded)), 100);
    }
}
