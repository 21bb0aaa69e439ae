//! Retrieval of raw sound bytes.

use std::fs;
use std::path::{Path, PathBuf};

use crate::audio_engine::errors::FetchError;

/// Source of the raw bytes behind a catalog `file` entry.
pub trait SoundFetcher {
    fn fetch(&self, file: &str) -> Result<Vec<u8>, FetchError>;
}

/// Reads sound files from disk, resolving relative paths against a root directory.
#[derive(Debug, Clone)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Fetcher rooted at the directory containing `catalog_path`.
    pub fn for_catalog(catalog_path: &Path) -> Self {
        let root = catalog_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::new(root)
    }

    pub fn resolve(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }
}

impl SoundFetcher for FsFetcher {
    fn fetch(&self, file: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.resolve(file);
        fs::read(&path).map_err(|source| FetchError::from_io(path, source))
    }
}

/// Reads a dropped file.
pub fn read_dropped_file(path: &Path) -> Result<Vec<u8>, FetchError> {
    fs::read(path).map_err(|source| FetchError::from_io(path.to_path_buf(), source))
}
