//! The sound catalog: default pad-to-file bindings.
//!
//! The catalog is a JSON document with a single recognised field:
//!
//! ```json
//! { "soundFiles": [ { "key": "Q", "file": "sounds/kick.wav" } ] }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid catalog: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid pad key {key:?} for {file}: expected a single uppercase letter")]
    InvalidKey { key: String, file: String },
}

/// One pad and its default sound.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SoundEntry {
    pub key: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundCatalog {
    pub sound_files: Vec<SoundEntry>,
}

impl SoundCatalog {
    /// Parses and validates a catalog document.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: SoundCatalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Reads a catalog file.
    ///
    /// Entry paths are not touched here; see [`FsFetcher::for_catalog`](crate::fetch::FsFetcher::for_catalog).
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let json = fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&json)?;
        log::debug!("Catalog {}: {:?}", path.display(), catalog);
        Ok(catalog)
    }

    /// Pad keys in catalog order.
    pub fn keys(&self) -> Vec<String> {
        self.sound_files.iter().map(|e| e.key.clone()).collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.sound_files.iter().any(|e| e.key == key)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        for entry in &self.sound_files {
            let mut chars = entry.key.chars();
            let valid = matches!(
                (chars.next(), chars.next()),
                (Some(c), None) if c.is_alphabetic() && c.is_uppercase()
            );
            if !valid {
                return Err(CatalogError::InvalidKey {
                    key: entry.key.clone(),
                    file: entry.file.clone(),
                });
            }
        }
        Ok(())
    }
}
