//! Decoded buffers by pad key.
//!
//! Entries are created when a decode succeeds and overwritten in place when a pad's sound is
//! replaced. A failed decode never touches an existing entry, and entries are never removed.

use std::collections::HashMap;
use std::thread;

use crate::audio_engine::context::OutputFormat;
use crate::audio_engine::errors::{LoadError, SampleLoadError};
use crate::audio_engine::sample_loader::{DecodeHint, decode_audio_bytes};
use crate::catalog::{SoundCatalog, SoundEntry};
use crate::fetch::SoundFetcher;
use crate::messages::SampleBuffer;

/// Outcome of [`BufferCache::preload_all`].
#[derive(Debug, Default)]
pub struct PreloadReport {
    /// Keys that now hold a buffer, in catalog order.
    pub loaded: Vec<String>,

    /// Keys whose fetch or decode failed.
    pub failed: Vec<(String, LoadError)>,
}

impl PreloadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct BufferCache {
    buffers: HashMap<String, SampleBuffer>,
}

impl BufferCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `bytes` and stores the result under `key`.
    ///
    /// On failure the previous buffer for `key`, if any, is left untouched.
    pub fn decode_and_store(
        &mut self,
        key: &str,
        bytes: Vec<u8>,
        hint: &DecodeHint,
        format: OutputFormat,
    ) -> Result<(), SampleLoadError> {
        let sample = decode_audio_bytes(bytes, hint, format)?;
        self.store(key, sample);
        Ok(())
    }

    /// Stores an already decoded buffer, replacing any previous one.
    pub fn store(&mut self, key: &str, sample: SampleBuffer) {
        log::debug!(
            "Stored {key}: {} frames ({:.3}s)",
            sample.frames(),
            sample.duration_sec()
        );
        self.buffers.insert(key.to_string(), sample);
    }

    pub fn get(&self, key: &str) -> Option<&SampleBuffer> {
        self.buffers.get(key)
    }

    /// Keys holding a buffer, sorted.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.buffers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Fetches and decodes every catalog entry concurrently.
    ///
    /// Each entry runs on its own thread; a failing entry is logged and reported but never keeps
    /// the others from loading. Returns once every entry has settled.
    pub fn preload_all<F>(
        &mut self,
        catalog: &SoundCatalog,
        fetcher: &F,
        format: OutputFormat,
    ) -> PreloadReport
    where
        F: SoundFetcher + Sync,
    {
        let results: Vec<(&SoundEntry, Result<SampleBuffer, LoadError>)> = thread::scope(|scope| {
            let handles: Vec<_> = catalog
                .sound_files
                .iter()
                .map(|entry| (entry, scope.spawn(move || load_entry(entry, fetcher, format))))
                .collect();

            handles
                .into_iter()
                .map(|(entry, handle)| {
                    let result = handle.join().unwrap_or(Err(LoadError::Panicked));
                    (entry, result)
                })
                .collect()
        });

        let mut report = PreloadReport::default();
        for (entry, result) in results {
            match result {
                Ok(sample) => {
                    self.store(&entry.key, sample);
                    report.loaded.push(entry.key.clone());
                }
                Err(err) => {
                    log::error!("Error preloading sound {} ({}): {err}", entry.key, entry.file);
                    report.failed.push((entry.key.clone(), err));
                }
            }
        }

        log::info!(
            "Preloaded {}/{} sounds",
            report.loaded.len(),
            catalog.sound_files.len()
        );
        report
    }
}

fn load_entry<F: SoundFetcher>(
    entry: &SoundEntry,
    fetcher: &F,
    format: OutputFormat,
) -> Result<SampleBuffer, LoadError> {
    let bytes = fetcher.fetch(&entry.file)?;
    Ok(decode_audio_bytes(
        bytes,
        &DecodeHint::from_path(&entry.file),
        format,
    )?)
}
