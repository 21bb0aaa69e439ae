//! Front-end input, validated and translated into engine events.
//!
//! Front ends report raw [`InputEvent`]s; [`PadInput`] drops everything that does not target a
//! known pad (unknown keys, auto-repeat, non-audio drops) and turns the rest into
//! [`EngineEvent`]s. [`PadIndicators`] tracks the purely cosmetic "pad is lit" state.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::catalog::SoundCatalog;
use crate::messages::{EngineEvent, TriggerSource};

/// Raw input as reported by a front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A key went down. `repeat` is set for auto-repeat events of a held key.
    KeyDown { key: String, repeat: bool },

    KeyUp { key: String },

    /// A pad was clicked or tapped.
    Click { key: String },

    /// A file was dropped onto a pad.
    FileDropped { key: String, path: PathBuf },

    /// Raw bytes with a reported media type were dropped onto a pad.
    BytesDropped {
        key: String,
        media_type: String,
        bytes: Vec<u8>,
    },

    Quit,
}

/// Guesses a media type from a file extension.
pub fn media_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("wav" | "wave") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("ogg" | "oga") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("m4a" | "aac" | "mp4") => "audio/aac",
        Some("aif" | "aiff") => "audio/aiff",
        _ => "application/octet-stream",
    }
}

pub fn is_audio_media_type(media_type: &str) -> bool {
    media_type.starts_with("audio/")
}

/// Maps input onto the pads of a catalog.
#[derive(Debug, Clone)]
pub struct PadInput {
    pads: HashSet<String>,
}

impl PadInput {
    pub fn new(catalog: &SoundCatalog) -> Self {
        Self {
            pads: catalog.keys().into_iter().collect(),
        }
    }

    /// The pad addressed by `key`, matched case-insensitively.
    pub fn pad_for(&self, key: &str) -> Option<String> {
        let key = key.to_uppercase();
        self.pads.contains(&key).then_some(key)
    }

    /// Translates one input event. Returns `None` for input that must be ignored.
    pub fn translate(&self, event: InputEvent) -> Option<EngineEvent> {
        match event {
            InputEvent::KeyDown { repeat: true, .. } => None,
            InputEvent::KeyDown { key, repeat: false } => {
                self.pad_for(&key).map(|key| EngineEvent::UserTriggered {
                    key,
                    source: TriggerSource::Keyboard,
                })
            }
            InputEvent::KeyUp { key } => self
                .pad_for(&key)
                .map(|key| EngineEvent::PadReleased { key }),
            InputEvent::Click { key } => self.pad_for(&key).map(|key| EngineEvent::UserTriggered {
                key,
                source: TriggerSource::Pointer,
            }),
            InputEvent::FileDropped { key, path } => {
                let key = self.pad_for(&key)?;
                let media_type = media_type_for_path(&path);
                if !is_audio_media_type(media_type) {
                    log::info!("Ignoring drop of non-audio file {}", path.display());
                    return None;
                }
                Some(EngineEvent::FileDropped {
                    key,
                    path,
                    media_type: media_type.to_string(),
                })
            }
            InputEvent::BytesDropped {
                key,
                media_type,
                bytes,
            } => {
                let key = self.pad_for(&key)?;
                if !is_audio_media_type(&media_type) {
                    log::info!("Ignoring drop of {media_type} onto {key}");
                    return None;
                }
                Some(EngineEvent::DropReceived {
                    key,
                    media_type,
                    bytes,
                })
            }
            InputEvent::Quit => Some(EngineEvent::Shutdown),
        }
    }
}

/// Which pads are currently lit.
///
/// A keyboard press lights its pad until shortly after the key is released; a click lights it
/// for a short flash.
#[derive(Debug, Clone)]
pub struct PadIndicators {
    flash: Duration,
    /// `None` while a key is held, otherwise the moment the pad goes dark.
    active: HashMap<String, Option<Instant>>,
}

impl PadIndicators {
    pub fn new(flash: Duration) -> Self {
        Self {
            flash,
            active: HashMap::new(),
        }
    }

    pub fn press(&mut self, key: &str, source: TriggerSource, now: Instant) {
        match source {
            TriggerSource::Keyboard => {
                self.active.insert(key.to_string(), None);
            }
            TriggerSource::Pointer => {
                let deadline = now + self.flash;
                let entry = self.active.entry(key.to_string()).or_insert(Some(deadline));
                if let Some(current) = entry {
                    *current = (*current).max(deadline);
                }
            }
        }
    }

    pub fn release(&mut self, key: &str, now: Instant) {
        if let Some(deadline) = self.active.get_mut(key) {
            *deadline = Some(now + self.flash);
        }
    }

    /// Drops indicators whose flash has run out.
    pub fn expire(&mut self, now: Instant) {
        self.active
            .retain(|_, deadline| deadline.is_none_or(|d| d > now));
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.active.contains_key(key)
    }
}
