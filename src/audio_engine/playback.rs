//! Control-side single-voice policy.
//!
//! At most one voice is ever active. Triggering a pad stops the current voice before the new one
//! is started, and completions of voices that were already superseded are ignored.

use crate::audio_engine::buffer_cache::BufferCache;
use crate::audio_engine::context::AudioContext;
use crate::audio_engine::errors::PlayError;
use crate::audio_engine::voice::VoiceId;
use crate::messages::{ControlMessage, SampleBuffer};

/// The voice the control loop believes is playing.
#[derive(Debug, Clone)]
pub struct ActiveVoice {
    pub id: VoiceId,
    pub key: String,
    pub sample: SampleBuffer,
}

#[derive(Debug, Default)]
pub struct PlaybackEngine {
    active: Option<ActiveVoice>,
    next_voice_id: u64,
}

impl PlaybackEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops whatever is playing and starts the buffer stored under `key` from its first frame.
    ///
    /// The stop is sent even when `key` has no buffer, so a missing sound still silences the
    /// previous one.
    pub fn play(
        &mut self,
        key: &str,
        cache: &BufferCache,
        context: &mut AudioContext,
    ) -> Result<VoiceId, PlayError> {
        // The previous voice stays active until its stop is queued.
        if let Some(previous) = &self.active {
            log::debug!("Stopping {} ({})", previous.id, previous.key);
            let voice_id = previous.id;
            context.send(ControlMessage::StopVoice { voice_id })?;
            self.active = None;
        }

        let sample = cache
            .get(key)
            .cloned()
            .ok_or_else(|| PlayError::MissingBuffer {
                key: key.to_string(),
            })?;

        context.connect_output()?;

        let id = self.allocate_id();
        context.send(ControlMessage::StartVoice {
            voice_id: id,
            sample: sample.clone(),
        })?;

        log::debug!("Playing {key} as {id}");
        self.active = Some(ActiveVoice {
            id,
            key: key.to_string(),
            sample,
        });
        Ok(id)
    }

    /// Handles a voice ending on the audio thread.
    ///
    /// Clears the active voice only when `id` is still the active one; returns whether it did.
    pub fn on_voice_ended(&mut self, id: VoiceId) -> bool {
        match &self.active {
            Some(active) if active.id == id => {
                self.active = None;
                true
            }
            _ => false,
        }
    }

    pub fn active_voice(&self) -> Option<&ActiveVoice> {
        self.active.as_ref()
    }

    fn allocate_id(&mut self) -> VoiceId {
        self.next_voice_id += 1;
        VoiceId(self.next_voice_id)
    }
}
