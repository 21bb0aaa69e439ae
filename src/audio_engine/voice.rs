//! Voice management for real-time audio playback.
//!
//! This module provides the [`Voice`] struct which represents a single playing
//! audio buffer with its current playback state.
//!
//! The [`PlaybackEngine`](crate::audio_engine::playback::PlaybackEngine) allocates voice ids; the
//! voice itself is built on the audio thread when its start message arrives and is rendered by
//! the [`RtMixer`](crate::audio_engine::mixer::RtMixer). A voice is one playback of a buffer, not
//! the buffer itself: replacing a pad's buffer never affects a voice that is already playing.

use std::fmt;

use crate::messages::SampleBuffer;

/// Identifier of one voice instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(pub u64);

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "voice#{}", self.0)
    }
}

/// A single voice in the mixer, representing a playing audio buffer.
#[derive(Debug)]
pub struct Voice {
    /// Identity used to match completion reports to the control side.
    pub id: VoiceId,

    /// The sample buffer being played.
    pub sample: SampleBuffer,

    /// Current playback position in frames.
    pub frame_pos: usize,
}

impl Voice {
    /// Creates a new voice positioned at the first frame of `sample`.
    pub fn new(id: VoiceId, sample: SampleBuffer) -> Self {
        Self {
            id,
            sample,
            frame_pos: 0,
        }
    }

    /// Frames left before the voice finishes.
    pub fn remaining_frames(&self) -> usize {
        self.sample.frames().saturating_sub(self.frame_pos)
    }

    /// Whether every frame has been rendered.
    pub fn is_finished(&self) -> bool {
        self.remaining_frames() == 0
    }
}
