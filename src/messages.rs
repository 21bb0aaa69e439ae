//! Message definitions for communication between the control loop, loader threads and the
//! real-time audio thread.
//!
//! [`ControlMessage`] and [`AudioMessage`] are the wire format of the ring buffers between the
//! control loop and the audio callback. [`EngineEvent`] is the queue the control loop drains: every
//! user action and every asynchronous completion arrives as one of its variants and is handled to
//! completion before the next one.

use std::path::PathBuf;
use std::sync::Arc;

use crate::audio_engine::errors::{FetchError, SampleLoadError};
use crate::audio_engine::voice::VoiceId;

/// Decoded, immutable PCM audio shared between the cache and the audio thread.
///
/// Samples are interleaved and already converted to the output stream's channel layout and
/// sample rate, so the mixer can copy frames without any conversion.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    pub channels: usize,
    pub sample_rate: u32,
    pub samples: Arc<[f32]>,
}

impl SampleBuffer {
    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels
    }

    /// Playback duration in seconds.
    pub fn duration_sec(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f32 / self.sample_rate as f32
    }

    /// Whether two handles point at the same decoded data.
    pub fn same_data(&self, other: &SampleBuffer) -> bool {
        Arc::ptr_eq(&self.samples, &other.samples)
    }
}

/// Why a voice stopped producing audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The voice reached the end of its buffer.
    Finished,

    /// The voice was stopped explicitly or replaced by a newer one.
    Stopped,
}

/// Message that is emitted from the audio thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioMessage {
    /// A voice is gone from the mixer.
    VoiceEnded { voice_id: VoiceId, reason: EndReason },
}

/// Message that is emitted from the control loop to the audio thread.
#[derive(Debug, Clone)]
pub enum ControlMessage {
    /// Route the analysis path to the output device.
    ///
    /// Sent once per context; the mixer treats repeats as no-ops.
    ConnectOutput,

    /// Start playing a buffer from its first frame.
    ///
    /// # Parameters
    /// * `voice_id` - Identifier of the new voice
    /// * `sample` - Pre-decoded immutable sample buffer (shared handle)
    StartVoice {
        voice_id: VoiceId,
        sample: SampleBuffer,
    },

    /// Stop a voice if it is still the one playing.
    StopVoice { voice_id: VoiceId },
}

/// How a pad was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    Keyboard,
    Pointer,
}

/// Events processed by the control loop, one at a time.
#[derive(Debug)]
pub enum EngineEvent {
    /// A pad was pressed (keyboard key down or pointer click).
    UserTriggered { key: String, source: TriggerSource },

    /// A pad's keyboard key was released.
    PadReleased { key: String },

    /// A file path was dropped onto a pad; its bytes still need to be read.
    FileDropped {
        key: String,
        path: PathBuf,
        media_type: String,
    },

    /// Reading the bytes of a dropped file finished.
    FetchCompleted {
        key: String,
        media_type: String,
        result: Result<Vec<u8>, FetchError>,
    },

    /// Raw audio bytes were dropped onto a pad.
    DropReceived {
        key: String,
        media_type: String,
        bytes: Vec<u8>,
    },

    /// A background decode of dropped audio finished.
    DecodeCompleted {
        key: String,
        result: Result<SampleBuffer, SampleLoadError>,
    },

    /// Time to sample the analysis node and draw a frame.
    FrameTick,

    /// Leave the loop.
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_buffer_frames_and_duration() {
        let sample = SampleBuffer {
            channels: 2,
            sample_rate: 4,
            samples: Arc::from(vec![0.0; 16].into_boxed_slice()),
        };

        assert_eq!(sample.frames(), 8);
        assert!((sample.duration_sec() - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_sample_buffer_zero_channels() {
        let sample = SampleBuffer {
            channels: 0,
            sample_rate: 44_100,
            samples: Arc::from(vec![0.5].into_boxed_slice()),
        };

        assert_eq!(sample.frames(), 0);
        assert_eq!(sample.duration_sec(), 0.0);
    }

    #[test]
    fn test_same_data_tracks_shared_handles() {
        let a = SampleBuffer {
            channels: 1,
            sample_rate: 44_100,
            samples: Arc::from(vec![0.1, 0.2].into_boxed_slice()),
        };
        let b = a.clone();
        let c = SampleBuffer {
            channels: 1,
            sample_rate: 44_100,
            samples: Arc::from(vec![0.1, 0.2].into_boxed_slice()),
        };

        assert!(a.same_data(&b));
        assert!(!a.same_data(&c));
    }
}
