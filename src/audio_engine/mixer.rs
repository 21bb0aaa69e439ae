//! Real-time audio mixer implementation.
//!
//! This module provides the [`RtMixer`] struct which renders the single active
//! [`Voice`](crate::audio_engine::voice::Voice) on the audio thread. It owns exactly one voice
//! slot: starting a voice replaces whatever was in it, so two pads can never sound at once.
//!
//! Every rendered frame is also handed, down-mixed to mono, to an analysis tap. The tap sits
//! upstream of the output connection, so it sees silence when no voice is playing and sees the
//! voice even before the output has been connected.

use cpal::Sample;

use crate::audio_engine::channels::downmix_frame;
use crate::audio_engine::voice::{Voice, VoiceId};

/// Real-time single-voice renderer.
///
/// All operations are allocation free and real-time safe (apart from dropping the last handle to
/// a sample buffer, which the control side normally still holds).
pub struct RtMixer {
    /// Number of output channels.
    channels: usize,

    /// The only voice slot.
    voice: Option<Voice>,

    /// Whether rendered audio reaches the output buffer.
    output_connected: bool,
}

impl RtMixer {
    /// Creates a new RtMixer with the specified number of channels.
    ///
    /// The output starts disconnected; see [`RtMixer::connect_output`].
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            voice: None,
            output_connected: false,
        }
    }

    /// Routes rendered audio to the output buffer. Repeated calls are no-ops.
    pub fn connect_output(&mut self) {
        self.output_connected = true;
    }

    /// Puts `voice` into the slot.
    ///
    /// Returns the id of the voice that was replaced, if any.
    pub fn start_voice(&mut self, voice: Voice) -> Option<VoiceId> {
        self.voice.replace(voice).map(|previous| previous.id)
    }

    /// Stops the voice with the given id.
    ///
    /// Returns `false` (and leaves the slot alone) when that voice is no longer playing.
    pub fn stop_voice(&mut self, id: VoiceId) -> bool {
        if self.voice.as_ref().is_some_and(|v| v.id == id) {
            self.voice = None;
            return true;
        }
        false
    }

    /// Renders audio frames to the output buffer.
    ///
    /// The output buffer contains interleaved audio samples with `channels` per frame. `tap`
    /// receives one mono sample per output frame.
    ///
    /// Returns the id of the voice that finished during this call.
    pub fn render(&mut self, output: &mut [f32], tap: &mut impl FnMut(f32)) -> Option<VoiceId> {
        output.fill(Sample::EQUILIBRIUM);

        if self.channels == 0 {
            return None;
        }

        let channels = self.channels;
        let frames = output.len() / channels;
        let mut rendered = 0;
        let mut finished = None;

        if let Some(voice) = self.voice.as_mut() {
            if voice.sample.channels != channels {
                finished = Some(voice.id);
            } else {
                let n = voice.remaining_frames().min(frames);
                let start = voice.frame_pos * channels;
                let source = &voice.sample.samples[start..start + n * channels];

                for (i, frame) in source.chunks_exact(channels).enumerate() {
                    tap(downmix_frame(frame));
                    if self.output_connected {
                        output[i * channels..(i + 1) * channels].copy_from_slice(frame);
                    }
                }

                voice.frame_pos += n;
                rendered = n;

                if voice.is_finished() {
                    finished = Some(voice.id);
                }
            }
        }

        if finished.is_some() {
            self.voice = None;
        }

        for _ in rendered..frames {
            tap(0.0);
        }

        finished
    }

    /// The voice currently in the slot.
    pub fn active_voice(&self) -> Option<&Voice> {
        self.voice.as_ref()
    }

    /// Whether rendered audio reaches the output buffer.
    pub fn is_output_connected(&self) -> bool {
        self.output_connected
    }

    /// Gets the number of channels configured for this mixer.
    pub fn channels(&self) -> usize {
        self.channels
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::messages::SampleBuffer;

    fn create_test_sample(channels: usize, frames: usize, value: f32) -> SampleBuffer {
        let samples = vec![value; channels * frames];
        SampleBuffer {
            channels,
            sample_rate: 44_100,
            samples: Arc::from(samples.into_boxed_slice()),
        }
    }

    fn connected_mixer(channels: usize) -> RtMixer {
        let mut mixer = RtMixer::new(channels);
        mixer.connect_output();
        mixer
    }

    #[test]
    fn test_mixer_creation() {
        let mixer = RtMixer::new(2);
        assert_eq!(mixer.channels(), 2);
        assert!(mixer.active_voice().is_none());
        assert!(!mixer.is_output_connected());
    }

    #[test]
    fn test_render_silence() {
        let mut mixer = connected_mixer(2);
        let mut output = vec![1.0; 200]; // 100 frames of stereo
        let mut tapped = Vec::new();

        let finished = mixer.render(&mut output, &mut |s| tapped.push(s));

        assert!(finished.is_none());
        assert!(output.iter().all(|&s| s == 0.0));
        assert_eq!(tapped.len(), 100);
        assert!(tapped.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_render_with_voice() {
        let mut mixer = connected_mixer(2);
        mixer.start_voice(Voice::new(VoiceId(1), create_test_sample(2, 10, 0.5)));

        let mut output = vec![0.0; 20]; // 10 frames of stereo
        mixer.render(&mut output, &mut |_| {});

        assert!(output.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn test_render_disconnected_output_still_taps() {
        let mut mixer = RtMixer::new(1);
        mixer.start_voice(Voice::new(VoiceId(1), create_test_sample(1, 4, 0.25)));

        let mut output = vec![0.0; 4];
        let mut tapped = Vec::new();
        mixer.render(&mut output, &mut |s| tapped.push(s));

        assert!(output.iter().all(|&s| s == 0.0));
        assert_eq!(tapped, vec![0.25; 4]);
    }

    #[test]
    fn test_tap_receives_mono_downmix() {
        let samples = vec![0.2, 0.4, -0.2, -0.4];
        let sample = SampleBuffer {
            channels: 2,
            sample_rate: 44_100,
            samples: Arc::from(samples.into_boxed_slice()),
        };
        let mut mixer = connected_mixer(2);
        mixer.start_voice(Voice::new(VoiceId(1), sample));

        let mut output = vec![0.0; 4];
        let mut tapped = Vec::new();
        mixer.render(&mut output, &mut |s| tapped.push(s));

        assert!((tapped[0] - 0.3).abs() < 1e-6);
        assert!((tapped[1] + 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_voice_plays_once_and_reports_completion() {
        let mut mixer = connected_mixer(1);
        mixer.start_voice(Voice::new(VoiceId(9), create_test_sample(1, 5, 0.5)));

        // Render more frames than the sample contains
        let mut output = vec![0.0; 8];
        let finished = mixer.render(&mut output, &mut |_| {});

        assert_eq!(finished, Some(VoiceId(9)));
        assert_eq!(&output[..5], &[0.5; 5]);
        assert_eq!(&output[5..], &[0.0; 3]);
        assert!(mixer.active_voice().is_none());
    }

    #[test]
    fn test_voice_spans_multiple_callbacks() {
        let mut mixer = connected_mixer(1);
        mixer.start_voice(Voice::new(VoiceId(2), create_test_sample(1, 6, 0.5)));

        let mut output = vec![0.0; 4];
        assert!(mixer.render(&mut output, &mut |_| {}).is_none());
        assert_eq!(mixer.active_voice().map(|v| v.frame_pos), Some(4));

        assert_eq!(mixer.render(&mut output, &mut |_| {}), Some(VoiceId(2)));
        assert_eq!(&output[..2], &[0.5; 2]);
    }

    #[test]
    fn test_start_voice_replaces_previous() {
        let mut mixer = connected_mixer(1);
        assert_eq!(
            mixer.start_voice(Voice::new(VoiceId(1), create_test_sample(1, 10, 0.3))),
            None
        );
        assert_eq!(
            mixer.start_voice(Voice::new(VoiceId(2), create_test_sample(1, 10, 0.2))),
            Some(VoiceId(1))
        );

        let mut output = vec![0.0; 10];
        mixer.render(&mut output, &mut |_| {});

        // Only the newer voice is audible, nothing is summed.
        assert!(output.iter().all(|&s| (s - 0.2).abs() < f32::EPSILON));
    }

    #[test]
    fn test_stop_voice_ignores_stale_id() {
        let mut mixer = connected_mixer(1);
        mixer.start_voice(Voice::new(VoiceId(1), create_test_sample(1, 10, 0.3)));
        mixer.start_voice(Voice::new(VoiceId(2), create_test_sample(1, 10, 0.2)));

        assert!(!mixer.stop_voice(VoiceId(1)));
        assert_eq!(mixer.active_voice().map(|v| v.id), Some(VoiceId(2)));

        assert!(mixer.stop_voice(VoiceId(2)));
        assert!(mixer.active_voice().is_none());
    }

    #[test]
    fn test_wrong_channel_count_finishes_silently() {
        let mut mixer = connected_mixer(2);
        mixer.start_voice(Voice::new(VoiceId(4), create_test_sample(1, 10, 0.5)));

        let mut output = vec![0.0; 20];
        let finished = mixer.render(&mut output, &mut |_| {});

        assert_eq!(finished, Some(VoiceId(4)));
        assert!(output.iter().all(|&s| s == 0.0));
    }
}
