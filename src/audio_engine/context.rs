//! The audio context: everything the control loop needs to talk to the audio thread.
//!
//! An [`AudioContext`] and its [`Renderer`] are created as a pair. The context stays on the
//! control loop and holds the sending end of the control queue, the receiving end of the event
//! queue and the [`AnalysisNode`]. The renderer moves into the audio callback and owns the
//! [`RtMixer`] plus the opposite queue ends. The two halves share nothing but lock-free SPSC ring
//! buffers.

use rtrb::{Consumer, Producer, RingBuffer};

use crate::audio_engine::analysis::AnalysisNode;
use crate::audio_engine::constants::TAP_CAPACITY_SNAPSHOTS;
use crate::audio_engine::errors::{EngineError, PlayError};
use crate::audio_engine::mixer::RtMixer;
use crate::audio_engine::voice::{Voice, VoiceId};
use crate::config::EngineConfig;
use crate::messages::{AudioMessage, ControlMessage, EndReason};

/// Channel layout and rate of the output stream. Decoded buffers are converted to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    pub channels: usize,
    pub sample_rate: u32,
}

/// Creates audio contexts. Called at most once per successful engine start.
pub trait ContextFactory {
    fn create(&mut self, config: &EngineConfig) -> Result<AudioContext, EngineError>;
}

/// Control-side half of a running audio output.
pub struct AudioContext {
    format: OutputFormat,
    producer: Producer<ControlMessage>,
    consumer: Consumer<AudioMessage>,
    analyser: AnalysisNode,
    output_connected: bool,
    /// Keeps the device stream alive; `None` for contexts driven without hardware.
    _stream: Option<cpal::Stream>,
}

impl AudioContext {
    /// Builds a context and the renderer that must be driven by the audio callback.
    pub fn new_pair(format: OutputFormat, config: &EngineConfig) -> (AudioContext, Renderer) {
        let (producer_in, consumer_in) = RingBuffer::new(config.message_queue_capacity);
        let (producer_out, consumer_out) = RingBuffer::new(config.message_queue_capacity);
        let (tap_producer, tap_consumer) =
            RingBuffer::new(config.fft_size * TAP_CAPACITY_SNAPSHOTS);

        let context = AudioContext {
            format,
            producer: producer_in,
            consumer: consumer_out,
            analyser: AnalysisNode::new(tap_consumer, config),
            output_connected: false,
            _stream: None,
        };

        let renderer = Renderer {
            mixer: RtMixer::new(format.channels),
            control: consumer_in,
            events: producer_out,
            tap: tap_producer,
        };

        (context, renderer)
    }

    /// Ties the lifetime of a device stream to this context.
    pub fn with_stream(mut self, stream: cpal::Stream) -> Self {
        self._stream = Some(stream);
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn analyser_mut(&mut self) -> &mut AnalysisNode {
        &mut self.analyser
    }

    /// Sends a control message to the audio thread.
    pub fn send(&mut self, message: ControlMessage) -> Result<(), PlayError> {
        let label = match &message {
            ControlMessage::ConnectOutput => "ConnectOutput",
            ControlMessage::StartVoice { .. } => "StartVoice",
            ControlMessage::StopVoice { .. } => "StopVoice",
        };
        self.producer
            .push(message)
            .map_err(|_| PlayError::QueueFull(label))
    }

    /// Connects the analysis path to the output device. Only the first call sends anything.
    pub fn connect_output(&mut self) -> Result<(), PlayError> {
        if self.output_connected {
            return Ok(());
        }
        self.send(ControlMessage::ConnectOutput)?;
        self.output_connected = true;
        Ok(())
    }

    /// Receives a message from the audio thread.
    pub fn try_recv(&mut self) -> Option<AudioMessage> {
        self.consumer.pop().ok()
    }
}

/// Audio-thread half: applies control messages and renders the mixer.
pub struct Renderer {
    mixer: RtMixer,
    control: Consumer<ControlMessage>,
    events: Producer<AudioMessage>,
    tap: Producer<f32>,
}

impl Renderer {
    /// Processes pending control messages, then fills `output` with interleaved samples.
    pub fn process(&mut self, output: &mut [f32]) {
        // Process incoming messages in real-time
        while let Ok(message) = self.control.pop() {
            match message {
                ControlMessage::ConnectOutput => {
                    self.mixer.connect_output();
                }
                ControlMessage::StartVoice { voice_id, sample } => {
                    if let Some(replaced) = self.mixer.start_voice(Voice::new(voice_id, sample)) {
                        self.report_end(replaced, EndReason::Stopped);
                    }
                }
                ControlMessage::StopVoice { voice_id } => {
                    if self.mixer.stop_voice(voice_id) {
                        self.report_end(voice_id, EndReason::Stopped);
                    }
                }
            }
        }

        // Render audio; analysis samples are dropped when the control side falls behind.
        let tap = &mut self.tap;
        let finished = self.mixer.render(output, &mut |s| {
            let _ = tap.push(s);
        });

        if let Some(voice_id) = finished {
            self.report_end(voice_id, EndReason::Finished);
        }
    }

    fn report_end(&mut self, voice_id: VoiceId, reason: EndReason) {
        let _ = self
            .events
            .push(AudioMessage::VoiceEnded { voice_id, reason });
    }

    #[cfg(test)]
    pub(crate) fn mixer(&self) -> &RtMixer {
        &self.mixer
    }
}
