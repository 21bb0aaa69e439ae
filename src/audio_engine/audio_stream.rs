//! Audio Stream Module
//!
//! This module handles CPAL audio stream management including:
//! - Logger setup
//! - Default output device discovery and stream configuration
//! - Wiring the [`Renderer`] into the real-time callback
//! - Error handling for audio stream operations

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, StreamConfig};
use env_logger::{Builder, Env, Target};

use crate::audio_engine::context::{AudioContext, ContextFactory, OutputFormat};
use crate::audio_engine::errors::EngineError;
use crate::config::EngineConfig;

/// Setup and configure the logger
pub fn setup_logger() {
    setup_logger_to(Target::Stderr, "info");
}

/// Like [`setup_logger`], but writes to `target` with its own default filter.
pub fn setup_logger_to(target: Target, default_filter: &str) {
    // Users can override via `RUST_LOG`, e.g. `RUST_LOG=debug` when troubleshooting.
    Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .target(target)
        .try_init()
        .unwrap_or(()); // Ignore initialization errors
}

/// Opens the default output device of the default host.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalContextFactory;

impl ContextFactory for CpalContextFactory {
    /// Create, configure and start the audio stream
    ///
    /// This function:
    /// 1. Sets up the default audio device
    /// 2. Configures the stream with a small fixed buffer for interactive latency
    /// 3. Creates the context/renderer pair (ring buffers, mixer, analysis node)
    /// 4. Builds and starts the audio stream
    fn create(&mut self, config: &EngineConfig) -> Result<AudioContext, EngineError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            EngineError::PlatformUnsupported("no audio output device found".to_string())
        })?;

        let default_config = device
            .default_output_config()
            .map_err(|e| EngineError::PlatformUnsupported(e.to_string()))?;
        let sample_rate = default_config.sample_rate();
        let channels = default_config.channels();

        log::info!(
            "Starting AudioEngine... ({} ch@{} Hz)",
            channels,
            sample_rate
        );

        let format = OutputFormat {
            channels: channels as usize,
            sample_rate,
        };
        let (context, mut renderer) = AudioContext::new_pair(format, config);

        let stream_config = StreamConfig {
            channels,
            sample_rate,
            buffer_size: BufferSize::Fixed(config.output_buffer_frames),
        };

        let stream = device.build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                renderer.process(data);
            },
            |err| {
                log::error!("Audio stream error: {}", err);
            },
            None,
        )?;

        stream.play()?;

        Ok(context.with_stream(stream))
    }
}
