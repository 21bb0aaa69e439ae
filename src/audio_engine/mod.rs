//! Audio Engine Module
//!
//! This module provides sample decoding, pad playback and spectrum analysis on top of a real-time
//! output stream. It is organized into sub-modules, each with a specific responsibility:
//!
//! - [`audio_stream`]: CPAL audio stream management, logger setup
//! - [`context`]: The control-side audio context and its audio-thread renderer
//! - [`constants`]: Configuration constants and limits
//! - [`errors`]: Audio-specific error types
//! - [`voice`]: Voice identity and lifecycle
//! - [`mixer`]: Real-time single-voice mixer
//! - [`analysis`]: Byte-valued frequency snapshots of the rendered signal
//! - [`sample_loader`]: Audio decoding, resampling and channel mapping
//! - [`buffer_cache`]: Decoded buffers by pad key
//! - [`playback`]: Single-active-voice policy
//!
//! The main [`AudioEngine`] struct ties these together for the control loop: it creates the
//! audio context on first use, owns the buffer cache and the visualizer, and routes voice
//! completions back to the playback policy.

use std::time::Instant;

use crate::audio_engine::buffer_cache::{BufferCache, PreloadReport};
use crate::audio_engine::context::{AudioContext, ContextFactory, OutputFormat};
use crate::audio_engine::errors::{EngineError, PlayError};
use crate::audio_engine::playback::{ActiveVoice, PlaybackEngine};
use crate::audio_engine::voice::VoiceId;
use crate::catalog::SoundCatalog;
use crate::config::EngineConfig;
use crate::fetch::SoundFetcher;
use crate::messages::{AudioMessage, EndReason, SampleBuffer};
use crate::visualizer::Visualizer;
use crate::visualizer::canvas::Canvas;

pub mod analysis;
pub mod audio_stream;
pub mod buffer_cache;
mod channels;
pub(crate) mod constants;
pub mod context;
pub mod errors;
mod mixer;
pub mod playback;
pub mod sample_loader;
pub mod voice;

#[cfg(test)]
pub(crate) mod offline;

/// Owns everything the control loop needs for audio: the lazily created context, the decoded
/// buffers, the playback policy and the visualizer.
pub struct AudioEngine<F: ContextFactory> {
    factory: F,
    config: EngineConfig,
    context: Option<AudioContext>,
    visualizer: Option<Visualizer>,
    cache: BufferCache,
    playback: PlaybackEngine,
}

impl<F: ContextFactory> AudioEngine<F> {
    /// Creates an engine without touching the audio device.
    pub fn new(factory: F, config: EngineConfig) -> Self {
        Self {
            factory,
            config,
            context: None,
            visualizer: None,
            cache: BufferCache::new(),
            playback: PlaybackEngine::new(),
        }
    }

    /// Returns the audio context, creating it (and starting the visualizer) on first use.
    ///
    /// A failed creation leaves nothing behind, so the next call tries again.
    pub fn context(&mut self) -> Result<&mut AudioContext, EngineError> {
        open_context(
            &mut self.context,
            &mut self.visualizer,
            &mut self.factory,
            &self.config,
        )
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    /// Rate and layout decoded buffers must have.
    pub fn output_format(&mut self) -> Result<OutputFormat, EngineError> {
        Ok(self.context()?.format())
    }

    /// Fetches and decodes every catalog entry into the buffer cache.
    ///
    /// Only a failure to create the audio context is returned; per-entry failures end up in the
    /// report.
    pub fn preload_all<S>(
        &mut self,
        catalog: &SoundCatalog,
        fetcher: &S,
    ) -> Result<PreloadReport, EngineError>
    where
        S: SoundFetcher + Sync,
    {
        let format = self.output_format()?;
        Ok(self.cache.preload_all(catalog, fetcher, format))
    }

    /// Stores a buffer decoded elsewhere under `key`.
    pub fn store(&mut self, key: &str, sample: SampleBuffer) {
        self.cache.store(key, sample);
    }

    /// Plays the buffer stored under `key`, stopping whatever was playing.
    pub fn play(&mut self, key: &str) -> Result<VoiceId, PlayError> {
        let context = open_context(
            &mut self.context,
            &mut self.visualizer,
            &mut self.factory,
            &self.config,
        )?;
        self.playback.play(key, &self.cache, context)
    }

    /// Drains messages from the audio thread.
    pub fn poll_audio_messages(&mut self) {
        let Some(context) = self.context.as_mut() else {
            return;
        };

        while let Some(message) = context.try_recv() {
            match message {
                AudioMessage::VoiceEnded { voice_id, reason } => {
                    if self.playback.on_voice_ended(voice_id) {
                        if reason == EndReason::Finished {
                            log::debug!("{voice_id} finished");
                        }
                    } else {
                        log::trace!("Ignoring end of superseded {voice_id}");
                    }
                }
            }
        }
    }

    /// Gives the visualizer a chance to draw. Returns whether a frame was drawn.
    pub fn render_frame(&mut self, now: Instant) -> bool {
        match (self.context.as_mut(), self.visualizer.as_mut()) {
            (Some(context), Some(visualizer)) => visualizer.tick(now, context.analyser_mut()),
            _ => false,
        }
    }

    /// The visualizer's canvas, once the context exists.
    pub fn canvas(&self) -> Option<&Canvas> {
        self.visualizer.as_ref().map(Visualizer::canvas)
    }

    pub fn visualizer(&self) -> Option<&Visualizer> {
        self.visualizer.as_ref()
    }

    pub fn buffers(&self) -> &BufferCache {
        &self.cache
    }

    pub fn active_voice(&self) -> Option<&ActiveVoice> {
        self.playback.active_voice()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

fn open_context<'a, F: ContextFactory>(
    slot: &'a mut Option<AudioContext>,
    visualizer: &mut Option<Visualizer>,
    factory: &mut F,
    config: &EngineConfig,
) -> Result<&'a mut AudioContext, EngineError> {
    let context = match slot.take() {
        Some(context) => context,
        None => {
            let mut context = factory.create(config)?;
            let bins = context.analyser_mut().frequency_bin_count();
            *visualizer = Some(Visualizer::new(bins, config));

            let format = context.format();
            log::info!(
                "Audio context ready ({} ch@{} Hz, {} analysis bins)",
                format.channels,
                format.sample_rate,
                bins
            );
            context
        }
    };
    Ok(slot.insert(context))
}
