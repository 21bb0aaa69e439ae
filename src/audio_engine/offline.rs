//! A context factory that needs no audio hardware.
//!
//! The renderer is kept on the test side so tests decide when the "audio callback" runs.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::audio_engine::context::{AudioContext, ContextFactory, OutputFormat, Renderer};
use crate::audio_engine::errors::EngineError;
use crate::config::EngineConfig;

pub(crate) struct OfflineContextFactory {
    format: OutputFormat,
    failures_left: usize,
    device: OfflineDevice,
}

/// Test-side handle to the renderer of the most recently created context.
#[derive(Clone, Default)]
pub(crate) struct OfflineDevice {
    renderer: Rc<RefCell<Option<Renderer>>>,
    created: Rc<Cell<usize>>,
}

impl OfflineContextFactory {
    pub(crate) fn new(channels: usize, sample_rate: u32) -> (Self, OfflineDevice) {
        Self::failing(0, channels, sample_rate)
    }

    /// Factory whose first `failures` creations report an unsupported platform.
    pub(crate) fn failing(
        failures: usize,
        channels: usize,
        sample_rate: u32,
    ) -> (Self, OfflineDevice) {
        let device = OfflineDevice::default();
        let factory = Self {
            format: OutputFormat {
                channels,
                sample_rate,
            },
            failures_left: failures,
            device: device.clone(),
        };
        (factory, device)
    }
}

impl ContextFactory for OfflineContextFactory {
    fn create(&mut self, config: &EngineConfig) -> Result<AudioContext, EngineError> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(EngineError::PlatformUnsupported(
                "offline device unavailable".to_string(),
            ));
        }

        let (context, renderer) = AudioContext::new_pair(self.format, config);
        *self.device.renderer.borrow_mut() = Some(renderer);
        self.device.created.set(self.device.created.get() + 1);
        Ok(context)
    }
}

impl OfflineDevice {
    /// Number of contexts created so far.
    pub(crate) fn created(&self) -> usize {
        self.created.get()
    }

    /// Runs one callback of `frames` frames and returns the interleaved output.
    ///
    /// Returns an empty buffer when no context has been created yet.
    pub(crate) fn render(&self, frames: usize) -> Vec<f32> {
        let mut renderer = self.renderer.borrow_mut();
        let Some(renderer) = renderer.as_mut() else {
            return Vec::new();
        };

        let mut output = vec![0.0; frames * renderer.mixer().channels()];
        renderer.process(&mut output);
        output
    }
}
