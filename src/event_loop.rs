//! The control loop.
//!
//! Every user action and every asynchronous completion reaches the loop as an [`EngineEvent`] on
//! one channel and is handled to completion before the next event is looked at. Reading dropped
//! files and decoding happen on short-lived worker threads that post their results back to the
//! same channel. Frame ticks are generated by [`EventLoop::run`] itself.

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Instant;

use crate::audio_engine::AudioEngine;
use crate::audio_engine::context::ContextFactory;
use crate::audio_engine::errors::PlayError;
use crate::audio_engine::sample_loader::{DecodeHint, decode_audio_bytes};
use crate::catalog::SoundCatalog;
use crate::fetch::read_dropped_file;
use crate::input::{PadIndicators, PadInput};
use crate::messages::{EngineEvent, TriggerSource};
use crate::visualizer::canvas::Canvas;

/// What a front end gets to show after a frame was drawn.
pub struct Frame<'a> {
    pub canvas: &'a Canvas,
    /// Pad keys in catalog order.
    pub pads: &'a [String],
    pub indicators: &'a PadIndicators,
}

/// Displays drawn frames.
pub trait Presenter {
    fn present(&mut self, frame: &Frame<'_>);
}

pub struct EventLoop<F: ContextFactory, P: Presenter> {
    engine: AudioEngine<F>,
    presenter: P,
    pads: Vec<String>,
    input: PadInput,
    indicators: PadIndicators,
    sender: Sender<EngineEvent>,
    receiver: Receiver<EngineEvent>,
}

impl<F: ContextFactory, P: Presenter> EventLoop<F, P> {
    pub fn new(engine: AudioEngine<F>, catalog: &SoundCatalog, presenter: P) -> Self {
        let (sender, receiver) = mpsc::channel();
        let indicators = PadIndicators::new(engine.config().pad_flash);
        Self {
            engine,
            presenter,
            pads: catalog.keys(),
            input: PadInput::new(catalog),
            indicators,
            sender,
            receiver,
        }
    }

    /// Sender for posting events from other threads.
    pub fn sender(&self) -> Sender<EngineEvent> {
        self.sender.clone()
    }

    /// Input translator for this loop's pads.
    pub fn pad_input(&self) -> PadInput {
        self.input.clone()
    }

    pub fn engine(&self) -> &AudioEngine<F> {
        &self.engine
    }

    pub fn indicators(&self) -> &PadIndicators {
        &self.indicators
    }

    /// Runs until a [`EngineEvent::Shutdown`] arrives.
    ///
    /// A frame tick is handled every `frame_period`, whether or not the previous tick drew.
    pub fn run(&mut self) {
        let period = self.engine.config().frame_period;
        let mut next_frame = Instant::now();

        loop {
            let now = Instant::now();
            if now >= next_frame {
                next_frame = now + period;
                if self.handle(EngineEvent::FrameTick, now).is_break() {
                    break;
                }
                continue;
            }

            match self.receiver.recv_timeout(next_frame - now) {
                Ok(event) => {
                    if self.handle(event, Instant::now()).is_break() {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        log::info!("Event loop stopped");
    }

    /// Handles a single event.
    pub fn handle(&mut self, event: EngineEvent, now: Instant) -> ControlFlow<()> {
        match event {
            EngineEvent::UserTriggered { key, source } => {
                log::debug!("{key} pressed ({source:?})");
                self.indicators.press(&key, source, now);
                self.trigger(&key);
            }
            EngineEvent::PadReleased { key } => {
                self.indicators.release(&key, now);
            }
            EngineEvent::FileDropped {
                key,
                path,
                media_type,
            } => {
                self.spawn_read(key, path, media_type);
            }
            EngineEvent::FetchCompleted {
                key,
                media_type,
                result,
            } => match result {
                Ok(bytes) => {
                    self.spawn_decode(key, DecodeHint::from_media_type(&media_type), bytes);
                }
                Err(err) => {
                    log::error!("Error reading dropped sound for {key}: {err}");
                }
            },
            EngineEvent::DropReceived {
                key,
                media_type,
                bytes,
            } => {
                self.spawn_decode(key, DecodeHint::from_media_type(&media_type), bytes);
            }
            EngineEvent::DecodeCompleted { key, result } => match result {
                Ok(sample) => {
                    self.engine.store(&key, sample);
                    log::info!("Replaced sound for {key}");
                    self.trigger(&key);
                }
                Err(err) => {
                    log::error!("Error decoding sound for {key}: {err}");
                }
            },
            EngineEvent::FrameTick => self.frame(now),
            EngineEvent::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn trigger(&mut self, key: &str) {
        match self.engine.play(key) {
            Ok(id) => log::debug!("{key} playing as {id}"),
            Err(err @ PlayError::MissingBuffer { .. }) => log::warn!("{err}"),
            Err(err) => log::error!("Failed to play {key}: {err}"),
        }
    }

    fn spawn_read(&self, key: String, path: PathBuf, media_type: String) {
        let sender = self.sender.clone();
        thread::spawn(move || {
            let result = read_dropped_file(&path);
            let _ = sender.send(EngineEvent::FetchCompleted {
                key,
                media_type,
                result,
            });
        });
    }

    fn spawn_decode(&mut self, key: String, hint: DecodeHint, bytes: Vec<u8>) {
        let format = match self.engine.output_format() {
            Ok(format) => format,
            Err(err) => {
                log::error!("Cannot decode sound for {key}: {err}");
                return;
            }
        };

        let sender = self.sender.clone();
        thread::spawn(move || {
            let result = decode_audio_bytes(bytes, &hint, format);
            let _ = sender.send(EngineEvent::DecodeCompleted {
                key,
                result,
            });
        });
    }

    fn frame(&mut self, now: Instant) {
        self.engine.poll_audio_messages();
        self.indicators.expire(now);

        if !self.engine.render_frame(now) {
            return;
        }

        if let Some(canvas) = self.engine.canvas() {
            self.presenter.present(&Frame {
                canvas,
                pads: &self.pads,
                indicators: &self.indicators,
            });
        }
    }
}
