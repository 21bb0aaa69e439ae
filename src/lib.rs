//! A keyboard-driven drum pad with a live spectrum display.
//!
//! Sounds listed in a [`catalog::SoundCatalog`] are decoded up front and bound to single-letter
//! pads. Triggering a pad plays its sound on the real-time audio thread, cutting off whatever
//! was playing before, while the [`visualizer`] turns the output into a decaying bar chart.

pub mod audio_engine;
pub mod catalog;
pub mod config;
pub mod event_loop;
pub mod fetch;
pub mod input;
pub mod messages;
pub mod visualizer;

#[cfg(test)]
mod test_support;
