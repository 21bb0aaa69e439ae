//! Engine configuration.

use std::time::Duration;

use crate::audio_engine::constants::{
    FFT_SIZE, MAX_DECIBELS, MESSAGE_QUEUE_CAPACITY, MIN_DECIBELS, OUTPUT_BUFFER_FRAMES,
    SMOOTHING_TIME_CONSTANT,
};
use crate::visualizer::{
    ACCENT_COLOR, BAR_GAP, BAR_WIDTH, CANVAS_HEIGHT, CANVAS_WIDTH, DECAY_FACTOR, MAX_DRAW_RATE_HZ,
};
use crate::visualizer::canvas::Rgb;

/// Tunables for the audio context, the analysis node, the visualizer and the frame loop.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Frames per device callback.
    pub output_buffer_frames: u32,

    /// Capacity of the control/event queues between loop and audio thread.
    pub message_queue_capacity: usize,

    /// Analysis transform size; snapshots have `fft_size / 2` bins.
    pub fft_size: usize,

    /// Analysis smoothing over time (0.0 to 1.0).
    pub smoothing_time_constant: f32,

    /// Magnitude mapped to byte 0.
    pub min_decibels: f32,

    /// Magnitude mapped to byte 255.
    pub max_decibels: f32,

    /// Per-frame retention of displayed bar heights.
    pub decay_factor: f32,

    /// Minimum time between two drawn frames.
    pub min_draw_interval: Duration,

    /// How often the loop schedules a frame tick.
    pub frame_period: Duration,

    pub canvas_width: usize,
    pub canvas_height: usize,
    pub bar_width: usize,
    pub bar_gap: usize,
    pub accent: Rgb,

    /// How long a pad stays highlighted after a click or key release.
    pub pad_flash: Duration,

    /// Same-key presses closer together than this count as auto-repeat on terminals that do
    /// not report key releases.
    pub key_repeat_window: Duration,
}

impl EngineConfig {
    /// Draw interval for a maximum draw rate in Hz.
    pub fn draw_interval_for_rate(rate_hz: f32) -> Duration {
        if !rate_hz.is_finite() || rate_hz <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f32(1.0 / rate_hz)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            output_buffer_frames: OUTPUT_BUFFER_FRAMES,
            message_queue_capacity: MESSAGE_QUEUE_CAPACITY,
            fft_size: FFT_SIZE,
            smoothing_time_constant: SMOOTHING_TIME_CONSTANT,
            min_decibels: MIN_DECIBELS,
            max_decibels: MAX_DECIBELS,
            decay_factor: DECAY_FACTOR,
            min_draw_interval: Self::draw_interval_for_rate(MAX_DRAW_RATE_HZ),
            frame_period: Duration::from_millis(4),
            canvas_width: CANVAS_WIDTH,
            canvas_height: CANVAS_HEIGHT,
            bar_width: BAR_WIDTH,
            bar_gap: BAR_GAP,
            accent: ACCENT_COLOR,
            pad_flash: Duration::from_millis(100),
            key_repeat_window: Duration::from_millis(500),
        }
    }
}
