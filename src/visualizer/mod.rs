//! Real-time spectrum visualizer.
//!
//! Every drawn frame samples the analysis node, rescales the snapshot so its loudest bin is 1.0,
//! cubes the result to push quiet bins towards zero, and holds each bar at
//! `max(new, previous * decay)` so bars jump up instantly and fall off smoothly.

pub mod canvas;

use std::time::{Duration, Instant};

use crate::audio_engine::analysis::AnalysisNode;
use crate::config::EngineConfig;
use canvas::{Canvas, Rgb};

/// Per-frame retention of a bar's previous height.
pub const DECAY_FACTOR: f32 = 0.9;

/// Upper bound on drawn frames per second.
pub const MAX_DRAW_RATE_HZ: f32 = 120.0;

pub const BAR_WIDTH: usize = 6;
pub const BAR_GAP: usize = 1;
pub const CANVAS_WIDTH: usize = 1024;
pub const CANVAS_HEIGHT: usize = 256;
pub const ACCENT_COLOR: Rgb = Rgb(37, 150, 190);

/// Rescales `data` so the largest bin becomes 1.0.
///
/// A snapshot whose maximum is 0 normalizes to all zeros.
pub fn normalize(data: &[u8], out: &mut [f32]) {
    let max = data.iter().copied().max().unwrap_or(0);
    if max == 0 {
        out.fill(0.0);
        return;
    }

    let max = f32::from(max);
    for (value, &n) in out.iter_mut().zip(data) {
        *value = f32::from(n) / max;
    }
}

/// Cubes each value in place; inputs in `[0, 1]` stay in `[0, 1]`.
pub fn exaggerate(values: &mut [f32]) {
    for value in values {
        *value = value.powi(3);
    }
}

/// Normalized and exaggerated copy of a snapshot.
pub fn normalize_data(data: &[u8]) -> Vec<f32> {
    let mut out = vec![0.0; data.len()];
    normalize(data, &mut out);
    exaggerate(&mut out);
    out
}

/// Peak hold with decay: `displayed[i] = max(fresh[i], displayed[i] * decay_factor)`.
pub fn apply_decay(displayed: &mut [f32], fresh: &[f32], decay_factor: f32) {
    for (shown, &new) in displayed.iter_mut().zip(fresh) {
        *shown = new.max(*shown * decay_factor);
    }
}

pub struct Visualizer {
    snapshot: Vec<u8>,
    fresh: Vec<f32>,
    displayed: Vec<f32>,
    canvas: Canvas,
    last_draw: Option<Instant>,
    min_draw_interval: Duration,
    decay_factor: f32,
    bar_width: usize,
    bar_gap: usize,
    accent: Rgb,
}

impl Visualizer {
    /// Creates a visualizer for snapshots of `bin_count` bins.
    pub fn new(bin_count: usize, config: &EngineConfig) -> Self {
        Self {
            snapshot: vec![0; bin_count],
            fresh: vec![0.0; bin_count],
            displayed: vec![0.0; bin_count],
            canvas: Canvas::new(config.canvas_width, config.canvas_height),
            last_draw: None,
            min_draw_interval: config.min_draw_interval,
            decay_factor: config.decay_factor,
            bar_width: config.bar_width,
            bar_gap: config.bar_gap,
            accent: config.accent,
        }
    }

    /// Runs one scheduled tick.
    ///
    /// Returns `true` when a frame was drawn. Ticks arriving within the minimum draw interval of
    /// the previous draw do nothing.
    pub fn tick(&mut self, now: Instant, analyser: &mut AnalysisNode) -> bool {
        if let Some(last) = self.last_draw {
            if now.saturating_duration_since(last) <= self.min_draw_interval {
                return false;
            }
        }

        analyser.byte_frequency_data(&mut self.snapshot);
        self.update_from_snapshot();
        self.draw();
        self.last_draw = Some(now);
        true
    }

    /// Folds a snapshot into the displayed values and redraws, bypassing the frame gate.
    pub fn render_snapshot(&mut self, snapshot: &[u8]) {
        let len = snapshot.len().min(self.snapshot.len());
        self.snapshot[..len].copy_from_slice(&snapshot[..len]);
        self.snapshot[len..].fill(0);
        self.update_from_snapshot();
        self.draw();
    }

    fn update_from_snapshot(&mut self) {
        normalize(&self.snapshot, &mut self.fresh);
        exaggerate(&mut self.fresh);
        apply_decay(&mut self.displayed, &self.fresh, self.decay_factor);
    }

    fn draw(&mut self) {
        self.canvas.clear(Rgb::BLACK);

        let height = self.canvas.height();
        let step = self.bar_width + self.bar_gap;
        for (i, &value) in self.displayed.iter().enumerate() {
            let x = i * step;
            if x >= self.canvas.width() {
                break;
            }

            let bar_height = ((value * height as f32).round() as usize).min(height);
            self.canvas
                .fill_rect(x, height - bar_height, self.bar_width, bar_height, self.accent);
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Current decayed bar heights (0.0 to 1.0).
    pub fn displayed(&self) -> &[f32] {
        &self.displayed
    }

    pub fn bin_count(&self) -> usize {
        self.displayed.len()
    }
}

#[cfg(test)]
mod tests {
    use rtrb::RingBuffer;

    use super::*;

    fn small_config() -> EngineConfig {
        EngineConfig {
            canvas_width: 21,
            canvas_height: 10,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_normalize_all_zero_snapshot() {
        let out = normalize_data(&[0, 0, 0, 0]);
        assert_eq!(out, vec![0.0; 4]);
        assert!(out.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_normalize_max_bin_is_one() {
        let data = [12, 49, 3, 0];
        let mut normalized = [0.0; 4];
        normalize(&data, &mut normalized);
        assert_eq!(normalized[1], 1.0);

        exaggerate(&mut normalized);
        assert_eq!(normalized[1], 1.0);
    }

    #[test]
    fn test_exaggerate_cubes_values() {
        let out = normalize_data(&[100, 200, 50]);
        assert!((out[0] - 0.125).abs() < 1e-6);
        assert!((out[1] - 1.0).abs() < 1e-6);
        assert!((out[2] - 0.015625).abs() < 1e-6);
        assert!(out.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_normalize_is_volume_independent() {
        assert_eq!(normalize_data(&[10, 20]), normalize_data(&[100, 200]));
    }

    #[test]
    fn test_decay_dominates_small_new_values() {
        let mut displayed = [0.8];
        apply_decay(&mut displayed, &[0.5], 0.9);
        assert!((displayed[0] - 0.72).abs() < 1e-6);
    }

    #[test]
    fn test_new_value_dominates_when_large_enough() {
        let mut displayed = [0.8];
        apply_decay(&mut displayed, &[0.75], 0.9);
        assert_eq!(displayed[0], 0.75);

        let mut displayed = [0.5];
        apply_decay(&mut displayed, &[0.9], 0.9);
        assert_eq!(displayed[0], 0.9);
    }

    #[test]
    fn test_bars_fall_off_over_frames() {
        let mut visualizer = Visualizer::new(3, &small_config());
        visualizer.render_snapshot(&[0, 255, 0]);
        assert_eq!(visualizer.displayed()[1], 1.0);

        visualizer.render_snapshot(&[0, 0, 0]);
        assert!((visualizer.displayed()[1] - 0.9).abs() < 1e-6);

        visualizer.render_snapshot(&[0, 0, 0]);
        assert!((visualizer.displayed()[1] - 0.81).abs() < 1e-6);
    }

    #[test]
    fn test_draw_bars_bottom_anchored() {
        let config = small_config();
        let mut visualizer = Visualizer::new(3, &config);
        visualizer.render_snapshot(&[0, 255, 0]);

        let canvas = visualizer.canvas();
        // Bar 1 spans x = 7..13 and the full height.
        assert_eq!(canvas.pixel(7, 0), Some(config.accent));
        assert_eq!(canvas.pixel(12, 9), Some(config.accent));
        // Gap and empty bars stay black.
        assert_eq!(canvas.pixel(6, 9), Some(Rgb::BLACK));
        assert_eq!(canvas.pixel(13, 9), Some(Rgb::BLACK));
        assert_eq!(canvas.pixel(0, 9), Some(Rgb::BLACK));
    }

    #[test]
    fn test_draw_partial_height() {
        let config = small_config();
        let mut visualizer = Visualizer::new(2, &config);
        // 128 / 255 cubed is about 0.126, so about one of ten rows.
        visualizer.render_snapshot(&[255, 128]);

        let canvas = visualizer.canvas();
        assert_eq!(canvas.pixel(7, 9), Some(config.accent));
        assert_eq!(canvas.pixel(7, 8), Some(Rgb::BLACK));
    }

    #[test]
    fn test_bars_beyond_canvas_are_clipped() {
        let config = small_config();
        let mut visualizer = Visualizer::new(1024, &config);
        visualizer.render_snapshot(&[255; 1024]);

        let lit = visualizer
            .canvas()
            .pixels()
            .iter()
            .filter(|&&p| p == config.accent)
            .count();
        // Three bars start inside 21 px: x = 0, 7, 14.
        assert_eq!(lit, 3 * 6 * 10);
    }

    #[test]
    fn test_tick_is_gated_by_draw_interval() {
        let config = EngineConfig {
            fft_size: 64,
            ..small_config()
        };
        let (_producer, consumer) = RingBuffer::new(256);
        let mut analyser = AnalysisNode::new(consumer, &config);
        let mut visualizer = Visualizer::new(analyser.frequency_bin_count(), &config);

        let start = Instant::now();
        assert!(visualizer.tick(start, &mut analyser));
        assert!(!visualizer.tick(start + Duration::from_millis(5), &mut analyser));
        assert!(!visualizer.tick(start + config.min_draw_interval, &mut analyser));
        assert!(visualizer.tick(start + Duration::from_millis(9), &mut analyser));
    }

    #[test]
    fn test_silent_ticks_keep_canvas_black() {
        let config = EngineConfig {
            fft_size: 64,
            ..small_config()
        };
        let (_producer, consumer) = RingBuffer::new(256);
        let mut analyser = AnalysisNode::new(consumer, &config);
        let mut visualizer = Visualizer::new(analyser.frequency_bin_count(), &config);

        visualizer.tick(Instant::now(), &mut analyser);

        assert!(visualizer.displayed().iter().all(|&v| v == 0.0));
        assert!(visualizer.canvas().pixels().iter().all(|&p| p == Rgb::BLACK));
    }
}
