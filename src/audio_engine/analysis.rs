//! Frequency analysis of whatever the mixer renders.
//!
//! [`AnalysisNode`] mirrors the behaviour of a Web Audio analyser: it keeps the most recent
//! `fft_size` mono samples, applies a Blackman window, runs a real FFT, smooths magnitudes over
//! time and maps them from decibels onto bytes.

use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use rtrb::Consumer;

use crate::audio_engine::constants::BLACKMAN_ALPHA;
use crate::config::EngineConfig;

pub struct AnalysisNode {
    tap: Consumer<f32>,
    fft_size: usize,
    fft: Arc<dyn RealToComplex<f32>>,
    /// Circular history of the latest `fft_size` samples.
    history: Vec<f32>,
    write_pos: usize,
    window: Vec<f32>,
    windowed: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
}

impl AnalysisNode {
    /// Creates a node reading mono samples from `tap`.
    pub fn new(tap: Consumer<f32>, config: &EngineConfig) -> Self {
        let fft_size = config.fft_size;
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);

        let windowed = fft.make_input_vec();
        let spectrum = fft.make_output_vec();
        let scratch = fft.make_scratch_vec();

        Self {
            tap,
            fft_size,
            fft,
            history: vec![0.0; fft_size],
            write_pos: 0,
            window: blackman_window(fft_size),
            windowed,
            spectrum,
            scratch,
            smoothed: vec![0.0; fft_size / 2],
            smoothing: config.smoothing_time_constant.clamp(0.0, 1.0),
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
        }
    }

    /// Transform size.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of bins in a snapshot (half the transform size).
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Writes the current byte-valued magnitude spectrum into `out`.
    ///
    /// Only the first `min(out.len(), frequency_bin_count())` entries are written.
    pub fn byte_frequency_data(&mut self, out: &mut [u8]) {
        self.pull();
        self.analyze();

        let range = self.max_decibels - self.min_decibels;
        let scale = if range > 0.0 { 255.0 / range } else { 0.0 };

        for (byte, &magnitude) in out.iter_mut().zip(&self.smoothed) {
            let db = if magnitude > 0.0 {
                20.0 * magnitude.log10()
            } else {
                f32::NEG_INFINITY
            };
            *byte = (scale * (db - self.min_decibels)).floor().clamp(0.0, 255.0) as u8;
        }
    }

    /// Moves everything the mixer produced since the last snapshot into the history.
    fn pull(&mut self) {
        while let Ok(sample) = self.tap.pop() {
            self.history[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % self.fft_size;
        }
    }

    fn analyze(&mut self) {
        // Oldest sample first.
        let (newer, older) = self.history.split_at(self.write_pos);
        for ((slot, &s), &w) in self
            .windowed
            .iter_mut()
            .zip(older.iter().chain(newer))
            .zip(&self.window)
        {
            *slot = s * w;
        }

        if self
            .fft
            .process_with_scratch(&mut self.windowed, &mut self.spectrum, &mut self.scratch)
            .is_err()
        {
            log::warn!("Analysis FFT failed; keeping previous spectrum");
            return;
        }

        let norm = 1.0 / self.fft_size as f32;
        let tau = self.smoothing;
        for (smoothed, bin) in self.smoothed.iter_mut().zip(&self.spectrum) {
            let value = tau * *smoothed + (1.0 - tau) * bin.norm() * norm;
            *smoothed = if value.is_finite() { value } else { 0.0 };
        }
    }
}

/// Blackman window as used by Web Audio analysers.
pub fn blackman_window(size: usize) -> Vec<f32> {
    let a0 = 0.5 * (1.0 - BLACKMAN_ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * BLACKMAN_ALPHA;
    let n = size as f32;

    (0..size)
        .map(|i| {
            let x = 2.0 * std::f32::consts::PI * i as f32 / n;
            a0 - a1 * x.cos() + a2 * (2.0 * x).cos()
        })
        .collect()
}
