//! Audio engine configuration constants and limits.

/// Frames per output callback requested from the device (low-latency hint).
pub const OUTPUT_BUFFER_FRAMES: u32 = 512;

/// Capacity of the control and event ring buffers.
pub const MESSAGE_QUEUE_CAPACITY: usize = 1024;

/// Transform size of the analysis node.
pub const FFT_SIZE: usize = 2048;

/// Temporal smoothing applied to analysis magnitudes between snapshots.
pub const SMOOTHING_TIME_CONSTANT: f32 = 0.8;

/// Magnitude (dB) mapped to byte value 0.
pub const MIN_DECIBELS: f32 = -100.0;

/// Magnitude (dB) mapped to byte value 255.
pub const MAX_DECIBELS: f32 = -30.0;

/// Blackman window parameter used by the analysis node.
pub const BLACKMAN_ALPHA: f32 = 0.16;

/// Number of analysis snapshots the tap ring buffer can hold before dropping samples.
pub const TAP_CAPACITY_SNAPSHOTS: usize = 8;

/// Input chunk size handed to the resampler.
pub const RESAMPLER_CHUNK_FRAMES: usize = 1024;
