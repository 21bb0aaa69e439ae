//! Audio-specific error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while decoding audio bytes.
#[derive(Debug, Error)]
pub enum SampleLoadError {
    /// Failed to read from the audio source.
    #[error("failed to read audio data: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to decode the audio data.
    #[error("failed to decode audio data: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    /// Failed to create resampler.
    #[error("failed to create resampler: {0}")]
    ResamplerConstruction(#[from] rubato::ResamplerConstructionError),

    /// Failed to resample audio.
    #[error("failed to resample audio: {0}")]
    Resample(#[from] rubato::ResampleError),

    /// Audio data has no default track.
    #[error("audio data has no default track")]
    NoDefaultTrack,

    /// Audio data is missing sample rate information.
    #[error("audio data is missing a sample rate")]
    MissingSampleRate,

    /// Audio data is missing channel information.
    #[error("audio data is missing channel information")]
    MissingChannels,

    /// Audio data decoded to zero frames.
    #[error("audio data contains no samples")]
    Empty,

    /// Unsupported channel mapping configuration.
    #[error(
        "unsupported channel mapping: file has {file_channels} channels, output has {output_channels} channels"
    )]
    UnsupportedChannels {
        /// Number of channels in the source file.
        file_channels: usize,
        /// Number of channels expected for output.
        output_channels: usize,
    },
}

/// Errors that can occur while retrieving a sound's raw bytes.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The source does not exist.
    #[error("sound file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The source exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }
}

/// A per-key failure while loading a sound into the cache.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] SampleLoadError),

    /// The loader thread for this entry panicked.
    #[error("loader thread panicked")]
    Panicked,
}

/// Errors raised while bringing up the audio context.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No usable audio output is available in this environment.
    #[error("audio output is not supported on this system: {0}")]
    PlatformUnsupported(String),

    #[error("failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

/// Errors returned when a pad cannot be played.
#[derive(Debug, Error)]
pub enum PlayError {
    /// No buffer has been decoded for this key.
    #[error("no sound loaded for pad {key}")]
    MissingBuffer { key: String },

    /// The control queue to the audio thread is full.
    #[error("failed to send {0} - buffer may be full")]
    QueueFull(&'static str),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
