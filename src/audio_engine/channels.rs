use crate::audio_engine::errors::SampleLoadError;

/// Maps audio samples from one channel configuration to another.
///
/// Supported conversions:
/// - Same channel count: no conversion needed
/// - Mono → N channels: duplicates the mono signal to every channel
/// - N channels → Mono: averages all channels of each frame
/// - M → N channels: copies the shared channels, extra output channels stay silent
///
/// # Parameters
///
/// - `samples`: Interleaved audio samples to convert
/// - `file_channels`: Number of channels in the source audio
/// - `output_channels`: Number of channels for the output
///
/// # Returns
///
/// - `Ok(Vec<f32>)`: Samples with converted channel layout
/// - `Err(SampleLoadError)`: Either side has zero channels
pub fn map_channels(
    samples: Vec<f32>,
    file_channels: usize,
    output_channels: usize,
) -> Result<Vec<f32>, SampleLoadError> {
    if file_channels == 0 || output_channels == 0 {
        return Err(SampleLoadError::UnsupportedChannels {
            file_channels,
            output_channels,
        });
    }

    if file_channels == output_channels {
        return Ok(samples);
    }

    let frames = samples.len() / file_channels;
    let mut out = Vec::with_capacity(frames * output_channels);

    match (file_channels, output_channels) {
        (1, _) => {
            for s in samples {
                out.extend(std::iter::repeat_n(s, output_channels));
            }
        }
        (_, 1) => {
            let scale = 1.0 / file_channels as f32;
            for frame in samples.chunks_exact(file_channels) {
                out.push(frame.iter().sum::<f32>() * scale);
            }
        }
        _ => {
            let shared = file_channels.min(output_channels);
            for frame in samples.chunks_exact(file_channels) {
                out.extend_from_slice(&frame[..shared]);
                out.extend(std::iter::repeat_n(0.0, output_channels - shared));
            }
        }
    }

    Ok(out)
}

/// Averages interleaved frames down to one channel.
pub fn downmix_frame(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    frame.iter().sum::<f32>() / frame.len() as f32
}
