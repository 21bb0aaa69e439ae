//! Audio decoding functionality.
//!
//! This module turns raw audio bytes (fetched from the catalog or dropped onto a pad) into sample
//! buffers that the real-time mixer can play directly: decoded with Symphonia, resampled to the
//! output rate and mapped to the output channel layout.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use rubato::{FftFixedIn, Resampler};
use symphonia::core::{
    audio::SampleBuffer as SymphoniaSampleBuffer, codecs::DecoderOptions,
    errors::Error as SymphoniaError, formats::FormatOptions, io::MediaSourceStream,
    meta::MetadataOptions, probe::Hint,
};
use symphonia::default::{get_codecs, get_probe};

use crate::audio_engine::channels::map_channels;
use crate::audio_engine::constants::RESAMPLER_CHUNK_FRAMES;
use crate::audio_engine::context::OutputFormat;
use crate::audio_engine::errors::SampleLoadError;
use crate::messages::SampleBuffer;

/// Format hints passed to the container probe.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeHint {
    pub extension: Option<String>,
    pub media_type: Option<String>,
}

impl DecodeHint {
    /// Hint derived from a file name or path.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            extension: path
                .as_ref()
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase),
            media_type: None,
        }
    }

    /// Hint derived from a reported media type such as `audio/wav`.
    pub fn from_media_type(media_type: &str) -> Self {
        Self {
            extension: None,
            media_type: Some(media_type.to_string()),
        }
    }

    fn to_probe_hint(&self) -> Hint {
        let mut hint = Hint::new();
        if let Some(ext) = &self.extension {
            hint.with_extension(ext);
        }
        if let Some(media_type) = &self.media_type {
            hint.mime_type(media_type);
        }
        hint
    }
}

/// Decodes audio bytes into a sample buffer with the specified output configuration.
///
/// # Parameters
///
/// - `bytes`: Complete contents of an audio file
/// - `hint`: Extension and/or media type used to speed up format detection
/// - `format`: Channel count and sample rate of the output stream
///
/// # Errors
///
/// - Format not recognized, corrupted or unsupported codec
/// - No decodable track, or a track without rate/channel information
/// - Zero decoded frames
/// - Resampler failures
pub fn decode_audio_bytes(
    bytes: Vec<u8>,
    hint: &DecodeHint,
    format: OutputFormat,
) -> Result<SampleBuffer, SampleLoadError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let probed = get_probe().format(
        &hint.to_probe_hint(),
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut reader = probed.format;

    let track = reader
        .default_track()
        .ok_or(SampleLoadError::NoDefaultTrack)?;
    let track_id = track.id;
    let file_rate_hz = track
        .codec_params
        .sample_rate
        .ok_or(SampleLoadError::MissingSampleRate)?;
    let file_channels = track
        .codec_params
        .channels
        .ok_or(SampleLoadError::MissingChannels)?
        .count();

    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut decoded: Vec<f32> = Vec::new();
    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(SampleLoadError::Decode(err)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let audio_buf = match decoder.decode(&packet) {
            Ok(buf) => buf,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::warn!("Skipping corrupt audio packet: {msg}");
                continue;
            }
            Err(err) => return Err(SampleLoadError::Decode(err)),
        };
        let spec = *audio_buf.spec();
        let duration = audio_buf.capacity() as u64;

        let mut sample_buf = SymphoniaSampleBuffer::<f32>::new(duration, spec);
        sample_buf.copy_interleaved_ref(audio_buf);
        decoded.extend_from_slice(sample_buf.samples());
    }

    if decoded.len() < file_channels.max(1) {
        return Err(SampleLoadError::Empty);
    }

    log::debug!(
        "Decoded {} frames ({} ch@{} Hz), converting to {} ch@{} Hz",
        decoded.len() / file_channels.max(1),
        file_channels,
        file_rate_hz,
        format.channels,
        format.sample_rate
    );

    let resampled = resample_interleaved(decoded, file_channels, file_rate_hz, format.sample_rate)?;
    let mapped = map_channels(resampled, file_channels, format.channels)?;

    Ok(SampleBuffer {
        channels: format.channels,
        sample_rate: format.sample_rate,
        samples: Arc::from(mapped.into_boxed_slice()),
    })
}

/// Converts interleaved samples from `from_hz` to `to_hz`.
///
/// The result holds exactly `ceil(frames * to_hz / from_hz)` frames; the resampler's group delay
/// is trimmed from the front and its tail is flushed.
pub fn resample_interleaved(
    samples: Vec<f32>,
    channels: usize,
    from_hz: u32,
    to_hz: u32,
) -> Result<Vec<f32>, SampleLoadError> {
    if from_hz == to_hz || channels == 0 || samples.is_empty() {
        return Ok(samples);
    }
    if from_hz == 0 || to_hz == 0 {
        return Err(SampleLoadError::MissingSampleRate);
    }

    let frames = samples.len() / channels;
    let expected = (frames as u64 * u64::from(to_hz)).div_ceil(u64::from(from_hz)) as usize;

    let mut planar: Vec<Vec<f32>> = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (channel, &s) in frame.iter().enumerate() {
            planar[channel].push(s);
        }
    }

    let mut resampler = FftFixedIn::<f32>::new(
        from_hz as usize,
        to_hz as usize,
        RESAMPLER_CHUNK_FRAMES,
        2,
        channels,
    )?;
    let delay = resampler.output_delay();
    let wanted = expected + delay;

    let mut out: Vec<Vec<f32>> = vec![Vec::with_capacity(wanted); channels];
    let mut pos = 0;

    while frames - pos >= resampler.input_frames_next() {
        let n = resampler.input_frames_next();
        let chunk: Vec<&[f32]> = planar.iter().map(|c| &c[pos..pos + n]).collect();
        append_planar(&mut out, resampler.process(&chunk, None)?);
        pos += n;
    }

    if pos < frames {
        let chunk: Vec<&[f32]> = planar.iter().map(|c| &c[pos..]).collect();
        append_planar(&mut out, resampler.process_partial(Some(&chunk), None)?);
    }

    while out[0].len() < wanted {
        let block = resampler.process_partial(None::<&[&[f32]]>, None)?;
        if block.first().is_none_or(|c| c.is_empty()) {
            break;
        }
        append_planar(&mut out, block);
    }

    let mut interleaved = Vec::with_capacity(expected * channels);
    for frame in delay..wanted {
        for channel in &out {
            interleaved.push(channel.get(frame).copied().unwrap_or(0.0));
        }
    }

    Ok(interleaved)
}

fn append_planar(out: &mut [Vec<f32>], block: Vec<Vec<f32>>) {
    for (channel, data) in out.iter_mut().zip(block) {
        channel.extend_from_slice(&data);
    }
}
