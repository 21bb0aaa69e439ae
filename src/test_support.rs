//! In-memory audio fixtures shared by the unit tests.

use std::io::Write;
use std::path::Path;

/// Encodes 16-bit PCM samples as a WAV file.
pub(crate) fn wav_bytes(channels: u16, sample_rate_hz: u32, samples: &[i16]) -> Vec<u8> {
    let bits_per_sample = 16u16;
    let block_align = channels * (bits_per_sample / 8);
    let byte_rate = sample_rate_hz * u32::from(block_align);
    let data_len_bytes = u32::try_from(samples.len() * 2).expect("sample data too large");
    let chunk_size = 36 + data_len_bytes;

    let mut out = Vec::with_capacity(44 + samples.len() * 2);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&chunk_size.to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate_hz.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits_per_sample.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len_bytes.to_le_bytes());
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}

/// Mono 44.1 kHz silence.
pub(crate) fn silent_wav(frames: usize) -> Vec<u8> {
    wav_bytes(1, 44_100, &vec![0; frames])
}

/// Writes a mono 44.1 kHz WAV file holding `frames` copies of `value`.
pub(crate) fn write_wav(path: &Path, frames: usize, value: i16) {
    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(&wav_bytes(1, 44_100, &vec![value; frames]))
        .unwrap();
}
