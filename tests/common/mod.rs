// WAV fixture generation for integration tests
#![allow(dead_code)]

use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::{Path, PathBuf};

/// Sample value for a given frame/channel that stays distinct across a file
pub fn ramp_value(frame: usize, channel: u16, seed: i32) -> i16 {
    (((frame as i32 * 7 + channel as i32 * 3 + seed) % 20_000) - 10_000) as i16
}

/// Write a 16-bit WAV with deterministic, non-repeating sample values
pub fn write_ramp_wav(path: &Path, sample_rate: u32, channels: u16, frames: usize, seed: i32) {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for frame in 0..frames {
        for ch in 0..channels {
            writer.write_sample(ramp_value(frame, ch, seed)).unwrap();
        }
    }
    writer.finalize().unwrap();
}

/// Write a 16-bit sine WAV
pub fn write_sine_wav(path: &Path, sample_rate: u32, channels: u16, frames: usize) {
    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for frame in 0..frames {
        let t = frame as f32 / sample_rate as f32;
        let value = ((2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5 * i16::MAX as f32) as i16;
        for _ in 0..channels {
            writer.write_sample(value).unwrap();
        }
    }
    writer.finalize().unwrap();
}

/// Expected output bytes for a stereo 44.1kHz ramp file
pub fn ramp_bytes(frames: usize, seed: i32) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(frames * 4);
    for frame in 0..frames {
        for ch in 0..2 {
            bytes.extend_from_slice(&ramp_value(frame, ch, seed).to_ne_bytes());
        }
    }
    bytes
}

/// Decode native-endian S16 bytes back into samples
pub fn to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|b| i16::from_ne_bytes([b[0], b[1]]))
        .collect()
}

pub fn fixture(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}
