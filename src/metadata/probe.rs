// Metadata probe for the catalog
// Reads stream properties without decoding audio and without touching any playback queue.

use std::path::Path;

use serde::Serialize;
use symphonia::core::errors::Error as SymphoniaError;
use tracing::{debug, error};

use crate::audio::decoder::{first_audio_track, open_format};
use crate::error::DecodeError;

/// Stream properties the catalog stores for a sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioProperties {
    pub duration_secs: f64,
    pub sample_rate: u32,
    /// Source bit depth, when the codec declares one
    pub bit_depth: Option<u32>,
    pub channels: u16,
}

/// Probe a file for duration, sample rate, bit depth and channel count.
///
/// A file without an audio track yields [`DecodeError::NoAudioStream`].
pub fn probe(path: &Path) -> Result<AudioProperties, DecodeError> {
    let result = probe_inner(path);
    if let Err(e) = &result {
        error!("Failed to probe {:?}: {}", path, e);
    }
    result
}

fn probe_inner(path: &Path) -> Result<AudioProperties, DecodeError> {
    let mut format = open_format(path)?;
    let track = first_audio_track(format.as_ref())?;

    let track_id = track.id;
    let params = track.codec_params.clone();

    let sample_rate = params
        .sample_rate
        .ok_or_else(|| DecodeError::Probe("sample rate not declared".to_string()))?;
    let channels = params
        .channels
        .map(|c| c.count() as u16)
        .ok_or_else(|| DecodeError::Probe("channel count not declared".to_string()))?;
    let bit_depth = params
        .bits_per_sample
        .or_else(|| params.sample_format.map(sample_format_bits));

    let frames = match params.n_frames {
        Some(n) => n,
        None => {
            debug!("No frame count declared for {:?}, summing packet durations", path);
            count_frames(format.as_mut(), track_id)?
        }
    };

    Ok(AudioProperties {
        duration_secs: frames as f64 / sample_rate as f64,
        sample_rate,
        bit_depth,
        channels,
    })
}

/// Walk the container's packets and add up their durations
fn count_frames(
    format: &mut dyn symphonia::core::formats::FormatReader,
    track_id: u32,
) -> Result<u64, DecodeError> {
    let mut frames = 0u64;
    loop {
        match format.next_packet() {
            Ok(packet) if packet.track_id() == track_id => frames += packet.dur,
            Ok(_) => {}
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Ok(frames);
            }
            Err(SymphoniaError::ResetRequired) => return Ok(frames),
            Err(e) => return Err(DecodeError::Probe(e.to_string())),
        }
    }
}

fn sample_format_bits(format: symphonia::core::sample::SampleFormat) -> u32 {
    use symphonia::core::sample::SampleFormat;

    match format {
        SampleFormat::U8 | SampleFormat::S8 => 8,
        SampleFormat::U16 | SampleFormat::S16 => 16,
        SampleFormat::U24 | SampleFormat::S24 => 24,
        SampleFormat::U32 | SampleFormat::S32 | SampleFormat::F32 => 32,
        SampleFormat::F64 => 64,
    }
}
