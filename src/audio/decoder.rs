// Audio decoder using Symphonia
// Decodes one file into a lazy sequence of PCM chunks in the fixed output format

use std::collections::VecDeque;
use std::fs::File;
use std::path::Path;

use symphonia::core::audio::{AudioBuffer, Signal, SignalSpec};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Track};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, error, info, warn};

use super::format::{PcmChunk, OUTPUT_CHANNELS};
use super::resampler::StreamConverter;
use crate::error::DecodeError;

/// Default upper bound on the frames held by one chunk
pub const DEFAULT_MAX_CHUNK_FRAMES: usize = 4096;

/// Open a file and probe its container
pub(crate) fn open_format(path: &Path) -> Result<Box<dyn FormatReader>, DecodeError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Create a hint using the file extension
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| DecodeError::Probe(e.to_string()))?;

    Ok(probed.format)
}

/// First track carrying a real codec
pub(crate) fn first_audio_track(format: &dyn FormatReader) -> Result<&Track, DecodeError> {
    format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoAudioStream)
}

/// Streaming decoder for a single file.
///
/// Iterating yields owned [`PcmChunk`]s already converted to S16 stereo
/// 44.1kHz. The sequence is finite and cannot be restarted.
pub struct AudioDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: Option<u32>,
    channels: Option<usize>,
    declared_frames: Option<u64>,
    converter: Option<StreamConverter>,
    sample_buf: Option<AudioBuffer<f32>>,
    ready: VecDeque<PcmChunk>,
    max_chunk_frames: usize,
    frames_decoded: u64,
    finished: bool,
}

impl AudioDecoder {
    /// Open an audio file and prepare for decoding
    pub fn open(path: &Path) -> Result<Self, DecodeError> {
        Self::open_with_chunk_frames(path, DEFAULT_MAX_CHUNK_FRAMES)
    }

    /// Open an audio file, splitting output into chunks of at most `max_chunk_frames`
    pub fn open_with_chunk_frames(path: &Path, max_chunk_frames: usize) -> Result<Self, DecodeError> {
        let format = open_format(path)?;
        let track = first_audio_track(format.as_ref())?;

        let track_id = track.id;
        let params = track.codec_params.clone();
        let sample_rate = params.sample_rate;
        let channels = params.channels.map(|c| c.count());

        debug!(
            "Opened {:?}: codec={:?} sample_rate={:?} channels={:?} frames={:?}",
            path, params.codec, sample_rate, channels, params.n_frames
        );

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| DecodeError::UnsupportedCodec(e.to_string()))?;

        // Build the converter up front when the stream declares its format,
        // so a resampler failure aborts the file before any chunk is produced
        let converter = match (sample_rate, channels) {
            (Some(rate), Some(count)) => Some(StreamConverter::new(rate, count)?),
            _ => None,
        };

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
            declared_frames: params.n_frames,
            converter,
            sample_buf: None,
            ready: VecDeque::new(),
            max_chunk_frames: max_chunk_frames.max(1),
            frames_decoded: 0,
            finished: false,
        })
    }

    /// Source sample rate, if known yet
    pub fn sample_rate(&self) -> Option<u32> {
        self.sample_rate
    }

    /// Source channel count, if known yet
    pub fn channels(&self) -> Option<usize> {
        self.channels
    }

    /// Source frames decoded so far
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    /// Decode the next packet into `ready`, or finish the stream
    fn decode_next_packet(&mut self) {
        let packet = match self.format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.finish();
                return;
            }
            Err(SymphoniaError::ResetRequired) => {
                self.decoder.reset();
                return;
            }
            Err(e) => {
                warn!("Failed to read packet, ending stream: {}", e);
                self.finish();
                return;
            }
        };

        // Skip packets from other tracks
        if packet.track_id() != self.track_id {
            return;
        }

        let (spec, frames) = {
            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Decode error (skipping packet): {}", e);
                    return;
                }
                Err(e) => {
                    warn!("Decode failed, ending stream: {}", e);
                    self.finish();
                    return;
                }
            };

            let spec = *decoded.spec();
            let frames = decoded.frames();
            if frames == 0 {
                return;
            }

            // Copy out of the codec's buffer right away (planar f32, our allocation).
            // The copy must hold the codec's largest packet, not just this one.
            let capacity = decoded.capacity();
            let needs_buf = self
                .sample_buf
                .as_ref()
                .map_or(true, |b| b.capacity() < capacity || *b.spec() != spec);
            if needs_buf {
                self.sample_buf = Some(AudioBuffer::new(capacity as u64, spec));
            }
            if let Some(buf) = self.sample_buf.as_mut() {
                decoded.convert(buf);
            }
            (spec, frames)
        };

        self.convert_buffered(spec, frames);
    }

    /// Run the buffered planar samples through the converter
    fn convert_buffered(&mut self, spec: SignalSpec, frames: usize) {
        let count = spec.channels.count();

        let matches = self
            .converter
            .as_ref()
            .is_some_and(|c| c.input_rate() == spec.rate && c.input_channels() == count);
        if !matches {
            if let Err(e) = self.rebuild_converter(spec.rate, count) {
                error!("Failed to initialise resampler: {}", e);
                self.ready.clear();
                self.finished = true;
                return;
            }
        }

        let (Some(buf), Some(converter)) = (self.sample_buf.as_ref(), self.converter.as_mut()) else {
            return;
        };
        let planes: Vec<&[f32]> = (0..count).map(|ch| buf.chan(ch)).collect();
        let result = converter.process(&planes);
        self.frames_decoded += frames as u64;

        match result {
            Ok(samples) => self.enqueue_samples(&samples),
            Err(e) => warn!("Resampling error (skipping frame): {}", e),
        }
    }

    /// Replace the converter when the stream format is first seen or changes
    fn rebuild_converter(&mut self, rate: u32, channels: usize) -> Result<(), DecodeError> {
        if let Some(mut old) = self.converter.take() {
            match old.flush() {
                Ok(samples) => self.enqueue_samples(&samples),
                Err(e) => warn!("Failed to flush resampler: {}", e),
            }
            debug!("Stream format changed to {}Hz x{}", rate, channels);
        }
        self.sample_rate = Some(rate);
        self.channels = Some(channels);
        self.converter = Some(StreamConverter::new(rate, channels)?);
        Ok(())
    }

    /// Split converted samples into owned chunks
    fn enqueue_samples(&mut self, samples: &[i16]) {
        let per_chunk = self.max_chunk_frames * OUTPUT_CHANNELS as usize;
        for piece in samples.chunks(per_chunk) {
            match PcmChunk::try_from_samples(piece) {
                Ok(chunk) => self.ready.push_back(chunk),
                Err(e) => warn!("Could not allocate output buffer (skipping frame): {}", e),
            }
        }
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        if let Some(converter) = self.converter.as_mut() {
            match converter.flush() {
                Ok(samples) => self.enqueue_samples(&samples),
                Err(e) => warn!("Failed to flush resampler: {}", e),
            }
        }

        if let Some(declared) = self.declared_frames {
            if self.frames_decoded < declared {
                warn!(
                    "Could not read all frames from the file ({} of {})",
                    self.frames_decoded, declared
                );
            }
        }

        info!("Decoded {} frames", self.frames_decoded);
    }
}

impl Iterator for AudioDecoder {
    type Item = PcmChunk;

    fn next(&mut self) -> Option<PcmChunk> {
        loop {
            if let Some(chunk) = self.ready.pop_front() {
                return Some(chunk);
            }
            if self.finished {
                return None;
            }
            self.decode_next_packet();
        }
    }
}
