// Streaming conversion from decoded planar f32 to the fixed S16 stereo 44.1kHz format
// Uses rubato's linear FastFixedIn, fed in fixed blocks as packets arrive.

use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

use super::format::{f32_to_i16, OUTPUT_SAMPLE_RATE};
use crate::error::DecodeError;

/// Input frames handed to rubato per call
const RESAMPLE_BLOCK_FRAMES: usize = 1024;

/// Input frames of history FastFixedIn keeps ahead of the first real frame
const RESAMPLER_LEAD_IN_FRAMES: f64 = 4.0;

/// Converts one stream's decoded audio into interleaved stereo S16 at the output rate.
///
/// Stateful: input may arrive in packets of any size, and the resampler's
/// history carries over from one packet to the next.
pub struct StreamConverter {
    input_rate: u32,
    input_channels: usize,
    /// `None` when the input is already at the output rate
    resampler: Option<FastFixedIn<f32>>,
    ratio: f64,
    /// Stereo-mapped input waiting for a full resampler block
    pending: [Vec<f32>; 2],
    /// Leading output frames that are resampler delay, not audio
    skip_frames: usize,
    /// Last stereo frame seen, held to pad the final block
    last_frame: [f32; 2],
    frames_in: u64,
    frames_out: u64,
}

impl StreamConverter {
    pub fn new(input_rate: u32, input_channels: usize) -> Result<Self, DecodeError> {
        if input_rate == 0 {
            return Err(DecodeError::Resampler("input sample rate is zero".to_string()));
        }
        if input_channels == 0 {
            return Err(DecodeError::Resampler("input has no channels".to_string()));
        }

        let ratio = OUTPUT_SAMPLE_RATE as f64 / input_rate as f64;
        let resampler = if input_rate == OUTPUT_SAMPLE_RATE {
            None
        } else {
            let resampler = FastFixedIn::<f32>::new(
                ratio,
                1.0, // fixed ratio
                PolynomialDegree::Linear,
                RESAMPLE_BLOCK_FRAMES,
                2,
            )
            .map_err(|e| DecodeError::Resampler(e.to_string()))?;
            Some(resampler)
        };

        // Output frame n sits at input position (n + 1) / ratio - lead-in, so the
        // first frame that lands on input frame 0 is ceil(lead-in * ratio) - 1
        let skip_frames = if resampler.is_some() {
            ((RESAMPLER_LEAD_IN_FRAMES * ratio).ceil() as usize).saturating_sub(1)
        } else {
            0
        };

        debug!(
            "Converter: {}Hz x{} -> {}Hz stereo (resampling: {})",
            input_rate,
            input_channels,
            OUTPUT_SAMPLE_RATE,
            resampler.is_some()
        );

        Ok(Self {
            input_rate,
            input_channels,
            resampler,
            ratio,
            pending: [Vec::new(), Vec::new()],
            skip_frames,
            last_frame: [0.0; 2],
            frames_in: 0,
            frames_out: 0,
        })
    }

    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    pub fn input_channels(&self) -> usize {
        self.input_channels
    }

    /// Convert one packet's worth of planar samples.
    ///
    /// Returns interleaved stereo S16; may be empty while the resampler is
    /// still collecting a full block.
    pub fn process(&mut self, planes: &[&[f32]]) -> Result<Vec<i16>, DecodeError> {
        let (left, right) = map_to_stereo(planes);
        let frames = left.len().min(right.len());
        self.frames_in += frames as u64;
        if frames > 0 {
            self.last_frame = [left[frames - 1], right[frames - 1]];
        }

        if self.resampler.is_none() {
            self.frames_out += frames as u64;
            return Ok(interleave(&left[..frames], &right[..frames]));
        }

        self.pending[0].extend_from_slice(&left[..frames]);
        self.pending[1].extend_from_slice(&right[..frames]);

        let mut out = Vec::new();
        while let Some(resampler) = self.resampler.as_mut() {
            let needed = resampler.input_frames_next();
            if self.pending[0].len() < needed {
                break;
            }
            let block = [&self.pending[0][..needed], &self.pending[1][..needed]];
            let planar = resampler
                .process(&block[..], None)
                .map_err(|e| DecodeError::Resampler(e.to_string()))?;
            self.pending[0].drain(..needed);
            self.pending[1].drain(..needed);
            self.emit(&planar, None, &mut out);
        }

        Ok(out)
    }

    /// Push any buffered input through the resampler at end of stream.
    ///
    /// The final blocks are padded by holding the last frame rather than with
    /// silence, so the tail does not fade towards zero.
    pub fn flush(&mut self) -> Result<Vec<i16>, DecodeError> {
        let mut out = Vec::new();
        if self.resampler.is_none() || self.frames_in == 0 {
            return Ok(out);
        }

        let expected = (self.frames_in as f64 * self.ratio).ceil() as u64;

        // The leftover input plus the resampler's delay line never spans more
        // than a couple of blocks
        for _ in 0..4 {
            if self.frames_out >= expected {
                break;
            }
            let Some(resampler) = self.resampler.as_mut() else {
                break;
            };

            let needed = resampler.input_frames_next();
            for (plane, held) in self.pending.iter_mut().zip(self.last_frame) {
                plane.resize(needed.max(plane.len()), held);
            }
            let block = [&self.pending[0][..needed], &self.pending[1][..needed]];
            let planar = resampler
                .process(&block[..], None)
                .map_err(|e| DecodeError::Resampler(e.to_string()))?;
            self.pending[0].clear();
            self.pending[1].clear();

            let remaining = expected.saturating_sub(self.frames_out) as usize;
            self.emit(&planar, Some(remaining), &mut out);
        }

        Ok(out)
    }

    /// Append resampled frames to `out`, dropping leading delay frames
    fn emit(&mut self, planar: &[Vec<f32>], limit: Option<usize>, out: &mut Vec<i16>) {
        if planar.len() < 2 {
            return;
        }
        let frames = planar[0].len().min(planar[1].len());
        let start = self.skip_frames.min(frames);
        self.skip_frames -= start;

        let mut end = frames;
        if let Some(limit) = limit {
            end = end.min(start + limit);
        }

        out.reserve((end - start) * 2);
        for i in start..end {
            out.push(f32_to_i16(planar[0][i]));
            out.push(f32_to_i16(planar[1][i]));
        }
        self.frames_out += (end - start) as u64;
    }
}

/// Pick the left/right planes: mono is duplicated, extra channels are dropped
fn map_to_stereo<'a>(planes: &[&'a [f32]]) -> (&'a [f32], &'a [f32]) {
    match planes {
        [] => (&[], &[]),
        [mono] => (*mono, *mono),
        [left, right, ..] => (*left, *right),
    }
}

fn interleave(left: &[f32], right: &[f32]) -> Vec<i16> {
    let mut out = Vec::with_capacity(left.len() * 2);
    for (l, r) in left.iter().zip(right) {
        out.push(f32_to_i16(*l));
        out.push(f32_to_i16(*r));
    }
    out
}
