// Fixed output format and the owned PCM chunk type
// Everything that reaches the queue is S16 native-endian, interleaved stereo, 44.1kHz.

use std::collections::TryReserveError;

/// Output sample rate negotiated with the device
pub const OUTPUT_SAMPLE_RATE: u32 = 44_100;

/// Output channel count (interleaved L/R)
pub const OUTPUT_CHANNELS: u16 = 2;

/// Bytes per output sample (signed 16-bit)
pub const BYTES_PER_SAMPLE: usize = 2;

/// Bytes per output frame (one sample per channel)
pub const BYTES_PER_FRAME: usize = BYTES_PER_SAMPLE * OUTPUT_CHANNELS as usize;

/// One owned, immutable buffer of decoded PCM in the output format.
///
/// The bytes live in a single boxed slice, so the length is always the
/// allocation's length and there is exactly one way the memory is released.
#[derive(Clone, PartialEq, Eq)]
pub struct PcmChunk {
    bytes: Box<[u8]>,
}

impl PcmChunk {
    /// Take ownership of already-encoded output bytes
    pub fn from_bytes(bytes: impl Into<Box<[u8]>>) -> Self {
        Self { bytes: bytes.into() }
    }

    /// Encode interleaved stereo samples into a new chunk.
    ///
    /// Fails only if the output buffer cannot be allocated.
    pub fn try_from_samples(samples: &[i16]) -> Result<Self, TryReserveError> {
        let mut bytes = Vec::new();
        bytes.try_reserve_exact(samples.len() * BYTES_PER_SAMPLE)?;
        for sample in samples {
            bytes.extend_from_slice(&sample.to_ne_bytes());
        }
        Ok(Self::from_bytes(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of whole stereo frames in the chunk
    pub fn frames(&self) -> usize {
        self.bytes.len() / BYTES_PER_FRAME
    }
}

impl std::fmt::Debug for PcmChunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcmChunk")
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Convert a normalised f32 sample to S16, clamping out-of-range input.
///
/// Uses the same 2^15 scale the decoder uses for S16 -> f32, so 16-bit
/// sources at the output rate come through unchanged.
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32_768.0).round().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}
