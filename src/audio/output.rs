// Audio output using cpal
// Registers the render callback with a fixed S16 stereo 44.1kHz stream

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleFormat, SampleRate, Stream, StreamConfig};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::format::{BYTES_PER_SAMPLE, OUTPUT_CHANNELS, OUTPUT_SAMPLE_RATE};
use super::queue::PlaybackQueue;
use crate::error::OutputError;
use crate::settings::OutputSettings;

/// Pulls output blocks from the playback queue on the render thread.
///
/// Does no decoding, no I/O and no allocation; the only wait is the queue's
/// short critical section. Devices that need a sample conversion go through
/// [`ConvertingRender`], whose scratch block is sized before the stream starts.
#[derive(Clone)]
pub struct RenderCallback {
    queue: Arc<PlaybackQueue>,
    underruns: Arc<AtomicU64>,
}

impl RenderCallback {
    pub fn new(queue: Arc<PlaybackQueue>) -> Self {
        Self {
            queue,
            underruns: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Fill `out` with exactly `out.len()` bytes of output audio
    pub fn render(&self, out: &mut [u8]) {
        let filled = self.queue.pull_into(out);
        if filled > 0 && filled < out.len() {
            self.underruns.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Same as [`render`](Self::render) for a device buffer of S16 samples
    pub fn render_i16(&self, out: &mut [i16]) {
        self.render(bytemuck::cast_slice_mut(out));
    }

    /// Blocks where queued audio ran out partway through
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }
}

/// Render adapter for devices fed F32 or U16 samples.
///
/// Renders S16 into a scratch block sized up front, then converts in place.
/// The scratch only grows if the device hands over a block larger than the
/// configured buffer size.
pub struct ConvertingRender {
    render: RenderCallback,
    scratch: Vec<u8>,
}

impl ConvertingRender {
    pub fn new(render: RenderCallback, block_frames: u32) -> Self {
        let bytes = block_frames as usize * OUTPUT_CHANNELS as usize * BYTES_PER_SAMPLE;
        Self {
            render,
            scratch: vec![0; bytes],
        }
    }

    pub fn render<T>(&mut self, data: &mut [T])
    where
        T: cpal::Sample + cpal::FromSample<i16>,
    {
        let needed = data.len() * BYTES_PER_SAMPLE;
        if self.scratch.len() < needed {
            warn!("Device block of {} bytes exceeds the configured buffer", needed);
            self.scratch.resize(needed, 0);
        }
        let block = &mut self.scratch[..needed];
        self.render.render(block);

        for (dst, bytes) in data.iter_mut().zip(block.chunks_exact(BYTES_PER_SAMPLE)) {
            *dst = T::from_sample(i16::from_ne_bytes([bytes[0], bytes[1]]));
        }
    }
}

/// An open output stream driving a [`RenderCallback`]
pub struct AudioOutput {
    _stream: Stream,
    device_name: String,
    device_format: SampleFormat,
}

impl AudioOutput {
    /// Open the configured (or default) output device and start the stream
    pub fn open(render: RenderCallback, settings: &OutputSettings) -> Result<Self, OutputError> {
        let device = Self::select_device(settings.device_name.as_deref())?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        let device_format = Self::negotiate_format(&device)?;

        let mut config = StreamConfig {
            channels: OUTPUT_CHANNELS,
            sample_rate: SampleRate(OUTPUT_SAMPLE_RATE),
            buffer_size: match settings.buffer_frames {
                0 => BufferSize::Default,
                frames => BufferSize::Fixed(frames),
            },
        };

        let block_frames = match settings.buffer_frames {
            0 => OutputSettings::default().buffer_frames,
            frames => frames,
        };

        let first = Self::build_stream(&device, &config, device_format, render.clone(), block_frames);
        let stream = match first {
            Ok(stream) => stream,
            Err(e) if config.buffer_size != BufferSize::Default => {
                warn!("Fixed buffer size rejected ({}), retrying with platform default", e);
                config.buffer_size = BufferSize::Default;
                Self::build_stream(&device, &config, device_format, render, block_frames)?
            }
            Err(e) => return Err(e),
        };

        stream.play().map_err(|e| OutputError::Play(e.to_string()))?;

        info!(
            "Audio output started on {:?} ({:?} device samples, buffer {:?})",
            device_name, device_format, config.buffer_size
        );

        Ok(Self {
            _stream: stream,
            device_name,
            device_format,
        })
    }

    fn select_device(name: Option<&str>) -> Result<Device, OutputError> {
        let host = cpal::default_host();

        if let Some(wanted) = name {
            let found = host
                .output_devices()
                .map_err(|e| OutputError::UnsupportedConfig(e.to_string()))?
                .find(|d| d.name().map(|n| n == wanted).unwrap_or(false));
            match found {
                Some(device) => return Ok(device),
                None => warn!("Output device {:?} not found, using default", wanted),
            }
        }

        host.default_output_device().ok_or(OutputError::NoDevice)
    }

    /// Pick a device sample type that can carry stereo 44.1kHz, preferring S16
    fn negotiate_format(device: &Device) -> Result<SampleFormat, OutputError> {
        let supported: Vec<SampleFormat> = device
            .supported_output_configs()
            .map_err(|e| OutputError::UnsupportedConfig(e.to_string()))?
            .filter(|c| {
                c.channels() == OUTPUT_CHANNELS
                    && c.min_sample_rate().0 <= OUTPUT_SAMPLE_RATE
                    && c.max_sample_rate().0 >= OUTPUT_SAMPLE_RATE
            })
            .map(|c| c.sample_format())
            .collect();

        debug!("Device sample formats for stereo 44.1kHz: {:?}", supported);

        [SampleFormat::I16, SampleFormat::F32, SampleFormat::U16]
            .into_iter()
            .find(|f| supported.contains(f))
            .ok_or_else(|| {
                OutputError::UnsupportedConfig("no stereo 44.1kHz configuration".to_string())
            })
    }

    fn build_stream(
        device: &Device,
        config: &StreamConfig,
        format: SampleFormat,
        render: RenderCallback,
        block_frames: u32,
    ) -> Result<Stream, OutputError> {
        let stream = match format {
            SampleFormat::I16 => device.build_output_stream(
                config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| render.render_i16(data),
                |err| warn!("Audio output error: {}", err),
                None,
            ),
            SampleFormat::F32 => {
                Self::build_converting_stream::<f32>(device, config, render, block_frames)
            }
            SampleFormat::U16 => {
                Self::build_converting_stream::<u16>(device, config, render, block_frames)
            }
            other => {
                return Err(OutputError::UnsupportedConfig(format!(
                    "unsupported sample format: {:?}",
                    other
                )))
            }
        };

        stream.map_err(|e| OutputError::BuildStream(e.to_string()))
    }

    /// Stream for devices that cannot take S16 directly; converts each block
    fn build_converting_stream<T>(
        device: &Device,
        config: &StreamConfig,
        render: RenderCallback,
        block_frames: u32,
    ) -> Result<Stream, cpal::BuildStreamError>
    where
        T: cpal::SizedSample + cpal::FromSample<i16>,
    {
        let mut converting = ConvertingRender::new(render, block_frames);

        device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| converting.render(data),
            |err| warn!("Audio output error: {}", err),
            None,
        )
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Sample type the device is fed with
    pub fn device_format(&self) -> SampleFormat {
        self.device_format
    }
}
