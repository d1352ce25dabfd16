//! [`AudioPlatform`] backed by `cpal`.
//!
//! Device construction maps onto `build_input_stream` / `build_output_stream`
//! with a fixed buffer size: a stream that builds is `Ready`, a build error is
//! `Failed`. Dropping the stream releases the device.
//!
//! Capture callbacks push `i16` samples into a shared [`RingBuffer`] that
//! [`CaptureDevice::read`] drains; playback callbacks pull from a ring that
//! [`PlaybackDevice::write`] fills and output silence on underrun.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use super::buffer::RingBuffer;
use super::device::{
    AudioError, AudioPlatform, CaptureDevice, DeviceHandle, DeviceSpec, DeviceState,
    PlaybackDevice,
};
use super::format::{ChannelConfig, SampleFormat, SampleRate};

/// Used when a backend cannot report its buffer range.
pub const DEFAULT_MIN_BUFFER_FRAMES: usize = 2048;

/// Ring capacity in multiples of the device buffer size.
const RING_BLOCKS: usize = 8;

/// Largest ring a handle may allocate, in samples.
const MAX_RING_SAMPLES: usize = 1 << 24;

const I16_MIN_F32: f32 = i16::MIN as f32;
const I16_MAX_F32: f32 = i16::MAX as f32;

type SharedSamples = Arc<Mutex<RingBuffer<i16>>>;

// ---------------------------------------------------------------------------
// CpalPlatform
// ---------------------------------------------------------------------------

/// The default cpal host's input and output devices.
pub struct CpalPlatform {
    input: cpal::Device,
    output: Option<cpal::Device>,
}

impl CpalPlatform {
    /// Open the default host's default input (required) and output devices.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError::NoDevice`] when there is no input device.
    pub fn new() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let input = host
            .default_input_device()
            .ok_or(AudioError::NoDevice("input"))?;
        let output = host.default_output_device();
        if output.is_none() {
            log::warn!("no default output device; playback will be unavailable");
        }

        log::debug!(
            "cpal host {:?}, input device {}",
            host.id(),
            input.name().unwrap_or_else(|_| "unknown".into())
        );
        Ok(Self { input, output })
    }
}

impl AudioPlatform for CpalPlatform {
    type Capture = CpalCapture;
    type Playback = CpalPlayback;

    fn min_capture_buffer_size(
        &self,
        sample_rate: SampleRate,
        channel_config: ChannelConfig,
        sample_format: SampleFormat,
    ) -> Result<usize, AudioError> {
        let configs = self
            .input
            .supported_input_configs()
            .map_err(|e| AudioError::BufferQuery {
                sample_rate,
                reason: e.to_string(),
            })?;
        min_buffer_frames(configs, sample_rate, channel_config, sample_format)
    }

    fn min_playback_buffer_size(
        &self,
        sample_rate: SampleRate,
        channel_config: ChannelConfig,
        sample_format: SampleFormat,
    ) -> Result<usize, AudioError> {
        let device = self.output.as_ref().ok_or(AudioError::NoDevice("output"))?;
        let configs = device
            .supported_output_configs()
            .map_err(|e| AudioError::BufferQuery {
                sample_rate,
                reason: e.to_string(),
            })?;
        min_buffer_frames(configs, sample_rate, channel_config, sample_format)
    }

    fn open_capture(&self, spec: &DeviceSpec) -> CpalCapture {
        let (config, ring) = match prepare(spec) {
            Ok(prepared) => prepared,
            Err(reason) => return CpalCapture::failed(spec, reason),
        };
        let built = match spec.sample_format {
            SampleFormat::Pcm16 => build_input::<i16>(&self.input, &config, &ring, |s| s),
            SampleFormat::Float32 => build_input::<f32>(&self.input, &config, &ring, f32_to_i16),
        };

        match built {
            Ok(stream) => CpalCapture {
                spec: *spec,
                stream: Some(stream),
                ring,
                failure: None,
            },
            Err(e) => CpalCapture {
                spec: *spec,
                stream: None,
                ring,
                failure: Some(e.to_string()),
            },
        }
    }

    fn open_playback(&self, spec: &DeviceSpec) -> CpalPlayback {
        let Some(device) = self.output.as_ref() else {
            return CpalPlayback::failed(spec, "no output device".into());
        };
        let (config, ring) = match prepare(spec) {
            Ok(prepared) => prepared,
            Err(reason) => return CpalPlayback::failed(spec, reason),
        };
        let built = match spec.sample_format {
            SampleFormat::Pcm16 => build_output::<i16>(device, &config, &ring, |s| s),
            SampleFormat::Float32 => build_output::<f32>(device, &config, &ring, i16_to_f32),
        };

        match built {
            Ok(stream) => CpalPlayback {
                spec: *spec,
                stream: Some(stream),
                ring,
                failure: None,
            },
            Err(e) => CpalPlayback {
                spec: *spec,
                stream: None,
                ring,
                failure: Some(e.to_string()),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// A cpal input stream plus the ring its callback fills.
pub struct CpalCapture {
    spec: DeviceSpec,
    stream: Option<cpal::Stream>,
    ring: SharedSamples,
    failure: Option<String>,
}

/// A cpal output stream plus the ring its callback drains.
pub struct CpalPlayback {
    spec: DeviceSpec,
    stream: Option<cpal::Stream>,
    ring: SharedSamples,
    failure: Option<String>,
}

macro_rules! impl_device_handle {
    ($handle:ty) => {
        impl $handle {
            /// A handle that never reached the backend.
            fn failed(spec: &DeviceSpec, reason: String) -> Self {
                Self {
                    spec: *spec,
                    stream: None,
                    ring: Arc::new(Mutex::new(RingBuffer::new(1))),
                    failure: Some(reason),
                }
            }
        }

        impl DeviceHandle for $handle {
            fn state(&self) -> DeviceState {
                if self.stream.is_some() {
                    DeviceState::Ready
                } else {
                    DeviceState::Failed
                }
            }

            fn failure_reason(&self) -> Option<String> {
                self.failure.clone()
            }

            fn start(&mut self) -> Result<(), AudioError> {
                let reason = match &self.stream {
                    Some(stream) => match stream.play() {
                        Ok(()) => return Ok(()),
                        Err(e) => e.to_string(),
                    },
                    None => self.failure.clone().unwrap_or_default(),
                };
                Err(AudioError::DeviceInitFailed {
                    sample_rate: self.spec.sample_rate,
                    buffer_size: self.spec.buffer_size,
                    reason,
                })
            }

            fn release(self) {
                // Dropping the cpal stream stops it and frees the device.
                drop(self.stream);
            }
        }
    };
}

impl_device_handle!(CpalCapture);
impl_device_handle!(CpalPlayback);

impl CaptureDevice for CpalCapture {
    fn read(&mut self, buf: &mut [i16]) -> usize {
        match self.ring.lock() {
            Ok(mut ring) => ring.pop_into(buf),
            Err(_) => 0,
        }
    }
}

impl PlaybackDevice for CpalPlayback {
    fn write(&mut self, samples: &[i16]) -> usize {
        match self.ring.lock() {
            Ok(mut ring) => {
                let overwritten = ring.push_slice(samples);
                if overwritten > 0 {
                    log::trace!("playback ring overrun, {overwritten} samples dropped");
                }
                samples.len()
            }
            Err(_) => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn cpal_format(format: SampleFormat) -> cpal::SampleFormat {
    match format {
        SampleFormat::Pcm16 => cpal::SampleFormat::I16,
        SampleFormat::Float32 => cpal::SampleFormat::F32,
    }
}

/// Stream config and ring for `spec`, or the reason the spec cannot be
/// handed to the backend.
fn prepare(spec: &DeviceSpec) -> Result<(cpal::StreamConfig, SharedSamples), String> {
    Ok((stream_config(spec)?, new_ring(spec)?))
}

fn stream_config(spec: &DeviceSpec) -> Result<cpal::StreamConfig, String> {
    let frames = u32::try_from(spec.buffer_size)
        .map_err(|_| format!("buffer size {} does not fit the backend", spec.buffer_size))?;
    Ok(cpal::StreamConfig {
        channels: spec.channel_config.channels(),
        sample_rate: cpal::SampleRate(spec.sample_rate.hz()),
        buffer_size: cpal::BufferSize::Fixed(frames),
    })
}

fn new_ring(spec: &DeviceSpec) -> Result<SharedSamples, String> {
    let capacity = spec
        .buffer_size
        .max(1)
        .checked_mul(spec.channel_config.channels() as usize)
        .and_then(|n| n.checked_mul(RING_BLOCKS))
        .filter(|&n| n <= MAX_RING_SAMPLES)
        .ok_or_else(|| format!("buffer size {} is too large", spec.buffer_size))?;
    Ok(Arc::new(Mutex::new(RingBuffer::new(capacity))))
}

/// Smallest buffer among the supported ranges matching the requested format.
fn min_buffer_frames(
    configs: impl Iterator<Item = cpal::SupportedStreamConfigRange>,
    sample_rate: SampleRate,
    channel_config: ChannelConfig,
    sample_format: SampleFormat,
) -> Result<usize, AudioError> {
    let hz = sample_rate.hz();
    configs
        .filter(|c| {
            c.channels() == channel_config.channels()
                && c.sample_format() == cpal_format(sample_format)
                && c.min_sample_rate().0 <= hz
                && hz <= c.max_sample_rate().0
        })
        .map(|c| match c.buffer_size() {
            cpal::SupportedBufferSize::Range { min, .. } => (*min as usize).max(1),
            cpal::SupportedBufferSize::Unknown => DEFAULT_MIN_BUFFER_FRAMES,
        })
        .min()
        .ok_or_else(|| AudioError::BufferQuery {
            sample_rate,
            reason: format!(
                "no supported config for {} channel(s) {:?}",
                channel_config.channels(),
                sample_format
            ),
        })
}

fn build_input<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    ring: &SharedSamples,
    to_i16: fn(T) -> i16,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + Send + 'static,
{
    let ring = Arc::clone(ring);
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let samples: Vec<i16> = data.iter().map(|&s| to_i16(s)).collect();
            if let Ok(mut ring) = ring.lock() {
                ring.push_slice(&samples);
            }
        },
        |err: cpal::StreamError| {
            log::error!("cpal input stream error: {err}");
        },
        None,
    )
}

fn build_output<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    ring: &SharedSamples,
    from_i16: fn(i16) -> T,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + Send + 'static,
{
    let ring = Arc::clone(ring);
    let mut scratch: Vec<i16> = Vec::new();
    device.build_output_stream(
        config,
        move |out: &mut [T], _: &cpal::OutputCallbackInfo| {
            scratch.resize(out.len(), 0);
            let filled = match ring.lock() {
                Ok(mut ring) => ring.pop_into(&mut scratch),
                Err(_) => 0,
            };
            for (i, slot) in out.iter_mut().enumerate() {
                *slot = from_i16(if i < filled { scratch[i] } else { 0 });
            }
        },
        |err: cpal::StreamError| {
            log::error!("cpal output stream error: {err}");
        },
        None,
    )
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample * I16_MAX_F32).clamp(I16_MIN_F32, I16_MAX_F32) as i16
}

fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / I16_MAX_F32
}
