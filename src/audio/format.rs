//! Capture format primitives: sample rates, channel layout, sample encoding
//! and the [`CaptureConfig`] that ties them to a buffer size.

use std::fmt;

// ---------------------------------------------------------------------------
// SampleRate
// ---------------------------------------------------------------------------

/// Sample rates the capture pipeline and the engine are able to run at.
///
/// [`SampleRate::PROBE_ORDER`] lists them in descending quality, which is
/// the order the capability prober walks them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleRate {
    Hz44100,
    Hz22050,
    Hz11025,
    Hz8000,
}

impl SampleRate {
    /// Candidate rates in descending-quality order.
    pub const PROBE_ORDER: [SampleRate; 4] = [
        SampleRate::Hz44100,
        SampleRate::Hz22050,
        SampleRate::Hz11025,
        SampleRate::Hz8000,
    ];

    /// The rate in Hz.
    pub fn hz(self) -> u32 {
        match self {
            SampleRate::Hz44100 => 44_100,
            SampleRate::Hz22050 => 22_050,
            SampleRate::Hz11025 => 11_025,
            SampleRate::Hz8000 => 8_000,
        }
    }
}

impl Default for SampleRate {
    fn default() -> Self {
        SampleRate::Hz44100
    }
}

impl TryFrom<u32> for SampleRate {
    type Error = u32;

    fn try_from(hz: u32) -> Result<Self, Self::Error> {
        SampleRate::PROBE_ORDER
            .into_iter()
            .find(|rate| rate.hz() == hz)
            .ok_or(hz)
    }
}

impl From<SampleRate> for u32 {
    fn from(rate: SampleRate) -> Self {
        rate.hz()
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.hz())
    }
}

// ---------------------------------------------------------------------------
// ChannelConfig / SampleFormat
// ---------------------------------------------------------------------------

/// Channel layout requested from the capture and playback devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelConfig {
    #[default]
    Mono,
    Stereo,
}

impl ChannelConfig {
    /// Number of interleaved channels.
    pub fn channels(self) -> u16 {
        match self {
            ChannelConfig::Mono => 1,
            ChannelConfig::Stereo => 2,
        }
    }
}

/// Sample encoding used on the device side.
///
/// The engine always sees signed 16-bit PCM; `Float32` devices are converted
/// at the backend boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    #[default]
    Pcm16,
    Float32,
}

/// Rate the platform minimum buffer size is queried at before probing.
pub const DEFAULT_SAMPLE_RATE: SampleRate = SampleRate::Hz44100;
/// Fixed channel layout of the pipeline.
pub const DEFAULT_CHANNEL_CONFIG: ChannelConfig = ChannelConfig::Mono;
/// Fixed sample encoding of the pipeline.
pub const DEFAULT_SAMPLE_FORMAT: SampleFormat = SampleFormat::Pcm16;

// ---------------------------------------------------------------------------
// CaptureConfig
// ---------------------------------------------------------------------------

/// A capture configuration: sample rate and buffer size on top of the fixed
/// channel layout and sample format.
///
/// Holding a `CaptureConfig` says nothing about whether a device will accept
/// it. Only a successful probe (or a successful device construction) proves
/// that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    pub sample_rate: SampleRate,
    /// Buffer size in platform units (frames for the cpal backend).
    pub buffer_size: usize,
    pub channel_config: ChannelConfig,
    pub sample_format: SampleFormat,
}

impl CaptureConfig {
    pub fn new(sample_rate: SampleRate, buffer_size: usize) -> Self {
        Self {
            sample_rate,
            buffer_size,
            channel_config: DEFAULT_CHANNEL_CONFIG,
            sample_format: DEFAULT_SAMPLE_FORMAT,
        }
    }
}
