//! Platform device abstraction.
//!
//! The pipeline never talks to an audio backend directly. It asks an
//! [`AudioPlatform`] for a minimum buffer size and for capture / playback
//! handles built from a [`DeviceSpec`]. A handle is returned whether or not
//! the backend accepted the spec; callers inspect [`DeviceHandle::state`] and
//! must [`release`](DeviceHandle::release) it either way.

use thiserror::Error;

use super::format::{ChannelConfig, SampleFormat, SampleRate};

// ---------------------------------------------------------------------------
// AudioError
// ---------------------------------------------------------------------------

/// Errors raised while querying or constructing audio devices.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AudioError {
    /// The backend returned a handle that is not ready.
    #[error("device failed to initialise at {sample_rate} with buffer {buffer_size}: {reason}")]
    DeviceInitFailed {
        sample_rate: SampleRate,
        buffer_size: usize,
        reason: String,
    },

    /// Every probe candidate was rejected by the platform.
    #[error("unable to configure audio: no supported sample rate / buffer size combination")]
    ProbeExhausted,

    /// The stored capture configuration is refused by the platform; the
    /// caller should re-probe.
    #[error("invalid audio configuration: {sample_rate} with buffer {buffer_size} was refused")]
    InvalidConfig {
        sample_rate: SampleRate,
        buffer_size: usize,
    },

    /// The platform could not report a minimum buffer size.
    #[error("failed to query minimum buffer size at {sample_rate}: {reason}")]
    BufferQuery {
        sample_rate: SampleRate,
        reason: String,
    },

    /// No input or output device exists on the default host.
    #[error("no {0} device found on the default audio host")]
    NoDevice(&'static str),
}

// ---------------------------------------------------------------------------
// DeviceSpec / DeviceState
// ---------------------------------------------------------------------------

/// Everything a backend needs to construct a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSpec {
    pub sample_rate: SampleRate,
    pub channel_config: ChannelConfig,
    pub sample_format: SampleFormat,
    pub buffer_size: usize,
}

/// Outcome of a device construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Ready,
    Failed,
}

// ---------------------------------------------------------------------------
// Device traits
// ---------------------------------------------------------------------------

/// A constructed device, ready or not.
pub trait DeviceHandle {
    fn state(&self) -> DeviceState;

    /// Backend-specific reason for a `Failed` state, if known.
    fn failure_reason(&self) -> Option<String> {
        None
    }

    /// Start streaming. Only meaningful on a `Ready` handle.
    fn start(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    /// Give the device back to the platform.
    fn release(self);

    fn is_ready(&self) -> bool {
        self.state() == DeviceState::Ready
    }
}

/// Microphone side of the pipeline.
pub trait CaptureDevice: DeviceHandle {
    /// Copy up to `buf.len()` captured samples into `buf`, returning how many
    /// were written.
    fn read(&mut self, buf: &mut [i16]) -> usize;
}

/// Speaker side of the pipeline.
pub trait PlaybackDevice: DeviceHandle {
    /// Queue `samples` for output, returning how many were accepted.
    fn write(&mut self, samples: &[i16]) -> usize;
}

/// Factory for capture / playback devices plus the minimum-buffer queries.
pub trait AudioPlatform {
    type Capture: CaptureDevice;
    type Playback: PlaybackDevice;

    /// Smallest capture buffer the platform accepts for the given format.
    /// Treated as a true lower bound.
    fn min_capture_buffer_size(
        &self,
        sample_rate: SampleRate,
        channel_config: ChannelConfig,
        sample_format: SampleFormat,
    ) -> Result<usize, AudioError>;

    /// Smallest playback buffer the platform accepts for the given format.
    fn min_playback_buffer_size(
        &self,
        sample_rate: SampleRate,
        channel_config: ChannelConfig,
        sample_format: SampleFormat,
    ) -> Result<usize, AudioError>;

    /// Construct a capture device. Never fails outright; a refused spec comes
    /// back as a `Failed` handle.
    fn open_capture(&self, spec: &DeviceSpec) -> Self::Capture;

    /// Construct a playback device; same contract as [`open_capture`](Self::open_capture).
    fn open_playback(&self, spec: &DeviceSpec) -> Self::Playback;
}
