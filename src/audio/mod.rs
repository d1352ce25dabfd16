//! Audio devices: format types, the platform abstraction, the cpal backend
//! and capture capability probing.
//!
//! # Layout
//!
//! ```text
//! format        SampleRate / ChannelConfig / SampleFormat / CaptureConfig
//! device        AudioPlatform → CaptureDevice / PlaybackDevice handles
//! cpal_backend  AudioPlatform over the default cpal host
//! probe         CapabilityProber: first accepted (rate, buffer) pair
//! buffer        RingBuffer shared by cpal callbacks and the pipeline thread
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use vocal_tune::audio::{
//!     CapabilityProber, CpalPlatform, DEFAULT_CHANNEL_CONFIG, DEFAULT_SAMPLE_FORMAT,
//!     DEFAULT_SAMPLE_RATE,
//! };
//!
//! let platform = CpalPlatform::new().unwrap();
//! let config = CapabilityProber::new(&platform)
//!     .probe(DEFAULT_SAMPLE_RATE, DEFAULT_CHANNEL_CONFIG, DEFAULT_SAMPLE_FORMAT)
//!     .unwrap();
//! println!("capture at {} with buffer {}", config.sample_rate, config.buffer_size);
//! ```

pub mod buffer;
pub mod cpal_backend;
pub mod device;
pub mod format;
pub mod probe;

#[cfg(test)]
pub mod mock;

pub use buffer::RingBuffer;
pub use cpal_backend::{CpalCapture, CpalPlatform, CpalPlayback};
pub use device::{
    AudioError, AudioPlatform, CaptureDevice, DeviceHandle, DeviceSpec, DeviceState,
    PlaybackDevice,
};
pub use format::{
    CaptureConfig, ChannelConfig, SampleFormat, SampleRate, DEFAULT_CHANNEL_CONFIG,
    DEFAULT_SAMPLE_FORMAT, DEFAULT_SAMPLE_RATE,
};
pub use probe::{CapabilityProber, BUFFER_MULTIPLIERS};
