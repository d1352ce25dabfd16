//! Capture capability probing.
//!
//! [`CapabilityProber`] walks a fixed candidate space of sample rates and
//! buffer-size multipliers and returns the first combination the platform
//! accepts:
//!
//! ```text
//! min = platform.min_capture_buffer_size(default_rate)
//! for rate in 44100, 22050, 11025, 8000:
//!     for m in 1.0, 0.5, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0:
//!         open capture(rate, floor(min * m)) → Ready? release, done
//!                                            → Failed? release, next
//! exhausted → AudioError::ProbeExhausted
//! ```

use crate::config::{keys, SettingValue, Settings};

use super::device::{AudioError, AudioPlatform, DeviceHandle, DeviceSpec};
use super::format::{CaptureConfig, ChannelConfig, SampleFormat, SampleRate};

/// Buffer-size multipliers applied to the platform minimum, in trial order.
pub const BUFFER_MULTIPLIERS: [f64; 8] = [1.0, 0.5, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0];

/// Searches for a capture configuration the platform will accept.
pub struct CapabilityProber<'a, P> {
    platform: &'a P,
}

impl<'a, P: AudioPlatform> CapabilityProber<'a, P> {
    pub fn new(platform: &'a P) -> Self {
        Self { platform }
    }

    /// Find the first accepted `(sample_rate, buffer_size)` pair.
    ///
    /// Holds at most one probe device at a time; every handle is released
    /// right after its state is read.
    ///
    /// # Errors
    ///
    /// - [`AudioError::BufferQuery`] when the minimum buffer size is unknown.
    /// - [`AudioError::ProbeExhausted`] when no candidate is accepted.
    pub fn probe(
        &self,
        default_rate: SampleRate,
        channel_config: ChannelConfig,
        sample_format: SampleFormat,
    ) -> Result<CaptureConfig, AudioError> {
        let min_buffer =
            self.platform
                .min_capture_buffer_size(default_rate, channel_config, sample_format)?;
        log::debug!("probe: platform minimum buffer at {default_rate} is {min_buffer}");

        for sample_rate in SampleRate::PROBE_ORDER {
            for multiplier in BUFFER_MULTIPLIERS {
                let buffer_size = scaled_buffer(min_buffer, multiplier);
                let spec = DeviceSpec {
                    sample_rate,
                    channel_config,
                    sample_format,
                    buffer_size,
                };

                let device = self.platform.open_capture(&spec);
                let ready = device.is_ready();
                if !ready {
                    log::debug!(
                        "probe: rejected {sample_rate} x{multiplier} ({buffer_size}): {}",
                        device.failure_reason().unwrap_or_else(|| "not ready".into())
                    );
                }
                device.release();

                if ready {
                    log::info!("probe: accepted {sample_rate} with buffer {buffer_size}");
                    return Ok(CaptureConfig {
                        sample_rate,
                        buffer_size,
                        channel_config,
                        sample_format,
                    });
                }
            }
        }

        log::warn!("probe: exhausted every sample rate / buffer size candidate");
        Err(AudioError::ProbeExhausted)
    }

    /// Probe and, on success, commit the winning pair to `settings` in a
    /// single update. Nothing is written when probing fails.
    pub fn probe_and_persist(
        &self,
        settings: &mut Settings,
        default_rate: SampleRate,
        channel_config: ChannelConfig,
        sample_format: SampleFormat,
    ) -> Result<CaptureConfig, AudioError> {
        let config = self.probe(default_rate, channel_config, sample_format)?;
        settings.set_many([
            (keys::BUFFER_SIZE, SettingValue::Int(config.buffer_size as i64)),
            (
                keys::SAMPLE_RATE,
                SettingValue::Str(config.sample_rate.hz().to_string()),
            ),
        ]);
        Ok(config)
    }
}

fn scaled_buffer(min_buffer: usize, multiplier: f64) -> usize {
    (min_buffer as f64 * multiplier).floor() as usize
}
