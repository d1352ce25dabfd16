//! Pipeline controller: keeps the pitch engine in step with the settings.
//!
//! # Lifecycle
//!
//! ```text
//! new(platform, factory, &settings)
//!   ├─ load CaptureConfig + live mode (declared defaults for absent keys)
//!   ├─ create engine at the loaded sample rate
//!   └─ push every EngineParameters member
//!
//! apply_change(key, value)          one changed key at a time
//!   ├─ buffer_size   → reload scalar
//!   ├─ sample_rate   → release engine, create at new rate (no reapply)
//!   ├─ live_mode     → reload scalar
//!   ├─ engine param  → push that one parameter
//!   └─ anything else → ignored
//!
//! shutdown()                        release the engine; later rate changes fail
//! ```
//!
//! The controller is not synchronised. Callers that drive `process` and
//! `apply_change` from different threads must serialise them; see
//! [`crate::pipeline::PipelineRunner`].

use thiserror::Error;

use crate::audio::{
    AudioError, AudioPlatform, CaptureConfig, DeviceHandle, DeviceSpec, SampleRate,
    DEFAULT_SAMPLE_RATE,
};
use crate::config::{keys, ConfigError, SettingValue, Settings};
use crate::engine::{EngineError, EngineFactory, EngineParameters, EngineSlot, Parameter, PitchEngine};

/// Buffer size used when `buffer_size` has never been stored.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Live mode used when `live_mode` has never been stored.
pub const DEFAULT_LIVE_MODE: bool = true;

// ---------------------------------------------------------------------------
// ControllerError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// `process` was asked for more samples than the slice holds.
    #[error("sample count {count} exceeds buffer length {len}")]
    SampleCount { count: usize, len: usize },
}

// ---------------------------------------------------------------------------
// ChangeOutcome
// ---------------------------------------------------------------------------

/// What [`PipelineController::apply_change`] did with a changed key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChangeOutcome {
    BufferSizeReloaded(usize),
    /// A new engine was created at this rate. It runs on the factory's own
    /// parameter defaults until each parameter key changes again.
    EngineRebuilt(SampleRate),
    LiveModeReloaded(bool),
    ParameterPushed(Parameter),
    Ignored,
}

// ---------------------------------------------------------------------------
// PipelineController
// ---------------------------------------------------------------------------

pub struct PipelineController<P: AudioPlatform, F: EngineFactory> {
    platform: P,
    capture: CaptureConfig,
    live: bool,
    engine: EngineSlot<F>,
}

impl<P: AudioPlatform, F: EngineFactory> PipelineController<P, F> {
    /// Load the capture configuration, create the engine and push the full
    /// parameter set into it.
    ///
    /// Every setting is parsed before the engine is created, so a malformed
    /// value fails construction without touching the factory.
    pub fn new(platform: P, factory: F, settings: &Settings) -> Result<Self, ControllerError> {
        let sample_rate = settings.get_sample_rate(keys::SAMPLE_RATE, DEFAULT_SAMPLE_RATE)?;
        let buffer_size = settings.get_count(keys::BUFFER_SIZE, DEFAULT_BUFFER_SIZE)?;
        let live = settings.get_bool(keys::LIVE_MODE, DEFAULT_LIVE_MODE)?;
        let params = EngineParameters::from_settings(settings)?;

        let mut engine = EngineSlot::new(factory, sample_rate);
        params.apply_to(engine.engine_mut()?);

        log::info!(
            "controller: {sample_rate}, buffer {buffer_size}, {} mode",
            if live { "live" } else { "buffered" }
        );

        Ok(Self {
            platform,
            capture: CaptureConfig::new(sample_rate, buffer_size),
            live,
            engine,
        })
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.capture.sample_rate
    }

    pub fn buffer_size(&self) -> usize {
        self.capture.buffer_size
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn capture_config(&self) -> CaptureConfig {
        self.capture
    }

    // -----------------------------------------------------------------------
    // Devices
    // -----------------------------------------------------------------------

    /// Open a capture device with the current configuration.
    ///
    /// The caller owns the returned handle and must release it. A device
    /// that did not reach `Ready` is released here and reported as
    /// [`AudioError::InvalidConfig`].
    pub fn get_capture_device(&self) -> Result<P::Capture, AudioError> {
        let spec = self.capture_spec();
        let device = self.platform.open_capture(&spec);
        checked(device, &spec)
    }

    /// Whether the current configuration yields a `Ready` capture device.
    /// The probe device is always released.
    pub fn is_capture_device_valid(&self) -> bool {
        let device = self.platform.open_capture(&self.capture_spec());
        let ready = device.is_ready();
        device.release();
        ready
    }

    /// Open a playback device at the current sample rate, sized by the
    /// platform's own minimum playback buffer for that rate.
    pub fn get_playback_device(&self) -> Result<P::Playback, AudioError> {
        let c = &self.capture;
        let buffer_size = self.platform.min_playback_buffer_size(
            c.sample_rate,
            c.channel_config,
            c.sample_format,
        )?;
        let spec = DeviceSpec {
            buffer_size,
            ..self.capture_spec()
        };
        let device = self.platform.open_playback(&spec);
        checked(device, &spec)
    }

    fn capture_spec(&self) -> DeviceSpec {
        DeviceSpec {
            sample_rate: self.capture.sample_rate,
            channel_config: self.capture.channel_config,
            sample_format: self.capture.sample_format,
            buffer_size: self.capture.buffer_size,
        }
    }

    // -----------------------------------------------------------------------
    // Processing
    // -----------------------------------------------------------------------

    /// Run the engine over the first `count` samples of `samples`, in place.
    pub fn process(&mut self, samples: &mut [i16], count: usize) -> Result<(), ControllerError> {
        let len = samples.len();
        let block = samples
            .get_mut(..count)
            .ok_or(ControllerError::SampleCount { count, len })?;
        self.engine.engine_mut()?.process(block);
        Ok(())
    }

    /// Release the engine. Idempotent; `process` fails afterwards.
    pub fn shutdown(&mut self) {
        self.engine.shutdown();
        log::info!("controller: shut down");
    }

    // -----------------------------------------------------------------------
    // Settings changes
    // -----------------------------------------------------------------------

    /// React to one changed setting.
    ///
    /// # Errors
    ///
    /// A value that cannot be parsed for its key is returned as
    /// [`ControllerError::Config`]; neither the engine nor the loaded
    /// configuration is touched in that case. After [`shutdown`](Self::shutdown)
    /// a sample-rate change fails with [`EngineError::Released`] instead of
    /// bringing a new engine up.
    pub fn apply_change(
        &mut self,
        key: &str,
        value: &SettingValue,
    ) -> Result<ChangeOutcome, ControllerError> {
        let outcome = match SettingUpdate::parse(key, value)? {
            SettingUpdate::BufferSize(size) => {
                self.capture.buffer_size = size;
                ChangeOutcome::BufferSizeReloaded(size)
            }
            SettingUpdate::SampleRate(rate) => {
                if !self.engine.is_live() {
                    return Err(EngineError::Released.into());
                }
                self.engine.rebuild(rate);
                self.capture.sample_rate = rate;
                ChangeOutcome::EngineRebuilt(rate)
            }
            SettingUpdate::LiveMode(live) => {
                self.live = live;
                ChangeOutcome::LiveModeReloaded(live)
            }
            SettingUpdate::Parameter(param) => {
                param.apply_to(self.engine.engine_mut()?);
                ChangeOutcome::ParameterPushed(param)
            }
            SettingUpdate::Unrelated => ChangeOutcome::Ignored,
        };
        log::debug!("controller: {key} = {value} -> {outcome:?}");
        Ok(outcome)
    }
}

// ---------------------------------------------------------------------------
// SettingUpdate
// ---------------------------------------------------------------------------

/// A setting value parsed into the form the controller consumes.
///
/// Parsing is shared by [`PipelineController::apply_change`] and by callers
/// that want to reject a value before it is stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingUpdate {
    BufferSize(usize),
    SampleRate(SampleRate),
    LiveMode(bool),
    Parameter(Parameter),
    /// A key the pipeline does not read.
    Unrelated,
}

impl SettingUpdate {
    pub fn parse(key: &str, value: &SettingValue) -> Result<Self, ConfigError> {
        Ok(match key {
            keys::BUFFER_SIZE => SettingUpdate::BufferSize(value.as_count(key)?),
            keys::SAMPLE_RATE => SettingUpdate::SampleRate(value.as_sample_rate(key)?),
            keys::LIVE_MODE => SettingUpdate::LiveMode(value.as_bool(key)?),
            _ => match Parameter::parse(key, value)? {
                Some(param) => SettingUpdate::Parameter(param),
                None => SettingUpdate::Unrelated,
            },
        })
    }
}

fn checked<D: DeviceHandle>(device: D, spec: &DeviceSpec) -> Result<D, AudioError> {
    if device.is_ready() {
        return Ok(device);
    }
    log::warn!(
        "device rejected {} with buffer {}: {}",
        spec.sample_rate,
        spec.buffer_size,
        device.failure_reason().unwrap_or_else(|| "not ready".into())
    );
    device.release();
    Err(AudioError::InvalidConfig {
        sample_rate: spec.sample_rate,
        buffer_size: spec.buffer_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock::{DeviceKind, MockPlatform};
    use crate::engine::recording::{CallLog, EngineCall, RecordingFactory};
    use crate::engine::MusicalKey;

    type Controller = PipelineController<MockPlatform, RecordingFactory>;

    fn controller(platform: MockPlatform, settings: &Settings) -> (Controller, CallLog) {
        let factory = RecordingFactory::default();
        let log = factory.log();
        let controller = PipelineController::new(platform, factory, settings).unwrap();
        (controller, log)
    }

    fn creations(log: &CallLog) -> usize {
        log.count(|c| matches!(c, EngineCall::Created(_)))
    }

    fn releases(log: &CallLog) -> usize {
        log.count(|c| matches!(c, EngineCall::Released(_)))
    }

    // ── Construction ──────────────────────────────────────────────────────

    #[test]
    fn empty_store_uses_declared_defaults() {
        let (c, log) = controller(MockPlatform::accepting(1024), &Settings::default());

        assert_eq!(c.sample_rate(), SampleRate::Hz44100);
        assert_eq!(c.buffer_size(), 4096);
        assert!(c.is_live());
        assert_eq!(log.calls()[0], EngineCall::Created(SampleRate::Hz44100));
        assert_eq!(
            log.parameters(),
            EngineParameters::default().to_parameters().to_vec()
        );
    }

    #[test]
    fn stored_values_reach_the_engine_at_construction() {
        let mut settings = Settings::default();
        settings.set(keys::SAMPLE_RATE, "22050");
        settings.set(keys::BUFFER_SIZE, 2048i64);
        settings.set(keys::LIVE_MODE, false);
        settings.set(keys::PITCH_SHIFT, "-3.0");
        settings.set(keys::KEY, "G");
        settings.set(keys::FORMANT_CORRECTION, true);

        let (c, log) = controller(MockPlatform::accepting(1024), &settings);

        assert_eq!(c.sample_rate(), SampleRate::Hz22050);
        assert_eq!(c.buffer_size(), 2048);
        assert!(!c.is_live());
        assert_eq!(log.calls()[0], EngineCall::Created(SampleRate::Hz22050));

        let pushed = log.parameters();
        assert_eq!(pushed.len(), 16);
        assert!(pushed.contains(&Parameter::PitchShift(-3.0)));
        assert!(pushed.contains(&Parameter::Key(MusicalKey::new('G').unwrap())));
        assert!(pushed.contains(&Parameter::FormantCorrection(true)));
        assert!(pushed.contains(&Parameter::ConcertA(440.0)));
    }

    #[test]
    fn malformed_setting_fails_before_the_engine_exists() {
        let mut settings = Settings::default();
        settings.set(keys::CORRECTION_MIX, "loud");

        let factory = RecordingFactory::default();
        let log = factory.log();
        let err = PipelineController::new(MockPlatform::accepting(1024), factory, &settings)
            .err()
            .unwrap();

        assert!(matches!(
            err,
            ControllerError::Config(ConfigError::MalformedParameterValue { ref key, .. })
                if key == keys::CORRECTION_MIX
        ));
        assert!(log.calls().is_empty());
    }

    #[test]
    fn unsupported_stored_rate_is_rejected() {
        let mut settings = Settings::default();
        settings.set(keys::SAMPLE_RATE, "48000");

        let factory = RecordingFactory::default();
        let err = PipelineController::new(MockPlatform::accepting(1024), factory, &settings)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ControllerError::Config(ConfigError::UnsupportedSampleRate { hz: 48000, .. })
        ));
    }

    // ── apply_change ──────────────────────────────────────────────────────

    #[test]
    fn sample_rate_change_rebuilds_exactly_once() {
        let (mut c, log) = controller(MockPlatform::accepting(1024), &Settings::default());
        log.clear();

        let outcome = c
            .apply_change(keys::SAMPLE_RATE, &SettingValue::from("22050"))
            .unwrap();

        assert_eq!(outcome, ChangeOutcome::EngineRebuilt(SampleRate::Hz22050));
        assert_eq!(
            log.calls(),
            vec![
                EngineCall::Released(SampleRate::Hz44100),
                EngineCall::Created(SampleRate::Hz22050),
            ]
        );
        assert_eq!(c.sample_rate(), SampleRate::Hz22050);
    }

    #[test]
    fn rebuild_does_not_reapply_parameters() {
        let mut settings = Settings::default();
        settings.set(keys::PITCH_SHIFT, "2.0");
        let (mut c, log) = controller(MockPlatform::accepting(1024), &settings);
        log.clear();

        c.apply_change(keys::SAMPLE_RATE, &SettingValue::from("8000"))
            .unwrap();

        assert!(log.parameters().is_empty());
    }

    #[test]
    fn other_keys_never_create_or_release() {
        let (mut c, log) = controller(MockPlatform::accepting(1024), &Settings::default());
        log.clear();

        c.apply_change(keys::BUFFER_SIZE, &SettingValue::Int(8192))
            .unwrap();
        c.apply_change(keys::LIVE_MODE, &SettingValue::Bool(false))
            .unwrap();
        c.apply_change(keys::CORRECTION_STRENGTH, &SettingValue::from("0.5"))
            .unwrap();
        c.apply_change("theme", &SettingValue::from("dark")).unwrap();

        assert_eq!(creations(&log), 0);
        assert_eq!(releases(&log), 0);
    }

    #[test]
    fn pitch_shift_change_pushes_exactly_one_parameter() {
        let (mut c, log) = controller(MockPlatform::accepting(1024), &Settings::default());
        log.clear();

        let outcome = c
            .apply_change(keys::PITCH_SHIFT, &SettingValue::from("3.5"))
            .unwrap();

        assert_eq!(outcome, ChangeOutcome::ParameterPushed(Parameter::PitchShift(3.5)));
        assert_eq!(log.calls(), vec![EngineCall::Set(Parameter::PitchShift(3.5))]);
    }

    #[test]
    fn scalar_reloads_update_the_loaded_configuration() {
        let (mut c, _log) = controller(MockPlatform::accepting(1024), &Settings::default());

        assert_eq!(
            c.apply_change(keys::BUFFER_SIZE, &SettingValue::Int(8192)),
            Ok(ChangeOutcome::BufferSizeReloaded(8192))
        );
        assert_eq!(
            c.apply_change(keys::LIVE_MODE, &SettingValue::Bool(false)),
            Ok(ChangeOutcome::LiveModeReloaded(false))
        );
        assert_eq!(c.buffer_size(), 8192);
        assert!(!c.is_live());
    }

    #[test]
    fn rate_change_after_shutdown_keeps_the_engine_released() {
        let (mut c, log) = controller(MockPlatform::accepting(1024), &Settings::default());
        c.shutdown();
        log.clear();

        assert_eq!(
            c.apply_change(keys::SAMPLE_RATE, &SettingValue::from("8000")),
            Err(ControllerError::Engine(EngineError::Released))
        );
        assert!(log.calls().is_empty());
        assert_eq!(c.sample_rate(), SampleRate::Hz44100);
    }

    #[test]
    fn setting_update_parses_each_kind_of_key() {
        assert_eq!(
            SettingUpdate::parse(keys::SAMPLE_RATE, &SettingValue::from("11025")),
            Ok(SettingUpdate::SampleRate(SampleRate::Hz11025))
        );
        assert_eq!(
            SettingUpdate::parse(keys::BUFFER_SIZE, &SettingValue::Int(2048)),
            Ok(SettingUpdate::BufferSize(2048))
        );
        assert_eq!(
            SettingUpdate::parse(keys::LIVE_MODE, &SettingValue::Bool(false)),
            Ok(SettingUpdate::LiveMode(false))
        );
        assert_eq!(
            SettingUpdate::parse(keys::CORRECTION_MIX, &SettingValue::from("0.25")),
            Ok(SettingUpdate::Parameter(Parameter::Mix(0.25)))
        );
        assert_eq!(
            SettingUpdate::parse("theme", &SettingValue::from("dark")),
            Ok(SettingUpdate::Unrelated)
        );
    }

    #[test]
    fn setting_update_rejects_values_that_would_break_startup() {
        assert!(matches!(
            SettingUpdate::parse(keys::SAMPLE_RATE, &SettingValue::from("48000")),
            Err(ConfigError::UnsupportedSampleRate { hz: 48000, .. })
        ));
        assert!(matches!(
            SettingUpdate::parse(keys::PITCH_SHIFT, &SettingValue::from("abc")),
            Err(ConfigError::MalformedParameterValue { .. })
        ));
        assert!(SettingUpdate::parse(keys::BUFFER_SIZE, &SettingValue::Int(0)).is_err());
    }

    #[test]
    fn unknown_key_is_ignored() {
        let (mut c, log) = controller(MockPlatform::accepting(1024), &Settings::default());
        log.clear();

        let outcome = c
            .apply_change("window_width", &SettingValue::Int(640))
            .unwrap();

        assert_eq!(outcome, ChangeOutcome::Ignored);
        assert!(log.calls().is_empty());
    }

    #[test]
    fn malformed_change_leaves_everything_untouched() {
        let (mut c, log) = controller(MockPlatform::accepting(1024), &Settings::default());
        log.clear();

        let err = c
            .apply_change(keys::PITCH_SHIFT, &SettingValue::from("abc"))
            .unwrap_err();
        assert!(matches!(
            err,
            ControllerError::Config(ConfigError::MalformedParameterValue { .. })
        ));

        assert!(c
            .apply_change(keys::BUFFER_SIZE, &SettingValue::from("huge"))
            .is_err());
        assert!(c
            .apply_change(keys::SAMPLE_RATE, &SettingValue::from("fast"))
            .is_err());

        assert!(log.calls().is_empty());
        assert_eq!(c.buffer_size(), 4096);
        assert_eq!(c.sample_rate(), SampleRate::Hz44100);
    }

    // ── Devices ───────────────────────────────────────────────────────────

    #[test]
    fn validity_check_is_idempotent_and_leaks_nothing() {
        let platform = MockPlatform::accepting(1024);
        let devices = platform.log();
        let (c, _log) = controller(platform, &Settings::default());

        assert!(c.is_capture_device_valid());
        assert!(c.is_capture_device_valid());
        assert_eq!(devices.opened_count(), 2);
        assert_eq!(devices.released_count(), 2);
    }

    #[test]
    fn rejected_configuration_is_reported_invalid() {
        let platform = MockPlatform::rejecting(1024);
        let devices = platform.log();
        let (c, _log) = controller(platform, &Settings::default());

        assert!(!c.is_capture_device_valid());
        assert_eq!(
            c.get_capture_device().err(),
            Some(AudioError::InvalidConfig {
                sample_rate: SampleRate::Hz44100,
                buffer_size: 4096,
            })
        );
        assert_eq!(devices.opened_count(), devices.released_count());
    }

    #[test]
    fn capture_device_uses_the_loaded_configuration() {
        let mut settings = Settings::default();
        settings.set(keys::SAMPLE_RATE, "11025");
        settings.set(keys::BUFFER_SIZE, 1536i64);
        let (c, _log) = controller(MockPlatform::accepting(1024), &settings);

        let device = c.get_capture_device().unwrap();
        assert_eq!(device.kind, DeviceKind::Capture);
        assert_eq!(device.spec.sample_rate, SampleRate::Hz11025);
        assert_eq!(device.spec.buffer_size, 1536);
        device.release();
    }

    #[test]
    fn playback_device_uses_the_platform_minimum() {
        let mut platform = MockPlatform::accepting(1024);
        platform.min_playback_buffer = 3000;
        let (mut c, _log) = controller(platform, &Settings::default());
        c.apply_change(keys::SAMPLE_RATE, &SettingValue::from("8000"))
            .unwrap();

        let device = c.get_playback_device().unwrap();
        assert_eq!(device.kind, DeviceKind::Playback);
        assert_eq!(device.spec.sample_rate, SampleRate::Hz8000);
        assert_eq!(device.spec.buffer_size, 3000);
        device.release();
    }

    // ── Processing ────────────────────────────────────────────────────────

    #[test]
    fn process_forwards_only_the_counted_prefix() {
        let (mut c, log) = controller(MockPlatform::accepting(1024), &Settings::default());
        log.clear();

        let mut samples = [10i16, 20, 30, 40];
        c.process(&mut samples, 3).unwrap();

        assert_eq!(samples, [11, 21, 31, 40]);
        assert_eq!(log.calls(), vec![EngineCall::Process(3)]);
    }

    #[test]
    fn process_rejects_a_count_past_the_slice() {
        let (mut c, log) = controller(MockPlatform::accepting(1024), &Settings::default());
        log.clear();

        let mut samples = [0i16; 4];
        assert_eq!(
            c.process(&mut samples, 5),
            Err(ControllerError::SampleCount { count: 5, len: 4 })
        );
        assert!(log.calls().is_empty());
    }

    #[test]
    fn shutdown_releases_the_engine_once() {
        let (mut c, log) = controller(MockPlatform::accepting(1024), &Settings::default());

        c.shutdown();
        c.shutdown();

        assert_eq!(releases(&log), 1);
        let mut samples = [0i16; 2];
        assert_eq!(
            c.process(&mut samples, 2),
            Err(ControllerError::Engine(EngineError::Released))
        );
        assert_eq!(
            c.apply_change(keys::CORRECTION_MIX, &SettingValue::from("0.5")),
            Err(ControllerError::Engine(EngineError::Released))
        );
    }
}
