//! In-memory [`AudioPlatform`] used by unit tests.
//!
//! Every construction and release is appended to a shared log so tests can
//! assert on the exact probe order and on handle leaks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::device::{
    AudioError, AudioPlatform, CaptureDevice, DeviceHandle, DeviceSpec, DeviceState,
    PlaybackDevice,
};
use super::format::{ChannelConfig, SampleFormat, SampleRate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Capture,
    Playback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Opened {
        kind: DeviceKind,
        spec: DeviceSpec,
        state: DeviceState,
    },
    Released {
        kind: DeviceKind,
        spec: DeviceSpec,
    },
    /// Samples handed to a playback handle's `write`.
    Written(Vec<i16>),
}

type Accept = dyn Fn(&DeviceSpec) -> bool + Send + Sync;
type ReadHook = dyn Fn() + Send + Sync;

/// Shared, cloneable view of every construction and release.
#[derive(Debug, Clone, Default)]
pub struct DeviceLog(Arc<Mutex<Vec<DeviceEvent>>>);

impl DeviceLog {
    fn push(&self, event: DeviceEvent) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<DeviceEvent> {
        self.0.lock().unwrap().clone()
    }

    /// Specs of every capture construction, in order.
    pub fn capture_attempts(&self) -> Vec<DeviceSpec> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DeviceEvent::Opened {
                    kind: DeviceKind::Capture,
                    spec,
                    ..
                } => Some(spec),
                _ => None,
            })
            .collect()
    }

    pub fn opened_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, DeviceEvent::Opened { .. }))
            .count()
    }

    pub fn released_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, DeviceEvent::Released { .. }))
            .count()
    }

    /// Every sample written to playback, concatenated.
    pub fn played(&self) -> Vec<i16> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                DeviceEvent::Written(samples) => Some(samples),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

pub struct MockPlatform {
    pub min_buffer: usize,
    pub min_playback_buffer: usize,
    accept_capture: Box<Accept>,
    accept_playback: Box<Accept>,
    log: DeviceLog,
    /// Samples handed out by every capture handle's `read`.
    pub capture_samples: Vec<i16>,
    drained: Option<Arc<AtomicBool>>,
    on_read: Option<Arc<ReadHook>>,
}

impl MockPlatform {
    /// A platform that accepts every spec.
    pub fn accepting(min_buffer: usize) -> Self {
        Self::with_capture_rule(min_buffer, |_| true)
    }

    /// A platform that rejects every spec.
    pub fn rejecting(min_buffer: usize) -> Self {
        let mut platform = Self::with_capture_rule(min_buffer, |_| false);
        platform.accept_playback = Box::new(|_| false);
        platform
    }

    pub fn with_capture_rule(
        min_buffer: usize,
        rule: impl Fn(&DeviceSpec) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            min_buffer,
            min_playback_buffer: min_buffer,
            accept_capture: Box::new(rule),
            accept_playback: Box::new(|_| true),
            log: DeviceLog::default(),
            capture_samples: Vec::new(),
            drained: None,
            on_read: None,
        }
    }

    /// Keep the capture rule but refuse every playback spec.
    pub fn rejecting_playback(mut self) -> Self {
        self.accept_playback = Box::new(|_| false);
        self
    }

    /// Raise `flag` whenever a capture handle is read with nothing left.
    pub fn stop_when_drained(mut self, flag: Arc<AtomicBool>) -> Self {
        self.drained = Some(flag);
        self
    }

    /// Call `hook` at the start of every capture `read`.
    pub fn on_read(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_read = Some(Arc::new(hook));
        self
    }

    pub fn log(&self) -> DeviceLog {
        self.log.clone()
    }

    pub fn events(&self) -> Vec<DeviceEvent> {
        self.log.events()
    }

    pub fn capture_attempts(&self) -> Vec<DeviceSpec> {
        self.log.capture_attempts()
    }

    pub fn opened_count(&self) -> usize {
        self.log.opened_count()
    }

    pub fn released_count(&self) -> usize {
        self.log.released_count()
    }

    fn open(&self, kind: DeviceKind, spec: &DeviceSpec, accepted: bool) -> MockDevice {
        let state = if accepted {
            DeviceState::Ready
        } else {
            DeviceState::Failed
        };
        self.log.push(DeviceEvent::Opened {
            kind,
            spec: *spec,
            state,
        });
        MockDevice {
            kind,
            spec: *spec,
            state,
            log: self.log.clone(),
            pending: self.capture_samples.clone(),
            drained: self.drained.clone(),
            on_read: self.on_read.clone(),
        }
    }
}

impl AudioPlatform for MockPlatform {
    type Capture = MockDevice;
    type Playback = MockDevice;

    fn min_capture_buffer_size(
        &self,
        _sample_rate: SampleRate,
        _channel_config: ChannelConfig,
        _sample_format: SampleFormat,
    ) -> Result<usize, AudioError> {
        Ok(self.min_buffer)
    }

    fn min_playback_buffer_size(
        &self,
        _sample_rate: SampleRate,
        _channel_config: ChannelConfig,
        _sample_format: SampleFormat,
    ) -> Result<usize, AudioError> {
        Ok(self.min_playback_buffer)
    }

    fn open_capture(&self, spec: &DeviceSpec) -> MockDevice {
        let accepted = (self.accept_capture)(spec);
        self.open(DeviceKind::Capture, spec, accepted)
    }

    fn open_playback(&self, spec: &DeviceSpec) -> MockDevice {
        let accepted = (self.accept_playback)(spec);
        self.open(DeviceKind::Playback, spec, accepted)
    }
}

pub struct MockDevice {
    pub kind: DeviceKind,
    pub spec: DeviceSpec,
    state: DeviceState,
    log: DeviceLog,
    pending: Vec<i16>,
    drained: Option<Arc<AtomicBool>>,
    on_read: Option<Arc<ReadHook>>,
}

impl DeviceHandle for MockDevice {
    fn state(&self) -> DeviceState {
        self.state
    }

    fn release(self) {
        self.log.push(DeviceEvent::Released {
            kind: self.kind,
            spec: self.spec,
        });
    }
}

impl CaptureDevice for MockDevice {
    fn read(&mut self, buf: &mut [i16]) -> usize {
        if let Some(hook) = &self.on_read {
            hook();
        }
        if self.pending.is_empty() {
            if let Some(flag) = &self.drained {
                flag.store(true, Ordering::Relaxed);
            }
            return 0;
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        n
    }
}

impl PlaybackDevice for MockDevice {
    fn write(&mut self, samples: &[i16]) -> usize {
        self.log.push(DeviceEvent::Written(samples.to_vec()));
        samples.len()
    }
}
