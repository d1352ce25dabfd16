//! Pipeline runner: drives audio through the controller and feeds it
//! settings changes.
//!
//! [`PipelineRunner`] shares one [`PipelineController`] between two callers:
//!
//! ```text
//! Settings::subscribe() ──mpsc──▶ spawn_change_listener   (tokio task)
//!                                    └─▶ lock ─▶ apply_change
//!
//! run_audio_loop                                           (blocking thread)
//!   open capture (+ playback when live)
//!   loop:
//!     read block ─▶ lock ─▶ configuration changed? ─▶ release devices, reopen
//!                        └▶ process ─▶ playback / take
//! ```
//!
//! Both paths take the controller lock, so a block is never processed by an
//! engine that is being replaced. A block read under a configuration that has
//! since changed is dropped rather than processed by the new engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::audio::{AudioError, AudioPlatform, CaptureConfig, CaptureDevice, DeviceHandle, PlaybackDevice};
use crate::config::SettingChange;
use crate::controller::{ChangeOutcome, ControllerError, PipelineController};
use crate::engine::EngineFactory;

use super::state::PipelineState;

/// Sleep between reads while the capture device has nothing new.
const IDLE_POLL: Duration = Duration::from_millis(5);

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// A thread panicked while holding the controller.
    #[error("controller lock poisoned")]
    Poisoned,
}

impl PipelineError {
    /// Whether a device refused the loaded sample rate and buffer size.
    pub fn is_invalid_config(&self) -> bool {
        matches!(
            self,
            PipelineError::Controller(ControllerError::Audio(AudioError::InvalidConfig { .. }))
        )
    }
}

impl From<AudioError> for PipelineError {
    fn from(e: AudioError) -> Self {
        PipelineError::Controller(e.into())
    }
}

// ---------------------------------------------------------------------------
// PipelineRunner
// ---------------------------------------------------------------------------

/// Controller shared between the audio loop and the change listener.
pub type SharedController<P, F> = Arc<Mutex<PipelineController<P, F>>>;

pub struct PipelineRunner<P: AudioPlatform, F: EngineFactory> {
    controller: SharedController<P, F>,
    state: Arc<Mutex<PipelineState>>,
}

impl<P: AudioPlatform, F: EngineFactory> Clone for PipelineRunner<P, F> {
    fn clone(&self) -> Self {
        Self {
            controller: Arc::clone(&self.controller),
            state: Arc::clone(&self.state),
        }
    }
}

enum SessionEnd {
    Stopped,
    Reopen,
}

/// Devices opened for one loaded configuration.
struct Session<C, B> {
    capture: C,
    playback: Option<B>,
    config: CaptureConfig,
    live: bool,
}

impl<C: CaptureDevice, B: PlaybackDevice> Session<C, B> {
    fn start(&mut self) -> Result<(), AudioError> {
        self.capture.start()?;
        if let Some(playback) = self.playback.as_mut() {
            playback.start()?;
        }
        Ok(())
    }

    fn release(self) {
        self.capture.release();
        if let Some(playback) = self.playback {
            playback.release();
        }
    }
}

impl<P: AudioPlatform, F: EngineFactory> PipelineRunner<P, F> {
    pub fn new(controller: PipelineController<P, F>) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
            state: Arc::new(Mutex::new(PipelineState::Idle)),
        }
    }

    pub fn controller(&self) -> SharedController<P, F> {
        Arc::clone(&self.controller)
    }

    pub fn state(&self) -> PipelineState {
        self.state.lock().map_or(PipelineState::Error, |s| *s)
    }

    fn set_state(&self, state: PipelineState) {
        if let Ok(mut guard) = self.state.lock() {
            *guard = state;
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, PipelineController<P, F>>, PipelineError> {
        self.controller.lock().map_err(|_| PipelineError::Poisoned)
    }

    // -----------------------------------------------------------------------
    // Settings changes
    // -----------------------------------------------------------------------

    /// Apply every [`SettingChange`] received on `rx` until the sender side
    /// is dropped.
    ///
    /// A change that fails to parse is logged and skipped; the engine keeps
    /// the previous value and the listener moves on to the next change.
    pub fn spawn_change_listener(
        &self,
        mut rx: mpsc::UnboundedReceiver<SettingChange>,
    ) -> JoinHandle<()>
    where
        P: Send + 'static,
        F: Send + 'static,
        F::Engine: Send,
    {
        let controller = Arc::clone(&self.controller);
        tokio::spawn(async move {
            while let Some(change) = rx.recv().await {
                let result = match controller.lock() {
                    Ok(mut c) => c.apply_change(&change.key, &change.value),
                    Err(_) => {
                        log::error!("pipeline: controller lock poisoned; listener stopping");
                        break;
                    }
                };
                match result {
                    Ok(ChangeOutcome::Ignored) => {
                        log::debug!("pipeline: `{}` does not affect the pipeline", change.key)
                    }
                    Ok(outcome) => log::info!("pipeline: `{}` applied: {outcome:?}", change.key),
                    Err(e) => log::warn!("pipeline: change to `{}` rejected: {e}", change.key),
                }
            }
            log::debug!("pipeline: settings channel closed");
        })
    }

    // -----------------------------------------------------------------------
    // Audio loop
    // -----------------------------------------------------------------------

    /// Capture, process and route audio until `stop` is raised.
    ///
    /// In live mode every processed block goes straight to playback and the
    /// returned take is empty. In buffered mode the processed blocks are
    /// appended to the take instead. Devices are reopened whenever the
    /// loaded sample rate, buffer size or mode changes.
    ///
    /// Blocks the calling thread; run it under `spawn_blocking` or on a
    /// dedicated thread.
    pub fn run_audio_loop(&self, stop: &AtomicBool) -> Result<Vec<i16>, PipelineError> {
        let result = self.audio_loop(stop);
        match &result {
            Ok(take) => {
                log::info!("pipeline: stopped with {} buffered samples", take.len());
                self.set_state(PipelineState::Stopped);
            }
            Err(e) => {
                log::error!("pipeline: audio loop failed: {e}");
                self.set_state(PipelineState::Error);
            }
        }
        result
    }

    fn audio_loop(&self, stop: &AtomicBool) -> Result<Vec<i16>, PipelineError> {
        let mut take = Vec::new();
        while !stop.load(Ordering::Relaxed) {
            let mut session = self.open_session()?;
            self.set_state(PipelineState::Running);

            let end = self.pump(&mut session, stop, &mut take);
            session.release();

            match end? {
                SessionEnd::Stopped => break,
                SessionEnd::Reopen => {
                    self.set_state(PipelineState::Reopening);
                    log::info!("pipeline: configuration changed, reopening devices");
                }
            }
        }
        Ok(take)
    }

    fn open_session(&self) -> Result<Session<P::Capture, P::Playback>, PipelineError> {
        let c = self.lock()?;
        let config = c.capture_config();
        let live = c.is_live();

        let capture = c.get_capture_device()?;
        let playback = if live {
            match c.get_playback_device() {
                Ok(playback) => Some(playback),
                Err(e) => {
                    capture.release();
                    return Err(e.into());
                }
            }
        } else {
            None
        };
        drop(c);

        let mut session = Session {
            capture,
            playback,
            config,
            live,
        };
        if let Err(e) = session.start() {
            session.release();
            return Err(e.into());
        }

        log::info!(
            "pipeline: capturing at {} with buffer {} ({})",
            config.sample_rate,
            config.buffer_size,
            if live { "live" } else { "buffered" }
        );
        Ok(session)
    }

    fn pump(
        &self,
        session: &mut Session<P::Capture, P::Playback>,
        stop: &AtomicBool,
        take: &mut Vec<i16>,
    ) -> Result<SessionEnd, PipelineError> {
        let mut block = vec![0i16; session.config.buffer_size];
        loop {
            if stop.load(Ordering::Relaxed) {
                return Ok(SessionEnd::Stopped);
            }

            let n = session.capture.read(&mut block);
            let mut c = self.lock()?;
            if c.capture_config() != session.config || c.is_live() != session.live {
                return Ok(SessionEnd::Reopen);
            }
            if n == 0 {
                drop(c);
                std::thread::sleep(IDLE_POLL);
                continue;
            }
            c.process(&mut block, n)?;
            drop(c);

            match session.playback.as_mut() {
                Some(playback) => {
                    playback.write(&block[..n]);
                }
                None => take.extend_from_slice(&block[..n]),
            }
        }
    }
}
