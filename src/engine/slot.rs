//! Ownership of the one live engine.
//!
//! An engine is tied to the sample rate it was created with, so a rate change
//! means replacing it wholesale. [`EngineSlot::rebuild`] always releases the
//! old engine before asking the factory for the new one, and nothing outside
//! the slot can hold on to a released engine.

use crate::audio::SampleRate;

use super::{EngineError, EngineFactory, PitchEngine};

pub struct EngineSlot<F: EngineFactory> {
    factory: F,
    live: Option<F::Engine>,
    sample_rate: SampleRate,
}

impl<F: EngineFactory> EngineSlot<F> {
    /// Create the first engine at `sample_rate`.
    pub fn new(factory: F, sample_rate: SampleRate) -> Self {
        let engine = factory.create(sample_rate);
        log::debug!("engine: created at {sample_rate}");
        Self {
            factory,
            live: Some(engine),
            sample_rate,
        }
    }

    /// Rate the current (or last) engine was bound to.
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    pub fn engine_mut(&mut self) -> Result<&mut F::Engine, EngineError> {
        self.live.as_mut().ok_or(EngineError::Released)
    }

    /// Release the current engine, then create a new one at `sample_rate`.
    ///
    /// The new engine starts from the factory's own defaults; no parameter of
    /// the old engine is carried over.
    pub fn rebuild(&mut self, sample_rate: SampleRate) {
        self.release_live();
        self.live = Some(self.factory.create(sample_rate));
        self.sample_rate = sample_rate;
        log::info!("engine: rebuilt at {sample_rate}");
    }

    /// Release the live engine. Later `engine_mut` calls return
    /// [`EngineError::Released`] until the next [`rebuild`](Self::rebuild).
    pub fn shutdown(&mut self) {
        if self.release_live() {
            log::debug!("engine: released");
        }
    }

    fn release_live(&mut self) -> bool {
        match self.live.take() {
            Some(engine) => {
                engine.release();
                true
            }
            None => false,
        }
    }
}

impl<F: EngineFactory> Drop for EngineSlot<F> {
    fn drop(&mut self) {
        if self.release_live() {
            log::warn!("engine: slot dropped without shutdown; released engine");
        }
    }
}
