//! Pitch-correction engine seam.
//!
//! # Architecture
//!
//! ```text
//! EngineFactory::create(rate) ──▶ PitchEngine (bound to one sample rate)
//!                                    ▲
//! EngineParameters::apply_to ────────┤  whole set at construction
//! Parameter::apply_to ───────────────┘  one member per settings change
//!
//! EngineSlot  owns the live engine; rebuild = release old, then create new
//! ```
//!
//! The DSP itself is opaque here: anything that implements [`PitchEngine`]
//! can be driven. [`PassthroughEngine`] is the built-in implementation used
//! when no correction engine is linked.

pub mod params;
pub mod passthrough;
pub mod slot;

#[cfg(test)]
pub mod recording;

use thiserror::Error;

use crate::audio::SampleRate;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use params::{EngineParameters, MusicalKey, Parameter};
pub use passthrough::{PassthroughEngine, PassthroughFactory};
pub use slot::EngineSlot;

/// Errors raised by the engine seam.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The engine was released by `shutdown` and has not been rebuilt.
    #[error("engine has been released")]
    Released,
}

/// A real-time pitch-correction engine bound to one sample rate.
///
/// Samples are mono signed 16-bit PCM at the rate the engine was created
/// with; `process` works in place.
pub trait PitchEngine {
    fn set_concert_a(&mut self, hz: f32);
    fn set_scale_rotate(&mut self, steps: i32);
    fn set_fixed_pitch(&mut self, pitch: f32);
    fn set_lfo_depth(&mut self, depth: f32);
    fn set_lfo_rate(&mut self, hz: f32);
    fn set_lfo_shape(&mut self, shape: f32);
    fn set_lfo_symmetry(&mut self, symmetry: f32);
    fn set_lfo_quantization(&mut self, quantization: i32);
    fn set_key(&mut self, key: MusicalKey);
    fn set_fixed_pull(&mut self, pull: f32);
    fn set_pitch_shift(&mut self, semitones: f32);
    fn set_strength(&mut self, strength: f32);
    fn set_smoothness(&mut self, smoothness: f32);
    fn enable_formant_correction(&mut self, enabled: bool);
    fn set_formant_warp(&mut self, warp: f32);
    fn set_mix(&mut self, mix: f32);

    fn process(&mut self, samples: &mut [i16]);

    /// Free the engine's resources. Consumes the engine so it cannot be used
    /// afterwards.
    fn release(self);
}

/// Builds engines bound to a given sample rate.
pub trait EngineFactory {
    type Engine: PitchEngine;

    fn create(&self, sample_rate: SampleRate) -> Self::Engine;
}
