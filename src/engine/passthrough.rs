//! Built-in engine that leaves audio untouched.
//!
//! Keeps the last value pushed for every parameter so the pipeline can be
//! run and inspected end to end without a correction engine linked in.

use crate::audio::SampleRate;

use super::{EngineFactory, EngineParameters, MusicalKey, Parameter, PitchEngine};

#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughFactory;

impl EngineFactory for PassthroughFactory {
    type Engine = PassthroughEngine;

    fn create(&self, sample_rate: SampleRate) -> PassthroughEngine {
        PassthroughEngine {
            sample_rate,
            params: EngineParameters::default(),
            processed: 0,
        }
    }
}

#[derive(Debug)]
pub struct PassthroughEngine {
    sample_rate: SampleRate,
    params: EngineParameters,
    processed: u64,
}

impl PassthroughEngine {
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    /// Last value received for every parameter.
    pub fn parameters(&self) -> &EngineParameters {
        &self.params
    }

    /// Total samples seen by `process`.
    pub fn processed_samples(&self) -> u64 {
        self.processed
    }
}

impl PitchEngine for PassthroughEngine {
    fn set_concert_a(&mut self, hz: f32) {
        self.params.set(Parameter::ConcertA(hz));
    }
    fn set_scale_rotate(&mut self, steps: i32) {
        self.params.set(Parameter::ScaleRotate(steps));
    }
    fn set_fixed_pitch(&mut self, pitch: f32) {
        self.params.set(Parameter::FixedPitch(pitch));
    }
    fn set_lfo_depth(&mut self, depth: f32) {
        self.params.set(Parameter::LfoDepth(depth));
    }
    fn set_lfo_rate(&mut self, hz: f32) {
        self.params.set(Parameter::LfoRate(hz));
    }
    fn set_lfo_shape(&mut self, shape: f32) {
        self.params.set(Parameter::LfoShape(shape));
    }
    fn set_lfo_symmetry(&mut self, symmetry: f32) {
        self.params.set(Parameter::LfoSymmetry(symmetry));
    }
    fn set_lfo_quantization(&mut self, quantization: i32) {
        self.params.set(Parameter::LfoQuantization(quantization));
    }
    fn set_key(&mut self, key: MusicalKey) {
        self.params.set(Parameter::Key(key));
    }
    fn set_fixed_pull(&mut self, pull: f32) {
        self.params.set(Parameter::FixedPull(pull));
    }
    fn set_pitch_shift(&mut self, semitones: f32) {
        self.params.set(Parameter::PitchShift(semitones));
    }
    fn set_strength(&mut self, strength: f32) {
        self.params.set(Parameter::Strength(strength));
    }
    fn set_smoothness(&mut self, smoothness: f32) {
        self.params.set(Parameter::Smoothness(smoothness));
    }
    fn enable_formant_correction(&mut self, enabled: bool) {
        self.params.set(Parameter::FormantCorrection(enabled));
    }
    fn set_formant_warp(&mut self, warp: f32) {
        self.params.set(Parameter::FormantWarp(warp));
    }
    fn set_mix(&mut self, mix: f32) {
        self.params.set(Parameter::Mix(mix));
    }

    fn process(&mut self, samples: &mut [i16]) {
        self.processed += samples.len() as u64;
    }

    fn release(self) {
        log::debug!(
            "passthrough engine at {} released after {} samples",
            self.sample_rate,
            self.processed
        );
    }
}
