//! Test double that records every call made on the engines it creates.

use std::sync::{Arc, Mutex};

use crate::audio::SampleRate;

use super::{EngineFactory, MusicalKey, Parameter, PitchEngine};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Created(SampleRate),
    Set(Parameter),
    Process(usize),
    Released(SampleRate),
}

/// Shared, cloneable view of the call log.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<EngineCall>>>);

impl CallLog {
    fn push(&self, call: EngineCall) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    pub fn count(&self, pred: impl Fn(&EngineCall) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    /// Parameters pushed since the log was last cleared, in order.
    pub fn parameters(&self) -> Vec<Parameter> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                EngineCall::Set(p) => Some(p),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct RecordingFactory {
    log: CallLog,
}

impl RecordingFactory {
    pub fn log(&self) -> CallLog {
        self.log.clone()
    }
}

impl EngineFactory for RecordingFactory {
    type Engine = RecordingEngine;

    fn create(&self, sample_rate: SampleRate) -> RecordingEngine {
        self.log.push(EngineCall::Created(sample_rate));
        RecordingEngine {
            sample_rate,
            log: self.log.clone(),
        }
    }
}

/// Records setters and adds one to every processed sample so callers can
/// see the engine ran.
pub struct RecordingEngine {
    sample_rate: SampleRate,
    log: CallLog,
}

impl RecordingEngine {
    fn set(&mut self, param: Parameter) {
        self.log.push(EngineCall::Set(param));
    }
}

impl PitchEngine for RecordingEngine {
    fn set_concert_a(&mut self, hz: f32) {
        self.set(Parameter::ConcertA(hz));
    }
    fn set_scale_rotate(&mut self, steps: i32) {
        self.set(Parameter::ScaleRotate(steps));
    }
    fn set_fixed_pitch(&mut self, pitch: f32) {
        self.set(Parameter::FixedPitch(pitch));
    }
    fn set_lfo_depth(&mut self, depth: f32) {
        self.set(Parameter::LfoDepth(depth));
    }
    fn set_lfo_rate(&mut self, hz: f32) {
        self.set(Parameter::LfoRate(hz));
    }
    fn set_lfo_shape(&mut self, shape: f32) {
        self.set(Parameter::LfoShape(shape));
    }
    fn set_lfo_symmetry(&mut self, symmetry: f32) {
        self.set(Parameter::LfoSymmetry(symmetry));
    }
    fn set_lfo_quantization(&mut self, quantization: i32) {
        self.set(Parameter::LfoQuantization(quantization));
    }
    fn set_key(&mut self, key: MusicalKey) {
        self.set(Parameter::Key(key));
    }
    fn set_fixed_pull(&mut self, pull: f32) {
        self.set(Parameter::FixedPull(pull));
    }
    fn set_pitch_shift(&mut self, semitones: f32) {
        self.set(Parameter::PitchShift(semitones));
    }
    fn set_strength(&mut self, strength: f32) {
        self.set(Parameter::Strength(strength));
    }
    fn set_smoothness(&mut self, smoothness: f32) {
        self.set(Parameter::Smoothness(smoothness));
    }
    fn enable_formant_correction(&mut self, enabled: bool) {
        self.set(Parameter::FormantCorrection(enabled));
    }
    fn set_formant_warp(&mut self, warp: f32) {
        self.set(Parameter::FormantWarp(warp));
    }
    fn set_mix(&mut self, mix: f32) {
        self.set(Parameter::Mix(mix));
    }

    fn process(&mut self, samples: &mut [i16]) {
        self.log.push(EngineCall::Process(samples.len()));
        for s in samples.iter_mut() {
            *s = s.wrapping_add(1);
        }
    }

    fn release(self) {
        self.log.push(EngineCall::Released(self.sample_rate));
    }
}
