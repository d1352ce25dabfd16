//! Tunable engine parameters, their declared defaults and their source keys.

use std::fmt;

use crate::config::settings::malformed;
use crate::config::{keys, ConfigError, SettingValue, Settings};

use super::PitchEngine;

// ---------------------------------------------------------------------------
// MusicalKey
// ---------------------------------------------------------------------------

/// Key the correction snaps to, identified by a single ASCII letter
/// (e.g. `'C'`, `'a'`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MusicalKey(char);

impl MusicalKey {
    pub fn new(c: char) -> Option<Self> {
        c.is_ascii_alphabetic().then_some(Self(c))
    }

    pub fn as_char(self) -> char {
        self.0
    }
}

impl Default for MusicalKey {
    fn default() -> Self {
        Self('C')
    }
}

impl fmt::Display for MusicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Parameter
// ---------------------------------------------------------------------------

/// One engine parameter with its value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Parameter {
    ConcertA(f32),
    ScaleRotate(i32),
    FixedPitch(f32),
    LfoDepth(f32),
    LfoRate(f32),
    LfoShape(f32),
    LfoSymmetry(f32),
    LfoQuantization(i32),
    Key(MusicalKey),
    FixedPull(f32),
    PitchShift(f32),
    Strength(f32),
    Smoothness(f32),
    FormantCorrection(bool),
    FormantWarp(f32),
    Mix(f32),
}

impl Parameter {
    /// Setting key this parameter is read from.
    pub fn setting_key(&self) -> &'static str {
        match self {
            Parameter::ConcertA(_) => keys::CONCERT_A,
            Parameter::ScaleRotate(_) => keys::SCALE_ROTATE,
            Parameter::FixedPitch(_) => keys::FIXED_PITCH,
            Parameter::LfoDepth(_) => keys::LFO_DEPTH,
            Parameter::LfoRate(_) => keys::LFO_RATE,
            Parameter::LfoShape(_) => keys::LFO_SHAPE,
            Parameter::LfoSymmetry(_) => keys::LFO_SYMMETRY,
            Parameter::LfoQuantization(_) => keys::LFO_QUANTIZATION,
            Parameter::Key(_) => keys::KEY,
            Parameter::FixedPull(_) => keys::PITCH_PULL,
            Parameter::PitchShift(_) => keys::PITCH_SHIFT,
            Parameter::Strength(_) => keys::CORRECTION_STRENGTH,
            Parameter::Smoothness(_) => keys::CORRECTION_SMOOTHNESS,
            Parameter::FormantCorrection(_) => keys::FORMANT_CORRECTION,
            Parameter::FormantWarp(_) => keys::FORMANT_WARP,
            Parameter::Mix(_) => keys::CORRECTION_MIX,
        }
    }

    /// Parse `value` as the parameter stored under `key`.
    ///
    /// Returns `Ok(None)` when `key` is not an engine parameter.
    pub fn parse(key: &str, value: &SettingValue) -> Result<Option<Parameter>, ConfigError> {
        let param = match key {
            keys::CONCERT_A => Parameter::ConcertA(value.as_float(key)?),
            keys::SCALE_ROTATE => Parameter::ScaleRotate(as_i32(key, value)?),
            keys::FIXED_PITCH => Parameter::FixedPitch(value.as_float(key)?),
            keys::LFO_DEPTH => Parameter::LfoDepth(value.as_float(key)?),
            keys::LFO_RATE => Parameter::LfoRate(value.as_float(key)?),
            keys::LFO_SHAPE => Parameter::LfoShape(value.as_float(key)?),
            keys::LFO_SYMMETRY => Parameter::LfoSymmetry(value.as_float(key)?),
            keys::LFO_QUANTIZATION => Parameter::LfoQuantization(as_i32(key, value)?),
            keys::KEY => Parameter::Key(as_musical_key(key, value.as_char(key)?)?),
            keys::PITCH_PULL => Parameter::FixedPull(value.as_float(key)?),
            keys::PITCH_SHIFT => Parameter::PitchShift(value.as_float(key)?),
            keys::CORRECTION_STRENGTH => Parameter::Strength(value.as_float(key)?),
            keys::CORRECTION_SMOOTHNESS => Parameter::Smoothness(value.as_float(key)?),
            keys::FORMANT_CORRECTION => Parameter::FormantCorrection(value.as_bool(key)?),
            keys::FORMANT_WARP => Parameter::FormantWarp(value.as_float(key)?),
            keys::CORRECTION_MIX => Parameter::Mix(value.as_float(key)?),
            _ => return Ok(None),
        };
        Ok(Some(param))
    }

    /// Push this one value into `engine`.
    pub fn apply_to<E: PitchEngine + ?Sized>(self, engine: &mut E) {
        match self {
            Parameter::ConcertA(v) => engine.set_concert_a(v),
            Parameter::ScaleRotate(v) => engine.set_scale_rotate(v),
            Parameter::FixedPitch(v) => engine.set_fixed_pitch(v),
            Parameter::LfoDepth(v) => engine.set_lfo_depth(v),
            Parameter::LfoRate(v) => engine.set_lfo_rate(v),
            Parameter::LfoShape(v) => engine.set_lfo_shape(v),
            Parameter::LfoSymmetry(v) => engine.set_lfo_symmetry(v),
            Parameter::LfoQuantization(v) => engine.set_lfo_quantization(v),
            Parameter::Key(v) => engine.set_key(v),
            Parameter::FixedPull(v) => engine.set_fixed_pull(v),
            Parameter::PitchShift(v) => engine.set_pitch_shift(v),
            Parameter::Strength(v) => engine.set_strength(v),
            Parameter::Smoothness(v) => engine.set_smoothness(v),
            Parameter::FormantCorrection(v) => engine.enable_formant_correction(v),
            Parameter::FormantWarp(v) => engine.set_formant_warp(v),
            Parameter::Mix(v) => engine.set_mix(v),
        }
    }
}

/// Renders as `key = value`, e.g. `pitch_shift = 3.5`.
impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = ", self.setting_key())?;
        match *self {
            Parameter::ScaleRotate(v) | Parameter::LfoQuantization(v) => write!(f, "{v}"),
            Parameter::Key(k) => write!(f, "{k}"),
            Parameter::FormantCorrection(b) => write!(f, "{b}"),
            Parameter::ConcertA(v)
            | Parameter::FixedPitch(v)
            | Parameter::LfoDepth(v)
            | Parameter::LfoRate(v)
            | Parameter::LfoShape(v)
            | Parameter::LfoSymmetry(v)
            | Parameter::FixedPull(v)
            | Parameter::PitchShift(v)
            | Parameter::Strength(v)
            | Parameter::Smoothness(v)
            | Parameter::FormantWarp(v)
            | Parameter::Mix(v) => write!(f, "{v}"),
        }
    }
}

fn as_i32(key: &str, value: &SettingValue) -> Result<i32, ConfigError> {
    let n = value.as_int(key)?;
    i32::try_from(n).map_err(|_| malformed(key, n, "32-bit integer"))
}

fn as_musical_key(key: &str, c: char) -> Result<MusicalKey, ConfigError> {
    MusicalKey::new(c).ok_or_else(|| malformed(key, c, "musical key"))
}

// ---------------------------------------------------------------------------
// EngineParameters
// ---------------------------------------------------------------------------

/// The full parameter set pushed into a freshly constructed engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineParameters {
    /// Reference pitch of A4 in Hz.
    pub concert_a: f32,
    pub scale_rotate: i32,
    pub fixed_pitch: f32,
    pub lfo_depth: f32,
    /// LFO rate in Hz.
    pub lfo_rate: f32,
    pub lfo_shape: f32,
    pub lfo_symmetry: f32,
    pub lfo_quantization: i32,
    pub key: MusicalKey,
    pub fixed_pull: f32,
    /// Pitch shift in semitones.
    pub pitch_shift: f32,
    pub strength: f32,
    pub smoothness: f32,
    pub formant_correction: bool,
    pub formant_warp: f32,
    /// Dry/wet mix, 1.0 = fully corrected.
    pub mix: f32,
}

impl Default for EngineParameters {
    fn default() -> Self {
        Self {
            concert_a: 440.0,
            scale_rotate: 0,
            fixed_pitch: 0.0,
            lfo_depth: 0.0,
            lfo_rate: 5.0,
            lfo_shape: 0.0,
            lfo_symmetry: 0.0,
            lfo_quantization: 0,
            key: MusicalKey::default(),
            fixed_pull: 0.0,
            pitch_shift: 0.0,
            strength: 1.0,
            smoothness: 0.0,
            formant_correction: false,
            formant_warp: 0.0,
            mix: 1.0,
        }
    }
}

impl EngineParameters {
    /// Read every parameter from `settings`, using the declared default for
    /// absent keys.
    ///
    /// # Errors
    ///
    /// The first [`ConfigError`] met; nothing is substituted for a malformed
    /// value.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let d = Self::default();
        let key = settings.get_char(keys::KEY, d.key.as_char())?;

        Ok(Self {
            concert_a: settings.get_float(keys::CONCERT_A, d.concert_a)?,
            scale_rotate: read_i32(settings, keys::SCALE_ROTATE, d.scale_rotate)?,
            fixed_pitch: settings.get_float(keys::FIXED_PITCH, d.fixed_pitch)?,
            lfo_depth: settings.get_float(keys::LFO_DEPTH, d.lfo_depth)?,
            lfo_rate: settings.get_float(keys::LFO_RATE, d.lfo_rate)?,
            lfo_shape: settings.get_float(keys::LFO_SHAPE, d.lfo_shape)?,
            lfo_symmetry: settings.get_float(keys::LFO_SYMMETRY, d.lfo_symmetry)?,
            lfo_quantization: read_i32(settings, keys::LFO_QUANTIZATION, d.lfo_quantization)?,
            key: as_musical_key(keys::KEY, key)?,
            fixed_pull: settings.get_float(keys::PITCH_PULL, d.fixed_pull)?,
            pitch_shift: settings.get_float(keys::PITCH_SHIFT, d.pitch_shift)?,
            strength: settings.get_float(keys::CORRECTION_STRENGTH, d.strength)?,
            smoothness: settings.get_float(keys::CORRECTION_SMOOTHNESS, d.smoothness)?,
            formant_correction: settings.get_bool(keys::FORMANT_CORRECTION, d.formant_correction)?,
            formant_warp: settings.get_float(keys::FORMANT_WARP, d.formant_warp)?,
            mix: settings.get_float(keys::CORRECTION_MIX, d.mix)?,
        })
    }

    /// Every member as a [`Parameter`].
    pub fn to_parameters(&self) -> [Parameter; 16] {
        [
            Parameter::ConcertA(self.concert_a),
            Parameter::ScaleRotate(self.scale_rotate),
            Parameter::FixedPitch(self.fixed_pitch),
            Parameter::LfoDepth(self.lfo_depth),
            Parameter::LfoRate(self.lfo_rate),
            Parameter::LfoShape(self.lfo_shape),
            Parameter::LfoSymmetry(self.lfo_symmetry),
            Parameter::LfoQuantization(self.lfo_quantization),
            Parameter::Key(self.key),
            Parameter::FixedPull(self.fixed_pull),
            Parameter::PitchShift(self.pitch_shift),
            Parameter::Strength(self.strength),
            Parameter::Smoothness(self.smoothness),
            Parameter::FormantCorrection(self.formant_correction),
            Parameter::FormantWarp(self.formant_warp),
            Parameter::Mix(self.mix),
        ]
    }

    /// Overwrite the member `param` refers to.
    pub fn set(&mut self, param: Parameter) {
        match param {
            Parameter::ConcertA(v) => self.concert_a = v,
            Parameter::ScaleRotate(v) => self.scale_rotate = v,
            Parameter::FixedPitch(v) => self.fixed_pitch = v,
            Parameter::LfoDepth(v) => self.lfo_depth = v,
            Parameter::LfoRate(v) => self.lfo_rate = v,
            Parameter::LfoShape(v) => self.lfo_shape = v,
            Parameter::LfoSymmetry(v) => self.lfo_symmetry = v,
            Parameter::LfoQuantization(v) => self.lfo_quantization = v,
            Parameter::Key(v) => self.key = v,
            Parameter::FixedPull(v) => self.fixed_pull = v,
            Parameter::PitchShift(v) => self.pitch_shift = v,
            Parameter::Strength(v) => self.strength = v,
            Parameter::Smoothness(v) => self.smoothness = v,
            Parameter::FormantCorrection(v) => self.formant_correction = v,
            Parameter::FormantWarp(v) => self.formant_warp = v,
            Parameter::Mix(v) => self.mix = v,
        }
    }

    /// Push the whole set into `engine`.
    pub fn apply_to<E: PitchEngine + ?Sized>(&self, engine: &mut E) {
        for param in self.to_parameters() {
            param.apply_to(engine);
        }
    }
}

fn read_i32(settings: &Settings, key: &str, default: i32) -> Result<i32, ConfigError> {
    match settings.get(key) {
        Some(value) => as_i32(key, value),
        None => Ok(default),
    }
}
