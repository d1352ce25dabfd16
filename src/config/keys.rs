//! Setting key names and the value kind stored under each.

/// Capture sample rate in Hz, stored as a string (e.g. `"44100"`).
pub const SAMPLE_RATE: &str = "sample_rate";
/// Capture buffer size in platform units, stored as an integer.
pub const BUFFER_SIZE: &str = "buffer_size";
/// Route capture straight to playback (`true`) or buffer the take (`false`).
pub const LIVE_MODE: &str = "live_mode";

pub const CONCERT_A: &str = "concert_a";
pub const SCALE_ROTATE: &str = "scale_rotate";
pub const FIXED_PITCH: &str = "fixed_pitch";
pub const LFO_DEPTH: &str = "lfo_depth";
pub const LFO_RATE: &str = "lfo_rate";
pub const LFO_SHAPE: &str = "lfo_shape";
pub const LFO_SYMMETRY: &str = "lfo_symmetry";
pub const LFO_QUANTIZATION: &str = "lfo_quantization";
pub const KEY: &str = "key";
pub const PITCH_PULL: &str = "pitch_pull";
pub const PITCH_SHIFT: &str = "pitch_shift";
pub const CORRECTION_STRENGTH: &str = "correction_strength";
pub const CORRECTION_SMOOTHNESS: &str = "correction_smoothness";
pub const FORMANT_CORRECTION: &str = "formant_correction";
pub const FORMANT_WARP: &str = "formant_warp";
pub const CORRECTION_MIX: &str = "correction_mix";

/// How a value is persisted under a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Free text, parsed on read (numbers and single characters).
    Text,
    Integer,
    Flag,
}

/// Every key the pipeline reads, with its stored kind.
pub const ALL: &[(&str, ValueKind)] = &[
    (SAMPLE_RATE, ValueKind::Text),
    (BUFFER_SIZE, ValueKind::Integer),
    (LIVE_MODE, ValueKind::Flag),
    (CONCERT_A, ValueKind::Text),
    (SCALE_ROTATE, ValueKind::Integer),
    (FIXED_PITCH, ValueKind::Text),
    (LFO_DEPTH, ValueKind::Text),
    (LFO_RATE, ValueKind::Text),
    (LFO_SHAPE, ValueKind::Text),
    (LFO_SYMMETRY, ValueKind::Text),
    (LFO_QUANTIZATION, ValueKind::Integer),
    (KEY, ValueKind::Text),
    (PITCH_PULL, ValueKind::Text),
    (PITCH_SHIFT, ValueKind::Text),
    (CORRECTION_STRENGTH, ValueKind::Text),
    (CORRECTION_SMOOTHNESS, ValueKind::Text),
    (FORMANT_CORRECTION, ValueKind::Flag),
    (FORMANT_WARP, ValueKind::Text),
    (CORRECTION_MIX, ValueKind::Text),
];

/// Stored kind for `key`, or `None` for keys the pipeline does not know.
pub fn kind_of(key: &str) -> Option<ValueKind> {
    ALL.iter().find(|(k, _)| *k == key).map(|(_, kind)| *kind)
}
