//! Key/value settings store with typed accessors, change notifications and
//! TOML persistence.
//!
//! Values are stored the way a preferences store keeps them (strings,
//! integers and booleans) and parsed on read. All parsing goes through
//! [`SettingValue`]'s `as_*` methods so a malformed value fails the same way
//! whether it is read at load time or delivered by a change notification.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::audio::SampleRate;

use super::keys::{self, ValueKind};
use super::AppPaths;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// A stored value could not be turned into the type its key requires.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("malformed value for `{key}`: {value:?} is not a valid {expected}")]
    MalformedParameterValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("unsupported sample rate for `{key}`: {hz} Hz")]
    UnsupportedSampleRate { key: String, hz: u32 },
}

pub(crate) fn malformed(key: &str, value: impl fmt::Display, expected: &'static str) -> ConfigError {
    ConfigError::MalformedParameterValue {
        key: key.to_string(),
        value: value.to_string(),
        expected,
    }
}

// ---------------------------------------------------------------------------
// SettingValue
// ---------------------------------------------------------------------------

/// A single stored value.
///
/// Hand-edited files may also contain TOML floats, which read back as
/// [`SettingValue::Float`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl SettingValue {
    /// Convert raw user input (CLI, stdin) into the kind stored under `key`.
    /// Unknown keys are kept as text.
    pub fn from_input(key: &str, raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        match keys::kind_of(key) {
            Some(ValueKind::Integer) => trimmed
                .parse::<i64>()
                .map(SettingValue::Int)
                .map_err(|_| malformed(key, raw, "integer")),
            Some(ValueKind::Flag) => trimmed
                .parse::<bool>()
                .map(SettingValue::Bool)
                .map_err(|_| malformed(key, raw, "boolean")),
            Some(ValueKind::Text) | None => Ok(SettingValue::Str(trimmed.to_string())),
        }
    }

    pub fn as_float(&self, key: &str) -> Result<f32, ConfigError> {
        match self {
            SettingValue::Str(s) => s.trim().parse::<f32>().map_err(|_| malformed(key, s, "number")),
            SettingValue::Float(f) => Ok(*f as f32),
            SettingValue::Int(n) => Ok(*n as f32),
            SettingValue::Bool(b) => Err(malformed(key, b, "number")),
        }
    }

    pub fn as_int(&self, key: &str) -> Result<i64, ConfigError> {
        match self {
            SettingValue::Int(n) => Ok(*n),
            SettingValue::Str(s) => s.trim().parse::<i64>().map_err(|_| malformed(key, s, "integer")),
            SettingValue::Float(f) => Err(malformed(key, f, "integer")),
            SettingValue::Bool(b) => Err(malformed(key, b, "integer")),
        }
    }

    /// A strictly positive integer, e.g. a buffer size.
    pub fn as_count(&self, key: &str) -> Result<usize, ConfigError> {
        let n = self.as_int(key)?;
        usize::try_from(n)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| malformed(key, n, "positive integer"))
    }

    pub fn as_bool(&self, key: &str) -> Result<bool, ConfigError> {
        match self {
            SettingValue::Bool(b) => Ok(*b),
            SettingValue::Str(s) => s.trim().parse::<bool>().map_err(|_| malformed(key, s, "boolean")),
            SettingValue::Int(n) => Err(malformed(key, n, "boolean")),
            SettingValue::Float(f) => Err(malformed(key, f, "boolean")),
        }
    }

    /// First character of a text value.
    pub fn as_char(&self, key: &str) -> Result<char, ConfigError> {
        match self {
            SettingValue::Str(s) => s.chars().next().ok_or_else(|| malformed(key, s, "character")),
            other => Err(malformed(key, other, "character")),
        }
    }

    pub fn as_sample_rate(&self, key: &str) -> Result<SampleRate, ConfigError> {
        let hz = self.as_int(key)?;
        let hz = u32::try_from(hz).map_err(|_| malformed(key, hz, "sample rate"))?;
        SampleRate::try_from(hz).map_err(|hz| ConfigError::UnsupportedSampleRate {
            key: key.to_string(),
            hz,
        })
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{b}"),
            SettingValue::Int(n) => write!(f, "{n}"),
            SettingValue::Float(x) => write!(f, "{x}"),
            SettingValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for SettingValue {
    fn from(s: &str) -> Self {
        SettingValue::Str(s.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(s: String) -> Self {
        SettingValue::Str(s)
    }
}

impl From<i64> for SettingValue {
    fn from(n: i64) -> Self {
        SettingValue::Int(n)
    }
}

impl From<bool> for SettingValue {
    fn from(b: bool) -> Self {
        SettingValue::Bool(b)
    }
}

// ---------------------------------------------------------------------------
// SettingChange
// ---------------------------------------------------------------------------

/// Delivered to subscribers once per key whose value changed.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingChange {
    pub key: String,
    pub value: SettingValue,
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// The settings store, serialised as a flat `settings.toml` table.
///
/// # Persistence
///
/// ```rust,no_run
/// use vocal_tune::config::{keys, Settings};
///
/// // Load (returns an empty store when the file is missing)
/// let mut settings = Settings::load().unwrap();
/// let shift = settings.get_float(keys::PITCH_SHIFT, 0.0).unwrap();
///
/// settings.set(keys::PITCH_SHIFT, "2.0");
/// // settings.save().unwrap();
/// # let _ = shift;
/// ```
#[derive(Debug, Default)]
pub struct Settings {
    values: BTreeMap<String, SettingValue>,
    subscribers: Vec<mpsc::UnboundedSender<SettingChange>>,
}

impl Settings {
    /// Load from the platform-appropriate `settings.toml`.
    ///
    /// Returns an empty store when the file does not exist yet, so every
    /// reader falls back to its declared default.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let values: BTreeMap<String, SettingValue> = toml::from_str(&content)?;
        Ok(Self {
            values,
            subscribers: Vec::new(),
        })
    }

    /// Save to the platform-appropriate `settings.toml`, creating parent
    /// directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(&self.values)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get_str(&self, key: &str, default: &str) -> String {
        self.values
            .get(key)
            .map_or_else(|| default.to_string(), |v| v.to_string())
    }

    pub fn get_float(&self, key: &str, default: f32) -> Result<f32, ConfigError> {
        self.values.get(key).map_or(Ok(default), |v| v.as_float(key))
    }

    pub fn get_int(&self, key: &str, default: i64) -> Result<i64, ConfigError> {
        self.values.get(key).map_or(Ok(default), |v| v.as_int(key))
    }

    pub fn get_count(&self, key: &str, default: usize) -> Result<usize, ConfigError> {
        self.values.get(key).map_or(Ok(default), |v| v.as_count(key))
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        self.values.get(key).map_or(Ok(default), |v| v.as_bool(key))
    }

    pub fn get_char(&self, key: &str, default: char) -> Result<char, ConfigError> {
        self.values.get(key).map_or(Ok(default), |v| v.as_char(key))
    }

    pub fn get_sample_rate(&self, key: &str, default: SampleRate) -> Result<SampleRate, ConfigError> {
        self.values
            .get(key)
            .map_or(Ok(default), |v| v.as_sample_rate(key))
    }

    // -----------------------------------------------------------------------
    // Writes / notifications
    // -----------------------------------------------------------------------

    /// Register for change notifications. Each changed key is delivered once;
    /// writes that store an identical value are not reported.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SettingChange> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn set(&mut self, key: &str, value: impl Into<SettingValue>) {
        self.set_many([(key, value.into())]);
    }

    /// Commit every entry first, then notify once per changed key in the
    /// order given.
    pub fn set_many<'k>(&mut self, entries: impl IntoIterator<Item = (&'k str, SettingValue)>) {
        let mut changed = Vec::new();
        for (key, value) in entries {
            if self.values.get(key) == Some(&value) {
                continue;
            }
            self.values.insert(key.to_string(), value.clone());
            changed.push(SettingChange {
                key: key.to_string(),
                value,
            });
        }

        for change in changed {
            log::debug!("settings: {} = {}", change.key, change.value);
            self.subscribers
                .retain(|tx| tx.send(change.clone()).is_ok());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
