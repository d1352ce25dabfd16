//! Configuration module.
//!
//! Provides the [`Settings`] key/value store (typed accessors, change
//! notifications, TOML persistence), the setting key names in [`keys`], and
//! [`AppPaths`] for the platform config directory.

pub mod keys;
pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{ConfigError, SettingChange, SettingValue, Settings};
