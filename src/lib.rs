//! Vocal pitch-correction pipeline.
//!
//! ```text
//! config      Settings store, keys, TOML persistence, change notifications
//! audio       formats, device seam, cpal backend, capture capability probe
//! engine      PitchEngine seam, parameters, EngineSlot
//! controller  PipelineController: settings → engine, device helpers
//! pipeline    PipelineRunner: audio loop + change listener
//! ```

pub mod audio;
pub mod config;
pub mod controller;
pub mod engine;
pub mod pipeline;
