//! Runs the controller against live audio.
//!
//! # Architecture
//!
//! ```text
//! Settings::set ──SettingChange (mpsc)──▶ change listener (tokio task)
//!                                              │
//!                                              ▼
//!                             Arc<Mutex<PipelineController>>
//!                                              ▲
//!                                              │
//! capture device ──▶ run_audio_loop (blocking) ─┴─▶ playback device | take
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::atomic::AtomicBool;
//! use vocal_tune::audio::CpalPlatform;
//! use vocal_tune::config::Settings;
//! use vocal_tune::controller::PipelineController;
//! use vocal_tune::engine::PassthroughFactory;
//! use vocal_tune::pipeline::PipelineRunner;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut settings = Settings::load().unwrap();
//!     let platform = CpalPlatform::new().unwrap();
//!     let controller = PipelineController::new(platform, PassthroughFactory, &settings).unwrap();
//!     let runner = PipelineRunner::new(controller);
//!
//!     let _listener = runner.spawn_change_listener(settings.subscribe());
//!     settings.set("pitch_shift", "2.0");
//!
//!     let stop = AtomicBool::new(true);
//!     let _take = runner.run_audio_loop(&stop).unwrap();
//! }
//! ```

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{PipelineError, PipelineRunner, SharedController};
pub use state::PipelineState;
