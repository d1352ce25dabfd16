//! Runner state machine.
//!
//! [`PipelineState`] is published by [`PipelineRunner`](super::PipelineRunner)
//! so the CLI can report what the audio loop is doing.

/// States of the audio loop.
///
/// ```text
/// Idle ──run_audio_loop──▶ Running
/// Running ──rate / buffer / mode change──▶ Reopening ──devices open──▶ Running
/// Running ──stop flag──▶ Stopped
/// any state ──device or engine error──▶ Error
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// The loop has not been started.
    #[default]
    Idle,

    /// Devices are open and blocks are flowing through the engine.
    Running,

    /// The loaded configuration changed; devices are being reopened.
    Reopening,

    /// The stop flag was raised and every device has been released.
    Stopped,

    /// The loop ended on an error.
    Error,
}

impl PipelineState {
    /// Returns `true` while the loop owns open devices.
    ///
    /// ```
    /// use vocal_tune::pipeline::PipelineState;
    ///
    /// assert!(!PipelineState::Idle.is_active());
    /// assert!(PipelineState::Running.is_active());
    /// assert!(PipelineState::Reopening.is_active());
    /// assert!(!PipelineState::Stopped.is_active());
    /// assert!(!PipelineState::Error.is_active());
    /// ```
    pub fn is_active(&self) -> bool {
        matches!(self, PipelineState::Running | PipelineState::Reopening)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PipelineState::Idle => "Idle",
            PipelineState::Running => "Running",
            PipelineState::Reopening => "Reopening",
            PipelineState::Stopped => "Stopped",
            PipelineState::Error => "Error",
        }
    }
}
