//! Error types for the sub-agent orchestration core.

use thiserror::Error;

/// Failures a sub-agent run can surface.
///
/// The loop itself never retries and never wraps collaborator failures;
/// everything a `TurnStream`, confirmation handler, or transcript sink
/// raises flows through `Collaborator` unchanged. The remaining variants
/// are the loop's own terminal-entry checks and cooperative cancellation,
/// kept distinct so callers can branch on them without string matching.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The stream ended on a recognized error-sentinel message.
    #[error("model turn ended with a reported failure: {sentinel}")]
    KnownStreamFailure { sentinel: String },

    /// The stream ended but its last entry was not an assistant message.
    #[error("{label} ended without an assistant reply")]
    IncompleteTurn { label: String },

    /// The session's cancellation token fired while the turn was running.
    #[error("agent turn cancelled")]
    Cancelled,

    /// Anything raised by an external collaborator, passed through as-is.
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

impl AgentError {
    /// Human label used in `IncompleteTurn`, naming the failing session.
    pub fn agent_label(agent_index: usize, synthesis: bool) -> String {
        if synthesis {
            "synthesis agent".to_string()
        } else {
            format!("agent {}", agent_index + 1)
        }
    }
}
