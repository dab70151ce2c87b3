//! Runtime error taxonomy.

use strand_llm::errors::GatewayError;

/// Session-level failures.
///
/// Per-tool errors never reach this type — the dispatcher folds them into
/// structured results the model reacts to. Everything here is systemic and
/// terminates the session.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Model provider failure (unreachable, bad status, unparsable output).
    #[error("model gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// Session exceeded its wall-clock deadline.
    #[error("session timed out after {budget_secs}s")]
    SessionTimeout {
        /// Deadline that was exceeded, in seconds.
        budget_secs: u64,
    },

    /// Model kept requesting tool calls past the iteration cap.
    #[error("iteration limit of {cap} reached without a final answer")]
    IterationLimitExceeded {
        /// The session's iteration cap.
        cap: u32,
    },

    /// The session already has an active run.
    #[error("session {0} is busy")]
    SessionBusy(String),

    /// The server is at its concurrent-run capacity.
    #[error("server busy: {current}/{max} runs active")]
    ServerBusy {
        /// Runs currently active.
        current: usize,
        /// Configured cap.
        max: usize,
    },

    /// The session was cancelled by the client or shutdown.
    #[error("session cancelled")]
    Cancelled,
}

impl RuntimeError {
    /// Machine-readable code carried on the terminal `error` frame.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Gateway(_) => "gateway_error",
            Self::SessionTimeout { .. } => "session_timeout",
            Self::IterationLimitExceeded { .. } => "iteration_limit",
            Self::SessionBusy(_) => "session_busy",
            Self::ServerBusy { .. } => "server_busy",
            Self::Cancelled => "cancelled",
        }
    }
}
