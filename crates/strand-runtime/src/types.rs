//! Session configuration and run outcome types.

use std::time::Duration;

/// Stop reason reported when the iteration cap forced termination.
pub const STOP_ITERATION_LIMIT: &str = "iteration_limit";

/// Per-session bounds. Injected by the caller, never a global.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Maximum model calls per session before forced termination.
    pub max_iterations: u32,
    /// Wall-clock deadline for the whole session.
    pub session_timeout: Duration,
    /// Per-call budget for one tool handler.
    pub tool_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            session_timeout: Duration::from_secs(300),
            tool_timeout: Duration::from_secs(30),
        }
    }
}

/// Outcome of a completed session run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunResult {
    /// Final answer text (synthesized at the iteration cap).
    pub text: String,
    /// Model calls made.
    pub iterations: u32,
    /// Present when termination was forced rather than model-chosen.
    pub stop_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_bounded() {
        let cfg = SessionConfig::default();
        assert!(cfg.max_iterations > 0);
        assert!(cfg.tool_timeout < cfg.session_timeout);
    }
}
