//! Tool error taxonomy.

use strand_core::messages::{ERR_EXECUTION, ERR_INVALID_ARGUMENTS, ERR_TIMEOUT, ERR_TOOL_NOT_FOUND};

/// Errors surfaced by tool lookup, validation, and execution.
///
/// Every variant is fatal for its own call only — the dispatcher converts
/// it into a structured result the model can react to, and sibling calls
/// in the same round are unaffected.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Requested name has no registered tool.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// A tool with this name is already registered.
    #[error("duplicate tool name: {0}")]
    DuplicateTool(String),

    /// Arguments failed schema validation.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// Handler returned an error or malformed output.
    #[error("tool execution failed: {0}")]
    Execution(String),

    /// Handler exceeded its per-call budget.
    #[error("tool timed out after {budget_ms}ms")]
    Timeout {
        /// Per-call budget that was exceeded.
        budget_ms: u64,
    },

    /// Sandbox provisioning or teardown failed.
    #[error("sandbox error: {0}")]
    Sandbox(String),
}

impl ToolError {
    /// Machine-readable code for the structured tool-call result.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => ERR_TOOL_NOT_FOUND,
            Self::InvalidArguments(_) => ERR_INVALID_ARGUMENTS,
            Self::Timeout { .. } => ERR_TIMEOUT,
            // Registry misuse and sandbox failures both surface to the model
            // as execution errors on the affected call.
            Self::DuplicateTool(_) | Self::Execution(_) | Self::Sandbox(_) => ERR_EXECUTION,
        }
    }
}
