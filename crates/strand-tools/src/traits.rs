//! The tool handler contract.

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use strand_core::tools::ToolSpec;

use crate::errors::ToolError;

/// Per-invocation context passed to every handler.
///
/// The cancellation token is session-scoped: handlers that honor it abort
/// promptly on session cancellation; handlers that don't run to completion
/// and have their result discarded.
#[derive(Clone, Debug)]
pub struct ToolContext {
    /// Identifier of the tool call being executed.
    pub tool_call_id: String,
    /// Session this call belongs to.
    pub session_id: String,
    /// Session-scoped cancellation signal.
    pub cancellation: CancellationToken,
}

impl ToolContext {
    /// Build a context for one call within a session.
    pub fn new(tool_call_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            session_id: session_id.into(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Same context scoped to a different call id.
    #[must_use]
    pub fn for_call(&self, tool_call_id: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            session_id: self.session_id.clone(),
            cancellation: self.cancellation.clone(),
        }
    }
}

/// A named, schema-described capability the model may invoke.
///
/// Handlers take a structured argument map and return a structured value or
/// an error. They may be network calls; isolation between sibling calls in
/// one dispatch round is the dispatcher's job, not the handler's.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registered name (globally unique).
    fn name(&self) -> &str;

    /// Catalogue entry sent to the model provider.
    fn spec(&self) -> ToolSpec;

    /// Execute the handler.
    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> Result<Value, ToolError>;

    /// The session has ended; drop any per-session state held for it.
    ///
    /// Called once per session on every exit path, including cancellation
    /// and timeout. The default is a no-op for stateless tools.
    fn session_closed(&self, _session_id: &str) {}
}
