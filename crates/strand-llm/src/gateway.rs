//! The model gateway port.

use async_trait::async_trait;
use serde_json::Value;

use strand_core::messages::{Conversation, ToolCallRequest};
use strand_core::tools::ToolSpec;

use crate::errors::GatewayError;

/// What the model returned for one call.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelOutcome {
    /// Natural-language answer with no tool calls — the success terminal
    /// signal for the session.
    Text {
        /// The answer text.
        text: String,
    },

    /// One or more tool calls (never empty), possibly alongside partial
    /// text, plus any opaque continuation metadata the provider requires
    /// callers to echo back verbatim on the next call.
    ToolCalls {
        /// Text the model produced alongside the calls, if any.
        text: Option<String>,
        /// Ordered tool-call requests.
        calls: Vec<ToolCallRequest>,
        /// Opaque provider state, replayed unchanged.
        continuation: Option<Value>,
    },
}

impl ModelOutcome {
    /// Whether this outcome carries tool calls.
    pub fn has_tool_calls(&self) -> bool {
        matches!(self, Self::ToolCalls { .. })
    }
}

/// Port to the language-model provider.
///
/// One method: send the accumulated conversation plus the tool catalogue,
/// get back text or tool calls. Implementations own transport, auth, and
/// wire-format concerns.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Call the model once.
    async fn call(
        &self,
        conversation: &Conversation,
        catalogue: &[ToolSpec],
    ) -> Result<ModelOutcome, GatewayError>;
}
