//! Conversation turns and tool-call types.
//!
//! A [`Conversation`] is an append-only sequence of [`Turn`]s. Past turns are
//! never reordered or deleted, so the model always sees a faithful replay of
//! what happened. Provider continuation metadata attached to a model turn is
//! stored as an opaque blob and echoed back verbatim — never inspected or
//! regenerated.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ─────────────────────────────────────────────────────────────────────────────
// Tool-call error codes
// ─────────────────────────────────────────────────────────────────────────────

/// Requested tool name is not registered.
pub const ERR_TOOL_NOT_FOUND: &str = "tool_not_found";
/// Arguments failed schema validation.
pub const ERR_INVALID_ARGUMENTS: &str = "invalid_arguments";
/// Handler returned an error or panicked.
pub const ERR_EXECUTION: &str = "execution_error";
/// Handler exceeded its per-call time limit.
pub const ERR_TIMEOUT: &str = "tool_timeout";

// ─────────────────────────────────────────────────────────────────────────────
// Tool calls
// ─────────────────────────────────────────────────────────────────────────────

/// One tool invocation requested by the model.
///
/// Created by the model gateway when parsing a provider response; consumed
/// exactly once by the dispatcher. `id` is unique within its turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Identifier the provider binds results to.
    pub id: String,
    /// Registered tool name.
    pub name: String,
    /// Structured arguments (validated against the tool's schema at dispatch).
    pub arguments: Map<String, Value>,
}

impl ToolCallRequest {
    /// Create a new request.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Structured error carried inside a [`ToolCallResult`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallError {
    /// Machine-readable code (one of the `ERR_*` constants).
    pub code: String,
    /// Human-readable message the model can react to.
    pub message: String,
}

/// Result of one tool invocation, order-matched to its request by `id`.
///
/// Exactly one result exists for every request in a turn, even on failure —
/// partial turns are invalid and never sent back to the model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Matches the request `id`.
    pub id: String,
    /// Tool name (echoed for providers that bind positionally).
    pub name: String,
    /// Structured output (present on success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Error detail (present on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolCallError>,
}

impl ToolCallResult {
    /// Build a success result.
    pub fn ok(id: impl Into<String>, name: impl Into<String>, output: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            output: Some(output),
            error: None,
        }
    }

    /// Build a failure result with a machine-readable code.
    pub fn error(
        id: impl Into<String>,
        name: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            output: None,
            error: Some(ToolCallError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }

    /// Whether this result carries an error.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Turns
// ─────────────────────────────────────────────────────────────────────────────

/// One atomic append to the conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    /// Free text from the user.
    User {
        /// Message text.
        text: String,
    },

    /// Model response: final text, or an ordered list of tool calls.
    ///
    /// When `tool_calls` is non-empty the turn drives tool dispatch; any
    /// `text` present alongside is buffered for best-effort synthesis but
    /// does not change control flow.
    Model {
        /// Text content, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        /// Ordered tool-call requests.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
        /// Opaque provider continuation metadata, replayed verbatim.
        #[serde(skip_serializing_if = "Option::is_none")]
        continuation: Option<Value>,
    },

    /// One result per outstanding request, order-matched by id.
    ToolResults {
        /// Ordered results.
        results: Vec<ToolCallResult>,
    },
}

impl Turn {
    /// User turn constructor.
    pub fn user(text: impl Into<String>) -> Self {
        Self::User { text: text.into() }
    }

    /// Model turn holding final text only.
    pub fn model_text(text: impl Into<String>) -> Self {
        Self::Model {
            text: Some(text.into()),
            tool_calls: Vec::new(),
            continuation: None,
        }
    }

    /// Model turn holding tool calls (with optional buffered text and
    /// continuation metadata).
    pub fn model_tool_calls(
        text: Option<String>,
        tool_calls: Vec<ToolCallRequest>,
        continuation: Option<Value>,
    ) -> Self {
        Self::Model {
            text,
            tool_calls,
            continuation,
        }
    }

    /// Tool-results turn constructor.
    pub fn tool_results(results: Vec<ToolCallResult>) -> Self {
        Self::ToolResults { results }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversation
// ─────────────────────────────────────────────────────────────────────────────

/// Append-only ordered sequence of turns.
///
/// The inner vector is private: the only mutation is [`Conversation::push`],
/// which guarantees the never-reorder/never-delete invariant by construction.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from prior history.
    pub fn from_turns(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    /// Append a turn.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Ordered view of all turns.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the conversation has no turns.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Most recently appended turn.
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Text fragments buffered on model turns, oldest first.
    ///
    /// Used for best-effort synthesis when the iteration cap is hit.
    pub fn model_text_fragments(&self) -> Vec<&str> {
        self.turns
            .iter()
            .filter_map(|t| match t {
                Turn::Model { text: Some(text), .. } if !text.is_empty() => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn req(id: &str, name: &str) -> ToolCallRequest {
        ToolCallRequest::new(id, name, Map::new())
    }

    // ── ToolCallResult ───────────────────────────────────────────────────

    #[test]
    fn ok_result_has_no_error() {
        let r = ToolCallResult::ok("tc_1", "lookup", json!({"rows": 3}));
        assert!(!r.is_error());
        assert_eq!(r.output.unwrap()["rows"], 3);
    }

    #[test]
    fn error_result_carries_code_and_message() {
        let r = ToolCallResult::error("tc_1", "lookup", ERR_TIMEOUT, "exceeded 30s");
        assert!(r.is_error());
        let err = r.error.unwrap();
        assert_eq!(err.code, ERR_TIMEOUT);
        assert_eq!(err.message, "exceeded 30s");
        assert!(r.output.is_none());
    }

    #[test]
    fn error_field_omitted_from_success_json() {
        let r = ToolCallResult::ok("tc_1", "lookup", json!(null));
        let v = serde_json::to_value(&r).unwrap();
        assert!(v.get("error").is_none());
    }

    // ── Turn serde ───────────────────────────────────────────────────────

    #[test]
    fn user_turn_roundtrip() {
        let t = Turn::user("hello");
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("\"role\":\"user\""));
        let back: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn model_text_turn_has_no_tool_calls_field() {
        let t = Turn::model_text("answer");
        let v = serde_json::to_value(&t).unwrap();
        assert!(v.get("tool_calls").is_none());
        assert!(v.get("continuation").is_none());
    }

    #[test]
    fn model_tool_call_turn_preserves_continuation_verbatim() {
        let blob = json!({"provider_state": "x9/==", "nested": {"k": [1, 2]}});
        let t = Turn::model_tool_calls(None, vec![req("tc_1", "run_code")], Some(blob.clone()));
        let json = serde_json::to_string(&t).unwrap();
        let back: Turn = serde_json::from_str(&json).unwrap();
        match back {
            Turn::Model { continuation, .. } => assert_eq!(continuation, Some(blob)),
            other => panic!("expected model turn, got {other:?}"),
        }
    }

    // ── Conversation ─────────────────────────────────────────────────────

    #[test]
    fn push_appends_in_order() {
        let mut c = Conversation::new();
        c.push(Turn::user("q"));
        c.push(Turn::model_text("a"));
        assert_eq!(c.len(), 2);
        assert_eq!(c.turns()[0], Turn::user("q"));
        assert_eq!(c.last(), Some(&Turn::model_text("a")));
    }

    #[test]
    fn from_turns_preserves_history() {
        let c = Conversation::from_turns(vec![Turn::user("earlier"), Turn::model_text("reply")]);
        assert_eq!(c.len(), 2);
        assert!(!c.is_empty());
    }

    #[test]
    fn model_text_fragments_skips_empty_and_non_model() {
        let mut c = Conversation::new();
        c.push(Turn::user("q"));
        c.push(Turn::model_tool_calls(
            Some("checking the data".into()),
            vec![req("tc_1", "lookup")],
            None,
        ));
        c.push(Turn::tool_results(vec![ToolCallResult::ok(
            "tc_1",
            "lookup",
            json!({}),
        )]));
        c.push(Turn::model_tool_calls(Some(String::new()), vec![req("tc_2", "lookup")], None));
        assert_eq!(c.model_text_fragments(), vec!["checking the data"]);
    }
}
