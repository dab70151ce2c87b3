//! Streaming event frames for orchestration progress.
//!
//! A session emits an ordered sequence of [`StrandEvent`] frames over a push
//! channel (server-sent events). The protocol invariants — exactly one
//! `connected` first, paired `tool_start`/`tool_complete|tool_failed`,
//! left-to-right `token` frames, exactly one terminal frame last — are
//! enforced by the session runner, which is the single emitting task.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Common fields carried by every frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseEvent {
    /// Session this frame belongs to.
    pub session_id: String,
    /// ISO 8601 timestamp.
    pub timestamp: String,
}

impl BaseEvent {
    /// Create a new base with the current UTC timestamp.
    #[must_use]
    pub fn now(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Declarative macro that generates [`StrandEvent`], its `base()` and
/// `event_type()` accessors, and a compile-time `VARIANT_COUNT`.
///
/// Adding a new frame requires ONE edit (inside this invocation). The
/// compiler enforces exhaustive matching everywhere else.
macro_rules! strand_events {
    ($(
        $(#[doc = $doc:literal])*
        $variant:ident {
            $(
                $(#[$fmeta:meta])*
                $field:ident : $ty:ty
            ),*
            $(,)?
        } => $rename:literal
    ),* $(,)?) => {
        /// One typed frame in the streaming event protocol.
        ///
        /// Clients rely on exact type strings and field names.
        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "type")]
        #[allow(missing_docs)]
        pub enum StrandEvent {
            $(
                $(#[doc = $doc])*
                #[serde(rename = $rename)]
                $variant {
                    #[serde(flatten)]
                    base: BaseEvent,
                    $(
                        $(#[$fmeta])*
                        $field: $ty,
                    )*
                },
            )*
        }

        impl StrandEvent {
            /// Get the base frame fields.
            #[must_use]
            pub fn base(&self) -> &BaseEvent {
                match self {
                    $(Self::$variant { base, .. } => base,)*
                }
            }

            /// Get the frame type string (for type discrimination).
            #[must_use]
            pub fn event_type(&self) -> &str {
                match self {
                    $(Self::$variant { .. } => $rename,)*
                }
            }
        }

        /// Number of `StrandEvent` variants (compile-time constant for tests).
        #[cfg(test)]
        pub(crate) const VARIANT_COUNT: usize = [$($rename),*].len();
    };
}

strand_events! {
    /// Session stream opened. Always the first frame.
    Connected {} => "connected",

    /// The model is reasoning; precedes the tool/token frames it describes.
    Thinking {
        message: String,
    } => "thinking",

    /// One tool call dispatched.
    ToolStart {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        arguments: Option<serde_json::Map<String, Value>>,
    } => "tool_start",

    /// Tool call resolved successfully. Paired with a prior `tool_start`.
    ToolComplete {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
        duration: u64,
    } => "tool_complete",

    /// Tool call resolved with an error. Paired with a prior `tool_start`.
    ToolFailed {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
        duration: u64,
        error: String,
    } => "tool_failed",

    /// Chunk of the terminal text, emitted in left-to-right order.
    /// Concatenating all `token` payloads reconstructs the full text exactly.
    Token {
        text: String,
    } => "token",

    /// Session finished successfully. Terminal.
    Done {
        text: String,
        iterations: u32,
        #[serde(rename = "stopReason", skip_serializing_if = "Option::is_none")]
        stop_reason: Option<String>,
    } => "done",

    /// Session failed. Terminal.
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    } => "error",
}

impl StrandEvent {
    /// Whether this frame ends the stream (`done` or `error`).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }
}

/// Convenience constructor for the opening frame.
pub fn connected_event(session_id: &str) -> StrandEvent {
    StrandEvent::Connected {
        base: BaseEvent::now(session_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn variant_count_matches_protocol() {
        // The streaming protocol defines exactly eight frame types.
        assert_eq!(VARIANT_COUNT, 8);
    }

    #[test]
    fn connected_serializes_with_type_tag() {
        let e = connected_event("s1");
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["type"], "connected");
        assert_eq!(v["sessionId"], "s1");
        assert!(v["timestamp"].is_string());
    }

    #[test]
    fn tool_frames_use_camel_case_ids() {
        let e = StrandEvent::ToolFailed {
            base: BaseEvent::now("s1"),
            tool_call_id: "tc_1".into(),
            tool_name: "run_code".into(),
            duration: 42,
            error: "boom".into(),
        };
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["type"], "tool_failed");
        assert_eq!(v["toolCallId"], "tc_1");
        assert_eq!(v["toolName"], "run_code");
        assert_eq!(v["duration"], 42);
    }

    #[test]
    fn optional_arguments_omitted_when_none() {
        let e = StrandEvent::ToolStart {
            base: BaseEvent::now("s1"),
            tool_call_id: "tc_1".into(),
            tool_name: "run_code".into(),
            arguments: None,
        };
        let v = serde_json::to_value(&e).unwrap();
        assert!(v.get("arguments").is_none());
    }

    #[test]
    fn terminal_detection() {
        let done = StrandEvent::Done {
            base: BaseEvent::now("s1"),
            text: "hi".into(),
            iterations: 1,
            stop_reason: None,
        };
        let err = StrandEvent::Error {
            base: BaseEvent::now("s1"),
            error: "x".into(),
            code: None,
        };
        let tok = StrandEvent::Token {
            base: BaseEvent::now("s1"),
            text: "h".into(),
        };
        assert!(done.is_terminal());
        assert!(err.is_terminal());
        assert!(!tok.is_terminal());
    }

    #[test]
    fn event_type_and_base_accessors() {
        let e = StrandEvent::Token {
            base: BaseEvent::now("sess_9"),
            text: "abc".into(),
        };
        assert_eq!(e.event_type(), "token");
        assert_eq!(e.base().session_id, "sess_9");
    }

    #[test]
    fn roundtrip_through_json() {
        let e = StrandEvent::Done {
            base: BaseEvent {
                session_id: "s1".into(),
                timestamp: "2026-01-01T00:00:00+00:00".into(),
            },
            text: "final".into(),
            iterations: 3,
            stop_reason: Some("iteration_limit".into()),
        };
        let json = serde_json::to_string(&e).unwrap();
        let back: StrandEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["stopReason"], json!("iteration_limit"));
    }
}
