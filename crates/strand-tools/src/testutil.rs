//! Shared scripted tools for tests across the workspace.
//!
//! Provides `EchoTool`, `FailingTool`, and `SlowTool` — previously the kind
//! of fixture every test module would copy-paste.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use strand_core::tools::{ParameterSchema, ToolSpec};

use crate::errors::ToolError;
use crate::traits::{Tool, ToolContext};

/// Echoes its `text` argument back as `{ "echo": text }`.
pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn spec(&self) -> ToolSpec {
        let mut props = Map::new();
        let _ = props.insert("text".into(), json!({"type": "string"}));
        ToolSpec {
            name: "echo".into(),
            description: "Echoes input".into(),
            parameters: ParameterSchema::object(props, vec![]),
        }
    }

    async fn execute(&self, arguments: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let text = arguments.get("text").and_then(Value::as_str).unwrap_or("");
        Ok(json!({"echo": text}))
    }
}

/// Fails the first `fail_count` invocations, then succeeds.
///
/// `always` never succeeds. Invocation counting is global to the instance.
pub struct FailingTool {
    message: String,
    fail_count: u32,
    calls: AtomicU32,
}

impl FailingTool {
    /// Fail every invocation with `message`.
    pub fn always(message: &str) -> Self {
        Self {
            message: message.into(),
            fail_count: u32::MAX,
            calls: AtomicU32::new(0),
        }
    }

    /// Fail the first `fail_count` invocations, succeed afterwards.
    pub fn fail_first(fail_count: u32) -> Self {
        Self {
            message: "scripted failure".into(),
            fail_count,
            calls: AtomicU32::new(0),
        }
    }

    /// Number of times the tool has been invoked.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        "flaky"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "flaky".into(),
            description: "Fails a scripted number of times".into(),
            parameters: ParameterSchema::empty(),
        }
    }

    async fn execute(&self, _arguments: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_count {
            Err(ToolError::Execution(self.message.clone()))
        } else {
            Ok(json!({"ok": true, "call": call + 1}))
        }
    }
}

/// Sleeps for a configured duration before succeeding.
///
/// Used with `tokio::time::pause` to exercise per-call timeouts.
pub struct SlowTool {
    delay: Duration,
}

impl SlowTool {
    /// Tool that takes `delay` to finish.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        "slow"
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "slow".into(),
            description: "Sleeps before answering".into(),
            parameters: ParameterSchema::empty(),
        }
    }

    async fn execute(&self, _arguments: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        tokio::time::sleep(self.delay).await;
        Ok(json!({"slept_ms": self.delay.as_millis() as u64}))
    }
}
