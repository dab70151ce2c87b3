//! Bounded self-correcting retry wrapper for the code-execution tool.
//!
//! Most failures of generated code (syntax errors, missing imports) are
//! self-correctable: fed the error text, the model fixes its input and
//! calls again. This wrapper converts a failed attempt into a result that
//! *looks like a successful tool call* whose payload carries the error and
//! a fix instruction, so the failure stays inside the conversation instead
//! of surfacing to the caller. Attempts are capped; at the cap the payload
//! carries `final_failure: true` so the model stops retrying.
//!
//! This is a deliberate exception to "the dispatcher does not retry" — the
//! retry lives inside this one tool's contract.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{info, warn};

use strand_core::text::truncate_with_suffix;
use strand_core::tools::ToolSpec;

use crate::errors::ToolError;
use crate::traits::{Tool, ToolContext};

/// Default attempt cap.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Upper bound on error text echoed into the payload.
const ERROR_TEXT_MAX_BYTES: usize = 2_048;

/// Instruction fragment appended to recoverable failures.
const FIX_INSTRUCTION: &str =
    "The code failed with the error above. Correct the code and call this tool again.";

/// Decorator that gives one fallible tool a bounded self-correction loop.
///
/// Attempt counts are tracked per session and reset on success, so one
/// session's failures never consume another's budget.
pub struct SelfCorrectingTool {
    inner: Arc<dyn Tool>,
    max_retries: u32,
    attempts: Mutex<HashMap<String, u32>>,
}

impl SelfCorrectingTool {
    /// Wrap `inner` with the default attempt cap.
    pub fn new(inner: Arc<dyn Tool>) -> Self {
        Self::with_max_retries(inner, DEFAULT_MAX_RETRIES)
    }

    /// Wrap `inner` with an explicit attempt cap (must be ≥ 1).
    pub fn with_max_retries(inner: Arc<dyn Tool>, max_retries: u32) -> Self {
        Self {
            inner,
            max_retries: max_retries.max(1),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Attempt number for this invocation (1-based), recorded under the
    /// session key.
    fn begin_attempt(&self, session_id: &str) -> u32 {
        let mut attempts = self.attempts.lock();
        let n = attempts.entry(session_id.to_owned()).or_insert(0);
        *n += 1;
        *n
    }

    /// Clear the session's attempt counter (success or final failure).
    fn reset(&self, session_id: &str) {
        let _ = self.attempts.lock().remove(session_id);
    }
}

#[async_trait]
impl Tool for SelfCorrectingTool {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn spec(&self) -> ToolSpec {
        self.inner.spec()
    }

    // Without this, a session whose last attempt was a recoverable failure
    // would leave its counter in the map forever.
    fn session_closed(&self, session_id: &str) {
        self.reset(session_id);
        self.inner.session_closed(session_id);
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let attempt = self.begin_attempt(&ctx.session_id);

        match self.inner.execute(arguments, ctx).await {
            Ok(output) => {
                self.reset(&ctx.session_id);
                Ok(json!({
                    "success": true,
                    "output": output,
                    "error": null,
                    "attempt": attempt,
                    "max_retries": self.max_retries,
                }))
            }
            Err(e) => {
                let error_text = truncate_with_suffix(&e.to_string(), ERROR_TEXT_MAX_BYTES, "...");
                if attempt >= self.max_retries {
                    self.reset(&ctx.session_id);
                    warn!(
                        tool = self.inner.name(),
                        session_id = %ctx.session_id,
                        attempt,
                        "attempt cap reached, reporting final failure"
                    );
                    Ok(json!({
                        "success": false,
                        "output": null,
                        "error": error_text,
                        "attempt": attempt,
                        "max_retries": self.max_retries,
                        "final_failure": true,
                    }))
                } else {
                    info!(
                        tool = self.inner.name(),
                        session_id = %ctx.session_id,
                        attempt,
                        "recoverable failure, asking the model to correct"
                    );
                    Ok(json!({
                        "success": false,
                        "output": null,
                        "error": error_text,
                        "fix_instruction": FIX_INSTRUCTION,
                        "attempt": attempt,
                        "max_retries": self.max_retries,
                    }))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FailingTool;

    fn ctx(session: &str) -> ToolContext {
        ToolContext::new("tc_1", session)
    }

    #[tokio::test]
    async fn success_on_first_attempt() {
        let tool = SelfCorrectingTool::new(Arc::new(FailingTool::fail_first(0)));
        let out = tool.execute(json!({}), &ctx("s1")).await.unwrap();
        assert_eq!(out["success"], true);
        assert_eq!(out["attempt"], 1);
        assert!(out.get("final_failure").is_none());
    }

    #[tokio::test]
    async fn fails_once_then_succeeds_reports_attempt_two() {
        let tool = SelfCorrectingTool::new(Arc::new(FailingTool::fail_first(1)));

        let first = tool.execute(json!({}), &ctx("s1")).await.unwrap();
        assert_eq!(first["success"], false);
        assert_eq!(first["attempt"], 1);
        assert!(first["fix_instruction"].as_str().unwrap().contains("Correct"));
        assert!(first.get("final_failure").is_none());

        let second = tool.execute(json!({}), &ctx("s1")).await.unwrap();
        assert_eq!(second["success"], true);
        assert_eq!(second["attempt"], 2);
    }

    #[tokio::test]
    async fn cap_reached_reports_final_failure() {
        let tool = SelfCorrectingTool::new(Arc::new(FailingTool::always("syntax error")));

        let first = tool.execute(json!({}), &ctx("s1")).await.unwrap();
        assert_eq!(first["attempt"], 1);
        assert!(first.get("final_failure").is_none());

        let second = tool.execute(json!({}), &ctx("s1")).await.unwrap();
        assert_eq!(second["attempt"], 2);
        assert_eq!(second["final_failure"], true);
        assert_eq!(second["success"], false);
        assert!(second["error"].as_str().unwrap().contains("syntax error"));
        // No fix instruction at the cap — the model must stop.
        assert!(second.get("fix_instruction").is_none());
    }

    #[tokio::test]
    async fn counter_resets_after_final_failure() {
        let tool = SelfCorrectingTool::new(Arc::new(FailingTool::always("boom")));
        let _ = tool.execute(json!({}), &ctx("s1")).await.unwrap();
        let _ = tool.execute(json!({}), &ctx("s1")).await.unwrap();

        // A later invocation in the same session starts a fresh budget.
        let third = tool.execute(json!({}), &ctx("s1")).await.unwrap();
        assert_eq!(third["attempt"], 1);
    }

    #[tokio::test]
    async fn session_closed_clears_pending_attempts() {
        let tool = SelfCorrectingTool::new(Arc::new(FailingTool::always("boom")));
        let first = tool.execute(json!({}), &ctx("s1")).await.unwrap();
        assert_eq!(first["attempt"], 1);

        // The session stops calling the tool after a recoverable failure;
        // the hook must release the counter it left behind.
        tool.session_closed("s1");

        let next = tool.execute(json!({}), &ctx("s1")).await.unwrap();
        assert_eq!(next["attempt"], 1);
    }

    #[tokio::test]
    async fn session_closed_leaves_other_sessions_alone() {
        let tool = SelfCorrectingTool::with_max_retries(Arc::new(FailingTool::always("boom")), 3);
        let _ = tool.execute(json!({}), &ctx("s1")).await.unwrap();
        let _ = tool.execute(json!({}), &ctx("s2")).await.unwrap();

        tool.session_closed("s2");

        let out = tool.execute(json!({}), &ctx("s1")).await.unwrap();
        assert_eq!(out["attempt"], 2);
    }

    #[tokio::test]
    async fn sessions_have_independent_budgets() {
        let tool = SelfCorrectingTool::new(Arc::new(FailingTool::always("boom")));
        let _ = tool.execute(json!({}), &ctx("s1")).await.unwrap();

        let other = tool.execute(json!({}), &ctx("s2")).await.unwrap();
        assert_eq!(other["attempt"], 1);
    }

    #[tokio::test]
    async fn never_exceeds_max_retries() {
        let tool = SelfCorrectingTool::with_max_retries(Arc::new(FailingTool::always("x")), 3);
        for expected in 1..=6u32 {
            let out = tool.execute(json!({}), &ctx("s1")).await.unwrap();
            let attempt = out["attempt"].as_u64().unwrap() as u32;
            assert!(attempt <= 3);
            let final_failure = out.get("final_failure").is_some();
            // Terminal exactly when the cap is hit.
            assert_eq!(final_failure, expected % 3 == 0);
        }
    }

    #[tokio::test]
    async fn wrapper_delegates_name_and_spec() {
        let inner: Arc<dyn Tool> = Arc::new(FailingTool::always("x"));
        let tool = SelfCorrectingTool::new(inner.clone());
        assert_eq!(tool.name(), inner.name());
        assert_eq!(tool.spec(), inner.spec());
    }
}
