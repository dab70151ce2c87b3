//! Sandboxed code execution over a provisioned-sandbox port.
//!
//! Sandboxes follow scoped-acquisition discipline: create → exec → destroy
//! on every exit path. Destruction is best-effort — a failed teardown is
//! logged, never escalated.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use strand_core::tools::{ParameterSchema, ToolSpec};

use crate::errors::ToolError;
use crate::traits::{Tool, ToolContext};

/// Output of one code execution inside a sandbox.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecOutput {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Process exit code.
    pub exit_code: i32,
}

/// Port to the external sandbox service.
///
/// Implementations are network clients; this crate only depends on the
/// contract.
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    /// Provision a fresh sandbox, returning its id.
    async fn create(&self) -> Result<String, ToolError>;

    /// Run code inside the sandbox.
    async fn exec(&self, sandbox_id: &str, code: &str) -> Result<ExecOutput, ToolError>;

    /// Tear the sandbox down.
    async fn destroy(&self, sandbox_id: &str) -> Result<(), ToolError>;
}

/// The code-execution tool.
///
/// Arguments: `{ code: string }`. Output: `{ stdout, stderr, exit_code }`.
/// A non-zero exit code is reported as an execution error carrying stderr,
/// which the self-correcting wrapper feeds back to the model.
pub struct RunCodeTool {
    provider: Arc<dyn SandboxProvider>,
}

impl RunCodeTool {
    /// Tool name as registered.
    pub const NAME: &'static str = "run_code";

    /// Create the tool over a sandbox provider.
    pub fn new(provider: Arc<dyn SandboxProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Tool for RunCodeTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn spec(&self) -> ToolSpec {
        let mut props = Map::new();
        let _ = props.insert(
            "code".into(),
            json!({"type": "string", "description": "Python source to execute in an isolated sandbox"}),
        );
        ToolSpec {
            name: Self::NAME.into(),
            description: "Execute code in a disposable sandbox and return stdout/stderr".into(),
            parameters: ParameterSchema::object(props, vec!["code".into()]),
        }
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let code = arguments
            .get("code")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("missing `code` string".into()))?;

        let sandbox_id = self.provider.create().await?;
        debug!(sandbox_id, session_id = %ctx.session_id, "sandbox created");

        // Destroy on every exit path; teardown failure is logged, not escalated.
        let outcome = self.provider.exec(&sandbox_id, code).await;
        if let Err(e) = self.provider.destroy(&sandbox_id).await {
            warn!(sandbox_id, error = %e, "sandbox destroy failed");
        }

        let output = outcome?;
        if output.exit_code != 0 {
            return Err(ToolError::Execution(format!(
                "exit code {}: {}",
                output.exit_code,
                if output.stderr.is_empty() {
                    &output.stdout
                } else {
                    &output.stderr
                }
            )));
        }

        Ok(json!({
            "stdout": output.stdout,
            "stderr": output.stderr,
            "exit_code": output.exit_code,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Scripted provider that records lifecycle calls.
    struct ScriptedProvider {
        exec_result: Result<ExecOutput, String>,
        fail_destroy: bool,
        created: AtomicU32,
        destroyed: AtomicU32,
    }

    impl ScriptedProvider {
        fn ok(stdout: &str) -> Self {
            Self {
                exec_result: Ok(ExecOutput {
                    stdout: stdout.into(),
                    stderr: String::new(),
                    exit_code: 0,
                }),
                fail_destroy: false,
                created: AtomicU32::new(0),
                destroyed: AtomicU32::new(0),
            }
        }

        fn failing(stderr: &str, exit_code: i32) -> Self {
            Self {
                exec_result: Ok(ExecOutput {
                    stdout: String::new(),
                    stderr: stderr.into(),
                    exit_code,
                }),
                fail_destroy: false,
                created: AtomicU32::new(0),
                destroyed: AtomicU32::new(0),
            }
        }

        fn exec_error(message: &str) -> Self {
            Self {
                exec_result: Err(message.into()),
                fail_destroy: false,
                created: AtomicU32::new(0),
                destroyed: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl SandboxProvider for ScriptedProvider {
        async fn create(&self) -> Result<String, ToolError> {
            let n = self.created.fetch_add(1, Ordering::SeqCst);
            Ok(format!("sbx_{n}"))
        }

        async fn exec(&self, _sandbox_id: &str, _code: &str) -> Result<ExecOutput, ToolError> {
            match &self.exec_result {
                Ok(out) => Ok(out.clone()),
                Err(msg) => Err(ToolError::Sandbox(msg.clone())),
            }
        }

        async fn destroy(&self, _sandbox_id: &str) -> Result<(), ToolError> {
            let _ = self.destroyed.fetch_add(1, Ordering::SeqCst);
            if self.fail_destroy {
                Err(ToolError::Sandbox("teardown failed".into()))
            } else {
                Ok(())
            }
        }
    }

    fn ctx() -> ToolContext {
        ToolContext::new("tc_1", "s1")
    }

    #[tokio::test]
    async fn successful_run_returns_output() {
        let provider = Arc::new(ScriptedProvider::ok("42\n"));
        let tool = RunCodeTool::new(provider.clone());
        let out = tool
            .execute(json!({"code": "print(42)"}), &ctx())
            .await
            .unwrap();
        assert_eq!(out["stdout"], "42\n");
        assert_eq!(out["exit_code"], 0);
        assert_eq!(provider.destroyed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn nonzero_exit_maps_to_execution_error() {
        let provider = Arc::new(ScriptedProvider::failing("SyntaxError: invalid syntax", 1));
        let tool = RunCodeTool::new(provider.clone());
        let err = tool
            .execute(json!({"code": "print("}), &ctx())
            .await
            .unwrap_err();
        assert_matches!(err, ToolError::Execution(msg) if msg.contains("SyntaxError"));
        // Destroyed even on the failure path.
        assert_eq!(provider.destroyed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn destroy_runs_when_exec_itself_errors() {
        let provider = Arc::new(ScriptedProvider::exec_error("connection reset"));
        let tool = RunCodeTool::new(provider.clone());
        let err = tool.execute(json!({"code": "x"}), &ctx()).await.unwrap_err();
        assert_matches!(err, ToolError::Sandbox(_));
        assert_eq!(provider.destroyed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn destroy_failure_is_swallowed() {
        let mut provider = ScriptedProvider::ok("ok");
        provider.fail_destroy = true;
        let tool = RunCodeTool::new(Arc::new(provider));
        // Teardown failure must not affect the call's result.
        let out = tool.execute(json!({"code": "x"}), &ctx()).await.unwrap();
        assert_eq!(out["stdout"], "ok");
    }

    #[tokio::test]
    async fn missing_code_argument_rejected() {
        let tool = RunCodeTool::new(Arc::new(ScriptedProvider::ok("")));
        let err = tool.execute(json!({}), &ctx()).await.unwrap_err();
        assert_matches!(err, ToolError::InvalidArguments(_));
    }

    #[test]
    fn spec_declares_code_required() {
        let tool = RunCodeTool::new(Arc::new(ScriptedProvider::ok("")));
        let spec = tool.spec();
        assert_eq!(spec.name, "run_code");
        assert_eq!(spec.parameters.required, vec!["code"]);
    }
}
