//! Real sandbox provider backed by local subprocesses.
//!
//! Each sandbox is a scratch directory; `exec` runs the interpreter in it
//! with an isolated flag set, and `destroy` removes the directory. Suitable
//! for development and single-tenant deployments; a remote provider
//! implements the same [`SandboxProvider`] port.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::errors::ToolError;
use crate::sandbox::{ExecOutput, SandboxProvider};

/// Subprocess-backed [`SandboxProvider`].
pub struct ProcessSandbox {
    command: String,
    args: Vec<String>,
    scratch_root: PathBuf,
}

impl ProcessSandbox {
    /// Python interpreter in isolated mode, scratch dirs under the system
    /// temp directory.
    pub fn new() -> Self {
        Self::with_command("python3", &["-I", "-c"])
    }

    /// Custom interpreter invocation; `args` are passed before the code.
    pub fn with_command(command: &str, args: &[&str]) -> Self {
        Self {
            command: command.into(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            scratch_root: std::env::temp_dir(),
        }
    }

    fn sandbox_dir(&self, sandbox_id: &str) -> PathBuf {
        self.scratch_root.join(sandbox_id)
    }
}

impl Default for ProcessSandbox {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SandboxProvider for ProcessSandbox {
    async fn create(&self) -> Result<String, ToolError> {
        let sandbox_id = format!("sbx_{}", Uuid::now_v7());
        let dir = self.sandbox_dir(&sandbox_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ToolError::Sandbox(format!("create failed: {e}")))?;
        debug!(sandbox_id, dir = %dir.display(), "sandbox directory created");
        Ok(sandbox_id)
    }

    async fn exec(&self, sandbox_id: &str, code: &str) -> Result<ExecOutput, ToolError> {
        let dir = self.sandbox_dir(sandbox_id);

        let output = tokio::process::Command::new(&self.command)
            .args(&self.args)
            .arg(code)
            .current_dir(&dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ToolError::Sandbox(format!("spawn failed: {e}")))?;

        Ok(ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    async fn destroy(&self, sandbox_id: &str) -> Result<(), ToolError> {
        let dir = self.sandbox_dir(sandbox_id);
        tokio::fs::remove_dir_all(&dir)
            .await
            .map_err(|e| ToolError::Sandbox(format!("destroy failed: {e}")))?;
        debug!(sandbox_id, "sandbox directory removed");
        Ok(())
    }
}
