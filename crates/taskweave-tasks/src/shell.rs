//! Shell command capability object

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::debug;

use crate::task::{Executable, LeafResult};

/// Environment variable carrying the run's shared data as JSON
pub const DATA_ENV_VAR: &str = "TASKWEAVE_DATA";

/// A leaf that runs a command through a shell.
///
/// The result is `{"stdout", "stderr", "exit_code"}`; a non-zero exit fails
/// the leaf with the exit code and captured stderr.
#[derive(Debug, Clone)]
pub struct ShellTask {
    command: String,
    shell: String,
    cwd: Option<PathBuf>,
    env: HashMap<String, String>,
}

impl ShellTask {
    /// Run `command` with `sh -c`
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            shell: "sh".to_string(),
            cwd: None,
            env: HashMap::new(),
        }
    }

    /// Use a different shell program
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Run in the given directory
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Add environment variables
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    /// The command line
    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl Executable<Value> for ShellTask {
    async fn execute(&self, data: Arc<Value>) -> LeafResult {
        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(&self.command)
            .envs(&self.env)
            .env(DATA_ENV_VAR, data.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        debug!(command = %self.command, shell = %self.shell, "spawning shell command");
        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to spawn '{}'", self.shell))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            anyhow::bail!("Command exited with code {}: {}", code, stderr);
        }

        Ok(json!({
            "stdout": stdout,
            "stderr": stderr,
            "exit_code": output.status.code().unwrap_or(0),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo() {
        let task = ShellTask::new("echo hello");
        let result = task.execute(Arc::new(Value::Null)).await.unwrap();
        assert_eq!(result["stdout"], "hello");
        assert_eq!(result["exit_code"], 0);
    }

    #[tokio::test]
    async fn test_data_is_exported() {
        let task = ShellTask::new("printf '%s' \"$TASKWEAVE_DATA\"");
        let result = task.execute(Arc::new(json!({ "n": 1 }))).await.unwrap();
        assert_eq!(result["stdout"], r#"{"n":1}"#);
    }

    #[tokio::test]
    async fn test_env_and_cwd() {
        let dir = tempfile::tempdir().unwrap();
        let task = ShellTask::new("echo \"$GREETING\" && pwd")
            .with_cwd(dir.path())
            .with_env(HashMap::from([("GREETING".to_string(), "hi".to_string())]));

        let result = task.execute(Arc::new(Value::Null)).await.unwrap();
        let stdout = result["stdout"].as_str().unwrap();
        assert!(stdout.starts_with("hi\n"));
        let expected = dir.path().canonicalize().unwrap();
        let printed = PathBuf::from(stdout.lines().nth(1).unwrap())
            .canonicalize()
            .unwrap();
        assert_eq!(printed, expected);
    }

    #[tokio::test]
    async fn test_nonzero_exit_fails() {
        let task = ShellTask::new("echo oops >&2; exit 3");
        let err = task.execute(Arc::new(Value::Null)).await.unwrap_err();
        assert_eq!(err.to_string(), "Command exited with code 3: oops");
    }

    #[tokio::test]
    async fn test_missing_shell_fails() {
        let task = ShellTask::new("true").with_shell("/definitely/not/a/shell");
        let err = task.execute(Arc::new(Value::Null)).await.unwrap_err();
        assert!(err.to_string().contains("Failed to spawn"));
    }
}
