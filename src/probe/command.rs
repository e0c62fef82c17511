//! Base command execution abstraction
//!
//! Provides the foundational trait for executing external commands, enabling
//! dependency injection for testing. Every execution carries a hard timeout
//! so a wedged child process cannot stall a monitoring cycle.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status_code == 0
    }
}

#[derive(Debug, Error, Clone)]
pub enum CommandError {
    #[error("command execution failed: {message}")]
    ExecutionFailed { message: String },
    #[error("command not found: {command}")]
    CommandNotFound { command: String },
    #[error("command timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("io error: {message}")]
    Io { message: String },
}

/// Trait for executing external commands
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError>;
}

/// Real implementation using tokio::process with a hard deadline.
/// The child is killed when the deadline fires.
pub struct TokioCommandExecutor;

#[async_trait]
impl CommandExecutor for TokioCommandExecutor {
    async fn execute(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let child = tokio::process::Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(timeout, child).await {
            Err(_) => {
                return Err(CommandError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CommandError::CommandNotFound {
                    command: program.to_string(),
                })
            }
            Ok(Err(e)) => {
                return Err(CommandError::Io {
                    message: e.to_string(),
                })
            }
            Ok(Ok(output)) => output,
        };

        Ok(CommandOutput {
            status_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
