// ABOUTME: External operations invoked through the retry controller.
// ABOUTME: Captures exit status, stdout, and stderr for shell commands and closures.

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Exit code reported when an attempt exceeds its execution ceiling.
pub const EXIT_TIMEOUT: i32 = 124;
/// Exit code reported when an operation could not be started at all.
pub const EXIT_SPAWN_FAILED: i32 = 127;

/// Captured result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Successful output with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Failed output with the given exit code and stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub(crate) fn timed_out(ceiling: Duration) -> Self {
        Self::failed(
            EXIT_TIMEOUT,
            format!("Timeout: operation exceeded {}s", ceiling.as_secs()),
        )
    }

    pub(crate) fn spawn_failed(err: std::io::Error) -> Self {
        Self::failed(EXIT_SPAWN_FAILED, format!("failed to start operation: {err}"))
    }

    /// Text used for classification: stderr, or stdout when stderr is empty.
    pub fn error_text(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// An external call the retry controller can invoke repeatedly.
#[async_trait]
pub trait Operation: Send + Sync {
    async fn invoke(&self) -> std::io::Result<CommandOutput>;
}

/// Runs a script through `sh -c`.
#[derive(Debug, Clone)]
pub struct ShellCommand {
    script: String,
    env: HashMap<String, String>,
}

impl ShellCommand {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            env: HashMap::new(),
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs(mut self, vars: HashMap<String, String>) -> Self {
        self.env.extend(vars);
        self
    }

    pub fn script(&self) -> &str {
        &self.script
    }
}

#[async_trait]
impl Operation for ShellCommand {
    async fn invoke(&self) -> std::io::Result<CommandOutput> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.script)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Adapts an async closure into an [`Operation`].
pub struct FnOperation<F>(F);

/// Wrap an async closure as an [`Operation`].
pub fn from_fn<F, Fut>(f: F) -> FnOperation<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = std::io::Result<CommandOutput>> + Send,
{
    FnOperation(f)
}

#[async_trait]
impl<F, Fut> Operation for FnOperation<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = std::io::Result<CommandOutput>> + Send,
{
    async fn invoke(&self) -> std::io::Result<CommandOutput> {
        (self.0)().await
    }
}
