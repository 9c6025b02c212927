// ABOUTME: Compensator that runs configured shell commands for each rollback strategy.
// ABOUTME: A strategy without a command succeeds without doing anything.

use async_trait::async_trait;

use super::env::deployment_env;
use crate::deploy::{Compensator, Deployment};
use crate::retry::{Operation, ShellCommand};
use crate::types::BackupId;

/// Rollback commands keyed by strategy.
#[derive(Debug, Clone, Default)]
pub struct CommandCompensator {
    recreate: Option<String>,
    snapshot: Option<String>,
    blue_green: Option<String>,
}

impl CommandCompensator {
    pub fn new(
        recreate: Option<String>,
        snapshot: Option<String>,
        blue_green: Option<String>,
    ) -> Self {
        Self {
            recreate,
            snapshot,
            blue_green,
        }
    }

    async fn run(
        &self,
        action: &str,
        command: Option<&String>,
        cmd: impl FnOnce(&String) -> ShellCommand,
    ) -> Result<(), String> {
        let Some(command) = command else {
            tracing::debug!(action, "no rollback command configured");
            return Ok(());
        };

        tracing::info!(action, "running rollback command");
        let output = cmd(command)
            .invoke()
            .await
            .map_err(|e| format!("{action}: failed to start command: {e}"))?;
        if output.success() {
            Ok(())
        } else {
            Err(format!(
                "{action}: command exited with {}: {}",
                output.exit_code,
                output.error_text().trim()
            ))
        }
    }
}

#[async_trait]
impl Compensator for CommandCompensator {
    async fn recreate(&self, deployment: &Deployment) -> Result<(), String> {
        self.run("recreate", self.recreate.as_ref(), |c| {
            ShellCommand::new(c).envs(deployment_env(deployment))
        })
        .await
    }

    async fn restore_snapshot(&self, deployment: &Deployment, backup: &BackupId) -> Result<(), String> {
        self.run("snapshot", self.snapshot.as_ref(), |c| {
            ShellCommand::new(c)
                .envs(deployment_env(deployment))
                .env("ROLLWRIGHT_BACKUP_ID", backup.as_str())
        })
        .await
    }

    async fn switch_traffic(&self, deployment: &Deployment) -> Result<(), String> {
        self.run("blue_green", self.blue_green.as_ref(), |c| {
            ShellCommand::new(c).envs(deployment_env(deployment))
        })
        .await
    }
}
