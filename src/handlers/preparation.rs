// ABOUTME: Preparation phase handler.
// ABOUTME: Creates and records a backup artifact when backups are enabled.

use async_trait::async_trait;
use chrono::Utc;

use super::env::phase_env;
use crate::deploy::{PhaseContext, PhaseHandler, PhaseOutcome};
use crate::retry::ShellCommand;
use crate::types::BackupId;

/// Records a backup id for later snapshot rollback, optionally running a
/// backup command first.
#[derive(Debug, Clone, Default)]
pub struct PreparationHandler {
    backup_command: Option<String>,
}

impl PreparationHandler {
    pub fn new(backup_command: Option<String>) -> Self {
        Self { backup_command }
    }
}

#[async_trait]
impl PhaseHandler for PreparationHandler {
    async fn handle(&self, ctx: PhaseContext) -> PhaseOutcome {
        let deployment = match ctx.deployment() {
            Ok(d) => d,
            Err(e) => return PhaseOutcome::failure(e.to_string()),
        };
        let options = ctx.options();

        if !options.backup_enabled {
            ctx.report_progress(100, "backup disabled");
            return PhaseOutcome::success("backup disabled");
        }

        // A resumed run reuses the backup taken earlier.
        let backup = deployment
            .rollback_info
            .backup_id
            .clone()
            .unwrap_or_else(|| BackupId::derive(&deployment.id, Utc::now().timestamp()));
        ctx.report_progress(20, format!("preparing backup {backup}"));

        if let Some(command) = &self.backup_command {
            if options.dry_run {
                tracing::info!(deployment = %deployment.id, %backup, "dry run: skipping backup command");
            } else {
                let op = ShellCommand::new(command)
                    .envs(phase_env(&deployment, ctx.phase()))
                    .env("ROLLWRIGHT_BACKUP_ID", backup.as_str());
                if let Err(e) = ctx.retry().s3("create-backup", &op).await {
                    return PhaseOutcome::failure(format!("backup failed: {e}"));
                }
            }
        }
        ctx.report_progress(80, "backup created");

        if let Err(e) = ctx.record_backup(backup.clone()) {
            return PhaseOutcome::failure(format!("failed to record backup: {e}"));
        }
        ctx.report_progress(100, format!("backup {backup} recorded"));

        PhaseOutcome::success(format!("backup {backup} recorded"))
    }
}
