// ABOUTME: Records owned by the deployment registry.
// ABOUTME: Deployment, per-phase progress, history events, rollback info, and phase metrics.

use serde::Serialize;
use std::collections::BTreeMap;

use super::phase::PhaseName;
use super::state::{DeploymentStatus, PhaseStatus};
use crate::types::{BackupId, DeploymentId, SessionId};

/// History event types appended by the orchestrator.
pub mod events {
    pub const INITIALIZED: &str = "initialized";
    pub const CONFIGURED: &str = "configured";
    pub const STARTED: &str = "started";
    pub const RESUMED: &str = "resumed";
    pub const PAUSED: &str = "paused";
    pub const CANCELLED: &str = "cancelled";
    pub const PHASE_STARTED: &str = "phase_started";
    pub const PHASE_COMPLETED: &str = "phase_completed";
    pub const PHASE_FAILED: &str = "phase_failed";
    pub const COMPLETED: &str = "completed";
    pub const FAILED: &str = "failed";
    pub const ROLLBACK_STARTED: &str = "rollback_started";
    pub const ROLLBACK_COMPLETED: &str = "rollback_completed";
    pub const ROLLBACK_FAILED: &str = "rollback_failed";
}

/// Result codes recorded in phase metrics.
pub mod result_codes {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const TIMEOUT: i32 = 124;
}

/// Compensating-action settings for a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackInfo {
    pub strategy: String,
    pub backup_id: Option<BackupId>,
}

impl Default for RollbackInfo {
    fn default() -> Self {
        Self {
            strategy: "recreate".to_string(),
            backup_id: None,
        }
    }
}

/// Timing and outcome of one phase execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseMetric {
    /// Seconds the handler ran.
    pub execution_time: f64,
    /// Seconds the handler was allowed.
    pub timeout_budget: u64,
    pub result_code: i32,
}

/// One tracked deployment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deployment {
    pub id: DeploymentId,
    pub session_id: SessionId,
    pub stack_name: String,
    pub deployment_type: String,
    pub status: DeploymentStatus,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub updated_at: i64,
    pub current_phase: Option<PhaseName>,
    pub overall_progress: f64,
    pub region: String,
    pub options: BTreeMap<String, String>,
    pub dependencies: Vec<DeploymentId>,
    pub rollback_info: RollbackInfo,
    pub metrics: BTreeMap<PhaseName, PhaseMetric>,
}

/// Progress of one phase for one deployment.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PhaseProgress {
    pub status: PhaseStatus,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    /// Percent complete, 0-100.
    pub progress: u8,
    pub message: String,
    /// Seconds between start and end.
    pub execution_time: f64,
}

/// Append-only history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEvent {
    pub timestamp: i64,
    pub event_type: String,
    pub message: String,
}

/// Phase progress tagged with its phase name, in catalog order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseEntry {
    pub name: PhaseName,
    #[serde(flatten)]
    pub progress: PhaseProgress,
}

/// Consistent copy of everything the registry holds for one deployment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeploymentSnapshot {
    pub deployment: Deployment,
    pub phases: Vec<PhaseEntry>,
    pub history: Vec<HistoryEvent>,
}

impl DeploymentSnapshot {
    pub fn phase(&self, name: PhaseName) -> Option<&PhaseProgress> {
        self.phases
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.progress)
    }
}
