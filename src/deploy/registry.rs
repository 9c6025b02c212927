// ABOUTME: In-memory deployment registry guarded by a single mutex.
// ABOUTME: Owns deployment records, phase progress, and append-only history.

use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::DeployError;
use super::phase::PhaseName;
use super::record::{
    Deployment, DeploymentSnapshot, HistoryEvent, PhaseEntry, PhaseMetric, PhaseProgress, events,
};
use super::state::{DeploymentStatus, PhaseStatus};
use crate::types::{BackupId, DeploymentId};

fn now() -> i64 {
    Utc::now().timestamp()
}

#[derive(Debug)]
struct Entry {
    deployment: Deployment,
    phases: Vec<PhaseEntry>,
    history: Vec<HistoryEvent>,
}

impl Entry {
    fn push_event(&mut self, event_type: &str, message: impl Into<String>) {
        self.history.push(HistoryEvent {
            timestamp: now(),
            event_type: event_type.to_string(),
            message: message.into(),
        });
    }

    fn phase_mut(&mut self, name: PhaseName) -> Option<&mut PhaseProgress> {
        self.phases
            .iter_mut()
            .find(|e| e.name == name)
            .map(|e| &mut e.progress)
    }

    fn touch(&mut self) {
        self.deployment.updated_at = now();
    }

    fn reset_phases(&mut self) {
        for entry in &mut self.phases {
            entry.progress = PhaseProgress::default();
        }
        self.deployment.overall_progress = 0.0;
        self.deployment.current_phase = None;
        self.deployment.metrics.clear();
    }

    fn set_status(&mut self, to: DeploymentStatus) {
        self.deployment.status = to;
        if matches!(
            to,
            DeploymentStatus::Completed
                | DeploymentStatus::Failed
                | DeploymentStatus::RolledBack
                | DeploymentStatus::Cancelled
        ) {
            self.deployment.completed_at = Some(now());
        }
        self.touch();
    }
}

/// How a run was entered by [`Registry::begin_run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStart {
    Fresh,
    Resumed,
    Restarted,
}

/// Completed outcome of one phase, written by the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseResult {
    pub success: bool,
    pub message: String,
    pub execution_time: f64,
    pub timeout_budget: u64,
    pub result_code: i32,
}

/// Shared store of all deployment state.
///
/// Every operation takes the lock once, so each call observes and leaves a
/// consistent record. Callers receive clones, never references.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Mutex<HashMap<DeploymentId, Entry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_entry<T>(
        &self,
        id: &DeploymentId,
        f: impl FnOnce(&mut Entry) -> Result<T, DeployError>,
    ) -> Result<T, DeployError> {
        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| DeployError::NotFound(id.clone()))?;
        f(entry)
    }

    /// Register a new deployment with zeroed progress for `phases`.
    ///
    /// An id whose previous session is terminal or failed starts a new
    /// session; its history is kept and appended to.
    pub fn insert(
        &self,
        deployment: Deployment,
        phases: impl IntoIterator<Item = PhaseName>,
    ) -> Result<(), DeployError> {
        let mut entries = self.entries.lock();
        let id = deployment.id.clone();

        let history = match entries.remove(&id) {
            None => Vec::new(),
            Some(existing) => {
                let status = existing.deployment.status;
                if !(status.is_terminal() || status == DeploymentStatus::Failed) {
                    entries.insert(id.clone(), existing);
                    return Err(DeployError::AlreadyExists(id));
                }
                existing.history
            }
        };

        let message = format!(
            "initialized session {} for stack {} ({})",
            deployment.session_id, deployment.stack_name, deployment.deployment_type
        );
        let mut entry = Entry {
            deployment,
            phases: phases
                .into_iter()
                .map(|name| PhaseEntry {
                    name,
                    progress: PhaseProgress::default(),
                })
                .collect(),
            history,
        };
        entry.push_event(events::INITIALIZED, message);
        entries.insert(id, entry);
        Ok(())
    }

    pub fn contains(&self, id: &DeploymentId) -> bool {
        self.entries.lock().contains_key(id)
    }

    pub fn get(&self, id: &DeploymentId) -> Option<Deployment> {
        self.entries.lock().get(id).map(|e| e.deployment.clone())
    }

    pub fn status(&self, id: &DeploymentId) -> Option<DeploymentStatus> {
        self.entries.lock().get(id).map(|e| e.deployment.status)
    }

    pub fn phase(&self, id: &DeploymentId, phase: PhaseName) -> Option<PhaseProgress> {
        self.entries
            .lock()
            .get(id)?
            .phases
            .iter()
            .find(|e| e.name == phase)
            .map(|e| e.progress.clone())
    }

    pub fn history(&self, id: &DeploymentId) -> Option<Vec<HistoryEvent>> {
        self.entries.lock().get(id).map(|e| e.history.clone())
    }

    pub fn snapshot(&self, id: &DeploymentId) -> Option<DeploymentSnapshot> {
        self.entries.lock().get(id).map(|e| DeploymentSnapshot {
            deployment: e.deployment.clone(),
            phases: e.phases.clone(),
            history: e.history.clone(),
        })
    }

    /// All deployment ids with their status, sorted by id.
    pub fn list(&self) -> Vec<(DeploymentId, DeploymentStatus)> {
        let mut all: Vec<_> = self
            .entries
            .lock()
            .iter()
            .map(|(id, e)| (id.clone(), e.deployment.status))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Apply a change to the deployment record, stamping `updated_at`.
    pub fn update<T>(
        &self,
        id: &DeploymentId,
        f: impl FnOnce(&mut Deployment) -> Result<T, DeployError>,
    ) -> Result<T, DeployError> {
        self.with_entry(id, |entry| {
            let value = f(&mut entry.deployment)?;
            entry.touch();
            Ok(value)
        })
    }

    /// Move to `to` if the transition table allows it, appending `event`.
    ///
    /// Returns the previous status.
    pub fn transition(
        &self,
        id: &DeploymentId,
        to: DeploymentStatus,
        event: (&str, String),
    ) -> Result<DeploymentStatus, DeployError> {
        self.with_entry(id, |entry| {
            let from = entry.deployment.status;
            if !from.can_transition_to(to) {
                return Err(DeployError::InvalidTransition {
                    id: id.clone(),
                    from,
                    to,
                });
            }
            entry.set_status(to);
            entry.push_event(event.0, event.1);
            Ok(from)
        })
    }

    /// Re-open a rolled back deployment for another rollback attempt.
    pub fn reopen_for_rollback(
        &self,
        id: &DeploymentId,
        event: (&str, String),
    ) -> Result<(), DeployError> {
        self.with_entry(id, |entry| {
            let from = entry.deployment.status;
            if from != DeploymentStatus::RolledBack {
                return Err(DeployError::InvalidTransition {
                    id: id.clone(),
                    from,
                    to: DeploymentStatus::RollingBack,
                });
            }
            tracing::warn!(deployment = %id, "forcing rollback of a rolled back deployment");
            entry.set_status(DeploymentStatus::RollingBack);
            entry.push_event(event.0, event.1);
            Ok(())
        })
    }

    /// Enter `running` for a start, resume, or forced restart.
    ///
    /// Pending starts fresh and paused resumes. With `force`, a failed run is
    /// restarted from a clean phase slate. Running and terminal deployments
    /// are never started.
    pub fn begin_run(&self, id: &DeploymentId, force: bool) -> Result<RunStart, DeployError> {
        self.with_entry(id, |entry| {
            let status = entry.deployment.status;
            let start = match status {
                DeploymentStatus::Pending => RunStart::Fresh,
                DeploymentStatus::Paused => RunStart::Resumed,
                DeploymentStatus::Failed if force => RunStart::Restarted,
                _ => {
                    return Err(DeployError::NotStartable {
                        id: id.clone(),
                        status,
                    });
                }
            };

            let (event_type, message) = match start {
                RunStart::Fresh => (events::STARTED, "deployment started".to_string()),
                RunStart::Resumed => (events::RESUMED, "deployment resumed".to_string()),
                RunStart::Restarted => {
                    entry.reset_phases();
                    (events::STARTED, "deployment restarted after failure".to_string())
                }
            };

            entry.deployment.status = DeploymentStatus::Running;
            entry.deployment.completed_at = None;
            if start != RunStart::Resumed || entry.deployment.started_at.is_none() {
                entry.deployment.started_at = Some(now());
            }
            entry.touch();
            entry.push_event(event_type, message);
            Ok(start)
        })
    }

    pub fn set_current_phase(&self, id: &DeploymentId, phase: PhaseName) -> Result<(), DeployError> {
        self.update(id, |d| {
            d.current_phase = Some(phase);
            Ok(())
        })
    }

    /// Mark a phase running and record `phase_started`.
    pub fn start_phase(&self, id: &DeploymentId, phase: PhaseName) -> Result<(), DeployError> {
        self.with_entry(id, |entry| {
            let progress = entry
                .phase_mut(phase)
                .ok_or_else(|| DeployError::InvalidCatalog(format!("no phase '{phase}'")))?;
            *progress = PhaseProgress {
                status: PhaseStatus::Running,
                start_time: Some(now()),
                ..PhaseProgress::default()
            };
            entry.touch();
            entry.push_event(events::PHASE_STARTED, format!("{phase} started"));
            Ok(())
        })
    }

    /// Record handler-reported progress for a running phase.
    ///
    /// Progress never decreases within a phase and is clamped to 100. Returns
    /// the stored percentage.
    pub fn report_progress(
        &self,
        id: &DeploymentId,
        phase: PhaseName,
        percent: u8,
        message: impl Into<String>,
    ) -> Result<u8, DeployError> {
        self.with_entry(id, |entry| {
            let progress = entry
                .phase_mut(phase)
                .ok_or_else(|| DeployError::InvalidCatalog(format!("no phase '{phase}'")))?;
            progress.progress = progress.progress.max(percent.min(100));
            progress.message = message.into();
            let stored = progress.progress;
            entry.touch();
            Ok(stored)
        })
    }

    /// Close out a phase with its result and update metrics and history.
    pub fn finish_phase(
        &self,
        id: &DeploymentId,
        phase: PhaseName,
        result: PhaseResult,
    ) -> Result<(), DeployError> {
        self.with_entry(id, |entry| {
            let progress = entry
                .phase_mut(phase)
                .ok_or_else(|| DeployError::InvalidCatalog(format!("no phase '{phase}'")))?;
            progress.status = if result.success {
                PhaseStatus::Completed
            } else {
                PhaseStatus::Failed
            };
            progress.end_time = Some(now());
            if result.success {
                progress.progress = 100;
            }
            progress.message = result.message.clone();
            progress.execution_time = result.execution_time;

            entry.deployment.metrics.insert(
                phase,
                PhaseMetric {
                    execution_time: result.execution_time,
                    timeout_budget: result.timeout_budget,
                    result_code: result.result_code,
                },
            );
            entry.touch();

            let (event_type, verb) = if result.success {
                (events::PHASE_COMPLETED, "completed")
            } else {
                (events::PHASE_FAILED, "failed")
            };
            entry.push_event(
                event_type,
                format!(
                    "{phase} {verb} in {:.1}s: {}",
                    result.execution_time, result.message
                ),
            );
            Ok(())
        })
    }

    /// Put an interrupted phase back to pending so a resume re-runs it.
    pub fn reset_phase(
        &self,
        id: &DeploymentId,
        phase: PhaseName,
        message: impl Into<String>,
    ) -> Result<(), DeployError> {
        self.with_entry(id, |entry| {
            let progress = entry
                .phase_mut(phase)
                .ok_or_else(|| DeployError::InvalidCatalog(format!("no phase '{phase}'")))?;
            *progress = PhaseProgress {
                message: message.into(),
                ..PhaseProgress::default()
            };
            entry.touch();
            Ok(())
        })
    }

    /// Recompute overall progress from finished phases; never decreases.
    pub fn recompute_progress(&self, id: &DeploymentId) -> Result<f64, DeployError> {
        self.with_entry(id, |entry| {
            let total = entry.phases.len();
            let finished = entry
                .phases
                .iter()
                .filter(|e| {
                    matches!(e.progress.status, PhaseStatus::Completed | PhaseStatus::Failed)
                })
                .count();
            let computed = if total == 0 {
                0.0
            } else {
                finished as f64 * 100.0 / total as f64
            };
            let progress = entry.deployment.overall_progress.max(computed);
            entry.deployment.overall_progress = progress;
            entry.touch();
            Ok(progress)
        })
    }

    pub fn append_history(
        &self,
        id: &DeploymentId,
        event_type: &str,
        message: impl Into<String>,
    ) -> Result<(), DeployError> {
        self.with_entry(id, |entry| {
            entry.push_event(event_type, message);
            Ok(())
        })
    }

    pub fn set_backup_id(&self, id: &DeploymentId, backup: BackupId) -> Result<(), DeployError> {
        self.update(id, |d| {
            d.rollback_info.backup_id = Some(backup);
            Ok(())
        })
    }
}
