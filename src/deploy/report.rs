// ABOUTME: Status rendering for deployment snapshots.
// ABOUTME: Summary and detailed text views plus a JSON structured view.

use std::fmt::Write as _;
use std::str::FromStr;

use super::DeployError;
use super::record::DeploymentSnapshot;

/// Rendering requested by a status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFormat {
    #[default]
    Summary,
    Detailed,
    Structured,
}

impl FromStr for StatusFormat {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summary" => Ok(Self::Summary),
            "detailed" => Ok(Self::Detailed),
            "structured" | "json" => Ok(Self::Structured),
            other => Err(DeployError::Validation(format!(
                "unknown status format '{other}' (expected summary, detailed, or structured)"
            ))),
        }
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Render a snapshot in the requested format.
pub fn render(snapshot: &DeploymentSnapshot, format: StatusFormat) -> Result<String, DeployError> {
    match format {
        StatusFormat::Summary => Ok(summary(snapshot)),
        StatusFormat::Detailed => Ok(detailed(snapshot)),
        StatusFormat::Structured => serde_json::to_string_pretty(snapshot)
            .map_err(|e| DeployError::Validation(format!("cannot encode status: {e}"))),
    }
}

fn summary(snapshot: &DeploymentSnapshot) -> String {
    let d = &snapshot.deployment;
    format!(
        "id: {}\nstatus: {}\noverall_progress: {:.1}\ncurrent_phase: {}\n",
        d.id,
        d.status,
        d.overall_progress,
        opt(d.current_phase)
    )
}

// Writes to a String never fail, so results are discarded.
fn detailed(snapshot: &DeploymentSnapshot) -> String {
    let d = &snapshot.deployment;
    let mut out = summary(snapshot);

    let _ = writeln!(out, "session_id: {}", d.session_id);
    let _ = writeln!(out, "stack_name: {}", d.stack_name);
    let _ = writeln!(out, "deployment_type: {}", d.deployment_type);
    let _ = writeln!(out, "region: {}", d.region);
    let _ = writeln!(out, "created_at: {}", d.created_at);
    let _ = writeln!(out, "started_at: {}", opt(d.started_at));
    let _ = writeln!(out, "completed_at: {}", opt(d.completed_at));
    let _ = writeln!(out, "updated_at: {}", d.updated_at);
    let deps: Vec<&str> = d.dependencies.iter().map(|id| id.as_str()).collect();
    let _ = writeln!(out, "dependencies: {}", deps.join(","));
    let _ = writeln!(out, "rollback_strategy: {}", d.rollback_info.strategy);
    let _ = writeln!(out, "backup_id: {}", opt(d.rollback_info.backup_id.as_ref()));

    out.push_str("options:\n");
    for (key, value) in &d.options {
        let _ = writeln!(out, "  {key}: {value}");
    }

    out.push_str("phases:\n");
    for entry in &snapshot.phases {
        let p = &entry.progress;
        let _ = writeln!(out, "  {}:", entry.name);
        let _ = writeln!(out, "    status: {}", p.status);
        let _ = writeln!(out, "    start_time: {}", opt(p.start_time));
        let _ = writeln!(out, "    end_time: {}", opt(p.end_time));
        let _ = writeln!(out, "    progress: {}", p.progress);
        let _ = writeln!(out, "    message: {}", p.message);
        let _ = writeln!(out, "    execution_time: {:.1}", p.execution_time);
    }

    out.push_str("metrics:\n");
    for (phase, metric) in &d.metrics {
        let _ = writeln!(
            out,
            "  {phase}: execution_time={:.1} timeout_budget={} result_code={}",
            metric.execution_time, metric.timeout_budget, metric.result_code
        );
    }

    out.push_str("history:\n");
    for event in &snapshot.history {
        let _ = writeln!(
            out,
            "  {} {} {}",
            event.timestamp, event.event_type, event.message
        );
    }
    out
}
