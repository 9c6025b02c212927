// ABOUTME: Run command implementation.
// ABOUTME: Initializes manifest deployments and runs them in dependency-ordered waves.

use futures::future::join_all;
use rollwright::config::{DeploymentConfig, Manifest};
use rollwright::deploy::{DeploymentStatus, Orchestrator, StatusFormat, options};
use rollwright::error::{Error, Result};
use rollwright::handlers;
use rollwright::output::{Output, OutputMode};
use rollwright::types::DeploymentId;
use std::collections::HashSet;
use std::sync::Arc;

/// Build an orchestrator wired to the manifest's commands and policies.
pub fn orchestrator_for(manifest: &Manifest) -> Result<Orchestrator> {
    Ok(Orchestrator::builder()
        .catalog(manifest.phases.catalog()?)
        .handlers(handlers::standard(manifest.phases.plan()?))
        .retry_policy(manifest.retry.clone())
        .compensator(Arc::new(manifest.rollback.compensator()))
        .default_region(manifest.region.clone())
        .build())
}

/// Selected deployments plus everything they depend on, in manifest order.
fn select<'a>(manifest: &'a Manifest, only: &'a [String]) -> Result<Vec<&'a DeploymentConfig>> {
    if only.is_empty() {
        return Ok(manifest.deployments.iter().collect());
    }

    let mut wanted = HashSet::new();
    let mut stack: Vec<&str> = only.iter().map(String::as_str).collect();
    while let Some(id) = stack.pop() {
        let deployment = manifest
            .deployment(id)
            .ok_or_else(|| Error::UnknownDeployment(id.to_string()))?;
        if wanted.insert(deployment.id.as_str()) {
            stack.extend(deployment.dependencies.iter().map(String::as_str));
        }
    }

    Ok(manifest
        .deployments
        .iter()
        .filter(|d| wanted.contains(d.id.as_str()))
        .collect())
}

pub async fn run(
    manifest: Manifest,
    only: &[String],
    dry_run: bool,
    format: StatusFormat,
    mut output: Output,
) -> Result<()> {
    output.start_timer();
    let orchestrator = orchestrator_for(&manifest)?;

    let mut ids = Vec::new();
    for deployment in select(&manifest, only)? {
        let mut overrides = manifest.overrides_for(deployment)?;
        if dry_run {
            overrides.insert(options::DRY_RUN.to_string(), "true".to_string());
        }
        let id = orchestrator.init(
            &deployment.id,
            &deployment.stack,
            &deployment.deployment_type,
            &overrides,
        )?;
        ids.push(id);
    }
    let total = ids.len();
    output.progress(&format!("Running {total} deployment(s)"));

    let mut failed = 0;
    let mut pending = ids.clone();
    while !pending.is_empty() {
        let waiting: HashSet<DeploymentId> = pending.iter().cloned().collect();
        let mut ready = Vec::new();
        let mut later = Vec::new();

        for id in pending {
            let dependencies = orchestrator
                .get(&id)
                .map(|d| d.dependencies)
                .unwrap_or_default();
            if dependencies.iter().any(|dep| waiting.contains(dep)) {
                later.push(id);
            } else if dependencies
                .iter()
                .all(|dep| orchestrator.registry().status(dep) == Some(DeploymentStatus::Completed))
            {
                ready.push(id);
            } else {
                output.error(&format!("{id}: skipped, a dependency did not complete"));
                failed += 1;
            }
        }

        if ready.is_empty() {
            for id in &later {
                output.error(&format!("{id}: blocked by unresolved dependencies"));
            }
            failed += later.len();
            break;
        }

        for id in &ready {
            output.progress(&format!("  → Starting {id}"));
        }
        let handles = ready.iter().map(|id| orchestrator.spawn(id.clone(), false));
        let results = join_all(handles).await;

        for (id, result) in ready.iter().zip(results) {
            match result {
                Ok(Ok(report)) => {
                    for warning in &report.warnings {
                        output.warning(&warning.message);
                    }
                    if report.status == DeploymentStatus::Completed {
                        output.progress(&format!("  ✓ {id} completed"));
                    } else {
                        output.error(&format!("{id}: stopped while {}", report.status));
                        failed += 1;
                    }
                }
                Ok(Err(e)) => {
                    output.error(&e.to_string());
                    failed += 1;
                }
                Err(e) => {
                    output.error(&format!("{id}: task failed: {e}"));
                    failed += 1;
                }
            }
        }

        pending = later;
    }

    for id in &ids {
        if output.mode() == OutputMode::Json {
            output.record("status", &orchestrator.snapshot(id)?);
        } else {
            output.report(&orchestrator.status(id, format)?);
        }
    }

    if failed > 0 {
        return Err(Error::RunFailed { failed, total });
    }
    output.success(&format!("{total} deployment(s) completed"));
    Ok(())
}
