// ABOUTME: Environment variables exposed to phase step commands.
// ABOUTME: Describes the deployment being run so scripts need no extra arguments.

use std::collections::HashMap;

use crate::deploy::{Deployment, PhaseName};

/// Prefix of the variables set here; manifests cannot define their own.
pub const ENV_PREFIX: &str = "ROLLWRIGHT_";

/// Variables describing `deployment`.
pub fn deployment_env(deployment: &Deployment) -> HashMap<String, String> {
    let mut env = HashMap::new();
    env.insert(
        "ROLLWRIGHT_DEPLOYMENT_ID".to_string(),
        deployment.id.to_string(),
    );
    env.insert(
        "ROLLWRIGHT_SESSION_ID".to_string(),
        deployment.session_id.to_string(),
    );
    env.insert("ROLLWRIGHT_STACK".to_string(), deployment.stack_name.clone());
    env.insert(
        "ROLLWRIGHT_TYPE".to_string(),
        deployment.deployment_type.clone(),
    );
    env.insert("ROLLWRIGHT_REGION".to_string(), deployment.region.clone());
    if let Some(ref backup) = deployment.rollback_info.backup_id {
        env.insert("ROLLWRIGHT_BACKUP_ID".to_string(), backup.to_string());
    }
    env
}

/// [`deployment_env`] plus the phase being run.
pub fn phase_env(deployment: &Deployment, phase: PhaseName) -> HashMap<String, String> {
    let mut env = deployment_env(deployment);
    env.insert("ROLLWRIGHT_PHASE".to_string(), phase.to_string());
    env
}
