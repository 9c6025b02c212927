// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates rollwright.yml template files.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{DeploymentType, StackName};

use super::{CONFIG_FILENAME, Manifest};

pub fn init_config(
    dir: &Path,
    stack: Option<&str>,
    deployment_type: Option<&str>,
    force: bool,
) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut manifest = Manifest::template();

    if let Some(s) = stack {
        let stack = StackName::new(s).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        manifest.deployments.head.stack = stack.to_string();
    }

    if let Some(t) = deployment_type {
        let kind: DeploymentType = t
            .parse()
            .map_err(|e: crate::types::DeploymentTypeError| Error::InvalidConfig(e.to_string()))?;
        manifest.deployments.head.deployment_type = kind.to_string();
    }

    let yaml = generate_template_yaml(&manifest);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(manifest: &Manifest) -> String {
    let first = manifest.deployments.first();
    format!(
        r#"region: {}

retry:
  failure_threshold: {}
  recovery_timeout: 5m
  max_delay: 60s

# notifications:
#   webhook_url:
#     env: ROLLWRIGHT_WEBHOOK_URL

phases:
  # validation:
  #   credentials: aws sts get-caller-identity
  #   quota: ./scripts/check-quota.sh
  # preparation:
  #   backup: aws s3 cp state.json "s3://my-backups/$ROLLWRIGHT_BACKUP_ID.json"
  infrastructure:
    - name: deploy-stack
      service: cloudformation
      run: echo "deploying $ROLLWRIGHT_STACK"
  application: []
  verification: []
  cleanup: []

# rollback:
#   recreate: ./scripts/recreate.sh
#   snapshot: ./scripts/restore.sh "$ROLLWRIGHT_BACKUP_ID"

deployments:
  - id: {}
    stack: {}
    type: {}
    options:
      dryRun: true
"#,
        manifest.region,
        manifest.retry.failure_threshold,
        first.id,
        first.stack,
        first.deployment_type
    )
}
