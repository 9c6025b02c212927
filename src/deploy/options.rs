// ABOUTME: Deployment option keys, defaults, and a typed view over the option map.
// ABOUTME: Options are stored as strings; parsing happens at configuration and read time.

use std::collections::BTreeMap;
use std::time::Duration;

use super::DeployError;

pub const TIMEOUT: &str = "timeout";
pub const RETRY_ATTEMPTS: &str = "retryAttempts";
pub const FAIL_FAST: &str = "failFast";
pub const DRY_RUN: &str = "dryRun";
pub const BACKUP_ENABLED: &str = "backupEnabled";
pub const ROLLBACK_ENABLED: &str = "rollbackEnabled";
pub const NOTIFICATIONS_ENABLED: &str = "notificationsEnabled";
pub const WEBHOOK_URL: &str = "webhookUrl";

/// Keys applied to record fields instead of the option map.
pub const DEPENDENCIES: &str = "dependencies";
pub const ROLLBACK_STRATEGY: &str = "rollbackStrategy";
pub const REGION: &str = "region";

/// Default option map every deployment starts from.
pub fn defaults() -> BTreeMap<String, String> {
    [
        (TIMEOUT, "3600"),
        (RETRY_ATTEMPTS, "3"),
        (FAIL_FAST, "false"),
        (DRY_RUN, "false"),
        (BACKUP_ENABLED, "true"),
        (ROLLBACK_ENABLED, "true"),
        (NOTIFICATIONS_ENABLED, "false"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

/// Reject values that would not parse for typed keys.
pub fn validate(key: &str, value: &str) -> Result<(), DeployError> {
    let ok = match key {
        TIMEOUT | RETRY_ATTEMPTS => value.trim().parse::<u64>().is_ok(),
        FAIL_FAST | DRY_RUN | BACKUP_ENABLED | ROLLBACK_ENABLED | NOTIFICATIONS_ENABLED => {
            parse_bool(value).is_some()
        }
        _ => true,
    };

    if ok {
        Ok(())
    } else {
        Err(DeployError::InvalidOption {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

/// Parsed view of a deployment's option map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentOptions {
    pub timeout: Duration,
    pub retry_attempts: u32,
    pub fail_fast: bool,
    pub dry_run: bool,
    pub backup_enabled: bool,
    pub rollback_enabled: bool,
    pub notifications_enabled: bool,
    pub webhook_url: Option<String>,
}

impl Default for DeploymentOptions {
    fn default() -> Self {
        Self::from_map(&defaults())
    }
}

impl DeploymentOptions {
    /// Parse known keys; unparsable values fall back to the defaults.
    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        let flag = |key: &str, default: bool| {
            map.get(key).and_then(|v| parse_bool(v)).unwrap_or(default)
        };
        let number = |key: &str, default: u64| {
            map.get(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };

        Self {
            timeout: Duration::from_secs(number(TIMEOUT, 3600)),
            retry_attempts: u32::try_from(number(RETRY_ATTEMPTS, 3)).unwrap_or(u32::MAX),
            fail_fast: flag(FAIL_FAST, false),
            dry_run: flag(DRY_RUN, false),
            backup_enabled: flag(BACKUP_ENABLED, true),
            rollback_enabled: flag(ROLLBACK_ENABLED, true),
            notifications_enabled: flag(NOTIFICATIONS_ENABLED, false),
            webhook_url: map
                .get(WEBHOOK_URL)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        }
    }

    /// Webhook destination when notifications are enabled and configured.
    pub fn notification_target(&self) -> Option<&str> {
        if self.notifications_enabled {
            self.webhook_url.as_deref()
        } else {
            None
        }
    }
}

/// Split a comma-separated dependency list, dropping blanks.
pub fn parse_dependencies(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
