// ABOUTME: Manifest values that may be read from the environment.
// ABOUTME: Resolves webhook URLs, deployment options, and step env into the strings deployments consume.

use crate::error::{Error, Result};
use crate::handlers::ENV_PREFIX;
use serde::Deserialize;
use std::collections::HashMap;

/// A string written inline or taken from an environment variable.
///
/// An empty variable counts as unset, so `HOOK_URL=` falls back to `default`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        env: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    /// Resolve the value. `field` names its manifest location in errors.
    pub fn resolve(&self, field: &str) -> Result<String> {
        let (var, default) = match self {
            EnvValue::Literal(s) => return Ok(s.clone()),
            EnvValue::FromEnv { env, default } => (env, default),
        };
        match std::env::var(var) {
            Ok(value) if !value.is_empty() => Ok(value),
            _ => default.clone().ok_or_else(|| Error::MissingEnvVar {
                var: var.clone(),
                field: field.to_string(),
            }),
        }
    }
}

fn is_env_name(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Extra environment for one step's command.
///
/// Keys must be shell variable names outside the `ROLLWRIGHT_` namespace,
/// which carries the deployment being run.
pub fn resolve_step_env(
    step: &str,
    env: &HashMap<String, EnvValue>,
) -> Result<HashMap<String, String>> {
    env.iter()
        .map(|(key, value)| {
            if !is_env_name(key) {
                return Err(Error::InvalidConfig(format!(
                    "step '{step}': '{key}' is not a valid environment variable name"
                )));
            }
            if key.starts_with(ENV_PREFIX) {
                return Err(Error::InvalidConfig(format!(
                    "step '{step}': {key} is reserved for deployment variables"
                )));
            }
            let resolved = value.resolve(&format!("step '{step}' env {key}"))?;
            Ok((key.clone(), resolved))
        })
        .collect()
}

/// Deployment option value: a YAML scalar or an env reference.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(EnvValue),
}

impl ScalarValue {
    /// Render option `key` the way deployment options are stored.
    ///
    /// Whole floats lose their fraction, so `timeout: 900.0` still parses as seconds.
    pub fn resolve(&self, key: &str) -> Result<String> {
        match self {
            ScalarValue::Bool(b) => Ok(b.to_string()),
            ScalarValue::Integer(n) => Ok(n.to_string()),
            ScalarValue::Float(f) if f.is_finite() && f.fract() == 0.0 => Ok(format!("{f:.0}")),
            ScalarValue::Float(f) => Ok(f.to_string()),
            ScalarValue::Text(value) => value.resolve(&format!("option {key}")),
        }
    }
}
