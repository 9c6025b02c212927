// ABOUTME: Custom serde deserializers for manifest types.
// ABOUTME: Enforces a non-empty deployment list and non-blank identifiers.

use nonempty::NonEmpty;
use serde::Deserialize;

use super::DeploymentConfig;

pub fn deserialize_deployments<'de, D>(
    deserializer: D,
) -> Result<NonEmpty<DeploymentConfig>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let deployments: Vec<DeploymentConfig> = Vec::deserialize(deserializer)?;
    NonEmpty::from_vec(deployments)
        .ok_or_else(|| serde::de::Error::custom("at least one deployment is required"))
}

pub fn deserialize_non_blank<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(serde::de::Error::custom("value must not be empty"));
    }
    Ok(trimmed.to_string())
}

/// Accepts either a YAML list or a comma-separated string.
pub fn deserialize_id_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdList {
        List(Vec<String>),
        Joined(String),
    }

    let ids = match IdList::deserialize(deserializer)? {
        IdList::List(ids) => ids,
        IdList::Joined(s) => crate::deploy::options::parse_dependencies(&s),
    };
    Ok(ids
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect())
}
