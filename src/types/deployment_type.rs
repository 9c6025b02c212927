// ABOUTME: Deployment type enumeration (simple, spot, ondemand).
// ABOUTME: Parsed from the free-form type stored on a deployment record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown deployment type '{0}' (expected simple, spot, or ondemand)")]
pub struct DeploymentTypeError(pub String);

/// How compute capacity is acquired for a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentType {
    Simple,
    Spot,
    OnDemand,
}

impl DeploymentType {
    pub const ALL: [DeploymentType; 3] = [
        DeploymentType::Simple,
        DeploymentType::Spot,
        DeploymentType::OnDemand,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentType::Simple => "simple",
            DeploymentType::Spot => "spot",
            DeploymentType::OnDemand => "ondemand",
        }
    }
}

impl FromStr for DeploymentType {
    type Err = DeploymentTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeploymentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DeploymentTypeError(s.to_string()))
    }
}

impl fmt::Display for DeploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_types() {
        assert_eq!("spot".parse::<DeploymentType>(), Ok(DeploymentType::Spot));
        assert_eq!(
            "ondemand".parse::<DeploymentType>(),
            Ok(DeploymentType::OnDemand)
        );
    }

    #[test]
    fn parsing_is_case_sensitive() {
        assert!("Spot".parse::<DeploymentType>().is_err());
    }
}
