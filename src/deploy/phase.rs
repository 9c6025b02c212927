// ABOUTME: Phase catalog shared by all deployments.
// ABOUTME: Ordered, non-empty list of named phases with timeout budgets and required flags.

use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::DeployError;

/// Canonical phase names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PhaseName {
    Validation,
    Preparation,
    Infrastructure,
    Application,
    Verification,
    Cleanup,
}

impl PhaseName {
    pub const ALL: [PhaseName; 6] = [
        PhaseName::Validation,
        PhaseName::Preparation,
        PhaseName::Infrastructure,
        PhaseName::Application,
        PhaseName::Verification,
        PhaseName::Cleanup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseName::Validation => "validation",
            PhaseName::Preparation => "preparation",
            PhaseName::Infrastructure => "infrastructure",
            PhaseName::Application => "application",
            PhaseName::Verification => "verification",
            PhaseName::Cleanup => "cleanup",
        }
    }
}

impl FromStr for PhaseName {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PhaseName::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| DeployError::InvalidCatalog(format!("unknown phase '{s}'")))
    }
}

impl fmt::Display for PhaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the phase catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseSpec {
    pub name: PhaseName,
    pub order: u32,
    pub description: String,
    #[serde(rename = "timeout_seconds", serialize_with = "as_seconds")]
    pub timeout: Duration,
    pub required: bool,
}

fn as_seconds<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

impl PhaseSpec {
    pub fn new(
        name: PhaseName,
        order: u32,
        description: impl Into<String>,
        timeout: Duration,
        required: bool,
    ) -> Self {
        Self {
            name,
            order,
            description: description.into(),
            timeout,
            required,
        }
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout.as_secs()
    }
}

/// Ordered phase catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseCatalog {
    phases: NonEmpty<PhaseSpec>,
}

impl PhaseCatalog {
    /// Build a catalog, sorted by `order`.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::InvalidCatalog` when the list is empty, an order is
    /// zero, or a name or order repeats.
    pub fn new(mut specs: Vec<PhaseSpec>) -> Result<Self, DeployError> {
        specs.sort_by_key(|s| s.order);

        let mut names = HashSet::new();
        let mut orders = HashSet::new();
        for spec in &specs {
            if spec.order == 0 {
                return Err(DeployError::InvalidCatalog(format!(
                    "phase '{}' must have a positive order",
                    spec.name
                )));
            }
            if !names.insert(spec.name) {
                return Err(DeployError::InvalidCatalog(format!(
                    "phase '{}' appears more than once",
                    spec.name
                )));
            }
            if !orders.insert(spec.order) {
                return Err(DeployError::InvalidCatalog(format!(
                    "order {} is used by more than one phase",
                    spec.order
                )));
            }
        }

        let phases = NonEmpty::from_vec(specs)
            .ok_or_else(|| DeployError::InvalidCatalog("catalog has no phases".to_string()))?;
        Ok(Self { phases })
    }

    /// The six canonical phases.
    pub fn standard() -> Self {
        let secs = Duration::from_secs;
        let phases = NonEmpty::from((
            PhaseSpec::new(
                PhaseName::Validation,
                1,
                "Validate stack name, credentials, deployment type, and quotas",
                secs(300),
                true,
            ),
            vec![
                PhaseSpec::new(
                    PhaseName::Preparation,
                    2,
                    "Create backups and prepare deployment artifacts",
                    secs(600),
                    true,
                ),
                PhaseSpec::new(
                    PhaseName::Infrastructure,
                    3,
                    "Provision network and compute infrastructure",
                    secs(1800),
                    true,
                ),
                PhaseSpec::new(
                    PhaseName::Application,
                    4,
                    "Roll out application containers",
                    secs(1200),
                    true,
                ),
                PhaseSpec::new(
                    PhaseName::Verification,
                    5,
                    "Run health checks against the new deployment",
                    secs(600),
                    true,
                ),
                PhaseSpec::new(
                    PhaseName::Cleanup,
                    6,
                    "Remove temporary resources",
                    secs(300),
                    false,
                ),
            ],
        ));
        Self { phases }
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhaseSpec> {
        self.phases.iter()
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    /// Always false; a catalog has at least one phase.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn get(&self, name: PhaseName) -> Option<&PhaseSpec> {
        self.phases.iter().find(|s| s.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = PhaseName> + '_ {
        self.phases.iter().map(|s| s.name)
    }
}

impl Default for PhaseCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_is_ordered() {
        let catalog = PhaseCatalog::standard();
        let orders: Vec<u32> = catalog.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4, 5, 6]);
        let names: Vec<PhaseName> = catalog.names().collect();
        assert_eq!(names, PhaseName::ALL.to_vec());
    }

    #[test]
    fn only_cleanup_is_optional() {
        let catalog = PhaseCatalog::standard();
        for spec in catalog.iter() {
            assert_eq!(spec.required, spec.name != PhaseName::Cleanup);
        }
    }

    #[test]
    fn new_sorts_by_order() {
        let catalog = PhaseCatalog::new(vec![
            PhaseSpec::new(PhaseName::Cleanup, 9, "", Duration::from_secs(1), false),
            PhaseSpec::new(PhaseName::Validation, 2, "", Duration::from_secs(1), true),
        ])
        .unwrap();
        let names: Vec<PhaseName> = catalog.names().collect();
        assert_eq!(names, vec![PhaseName::Validation, PhaseName::Cleanup]);
    }

    #[test]
    fn rejects_duplicate_orders() {
        let result = PhaseCatalog::new(vec![
            PhaseSpec::new(PhaseName::Validation, 1, "", Duration::from_secs(1), true),
            PhaseSpec::new(PhaseName::Cleanup, 1, "", Duration::from_secs(1), false),
        ]);
        assert!(matches!(result, Err(DeployError::InvalidCatalog(_))));
    }

    #[test]
    fn rejects_empty_catalog() {
        assert!(PhaseCatalog::new(Vec::new()).is_err());
    }

    #[test]
    fn phase_spec_serializes_timeout_in_seconds() {
        let catalog = PhaseCatalog::standard();
        let json = serde_json::to_value(catalog.get(PhaseName::Infrastructure).unwrap()).unwrap();
        assert_eq!(json["timeout_seconds"], 1800);
        assert_eq!(json["name"], "infrastructure");
    }
}
