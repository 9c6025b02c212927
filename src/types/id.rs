// ABOUTME: Typed identifiers for deployments, sessions, and backups.
// ABOUTME: Validates ids at the boundary and derives session and backup ids from deployments.

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use thiserror::Error;

/// What an id refers to; names the kind in debug output and errors.
pub trait IdKind {
    const LABEL: &'static str;
}

pub enum DeploymentMarker {}
pub enum SessionMarker {}
pub enum BackupMarker {}

impl IdKind for DeploymentMarker {
    const LABEL: &'static str = "deployment";
}

impl IdKind for SessionMarker {
    const LABEL: &'static str = "session";
}

impl IdKind for BackupMarker {
    const LABEL: &'static str = "backup";
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("{kind} id must not be empty")]
    Empty { kind: &'static str },

    #[error("{kind} id '{value}' must not contain whitespace or commas")]
    InvalidChar { kind: &'static str, value: String },
}

/// Identifier tagged with the kind of record it names.
///
/// Deployment ids travel in comma-separated dependency lists, so
/// [`Id::parse`] rejects commas and whitespace.
#[must_use = "ids name tracked deployments and should not be ignored"]
pub struct Id<T> {
    value: String,
    _kind: PhantomData<T>,
}

impl<T> Id<T> {
    /// Wrap a value already known to be well formed.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _kind: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl<T: IdKind> Id<T> {
    /// Validate user input, trimming surrounding whitespace.
    pub fn parse(value: &str) -> Result<Self, IdError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(IdError::Empty { kind: T::LABEL });
        }
        if value.chars().any(|c| c == ',' || c.is_whitespace()) {
            return Err(IdError::InvalidChar {
                kind: T::LABEL,
                value: value.to_string(),
            });
        }
        Ok(Self::new(value))
    }
}

impl SessionId {
    /// Session for a deployment initialised at `created_at` (epoch seconds).
    pub fn derive(deployment: &DeploymentId, created_at: i64) -> Self {
        Self::new(format!("{deployment}-{created_at}"))
    }
}

impl BackupId {
    /// Backup artifact for a deployment taken at `taken_at` (epoch seconds).
    pub fn derive(deployment: &DeploymentId, taken_at: i64) -> Self {
        Self::new(format!("backup-{deployment}-{taken_at}"))
    }
}

// Markers are uninhabited, so these impls cannot be derived.

impl<T: IdKind> std::fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", T::LABEL, self.value)
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> std::fmt::Display for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

pub type DeploymentId = Id<DeploymentMarker>;
pub type SessionId = Id<SessionMarker>;
pub type BackupId = Id<BackupMarker>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_combines_deployment_and_epoch() {
        let id = DeploymentId::new("web");
        assert_eq!(SessionId::derive(&id, 1700000000).as_str(), "web-1700000000");
    }

    #[test]
    fn backup_id_is_prefixed() {
        let id = DeploymentId::new("web");
        assert_eq!(BackupId::derive(&id, 42).as_str(), "backup-web-42");
    }

    #[test]
    fn parse_trims_and_rejects_list_separators() {
        assert_eq!(DeploymentId::parse("  web ").unwrap().as_str(), "web");
        assert_eq!(
            DeploymentId::parse(" ").unwrap_err(),
            IdError::Empty { kind: "deployment" }
        );
        assert!(matches!(
            DeploymentId::parse("web,api"),
            Err(IdError::InvalidChar { kind: "deployment", .. })
        ));
        assert!(DeploymentId::parse("web api").is_err());
    }

    #[test]
    fn debug_names_the_kind() {
        assert_eq!(format!("{:?}", BackupId::new("b-1")), "backup:b-1");
    }

    #[test]
    fn ids_order_by_value_and_serialize_as_strings() {
        let mut ids = vec![DeploymentId::new("web"), DeploymentId::new("api")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "api");
        assert_eq!(serde_json::to_string(&ids[1]).unwrap(), "\"web\"");
    }
}
