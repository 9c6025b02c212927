// ABOUTME: Error types for deployment orchestration.
// ABOUTME: Covers validation, state transitions, dependency gating, phases, and rollback.

use super::phase::PhaseName;
use super::state::DeploymentStatus;
use crate::types::DeploymentId;

/// Errors returned by registry, orchestrator, and rollback operations.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Required input was missing or malformed.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("unknown deployment: {0}")]
    NotFound(DeploymentId),

    #[error("deployment {0} already exists")]
    AlreadyExists(DeploymentId),

    #[error("deployment {id}: cannot move from {from} to {to}")]
    InvalidTransition {
        id: DeploymentId,
        from: DeploymentStatus,
        to: DeploymentStatus,
    },

    #[error("deployment {id} cannot start from status {status} (use force to override)")]
    NotStartable {
        id: DeploymentId,
        status: DeploymentStatus,
    },

    /// A dependency has not completed.
    #[error("dependency {dependency} of {id} is not completed (status: {status})")]
    DependencyNotMet {
        id: DeploymentId,
        dependency: DeploymentId,
        status: String,
    },

    /// A required phase failed and aborted the deployment.
    #[error("deployment {id} failed in phase {phase}: {message}")]
    PhaseFailed {
        id: DeploymentId,
        phase: PhaseName,
        message: String,
        rolled_back: bool,
    },

    #[error("rollback of {id} failed: {message}")]
    RollbackFailed { id: DeploymentId, message: String },

    #[error("invalid phase catalog: {0}")]
    InvalidCatalog(String),

    #[error("invalid value '{value}' for option {key}")]
    InvalidOption { key: String, value: String },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    Validation,
    NotFound,
    Conflict,
    DependencyNotMet,
    PhaseFailed,
    RollbackFailed,
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Validation(_)
            | DeployError::InvalidCatalog(_)
            | DeployError::InvalidOption { .. } => DeployErrorKind::Validation,
            DeployError::NotFound(_) => DeployErrorKind::NotFound,
            DeployError::AlreadyExists(_)
            | DeployError::InvalidTransition { .. }
            | DeployError::NotStartable { .. } => DeployErrorKind::Conflict,
            DeployError::DependencyNotMet { .. } => DeployErrorKind::DependencyNotMet,
            DeployError::PhaseFailed { .. } => DeployErrorKind::PhaseFailed,
            DeployError::RollbackFailed { .. } => DeployErrorKind::RollbackFailed,
        }
    }
}
