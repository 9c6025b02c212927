// ABOUTME: Diagnostics accumulator for non-fatal warnings during a deployment run.
// ABOUTME: Collects warnings that shouldn't fail a deployment but should be shown to users.

use serde::Serialize;

/// Collects non-fatal warnings during deployment operations.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Record a warning, auto-logging it via tracing.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<Warning> {
        self.warnings
    }
}

/// A non-fatal warning collected during deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// An optional phase failed and the run continued.
    pub fn optional_phase_failed(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::OptionalPhaseFailed,
            message: message.into(),
        }
    }

    /// A status notification could not be delivered.
    pub fn notification_failed(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::NotificationFailed,
            message: message.into(),
        }
    }

    pub fn unknown_rollback_strategy(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::UnknownRollbackStrategy,
            message: message.into(),
        }
    }

    /// Automatic rollback after a failure did not succeed.
    pub fn rollback_failed(message: impl Into<String>) -> Self {
        Self {
            kind: WarningKind::RollbackFailed,
            message: message.into(),
        }
    }
}

/// Categories of warnings that can occur during deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    OptionalPhaseFailed,
    NotificationFailed,
    UnknownRollbackStrategy,
    RollbackFailed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_starts_empty() {
        let diag = Diagnostics::default();
        assert!(!diag.has_warnings());
        assert!(diag.warnings().is_empty());
    }

    #[test]
    fn diagnostics_collects_warnings() {
        let mut diag = Diagnostics::default();

        diag.warn(Warning::optional_phase_failed("cleanup failed"));
        diag.warn(Warning::notification_failed("connection refused"));

        assert!(diag.has_warnings());
        assert_eq!(diag.into_warnings().len(), 2);
    }

    #[test]
    fn warning_constructors_set_correct_kind() {
        assert_eq!(
            Warning::unknown_rollback_strategy("x").kind,
            WarningKind::UnknownRollbackStrategy
        );
        assert_eq!(
            Warning::rollback_failed("x").kind,
            WarningKind::RollbackFailed
        );
    }
}
