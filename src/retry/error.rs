// ABOUTME: Retry controller error types with SNAFU pattern.
// ABOUTME: Separates open-circuit rejections from ordinary operation failures.

use snafu::Snafu;
use std::time::Duration;

use super::operation::CommandOutput;
use crate::classify::{Category, Classification};

/// Terminal outcome of a retried call that did not succeed.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RetryError {
    #[snafu(display(
        "circuit open for {operation}: retry in {}s",
        remaining.as_secs()
    ))]
    CircuitOpen {
        operation: String,
        remaining: Duration,
    },

    #[snafu(display(
        "{operation} failed after {attempts} attempt(s) with exit code {} [{}/{}]: {}",
        output.exit_code,
        classification.category,
        classification.subtype,
        output.error_text().trim()
    ))]
    Failed {
        operation: String,
        attempts: u32,
        output: CommandOutput,
        classification: Box<Classification>,
        breaker_tripped: bool,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorKind {
    /// Call rejected without invoking the operation.
    CircuitOpen,
    /// This failure opened the circuit breaker.
    BreakerTripped,
    /// Non-retryable classification; surfaced immediately.
    Permanent,
    /// Retryable failure that ran out of attempts.
    Exhausted,
}

impl RetryError {
    pub fn kind(&self) -> RetryErrorKind {
        match self {
            RetryError::CircuitOpen { .. } => RetryErrorKind::CircuitOpen,
            RetryError::Failed {
                breaker_tripped: true,
                ..
            } => RetryErrorKind::BreakerTripped,
            RetryError::Failed { classification, .. } if !classification.retryable => {
                RetryErrorKind::Permanent
            }
            RetryError::Failed { .. } => RetryErrorKind::Exhausted,
        }
    }

    /// Captured output of the last attempt, if the operation was invoked.
    pub fn output(&self) -> Option<&CommandOutput> {
        match self {
            RetryError::Failed { output, .. } => Some(output),
            RetryError::CircuitOpen { .. } => None,
        }
    }

    pub fn classification(&self) -> Option<&Classification> {
        match self {
            RetryError::Failed { classification, .. } => Some(classification),
            RetryError::CircuitOpen { .. } => None,
        }
    }

    pub fn category(&self) -> Option<Category> {
        self.classification().map(|c| c.category)
    }

    /// Remaining cool-down when the circuit is open.
    pub fn remaining_cooldown(&self) -> Option<Duration> {
        match self {
            RetryError::CircuitOpen { remaining, .. } => Some(*remaining),
            RetryError::Failed { .. } => None,
        }
    }
}
