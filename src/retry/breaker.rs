// ABOUTME: Per-operation circuit breaker shared by every caller of an operation.
// ABOUTME: Counts consecutive failures and blocks calls for a recovery window once tripped.

use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Default)]
struct BreakerRecord {
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    last_failure_time: Option<i64>,
}

/// Snapshot of one operation's breaker state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerState {
    pub consecutive_failures: u32,
    /// Epoch seconds at which the breaker opened, if it is open.
    pub last_failure_time: Option<i64>,
}

/// Outcome of recording a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureVerdict {
    pub consecutive_failures: u32,
    /// The failure reached the threshold and opened the breaker.
    pub tripped: bool,
}

/// Circuit breaker keyed by operation name.
#[derive(Debug)]
pub struct CircuitBreaker {
    records: Mutex<HashMap<String, BreakerRecord>>,
    failure_threshold: u32,
    recovery_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
        }
    }

    /// Check whether `operation` may be invoked.
    ///
    /// Returns the remaining cool-down when the breaker is open. An open
    /// breaker whose recovery window has elapsed is cleared.
    pub fn check(&self, operation: &str) -> Result<(), Duration> {
        let mut records = self.records.lock();
        let Some(opened_at) = records.get(operation).and_then(|r| r.last_failure) else {
            return Ok(());
        };

        let elapsed = opened_at.elapsed();
        if elapsed < self.recovery_timeout {
            return Err(self.recovery_timeout - elapsed);
        }

        tracing::info!(operation, "circuit breaker recovery window elapsed, closing");
        records.remove(operation);
        Ok(())
    }

    pub fn record_success(&self, operation: &str) {
        self.records.lock().remove(operation);
    }

    /// Count a failure; opens the breaker when the threshold is reached.
    pub fn record_failure(&self, operation: &str) -> FailureVerdict {
        let mut records = self.records.lock();
        let record = records.entry(operation.to_string()).or_default();
        record.consecutive_failures += 1;

        let tripped = record.consecutive_failures >= self.failure_threshold;
        if tripped {
            record.last_failure = Some(Instant::now());
            record.last_failure_time = Some(Utc::now().timestamp());
        }

        FailureVerdict {
            consecutive_failures: record.consecutive_failures,
            tripped,
        }
    }

    pub fn state(&self, operation: &str) -> Option<BreakerState> {
        self.records.lock().get(operation).map(|r| BreakerState {
            consecutive_failures: r.consecutive_failures,
            last_failure_time: r.last_failure_time,
        })
    }

    pub fn reset(&self, operation: &str) {
        self.records.lock().remove(operation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_breaker_allows_calls() {
        let breaker = CircuitBreaker::new(5, Duration::from_secs(300));
        assert!(breaker.check("s3:put").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn trips_at_threshold_and_recovers() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(300));
        assert!(!breaker.record_failure("op").tripped);
        assert!(!breaker.record_failure("op").tripped);
        assert!(breaker.record_failure("op").tripped);

        let remaining = breaker.check("op").unwrap_err();
        assert_eq!(remaining, Duration::from_secs(300));

        tokio::time::advance(Duration::from_secs(120)).await;
        assert_eq!(breaker.check("op").unwrap_err(), Duration::from_secs(180));

        tokio::time::advance(Duration::from_secs(180)).await;
        assert!(breaker.check("op").is_ok());
        assert!(breaker.state("op").is_none());
    }

    #[test]
    fn success_clears_failure_count() {
        let breaker = CircuitBreaker::new(5, Duration::from_secs(300));
        breaker.record_failure("op");
        breaker.record_failure("op");
        breaker.record_success("op");
        assert!(breaker.state("op").is_none());
        assert_eq!(breaker.record_failure("op").consecutive_failures, 1);
    }

    #[test]
    fn operations_are_tracked_independently() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(300));
        breaker.record_failure("ec2:run");
        assert!(breaker.check("ec2:run").is_err());
        assert!(breaker.check("s3:put").is_ok());
    }
}
