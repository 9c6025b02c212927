// ABOUTME: Tunable retry and circuit breaker policy.
// ABOUTME: Deserializable from the manifest with humantime durations.

use serde::Deserialize;
use std::time::Duration;

use super::backoff::Jitter;

/// Limits applied by the retry controller.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Consecutive failures that open the breaker.
    pub failure_threshold: u32,

    /// How long an open breaker rejects calls.
    #[serde(with = "humantime_serde")]
    pub recovery_timeout: Duration,

    /// Hard ceiling on a single attempt.
    #[serde(with = "humantime_serde")]
    pub attempt_timeout: Duration,

    /// Cap for exponential backoff.
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,

    #[serde(with = "humantime_serde")]
    pub jitter_min: Duration,

    #[serde(with = "humantime_serde")]
    pub jitter_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(300),
            attempt_timeout: Duration::from_secs(300),
            max_delay: Duration::from_secs(60),
            jitter_min: Duration::from_secs(1),
            jitter_max: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    pub fn jitter(&self) -> Jitter {
        Jitter::new(self.jitter_min, self.jitter_max)
    }

    /// Same policy without random jitter.
    pub fn without_jitter(mut self) -> Self {
        self.jitter_min = Duration::ZERO;
        self.jitter_max = Duration::ZERO;
        self
    }
}
