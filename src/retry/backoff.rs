// ABOUTME: Adaptive backoff delays chosen by error category.
// ABOUTME: Exponential for rate limits, linear for network/service faults, fixed otherwise.

use rand::Rng;
use std::time::Duration;

use crate::classify::Category;

/// Delay before the attempt following `attempt` (1-based), without jitter.
pub fn adaptive_delay(
    category: Category,
    base_secs: u64,
    attempt: u32,
    max_delay: Duration,
) -> Duration {
    let step = u64::from(attempt.saturating_sub(1));
    match category {
        Category::Rate => {
            let factor = 1u64.checked_shl(step as u32).unwrap_or(u64::MAX);
            Duration::from_secs(base_secs.saturating_mul(factor)).min(max_delay)
        }
        Category::Network | Category::Service => {
            Duration::from_secs(base_secs.saturating_add(step.saturating_mul(2)))
        }
        _ => Duration::from_secs(base_secs),
    }
}

/// Uniform random jitter added on top of the adaptive delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jitter {
    min: Duration,
    max: Duration,
}

impl Jitter {
    pub fn new(min: Duration, max: Duration) -> Self {
        if max < min {
            Self { min: max, max: min }
        } else {
            Self { min, max }
        }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let secs = rand::thread_rng().gen_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

impl Default for Jitter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(3))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAP: Duration = Duration::from_secs(60);

    #[test]
    fn rate_limits_back_off_exponentially() {
        assert_eq!(adaptive_delay(Category::Rate, 5, 1, CAP), Duration::from_secs(5));
        assert_eq!(adaptive_delay(Category::Rate, 5, 2, CAP), Duration::from_secs(10));
        assert_eq!(adaptive_delay(Category::Rate, 5, 3, CAP), Duration::from_secs(20));
    }

    #[test]
    fn exponential_delay_is_capped() {
        assert_eq!(adaptive_delay(Category::Rate, 5, 5, CAP), CAP);
        assert_eq!(adaptive_delay(Category::Rate, 5, 200, CAP), CAP);
    }

    #[test]
    fn network_and_service_back_off_linearly() {
        assert_eq!(adaptive_delay(Category::Network, 5, 1, CAP), Duration::from_secs(5));
        assert_eq!(adaptive_delay(Category::Service, 5, 3, CAP), Duration::from_secs(9));
    }

    #[test]
    fn other_categories_use_fixed_delay() {
        assert_eq!(adaptive_delay(Category::Capacity, 10, 4, CAP), Duration::from_secs(10));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let jitter = Jitter::default();
        for _ in 0..100 {
            let d = jitter.sample();
            assert!(d >= Duration::from_secs(1) && d <= Duration::from_secs(3));
        }
    }

    #[test]
    fn zero_jitter_is_exact() {
        assert_eq!(Jitter::none().sample(), Duration::ZERO);
    }
}
