//! Retry policy and exponential backoff with jitter
//!
//! ```
//! use waypoint_core_failover::retry::{FixedJitter, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::default();
//!
//! // 1s, 2s, 4s, ... capped at 32s
//! assert_eq!(policy.base_delay_for(1), Duration::from_secs(1));
//! assert_eq!(policy.base_delay_for(3), Duration::from_secs(4));
//! assert_eq!(policy.base_delay_for(10), Duration::from_secs(32));
//!
//! // Jitter pinned to its upper bound adds 25%
//! let delay = policy.delay_for(1, &FixedJitter(1.0));
//! assert_eq!(delay, Duration::from_millis(1250));
//! ```

use rand::Rng;
use std::fmt;
use std::time::Duration;

/// Largest relative perturbation applied by jitter (±25%)
pub const JITTER_FRACTION: f64 = 0.25;

/// Source of randomness for backoff jitter.
///
/// `sample` returns a value in `[-1.0, 1.0]`; it is scaled by
/// [`JITTER_FRACTION`] and applied to the pre-jitter delay.
pub trait JitterSource: Send + Sync + fmt::Debug {
    fn sample(&self) -> f64;
}

/// Uniform jitter drawn from the thread-local RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngJitter;

impl JitterSource for ThreadRngJitter {
    fn sample(&self) -> f64 {
        rand::rng().random_range(-1.0..=1.0)
    }
}

/// Jitter pinned to a constant sample, for deterministic delays
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn sample(&self) -> f64 {
        self.0.clamp(-1.0, 1.0)
    }
}

/// Immutable retry configuration shared by all providers
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed per provider after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Multiplier applied to the delay on each further retry
    pub backoff_multiplier: f64,

    /// Whether to perturb delays by up to ±25%
    pub jitter_enabled: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(32),
            backoff_multiplier: 2.0,
            jitter_enabled: true,
        }
    }
}

impl RetryPolicy {
    /// Policy that retries immediately without sleeping
    pub fn no_backoff(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            jitter_enabled: false,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, backoff_multiplier: f64) -> Self {
        self.backoff_multiplier = backoff_multiplier;
        self
    }

    pub fn with_jitter(mut self, jitter_enabled: bool) -> Self {
        self.jitter_enabled = jitter_enabled;
        self
    }

    /// Check the policy for values that would make backoff meaningless
    pub fn validate(&self) -> Result<(), String> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier <= 0.0 {
            return Err(format!(
                "backoff_multiplier must be a positive finite number, got {}",
                self.backoff_multiplier
            ));
        }
        if self.base_delay > self.max_delay {
            return Err(format!(
                "base_delay ({:?}) must not exceed max_delay ({:?})",
                self.base_delay, self.max_delay
            ));
        }
        Ok(())
    }

    /// Pre-jitter delay before retry number `retry_count` (1-based).
    ///
    /// `min(base_delay * backoff_multiplier^(retry_count - 1), max_delay)`.
    /// A `retry_count` of 0 is treated as 1.
    pub fn base_delay_for(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.max(1) - 1;
        let factor = self
            .backoff_multiplier
            .powi(exponent.min(i32::MAX as u32) as i32);
        let delay_secs = self.base_delay.as_secs_f64() * factor;
        let max_secs = self.max_delay.as_secs_f64();

        if !delay_secs.is_finite() || delay_secs >= max_secs {
            self.max_delay
        } else {
            Duration::from_secs_f64(delay_secs.max(0.0))
        }
    }

    /// Delay before retry number `retry_count`, with jitter applied when enabled
    pub fn delay_for(&self, retry_count: u32, jitter: &dyn JitterSource) -> Duration {
        let delay = self.base_delay_for(retry_count);
        if !self.jitter_enabled {
            return delay;
        }

        let offset = jitter.sample().clamp(-1.0, 1.0) * JITTER_FRACTION;
        let jittered = delay.as_secs_f64() * (1.0 + offset);
        // Near Duration::MAX the jittered value no longer fits
        Duration::try_from_secs_f64(jittered.max(0.0)).unwrap_or(Duration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 8,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            backoff_multiplier: 2.0,
            jitter_enabled: false,
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(policy.max_delay, Duration::from_secs(32));
        assert_eq!(policy.backoff_multiplier, 2.0);
        assert!(policy.jitter_enabled);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_exponential_delays() {
        let policy = policy();
        assert_eq!(policy.base_delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.base_delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.base_delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.base_delay_for(4), Duration::from_millis(800));
        assert_eq!(policy.base_delay_for(5), Duration::from_millis(1000));
    }

    #[test]
    fn test_backoff_monotonic_and_capped() {
        let policy = policy();
        let mut previous = Duration::ZERO;
        for retry in 1..=policy.max_retries {
            let delay = policy.base_delay_for(retry);
            assert!(delay >= previous, "delay decreased at retry {}", retry);
            assert!(delay <= policy.max_delay);
            previous = delay;
        }
    }

    #[test]
    fn test_huge_retry_count_saturates() {
        let policy = policy();
        assert_eq!(policy.base_delay_for(u32::MAX), policy.max_delay);
    }

    #[test]
    fn test_uncapped_policy_with_positive_jitter_saturates() {
        let policy = RetryPolicy::default()
            .with_max_delay(Duration::MAX)
            .with_jitter(true);
        assert!(policy.validate().is_ok());

        assert_eq!(policy.delay_for(80, &FixedJitter(1.0)), Duration::MAX);
        assert_eq!(policy.delay_for(u32::MAX, &FixedJitter(1.0)), Duration::MAX);
        assert!(policy.delay_for(80, &FixedJitter(-1.0)) < Duration::MAX);
    }

    #[test]
    fn test_zero_retry_count_uses_base_delay() {
        let policy = policy();
        assert_eq!(policy.base_delay_for(0), policy.base_delay);
    }

    #[test]
    fn test_jitter_bounds() {
        let policy = policy().with_jitter(true);

        let low = policy.delay_for(2, &FixedJitter(-1.0));
        let high = policy.delay_for(2, &FixedJitter(1.0));
        let mid = policy.delay_for(2, &FixedJitter(0.0));

        assert_eq!(low, Duration::from_millis(150));
        assert_eq!(high, Duration::from_millis(250));
        assert_eq!(mid, Duration::from_millis(200));
    }

    #[test]
    fn test_random_jitter_stays_in_range() {
        let policy = policy().with_jitter(true);
        let jitter = ThreadRngJitter;
        for retry in 1..=policy.max_retries {
            let base = policy.base_delay_for(retry).as_secs_f64();
            for _ in 0..50 {
                let delay = policy.delay_for(retry, &jitter).as_secs_f64();
                assert!(delay >= base * 0.75 - 1e-9);
                assert!(delay <= base * 1.25 + 1e-9);
            }
        }
    }

    #[test]
    fn test_out_of_range_sample_is_clamped() {
        let policy = policy().with_jitter(true);
        let delay = policy.delay_for(1, &FixedJitter(-40.0));
        assert_eq!(delay, Duration::from_millis(75));
    }

    #[test]
    fn test_jitter_disabled_ignores_source() {
        let policy = policy();
        assert_eq!(
            policy.delay_for(3, &FixedJitter(1.0)),
            policy.base_delay_for(3)
        );
    }

    #[test]
    fn test_no_backoff_policy() {
        let policy = RetryPolicy::no_backoff(3);
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay_for(3, &ThreadRngJitter), Duration::ZERO);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(policy().with_backoff_multiplier(0.0).validate().is_err());
        assert!(policy()
            .with_backoff_multiplier(f64::NAN)
            .validate()
            .is_err());
        assert!(policy()
            .with_base_delay(Duration::from_secs(5))
            .validate()
            .is_err());
    }
}
