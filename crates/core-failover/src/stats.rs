//! Per-provider outcome counters
//!
//! Error and success rates are derived from lifetime counters, not a sliding
//! window. Counters only go back to zero through an explicit reset.

use tokio::time::Instant;

/// Rolling counters for one provider
#[derive(Debug, Clone, Default)]
pub struct ProviderStats {
    /// Attempts made against this provider (successes + failures)
    pub total_attempts: u64,
    /// Attempts that returned a result
    pub success_count: u64,
    /// Attempts that returned an error
    pub failure_count: u64,
    /// When the last success was recorded
    pub last_success_at: Option<Instant>,
    /// When the last failure was recorded
    pub last_failure_at: Option<Instant>,
    /// Failures since the last success
    pub consecutive_failures: u32,
}

impl ProviderStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful attempt
    pub fn record_success(&mut self) {
        self.total_attempts += 1;
        self.success_count += 1;
        self.consecutive_failures = 0;
        self.last_success_at = Some(Instant::now());
    }

    /// Record a failed attempt
    pub fn record_failure(&mut self) {
        self.total_attempts += 1;
        self.failure_count += 1;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_failure_at = Some(Instant::now());
    }

    /// Fraction of attempts that failed, 0.0 before any attempt
    pub fn error_rate(&self) -> f64 {
        if self.total_attempts == 0 {
            return 0.0;
        }
        self.failure_count as f64 / self.total_attempts as f64
    }

    /// Fraction of attempts that succeeded
    pub fn success_rate(&self) -> f64 {
        1.0 - self.error_rate()
    }

    /// Return to construction-time defaults
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
