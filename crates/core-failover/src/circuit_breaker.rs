//! Circuit Breaker implementation for per-provider isolation
//!
//! The circuit breaker decides, independently of any retry logic, whether a
//! provider may currently be contacted. It has three states:
//! - Closed: Normal operation, requests pass through
//! - Open: Provider is unhealthy, requests are refused
//! - HalfOpen: A limited number of probe requests test provider recovery
//!
//! ```text
//! Closed   → Open:     failure_threshold consecutive failures
//! Open     → HalfOpen: open_timeout elapsed since the last failure (on admission)
//! HalfOpen → Closed:   any probe succeeds
//! HalfOpen → Open:     any probe fails
//! ```
//!
//! Recovery is optimistic: a single successful probe closes the circuit.
//!
//! The breaker itself is not synchronised. The orchestrator keeps each breaker
//! next to its provider's stats behind one lock.

use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// State of the circuit breaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CircuitState {
    /// Circuit is closed, requests pass through normally
    Closed,
    /// Circuit is open, requests are refused until the open timeout elapses
    Open,
    /// Circuit is half-open, admitting a bounded number of probes
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        };
        f.write_str(name)
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening circuit
    pub failure_threshold: u32,
    /// Duration to wait after the last failure before probing again
    pub open_timeout: Duration,
    /// Maximum probe requests admitted per half-open window
    pub half_open_max_probes: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout: Duration::from_secs(60),
            half_open_max_probes: 3,
        }
    }
}

impl CircuitBreakerConfig {
    /// Check that the breaker can open and can probe its way back
    pub fn validate(&self) -> Result<(), String> {
        if self.failure_threshold == 0 {
            return Err("failure_threshold must be at least 1".to_string());
        }
        if self.half_open_max_probes == 0 {
            return Err("half_open_max_probes must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Per-provider circuit breaker state machine
///
/// # Example
/// ```
/// use waypoint_core_failover::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
///
/// let mut breaker = CircuitBreaker::new(CircuitBreakerConfig {
///     failure_threshold: 2,
///     ..Default::default()
/// });
///
/// breaker.record_failure();
/// breaker.record_failure();
///
/// assert_eq!(breaker.state(), CircuitState::Open);
/// assert!(!breaker.can_admit());
/// ```
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: CircuitState,
    /// Consecutive failures seen by this breaker
    failure_count: u32,
    last_failure_at: Option<Instant>,
    half_open_probes_issued: u32,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            state: CircuitState::Closed,
            failure_count: 0,
            last_failure_at: None,
            half_open_probes_issued: 0,
        }
    }

    /// Get the current state of the circuit breaker
    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Get current consecutive failure count
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Probes admitted in the current half-open window
    pub fn half_open_probes_issued(&self) -> u32 {
        self.half_open_probes_issued
    }

    pub fn last_failure_at(&self) -> Option<Instant> {
        self.last_failure_at
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Decide whether a request may be sent to the provider now.
    ///
    /// Not a pure query: an expired open timeout moves the breaker to
    /// half-open, and every half-open admission consumes one probe. The
    /// probe admitted by the open → half-open transition counts against
    /// the budget. A zero probe budget keeps the circuit open until reset.
    pub fn can_admit(&mut self) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let elapsed = self
                    .last_failure_at
                    .map(|at| Instant::now().saturating_duration_since(at))
                    .unwrap_or(Duration::MAX);

                if elapsed >= self.config.open_timeout && self.config.half_open_max_probes > 0 {
                    self.state = CircuitState::HalfOpen;
                    self.half_open_probes_issued = 1;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if self.half_open_probes_issued < self.config.half_open_max_probes {
                    self.half_open_probes_issued += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Handle successful operation
    pub fn record_success(&mut self) {
        self.failure_count = 0;

        if self.state == CircuitState::HalfOpen {
            // Recovery confirmed
            self.state = CircuitState::Closed;
            self.half_open_probes_issued = 0;
        }
    }

    /// Handle failed operation
    pub fn record_failure(&mut self) {
        self.last_failure_at = Some(Instant::now());
        self.failure_count = self.failure_count.saturating_add(1);

        match self.state {
            CircuitState::HalfOpen => {
                // Any failed probe reopens the circuit
                self.state = CircuitState::Open;
                self.half_open_probes_issued = 0;
            }
            CircuitState::Closed | CircuitState::Open => {
                if self.failure_count >= self.config.failure_threshold {
                    self.state = CircuitState::Open;
                    self.half_open_probes_issued = 0;
                }
            }
        }
    }

    /// Reset the circuit breaker to closed state
    pub fn reset(&mut self) {
        self.state = CircuitState::Closed;
        self.failure_count = 0;
        self.last_failure_at = None;
        self.half_open_probes_issued = 0;
    }
}
