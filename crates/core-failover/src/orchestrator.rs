//! Failover orchestrator: provider selection, retries and adaptive rerouting
//!
//! The orchestrator owns one [`ProviderStats`] and one [`CircuitBreaker`] per
//! configured provider and routes each call through them:
//!
//! ```text
//! execute_with_retry(op, preferred)
//!     → select_provider        (preferred → priority order → forced fallback)
//!     → loop
//!         → breaker gate        (switch provider if the breaker refuses)
//!         → op(provider)        (success: record + return)
//!         → record failure
//!         → adaptive reroute    (error rate > 50% after 3 failures)
//!         → budget check        (exhausted: RetriesExhausted)
//!         → backoff sleep       (cancellable)
//! ```
//!
//! A provider switch resets the retry counter, so every healthy provider gets
//! a full retry budget. The total number of attempts for one call is bounded
//! by `(max_retries + 1) * (switches + 1)`.

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
use crate::error::{FailoverError, OperationError};
use crate::provider::Provider;
use crate::retry::{JitterSource, RetryPolicy, ThreadRngJitter};
use crate::stats::ProviderStats;
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Error rate above which a failing provider is abandoned mid-call
pub const REROUTE_ERROR_RATE: f64 = 0.5;

/// Retries on one provider before adaptive rerouting is considered
pub const REROUTE_MIN_RETRIES: u32 = 2;

/// A call that can be sent to any of the interchangeable providers
///
/// Implement this for a client type when a closure is inconvenient; see
/// [`FailoverOrchestrator::execute_operation`].
#[async_trait]
pub trait ProviderOperation<T>: Send + Sync {
    /// Perform the call against `provider`
    async fn invoke(&self, provider: &Provider) -> Result<T, OperationError>;
}

/// Outcome of provider selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub provider: Provider,
    /// True when no breaker admitted and the provider was forced through
    pub forced: bool,
}

/// Read-only view of one provider's health
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSnapshot {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub error_rate: f64,
    pub success_rate: f64,
    pub consecutive_failures: u32,
    pub breaker_state: CircuitState,
    pub last_success_at: Option<Instant>,
    pub last_failure_at: Option<Instant>,
}

/// Stats and breaker for one provider, always mutated together
#[derive(Debug)]
struct ProviderHealth {
    stats: ProviderStats,
    breaker: CircuitBreaker,
}

impl ProviderHealth {
    fn new(config: &CircuitBreakerConfig) -> Self {
        Self {
            stats: ProviderStats::new(),
            breaker: CircuitBreaker::new(config.clone()),
        }
    }

    fn snapshot(&self) -> ProviderSnapshot {
        ProviderSnapshot {
            attempts: self.stats.total_attempts,
            successes: self.stats.success_count,
            failures: self.stats.failure_count,
            error_rate: self.stats.error_rate(),
            success_rate: self.stats.success_rate(),
            consecutive_failures: self.stats.consecutive_failures,
            breaker_state: self.breaker.state(),
            last_success_at: self.stats.last_success_at,
            last_failure_at: self.stats.last_failure_at,
        }
    }
}

/// Routes calls across providers with retries, circuit breaking and rerouting
///
/// # Example
/// ```no_run
/// use waypoint_core_failover::{FailoverOrchestrator, Provider, RetryPolicy};
///
/// # async fn example() -> Result<(), waypoint_core_failover::FailoverError> {
/// let orchestrator = FailoverOrchestrator::new(
///     vec![Provider::new("mapbox"), Provider::new("google")],
///     RetryPolicy::default(),
/// );
///
/// let coords = orchestrator
///     .execute_with_retry(
///         |provider: Provider| async move {
///             // Call the provider's geocoding API here
///             let _ = provider;
///             Ok::<_, std::io::Error>((51.5072, -0.1276))
///         },
///         None,
///     )
///     .await?;
/// # let _ = coords;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FailoverOrchestrator {
    /// Preference order; first entry is tried first
    priority: Vec<Provider>,
    health: HashMap<Provider, Mutex<ProviderHealth>>,
    policy: RetryPolicy,
    breaker_config: CircuitBreakerConfig,
    jitter: Arc<dyn JitterSource>,
}

impl FailoverOrchestrator {
    /// Create an orchestrator with default circuit breaker settings
    pub fn new(providers: Vec<Provider>, policy: RetryPolicy) -> Self {
        Self::with_breaker_config(providers, policy, CircuitBreakerConfig::default())
    }

    /// Create an orchestrator with explicit circuit breaker settings
    pub fn with_breaker_config(
        providers: Vec<Provider>,
        policy: RetryPolicy,
        breaker_config: CircuitBreakerConfig,
    ) -> Self {
        let mut priority = Vec::with_capacity(providers.len());
        let mut health = HashMap::with_capacity(providers.len());

        for provider in providers {
            if health.contains_key(&provider) {
                warn!(provider = %provider, "Duplicate provider ignored");
                continue;
            }
            health.insert(
                provider.clone(),
                Mutex::new(ProviderHealth::new(&breaker_config)),
            );
            priority.push(provider);
        }

        Self {
            priority,
            health,
            policy,
            breaker_config,
            jitter: Arc::new(ThreadRngJitter),
        }
    }

    /// Replace the randomness used for backoff jitter
    pub fn with_jitter_source(mut self, jitter: Arc<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    /// Providers in preference order
    pub fn providers(&self) -> &[Provider] {
        &self.priority
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn breaker_config(&self) -> &CircuitBreakerConfig {
        &self.breaker_config
    }

    /// Pick the provider for the next attempt.
    ///
    /// The preferred provider wins if its breaker admits; otherwise the first
    /// provider in priority order whose breaker admits. When every breaker
    /// refuses, the provider with the lowest error rate is forced through
    /// anyway. Returns `None` only when no provider is configured.
    pub async fn select_provider(&self, preferred: Option<&Provider>) -> Option<Selection> {
        if let Some(preferred) = preferred {
            if !self.health.contains_key(preferred) {
                warn!(provider = %preferred, "Preferred provider is not configured");
            } else if self.try_admit(preferred).await {
                return Some(Selection {
                    provider: preferred.clone(),
                    forced: false,
                });
            }
        }

        for provider in self.priority.iter().filter(|p| Some(*p) != preferred) {
            if self.try_admit(provider).await {
                return Some(Selection {
                    provider: provider.clone(),
                    forced: false,
                });
            }
        }

        let fallback = self.lowest_error_rate().await?;
        warn!(
            provider = %fallback,
            "All circuit breakers open, forcing lowest error rate provider"
        );
        Some(Selection {
            provider: fallback,
            forced: true,
        })
    }

    /// Run `operation` with retries, circuit breaking and provider failover.
    ///
    /// The operation receives the provider chosen for each attempt. Its error
    /// type is recorded as a provider failure and retried per the policy.
    pub async fn execute_with_retry<F, Fut, T, E>(
        &self,
        operation: F,
        preferred: Option<&Provider>,
    ) -> Result<T, FailoverError>
    where
        F: Fn(Provider) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        self.execute_with_retry_until(operation, preferred, &CancellationToken::new())
            .await
    }

    /// Run a [`ProviderOperation`] with retries and provider failover
    pub async fn execute_operation<T, O>(
        &self,
        operation: &O,
        preferred: Option<&Provider>,
    ) -> Result<T, FailoverError>
    where
        O: ProviderOperation<T> + ?Sized,
    {
        self.execute_with_retry(
            |provider: Provider| async move { operation.invoke(&provider).await },
            preferred,
        )
        .await
    }

    /// Like [`execute_with_retry`](Self::execute_with_retry), but stops with
    /// [`FailoverError::Cancelled`] once `cancel` fires.
    ///
    /// Cancellation is checked before every attempt and interrupts a backoff
    /// sleep in progress. An attempt already in flight is not interrupted.
    pub async fn execute_with_retry_until<F, Fut, T, E>(
        &self,
        operation: F,
        preferred: Option<&Provider>,
        cancel: &CancellationToken,
    ) -> Result<T, FailoverError>
    where
        F: Fn(Provider) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        let selection = self
            .select_provider(preferred)
            .await
            .ok_or(FailoverError::NoProviderAvailable)?;

        // With a single provider there is nothing to fail over to, so a forced
        // pick would only bypass its open breaker.
        if selection.forced && self.priority.len() == 1 {
            warn!(provider = %selection.provider, "Only provider has an open circuit");
            return Err(FailoverError::CircuitOpenAllProviders {
                provider: selection.provider,
                attempts: 0,
                source: None,
            });
        }

        let mut provider = selection.provider;
        // Selection already consumed this provider's admission
        let mut admitted = true;
        let mut retry_count: u32 = 0;
        let mut attempts: u32 = 0;
        let mut last_error: Option<FailoverError> = None;

        while retry_count <= self.policy.max_retries {
            if cancel.is_cancelled() {
                return Err(FailoverError::Cancelled { provider, attempts });
            }

            if !admitted && !self.try_admit(&provider).await {
                match self.select_alternative(&provider).await {
                    Some(next) => {
                        info!(
                            from = %provider,
                            to = %next,
                            "Circuit open, switching provider"
                        );
                        provider = next;
                        retry_count = 0;
                    }
                    None => {
                        warn!(provider = %provider, attempts, "No provider admits requests");
                        return Err(FailoverError::CircuitOpenAllProviders {
                            provider,
                            attempts,
                            source: last_error.map(Box::new),
                        });
                    }
                }
            }
            admitted = false;

            attempts += 1;
            debug!(provider = %provider, attempt = attempts, retry = retry_count, "Invoking operation");

            let error = match operation(provider.clone()).await {
                Ok(value) => {
                    self.record_success(&provider).await;
                    return Ok(value);
                }
                Err(e) => FailoverError::operation_failed(provider.clone(), e),
            };

            debug!(provider = %provider, error = %error, "Attempt failed");
            let error_rate = self.record_failure(&provider).await;
            last_error = Some(error);
            retry_count += 1;

            // A reroute gets a fresh budget, so it can absorb an exhausted one
            if error_rate > REROUTE_ERROR_RATE && retry_count > REROUTE_MIN_RETRIES {
                if let Some(next) = self.select_alternative(&provider).await {
                    info!(
                        from = %provider,
                        to = %next,
                        error_rate,
                        "Error rate too high, rerouting"
                    );
                    provider = next;
                    retry_count = 0;
                    admitted = true;
                }
            }

            if retry_count > self.policy.max_retries {
                break;
            }

            let delay = self.policy.delay_for(retry_count, self.jitter.as_ref());
            if !delay.is_zero() {
                debug!(provider = %provider, ?delay, "Backing off before retry");
                tokio::select! {
                    _ = cancel.cancelled() => {
                        return Err(FailoverError::Cancelled { provider, attempts });
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        warn!(provider = %provider, attempts, "Retries exhausted");
        match last_error {
            Some(last) => Err(FailoverError::RetriesExhausted {
                provider,
                attempts,
                source: Box::new(last),
            }),
            // Only reachable with a loop that never ran an attempt
            None => Err(FailoverError::CircuitOpenAllProviders {
                provider,
                attempts,
                source: None,
            }),
        }
    }

    /// Snapshot of every provider's counters and breaker state
    pub async fn stats(&self) -> HashMap<Provider, ProviderSnapshot> {
        let mut snapshot = HashMap::with_capacity(self.priority.len());
        for provider in &self.priority {
            if let Some(health) = self.health.get(provider) {
                snapshot.insert(provider.clone(), health.lock().await.snapshot());
            }
        }
        snapshot
    }

    /// Snapshot of a single provider, `None` if it is not configured
    pub async fn stats_for(&self, provider: &Provider) -> Option<ProviderSnapshot> {
        let health = self.health.get(provider)?;
        let snapshot = health.lock().await.snapshot();
        Some(snapshot)
    }

    /// Return every provider's stats and breaker to construction defaults
    pub async fn reset_stats(&self) {
        for provider in &self.priority {
            if let Some(health) = self.health.get(provider) {
                let mut health = health.lock().await;
                health.stats.reset();
                health.breaker.reset();
            }
        }
        info!(providers = self.priority.len(), "Provider stats reset");
    }

    async fn try_admit(&self, provider: &Provider) -> bool {
        let Some(health) = self.health.get(provider) else {
            return false;
        };
        let mut health = health.lock().await;
        let before = health.breaker.state();
        let admitted = health.breaker.can_admit();
        if before == CircuitState::Open && health.breaker.state() == CircuitState::HalfOpen {
            info!(provider = %provider, "Circuit half-open, probing provider");
        }
        admitted
    }

    /// First provider in priority order, other than `current`, whose breaker admits
    async fn select_alternative(&self, current: &Provider) -> Option<Provider> {
        for provider in self.priority.iter().filter(|p| *p != current) {
            if self.try_admit(provider).await {
                return Some(provider.clone());
            }
        }
        None
    }

    async fn lowest_error_rate(&self) -> Option<Provider> {
        let mut best: Option<(&Provider, f64)> = None;
        for provider in &self.priority {
            let Some(health) = self.health.get(provider) else {
                continue;
            };
            let rate = health.lock().await.stats.error_rate();
            if best.map_or(true, |(_, best_rate)| rate < best_rate) {
                best = Some((provider, rate));
            }
        }
        best.map(|(provider, _)| provider.clone())
    }

    /// Record a success and return whether it closed the provider's circuit
    async fn record_success(&self, provider: &Provider) -> bool {
        let Some(health) = self.health.get(provider) else {
            return false;
        };
        let mut health = health.lock().await;
        let before = health.breaker.state();
        health.stats.record_success();
        health.breaker.record_success();
        let recovered =
            before != CircuitState::Closed && health.breaker.state() == CircuitState::Closed;
        if recovered {
            info!(provider = %provider, "Circuit closed, provider recovered");
        }
        recovered
    }

    /// Record a failure and return the provider's updated error rate
    async fn record_failure(&self, provider: &Provider) -> f64 {
        let Some(health) = self.health.get(provider) else {
            return 0.0;
        };
        let mut health = health.lock().await;
        let before = health.breaker.state();
        health.stats.record_failure();
        health.breaker.record_failure();
        if before != CircuitState::Open && health.breaker.state() == CircuitState::Open {
            warn!(
                provider = %provider,
                consecutive_failures = health.breaker.failure_count(),
                "Circuit opened"
            );
        }
        health.stats.error_rate()
    }
}
