//! Waypoint Core Failover: Pure-logic provider failover
//!
//! # Overview
//!
//! This crate routes calls to one of several interchangeable upstream
//! providers (for example competing geocoding services) and keeps those calls
//! working while individual providers fail. It includes:
//!
//! - **Provider Stats**: Per-provider attempt/success/failure counters and error rate
//! - **Circuit Breaker**: Per-provider Closed/Open/HalfOpen state machine with probe-based recovery
//! - **Retry Policy**: Exponential backoff capped at a maximum delay, with optional ±25% jitter
//! - **Failover Orchestrator**: Provider selection, retries, breaker gating and adaptive rerouting
//!
//! # Key Principles
//!
//! This crate is **pure logic** with zero knowledge of:
//! - What the wrapped operation does (HTTP, gRPC, SDK calls)
//! - Authentication, request construction or response parsing
//! - Where configuration comes from
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Your Application                │
//! └─────────────┬───────────────────────────┘
//!               │ execute_with_retry(op, preferred)
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │       Failover Orchestrator             │  ← Selection + retry loop
//! │  (priority order, reroute on errors)    │
//! └─────────────┬───────────────────────────┘
//!               │ per provider
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │   Circuit Breaker  +  Provider Stats    │  ← Admission + health
//! │  (one pair per provider, one lock)      │
//! └─────────────┬───────────────────────────┘
//!               │
//!               ▼
//!     Provider A    Provider B    Provider C
//! ```
//!
//! # Usage Example
//!
//! ```no_run
//! use waypoint_core_failover::{
//!     CircuitBreakerConfig, FailoverError, FailoverOrchestrator, Provider, RetryPolicy,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), FailoverError> {
//! let orchestrator = Arc::new(FailoverOrchestrator::with_breaker_config(
//!     vec![Provider::new("mapbox"), Provider::new("google"), Provider::new("here")],
//!     RetryPolicy::default().with_max_retries(3),
//!     CircuitBreakerConfig {
//!         failure_threshold: 5,
//!         open_timeout: Duration::from_secs(60),
//!         half_open_max_probes: 3,
//!     },
//! ));
//!
//! let address = orchestrator
//!     .execute_with_retry(
//!         |provider: Provider| async move {
//!             // Issue the request against `provider`
//!             Ok::<_, std::io::Error>(format!("resolved by {}", provider))
//!         },
//!         Some(&Provider::new("google")),
//!     )
//!     .await?;
//!
//! for (provider, snapshot) in orchestrator.stats().await {
//!     println!("{}: {:.0}% errors, breaker {}", provider, snapshot.error_rate * 100.0, snapshot.breaker_state);
//! }
//! # let _ = address;
//! # Ok(())
//! # }
//! ```

pub mod circuit_breaker;
pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod retry;
pub mod stats;

// Re-export main types for convenience
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use error::{FailoverError, OperationError};
pub use orchestrator::{FailoverOrchestrator, ProviderOperation, ProviderSnapshot, Selection};
pub use provider::Provider;
pub use retry::{FixedJitter, JitterSource, RetryPolicy, ThreadRngJitter};
pub use stats::ProviderStats;

/// Prelude module for convenient imports
///
/// # Example
/// ```
/// use waypoint_core_failover::prelude::*;
/// ```
pub mod prelude {
    pub use super::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
    pub use super::error::{FailoverError, OperationError};
    pub use super::orchestrator::{FailoverOrchestrator, ProviderOperation, ProviderSnapshot};
    pub use super::provider::Provider;
    pub use super::retry::{JitterSource, RetryPolicy};
}
