/*!
 * Waypoint - resilient routing of external API calls
 *
 * Wires the failover core to the outside world:
 * - TOML configuration with `WAYPOINT_*` environment overrides
 * - Structured logging (compact text, JSON lines, or a JSON log file)
 * - A single error type covering configuration and routed calls
 *
 * Author: Shane Wall <shaneawall@gmail.com>
 */

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{BreakerSettings, LogLevel, LoggingConfig, RetrySettings, WaypointConfig};
pub use error::{Result, WaypointError};
pub use logging::init_logging;
pub use waypoint_core_failover::{
    CircuitState, FailoverError, FailoverOrchestrator, Provider, ProviderOperation,
    ProviderSnapshot, RetryPolicy,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build an orchestrator from validated configuration
pub fn build_orchestrator(config: &WaypointConfig) -> Result<FailoverOrchestrator> {
    config.validate()?;

    let providers = config.provider_list();
    if providers.is_empty() {
        tracing::warn!("No providers configured; every call will fail with NoProviderAvailable");
    } else {
        tracing::info!(
            providers = ?config.providers,
            max_retries = config.retry.max_retries,
            failure_threshold = config.breaker.failure_threshold,
            "Failover orchestrator configured"
        );
    }

    Ok(FailoverOrchestrator::with_breaker_config(
        providers,
        config.retry_policy(),
        config.breaker_config(),
    ))
}
