//! Error types for the failover module

use crate::provider::Provider;
use std::sync::Arc;
use thiserror::Error;

/// Error produced by a wrapped provider operation.
///
/// Shared so that [`FailoverError`] stays `Clone` while still exposing the
/// original cause through [`std::error::Error::source`].
pub type OperationError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while routing a call through the orchestrator
#[derive(Debug, Error, Clone)]
pub enum FailoverError {
    /// The orchestrator was constructed without any provider
    #[error("No provider available: orchestrator has no configured providers")]
    NoProviderAvailable,

    /// Every breaker refused admission and no alternative provider could be found.
    ///
    /// When the circuit opened partway through a call, `source` holds the
    /// last operation failure and `attempts` counts the calls already made.
    #[error("Circuit open for all providers (last tried: {provider}, {attempts} attempt(s))")]
    CircuitOpenAllProviders {
        provider: Provider,
        attempts: u32,
        #[source]
        source: Option<Box<FailoverError>>,
    },

    /// A single attempt against a provider failed
    #[error("Operation failed on provider {provider}: {source}")]
    OperationFailed {
        provider: Provider,
        #[source]
        source: OperationError,
    },

    /// The retry budget on the active provider ran out
    #[error("Retries exhausted on provider {provider} after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        provider: Provider,
        attempts: u32,
        #[source]
        source: Box<FailoverError>,
    },

    /// The caller cancelled the call
    #[error("Call cancelled on provider {provider} after {attempts} attempt(s)")]
    Cancelled { provider: Provider, attempts: u32 },
}

impl FailoverError {
    /// Wrap an operation error raised while talking to `provider`
    pub fn operation_failed<E>(provider: Provider, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        FailoverError::OperationFailed {
            provider,
            source: Arc::from(error.into()),
        }
    }

    /// Check if this error is transient and is handled by the retry loop
    pub fn is_transient(&self) -> bool {
        matches!(self, FailoverError::OperationFailed { .. })
    }

    /// Check if this error is fatal for this call (retrying it inside the loop cannot help)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FailoverError::NoProviderAvailable | FailoverError::CircuitOpenAllProviders { .. }
        )
    }

    /// Provider the error is attributed to, if any
    pub fn provider(&self) -> Option<&Provider> {
        match self {
            FailoverError::NoProviderAvailable => None,
            FailoverError::CircuitOpenAllProviders { provider, .. }
            | FailoverError::OperationFailed { provider, .. }
            | FailoverError::RetriesExhausted { provider, .. }
            | FailoverError::Cancelled { provider, .. } => Some(provider),
        }
    }

    /// Total physical attempts made before this error surfaced, if tracked
    pub fn attempts(&self) -> Option<u32> {
        match self {
            FailoverError::RetriesExhausted { attempts, .. }
            | FailoverError::CircuitOpenAllProviders { attempts, .. }
            | FailoverError::Cancelled { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_classification() {
        let failed = FailoverError::operation_failed(Provider::new("mapbox"), "timeout");
        assert!(failed.is_transient());
        assert!(!failed.is_fatal());

        assert!(FailoverError::NoProviderAvailable.is_fatal());
        assert!(!FailoverError::NoProviderAvailable.is_transient());

        let open = FailoverError::CircuitOpenAllProviders {
            provider: Provider::new("mapbox"),
            attempts: 0,
            source: None,
        };
        assert!(open.is_fatal());
        assert!(open.source().is_none());
    }

    #[test]
    fn test_circuit_open_mid_call_keeps_cause_chain() {
        let provider = Provider::new("only");
        let last = FailoverError::operation_failed(provider.clone(), "upstream 502 bad gateway");
        let open = FailoverError::CircuitOpenAllProviders {
            provider: provider.clone(),
            attempts: 2,
            source: Some(Box::new(last)),
        };

        assert_eq!(open.attempts(), Some(2));
        assert_eq!(
            open.to_string(),
            "Circuit open for all providers (last tried: only, 2 attempt(s))"
        );
        let cause = open.source().expect("last operation failure");
        assert!(cause.to_string().contains("upstream 502 bad gateway"));
    }

    #[test]
    fn test_retries_exhausted_keeps_cause_chain() {
        let provider = Provider::new("here");
        let last = FailoverError::operation_failed(provider.clone(), "503 service unavailable");
        let exhausted = FailoverError::RetriesExhausted {
            provider: provider.clone(),
            attempts: 4,
            source: Box::new(last),
        };

        assert_eq!(exhausted.provider(), Some(&provider));
        assert_eq!(exhausted.attempts(), Some(4));

        let cause = exhausted.source().expect("wrapped operation failure");
        assert!(cause.to_string().contains("503 service unavailable"));
        let root = cause.source().expect("original operation error");
        assert_eq!(root.to_string(), "503 service unavailable");
    }

    #[test]
    fn test_display_names_provider() {
        let err = FailoverError::Cancelled {
            provider: Provider::new("google"),
            attempts: 2,
        };
        assert_eq!(
            err.to_string(),
            "Call cancelled on provider google after 2 attempt(s)"
        );
    }
}
