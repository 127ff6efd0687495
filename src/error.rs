/*!
 * Error types for Waypoint
 */

use std::io;
use thiserror::Error;
use waypoint_core_failover::FailoverError;

pub type Result<T> = std::result::Result<T, WaypointError>;

#[derive(Debug, Error)]
pub enum WaypointError {
    /// Configuration value is missing or out of range
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration file is not valid TOML or does not match the schema
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration could not be written back out
    #[error("Failed to serialize configuration: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Logging subscriber could not be installed
    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    /// A routed call failed
    #[error(transparent)]
    Failover(#[from] FailoverError),
}

impl WaypointError {
    /// Check if this error is fatal (retrying the same call cannot help)
    pub fn is_fatal(&self) -> bool {
        match self {
            WaypointError::Config(_)
            | WaypointError::ConfigParse(_)
            | WaypointError::ConfigSerialize(_)
            | WaypointError::Logging(_) => true,
            WaypointError::Io(_) => false,
            WaypointError::Failover(e) => e.is_fatal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core_failover::Provider;

    #[test]
    fn test_config_errors_are_fatal() {
        assert!(WaypointError::Config("bad".to_string()).is_fatal());
        assert!(WaypointError::Logging("twice".to_string()).is_fatal());
    }

    #[test]
    fn test_failover_classification_passes_through() {
        let fatal: WaypointError = FailoverError::NoProviderAvailable.into();
        assert!(fatal.is_fatal());

        let transient: WaypointError =
            FailoverError::operation_failed(Provider::new("here"), "timeout").into();
        assert!(!transient.is_fatal());
        assert_eq!(
            transient.to_string(),
            "Operation failed on provider here: timeout"
        );
    }
}
