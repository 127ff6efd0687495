/*!
 * Configuration types for Waypoint
 */

use crate::error::{Result, WaypointError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use waypoint_core_failover::{CircuitBreakerConfig, Provider, RetryPolicy};

/// Prefix shared by every environment override
pub const ENV_PREFIX: &str = "WAYPOINT_";

/// Main configuration for the failover layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WaypointConfig {
    /// Provider names in preference order
    #[serde(default)]
    pub providers: Vec<String>,

    /// Retry and backoff settings
    #[serde(default)]
    pub retry: RetrySettings,

    /// Circuit breaker settings, applied to every provider
    #[serde(default)]
    pub breaker: BreakerSettings,

    /// Diagnostic output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Retry and backoff settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Retries per provider after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry in milliseconds
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Upper bound for any single delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Exponential growth factor between retries
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Randomize delays by ±25%
    #[serde(default = "default_true")]
    pub jitter_enabled: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter_enabled: true,
        }
    }
}

/// Circuit breaker settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerSettings {
    /// Consecutive failures that open a provider's circuit
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Seconds an open circuit waits before admitting a probe
    #[serde(default = "default_open_timeout_secs")]
    pub open_timeout_secs: u64,

    /// Probe requests admitted while half-open
    #[serde(default = "default_half_open_max_probes")]
    pub half_open_max_probes: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            open_timeout_secs: default_open_timeout_secs(),
            half_open_max_probes: default_half_open_max_probes(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Minimum level emitted when `RUST_LOG` is not set
    #[serde(default)]
    pub level: LogLevel,

    /// Emit JSON lines instead of compact text
    #[serde(default)]
    pub json: bool,

    /// Write to this file instead of stdout
    #[serde(default)]
    pub file: Option<PathBuf>,
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl FromStr for LogLevel {
    type Err = WaypointError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(WaypointError::Config(format!(
                "Unknown log level '{}'",
                other
            ))),
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    32_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_open_timeout_secs() -> u64 {
    60
}

fn default_half_open_max_probes() -> u32 {
    3
}

impl WaypointConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: WaypointConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Load from an optional file, apply `WAYPOINT_*` environment overrides
    /// and validate the result
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (keys carry the `WAYPOINT_` prefix)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        if let Some(value) = var("PROVIDERS") {
            self.providers = value
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(value) = var("MAX_RETRIES") {
            self.retry.max_retries = parse_override("MAX_RETRIES", &value)?;
        }
        if let Some(value) = var("BASE_DELAY_MS") {
            self.retry.base_delay_ms = parse_override("BASE_DELAY_MS", &value)?;
        }
        if let Some(value) = var("MAX_DELAY_MS") {
            self.retry.max_delay_ms = parse_override("MAX_DELAY_MS", &value)?;
        }
        if let Some(value) = var("BACKOFF_MULTIPLIER") {
            self.retry.backoff_multiplier = parse_override("BACKOFF_MULTIPLIER", &value)?;
        }
        if let Some(value) = var("JITTER_ENABLED") {
            self.retry.jitter_enabled = parse_bool("JITTER_ENABLED", &value)?;
        }
        if let Some(value) = var("FAILURE_THRESHOLD") {
            self.breaker.failure_threshold = parse_override("FAILURE_THRESHOLD", &value)?;
        }
        if let Some(value) = var("OPEN_TIMEOUT_SECS") {
            self.breaker.open_timeout_secs = parse_override("OPEN_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = var("HALF_OPEN_MAX_PROBES") {
            self.breaker.half_open_max_probes =
                parse_override("HALF_OPEN_MAX_PROBES", &value)?;
        }
        if let Some(value) = var("LOG_LEVEL") {
            self.logging.level = value.parse()?;
        }

        Ok(())
    }

    /// Reject settings the failover core cannot work with
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for name in &self.providers {
            if name.trim().is_empty() {
                return Err(WaypointError::Config(
                    "Provider names must not be empty".to_string(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(WaypointError::Config(format!(
                    "Provider '{}' is listed more than once",
                    name
                )));
            }
        }

        self.breaker_config()
            .validate()
            .map_err(|e| WaypointError::Config(format!("breaker: {}", e)))?;

        self.retry_policy()
            .validate()
            .map_err(|e| WaypointError::Config(format!("retry: {}", e)))
    }

    /// Providers in preference order
    pub fn provider_list(&self) -> Vec<Provider> {
        self.providers.iter().map(Provider::new).collect()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            backoff_multiplier: self.retry.backoff_multiplier,
            jitter_enabled: self.retry.jitter_enabled,
        }
    }

    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.breaker.failure_threshold,
            open_timeout: Duration::from_secs(self.breaker.open_timeout_secs),
            half_open_max_probes: self.breaker.half_open_max_probes,
        }
    }
}

fn parse_override<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        WaypointError::Config(format!(
            "Invalid value for {}{}: '{}'",
            ENV_PREFIX, name, value
        ))
    })
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(WaypointError::Config(format!(
            "Invalid value for {}{}: '{}'",
            ENV_PREFIX, name, value
        ))),
    }
}
