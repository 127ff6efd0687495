/*!
 * Integration tests for configuration-driven failover
 *
 * Loads a TOML file from disk, applies overrides, builds the orchestrator
 * and routes calls through it against a fake upstream.
 */

use std::collections::HashMap;
use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;
use waypoint::{
    build_orchestrator, CircuitState, FailoverError, Provider, WaypointConfig, WaypointError,
};

const CONFIG: &str = r#"
providers = ["primary", "backup"]

[retry]
max_retries = 1
base_delay_ms = 1
max_delay_ms = 10
jitter_enabled = false

[breaker]
failure_threshold = 2
open_timeout_secs = 300
"#;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Upstream where "primary" is down and everything else answers
#[derive(Default)]
struct PrimaryOutage {
    primary_calls: AtomicU32,
    backup_calls: AtomicU32,
}

impl PrimaryOutage {
    async fn call(&self, provider: Provider) -> Result<String, std::io::Error> {
        if provider.name() == "primary" {
            self.primary_calls.fetch_add(1, Ordering::SeqCst);
            Err(std::io::Error::other("connection refused"))
        } else {
            self.backup_calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("answered by {}", provider))
        }
    }
}

#[tokio::test]
async fn test_file_config_drives_failover() {
    let file = write_config(CONFIG);
    let config = WaypointConfig::load(Some(file.path())).unwrap();
    let orchestrator = build_orchestrator(&config).unwrap();
    let upstream = Arc::new(PrimaryOutage::default());

    // First call burns the primary's retry budget and opens its circuit
    let first = orchestrator
        .execute_with_retry(
            |provider| {
                let upstream = upstream.clone();
                async move { upstream.call(provider).await }
            },
            None,
        )
        .await;
    match first {
        Err(FailoverError::RetriesExhausted {
            provider, attempts, ..
        }) => {
            assert_eq!(provider, Provider::new("primary"));
            assert_eq!(attempts, 2);
        }
        other => panic!("expected RetriesExhausted, got {:?}", other),
    }

    // Second call skips the open primary entirely
    let second = orchestrator
        .execute_with_retry(
            |provider| {
                let upstream = upstream.clone();
                async move { upstream.call(provider).await }
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(second, "answered by backup");
    assert_eq!(upstream.primary_calls.load(Ordering::SeqCst), 2);
    assert_eq!(upstream.backup_calls.load(Ordering::SeqCst), 1);

    let stats = orchestrator.stats().await;
    assert_eq!(
        stats[&Provider::new("primary")].breaker_state,
        CircuitState::Open
    );
    assert_eq!(
        stats[&Provider::new("backup")].breaker_state,
        CircuitState::Closed
    );
    assert_eq!(stats[&Provider::new("backup")].successes, 1);
}

#[tokio::test]
async fn test_overrides_reorder_providers() {
    let file = write_config(CONFIG);
    let mut config = WaypointConfig::from_file(file.path()).unwrap();

    let env: HashMap<&str, &str> = [("WAYPOINT_PROVIDERS", "backup,primary")]
        .into_iter()
        .collect();
    config
        .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
        .unwrap();

    let orchestrator = build_orchestrator(&config).unwrap();
    let upstream = Arc::new(PrimaryOutage::default());

    let answer = orchestrator
        .execute_with_retry(
            |provider| {
                let upstream = upstream.clone();
                async move { upstream.call(provider).await }
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(answer, "answered by backup");
    assert_eq!(upstream.primary_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_provider_list_fails_every_call() {
    let config = WaypointConfig::default();
    let orchestrator = build_orchestrator(&config).unwrap();

    let result = orchestrator
        .execute_with_retry(
            |_provider| async { Ok::<_, std::io::Error>(()) },
            None,
        )
        .await;
    let err: WaypointError = result.unwrap_err().into();
    assert!(matches!(
        err,
        WaypointError::Failover(FailoverError::NoProviderAvailable)
    ));
    assert!(err.is_fatal());
}

#[test]
fn test_invalid_file_is_rejected_before_building() {
    let file = write_config("providers = [\"a\", \"a\"]\n");
    let result = WaypointConfig::load(Some(file.path()));
    assert!(matches!(result, Err(WaypointError::Config(_))));

    let file = write_config("providers = 12\n");
    let result = WaypointConfig::load(Some(file.path()));
    assert!(matches!(result, Err(WaypointError::ConfigParse(_))));
}
