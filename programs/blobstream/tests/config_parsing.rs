use std::time::Duration;

use blobstream::config::Config;
use rstest::rstest;
use serde_json::json;

/// A config with only the required fields.
fn minimal_json() -> serde_json::Value {
    json!({
        "source": { "endpoint": "http://localhost:9090" }
    })
}

/// A config touching every section.
fn full_json() -> serde_json::Value {
    json!({
        "source": {
            "endpoint": "http://localhost:9090",
            "request_timeout_ms": 2000,
            "poll_interval_ms": 500
        },
        "store": {
            "peers": ["http://10.0.0.1:30000", "http://10.0.0.2:30000"],
            "listen_addr": "127.0.0.1:30001",
            "client": { "request_timeout_ms": 3000, "poll_interval_ms": 250 }
        },
        "orchestrator": { "requeue_window": 10, "requeue_interval_ms": 5000 },
        "relayer": {
            "poll_interval_ms": 1000,
            "quorum_timeout_ms": 60000,
            "backup": true,
            "historical": { "step": 500 }
        },
        "target": {
            "rpc_url": "http://localhost:8545",
            "contract_address": "0x5fbdb2315678afecb367f032d93f642f64180aa3"
        },
        "retry": { "max_retries": 3, "delay_ms": 1000 },
        "keystore": { "dir": "/var/lib/blobstream/keys" },
        "observability": { "level": "debug", "use_otel": false },
        "metrics": { "enabled": false }
    })
}

fn parse(value: &serde_json::Value) -> anyhow::Result<Config> {
    Config::parse(&value.to_string())
}

// ----------------- Happy paths -----------------

#[test]
fn minimal_config_uses_defaults() {
    let config = parse(&minimal_json()).unwrap();

    assert!(config.store.peers.is_empty());
    assert!(config.target.is_none());
    assert!(!config.relayer.backup);
    assert_eq!(config.retry.max_retries, 6);
    assert_eq!(config.keystore.orchestrator_path().to_str(), Some("keys/orchestrator"));
    assert_eq!(config.observability.level(), tracing::Level::INFO);
    assert!(config.metrics.enabled);
    assert_eq!(config.metrics.listen_addr.port(), 9000);
}

#[test]
fn full_config_parses() {
    let config = parse(&full_json()).unwrap();

    assert_eq!(config.source.poll_interval, Duration::from_millis(500));
    assert_eq!(config.store.peers.len(), 2);
    assert_eq!(config.store.client.poll_interval, Duration::from_millis(250));
    assert_eq!(config.orchestrator.requeue_window, 10);
    assert_eq!(config.relayer.historical.step, 500);
    assert_eq!(config.relayer.quorum_timeout, Duration::from_secs(60));
    assert_eq!(config.retry.delay, Duration::from_secs(1));
    assert_eq!(
        config.keystore.relayer_path().to_str(),
        Some("/var/lib/blobstream/keys/relayer")
    );

    let target = config.target().unwrap();
    assert_eq!(target.receipt_timeout, Duration::from_secs(300));
    assert!(!config.metrics.enabled);
}

#[test]
fn relayer_needs_target() {
    let err = parse(&minimal_json()).unwrap().target().unwrap_err();
    assert!(err.to_string().contains("target"));
}

// ----------------- Parse errors carry the JSON path -----------------

#[test]
fn missing_source_fails() {
    let err = parse(&json!({})).unwrap_err();
    assert!(err.to_string().contains("source"));
}

#[test]
fn wrong_type_reports_path() {
    let mut value = full_json();
    value["relayer"]["historical"]["step"] = json!("many");

    let err = parse(&value).unwrap_err();
    assert!(err.to_string().contains("relayer.historical.step"), "{err}");
}

#[test]
fn bad_contract_address_reports_path() {
    let mut value = full_json();
    value["target"]["contract_address"] = json!("0x1234");

    let err = parse(&value).unwrap_err();
    assert!(err.to_string().contains("target.contract_address"), "{err}");
}

#[test]
fn unknown_section_is_rejected() {
    let mut value = minimal_json();
    value["server"] = json!({ "port": 3000 });

    assert!(parse(&value).is_err());
}

// ----------------- Validation -----------------

#[rstest]
#[case::zero_contract_address(
    "/target/contract_address",
    json!("0x0000000000000000000000000000000000000000"),
    "zero address"
)]
#[case::non_http_peer("/store/peers", json!(["10.0.0.1:30000"]), "invalid store config")]
#[case::zero_retry_delay("/retry/delay_ms", json!(0), "invalid retry config")]
#[case::zero_quorum_timeout("/relayer/quorum_timeout_ms", json!(0), "invalid relayer config")]
#[case::empty_rpc_url("/target/rpc_url", json!(""), "invalid target config")]
fn invalid_values_are_rejected(
    #[case] pointer: &str,
    #[case] replacement: serde_json::Value,
    #[case] expected: &str,
) {
    let mut value = full_json();
    *value.pointer_mut(pointer).unwrap() = replacement;

    let err = parse(&value).unwrap_err();
    assert!(format!("{err:#}").contains(expected), "{err:#}");
}

#[test]
fn reads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, full_json().to_string()).unwrap();

    assert!(Config::from_file(&path).is_ok());
    assert!(Config::from_file(dir.path().join("missing.json")).is_err());
}
