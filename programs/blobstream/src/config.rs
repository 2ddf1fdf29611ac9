//! Configuration file of the `blobstream` binary.

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use alloy_primitives::Address;
use anyhow::Context;
use blobstream_confirm_store::StoreConfig;
use blobstream_orchestrator::OrchestratorConfig;
use blobstream_relayer::RelayerConfig;
use blobstream_source_client::SourceConfig;
use blobstream_utils::{serde::duration_ms, RetryConfig};
use serde::{Deserialize, Serialize};
use tracing::Level;

/// Environment variable holding the keystore password.
pub const KEYSTORE_PASSWORD_ENV: &str = "BLOBSTREAM_KEYSTORE_PASSWORD";

/// The top level configuration.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The source chain node to read attestations from.
    pub source: SourceConfig,
    /// The confirm store node and its peers.
    #[serde(default)]
    pub store: StoreSection,
    /// Orchestrator queues and timers.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// Relayer timers.
    #[serde(default)]
    pub relayer: RelayerConfig,
    /// The bridge contract. Only needed by the relayer.
    #[serde(default)]
    pub target: Option<TargetConfig>,
    /// Retries of source chain requests.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Where signing keys are kept.
    #[serde(default)]
    pub keystore: KeystoreConfig,
    /// Logging and tracing.
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Prometheus endpoint.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Confirm store settings.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    /// Replica endpoints confirms are written to and read from.
    #[serde(default)]
    pub peers: Vec<String>,
    /// Address `store serve` listens on.
    #[serde(default = "defaults::store_listen_addr")]
    pub listen_addr: SocketAddr,
    /// Client side timeouts and caching.
    #[serde(default)]
    pub client: StoreConfig,
}

/// The bridge contract and the chain it lives on.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// JSON-RPC endpoint of the target chain.
    pub rpc_url: String,
    /// Address of the deployed bridge contract.
    pub contract_address: Address,
    /// How long to wait for a transaction receipt.
    #[serde(
        rename = "receipt_timeout_ms",
        with = "duration_ms",
        default = "defaults::receipt_timeout"
    )]
    pub receipt_timeout: Duration,
}

/// Location of the encrypted keystores.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeystoreConfig {
    /// Directory holding the keystores.
    #[serde(default = "defaults::keystore_dir")]
    pub dir: PathBuf,
    /// Keystore of the orchestrator's signing key.
    #[serde(default = "defaults::orchestrator_key")]
    pub orchestrator_key: String,
    /// Keystore of the key paying for relayer transactions.
    #[serde(default = "defaults::relayer_key")]
    pub relayer_key: String,
}

/// The configuration for observability.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ObservabilityConfig {
    /// The log level, e.g. `info` or `debug`.
    #[serde(default = "defaults::level")]
    pub level: String,
    /// Whether to export traces and logs over OTLP.
    #[serde(default)]
    pub use_otel: bool,
    /// Service name reported to the collector.
    #[serde(default = "defaults::service_name")]
    pub service_name: String,
    /// OTLP gRPC endpoint. The exporter default is used when absent.
    #[serde(default)]
    pub otel_endpoint: Option<String>,
}

/// The Prometheus endpoint.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Whether to serve `/metrics`.
    #[serde(default = "defaults::metrics_enabled")]
    pub enabled: bool,
    /// Address the metrics server binds to.
    #[serde(default = "defaults::metrics_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            peers: Vec::new(),
            listen_addr: defaults::store_listen_addr(),
            client: StoreConfig::default(),
        }
    }
}

impl Default for KeystoreConfig {
    fn default() -> Self {
        Self {
            dir: defaults::keystore_dir(),
            orchestrator_key: defaults::orchestrator_key(),
            relayer_key: defaults::relayer_key(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            level: defaults::level(),
            use_otel: false,
            service_name: defaults::service_name(),
            otel_endpoint: None,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::metrics_enabled(),
            listen_addr: defaults::metrics_listen_addr(),
        }
    }
}

impl ObservabilityConfig {
    /// Returns the log level, falling back to `INFO` if unparsable.
    #[must_use]
    pub fn level(&self) -> Level {
        Level::from_str(&self.level).unwrap_or(Level::INFO)
    }
}

impl KeystoreConfig {
    /// Path of the orchestrator keystore.
    #[must_use]
    pub fn orchestrator_path(&self) -> PathBuf {
        self.dir.join(&self.orchestrator_key)
    }

    /// Path of the relayer keystore.
    #[must_use]
    pub fn relayer_path(&self) -> PathBuf {
        self.dir.join(&self.relayer_key)
    }
}

impl StoreSection {
    /// Validates the store section.
    ///
    /// # Errors
    /// Fails if a peer is not an http(s) URL or the client config is invalid.
    pub fn validate(&self) -> anyhow::Result<()> {
        for peer in &self.peers {
            anyhow::ensure!(
                peer.starts_with("http://") || peer.starts_with("https://"),
                "store peer must be an http(s) URL, got {peer:?}"
            );
        }
        self.client.validate()
    }
}

impl TargetConfig {
    /// Validates the target section.
    ///
    /// # Errors
    /// Fails on an empty RPC URL, the zero contract address or a zero timeout.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.rpc_url.is_empty(), "target rpc_url must not be empty");
        anyhow::ensure!(
            self.contract_address != Address::ZERO,
            "target contract_address must not be the zero address"
        );
        anyhow::ensure!(
            !self.receipt_timeout.is_zero(),
            "target receipt_timeout_ms must be greater than 0"
        );
        Ok(())
    }
}

impl Config {
    /// Reads, parses and validates a JSON config file.
    ///
    /// # Errors
    /// Fails if the file cannot be read, does not parse or does not validate.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&contents)
    }

    /// Parses and validates a JSON config.
    ///
    /// Parse errors carry the JSON path of the offending field.
    ///
    /// # Errors
    /// Fails if the config does not parse or does not validate.
    pub fn parse(json: &str) -> anyhow::Result<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(json);
        let config: Self = serde_path_to_error::deserialize(&mut deserializer)
            .map_err(|e| anyhow::anyhow!("config error at {}: {}", e.path(), e.inner()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every section.
    ///
    /// # Errors
    /// Returns the first invalid section.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.source.validate().context("invalid source config")?;
        self.store.validate().context("invalid store config")?;
        self.orchestrator
            .validate()
            .context("invalid orchestrator config")?;
        self.relayer.validate().context("invalid relayer config")?;
        if let Some(target) = &self.target {
            target.validate().context("invalid target config")?;
        }
        self.retry.validate().context("invalid retry config")?;
        Ok(())
    }

    /// The target section, required by the relayer.
    ///
    /// # Errors
    /// Fails if the section is missing.
    pub fn target(&self) -> anyhow::Result<&TargetConfig> {
        self.target
            .as_ref()
            .context("the relayer needs a `target` config section")
    }
}

mod defaults {
    use std::{
        net::{Ipv4Addr, SocketAddr},
        path::PathBuf,
        time::Duration,
    };

    pub const fn store_listen_addr() -> SocketAddr {
        SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::UNSPECIFIED), 30_000)
    }

    pub const fn metrics_listen_addr() -> SocketAddr {
        SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::UNSPECIFIED), 9_000)
    }

    pub const fn metrics_enabled() -> bool {
        true
    }

    pub const fn receipt_timeout() -> Duration {
        Duration::from_secs(5 * 60)
    }

    pub fn keystore_dir() -> PathBuf {
        PathBuf::from("keys")
    }

    pub fn orchestrator_key() -> String {
        "orchestrator".to_string()
    }

    pub fn relayer_key() -> String {
        "relayer".to_string()
    }

    pub fn level() -> String {
        "info".to_string()
    }

    pub fn service_name() -> String {
        "blobstream".to_string()
    }
}
