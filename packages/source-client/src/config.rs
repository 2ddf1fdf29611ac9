//! Configuration of the source chain client.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where and how to query the source chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// gRPC endpoint of a source chain node, e.g. `http://localhost:9090`.
    pub endpoint: String,
    /// Per-request timeout.
    #[serde(
        rename = "request_timeout_ms",
        with = "blobstream_utils::serde::duration_ms",
        default = "defaults::request_timeout"
    )]
    pub request_timeout: Duration,
    /// How often the latest nonce is polled for new attestations.
    #[serde(
        rename = "poll_interval_ms",
        with = "blobstream_utils::serde::duration_ms",
        default = "defaults::poll_interval"
    )]
    pub poll_interval: Duration,
}

impl SourceConfig {
    /// Creates a config for `endpoint` with default timings.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            request_timeout: defaults::request_timeout(),
            poll_interval: defaults::poll_interval(),
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Fails if the endpoint is not an http(s) URL or a duration is zero.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://"),
            "source endpoint must be an http(s) URL, got {:?}",
            self.endpoint
        );
        anyhow::ensure!(
            !self.request_timeout.is_zero(),
            "source request_timeout_ms must be greater than 0"
        );
        anyhow::ensure!(
            !self.poll_interval.is_zero(),
            "source poll_interval_ms must be greater than 0"
        );
        Ok(())
    }
}

mod defaults {
    use std::time::Duration;

    pub const fn request_timeout() -> Duration {
        Duration::from_secs(30)
    }

    pub const fn poll_interval() -> Duration {
        Duration::from_secs(5)
    }
}
