//! Relayer configuration.

use std::time::Duration;

use anyhow::Result;
use blobstream_utils::serde::duration_ms;

/// Timers of the relay loop.
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct RelayerConfig {
    /// Delay between two checks of the contract when it is up to date.
    #[serde(
        rename = "poll_interval_ms",
        with = "duration_ms",
        default = "defaults::poll_interval"
    )]
    pub poll_interval: Duration,
    /// How long to wait for a quorum of confirms.
    #[serde(
        rename = "quorum_timeout_ms",
        with = "duration_ms",
        default = "defaults::quorum_timeout"
    )]
    pub quorum_timeout: Duration,
    /// Whether this relayer only steps in when the primary one stalls.
    #[serde(default)]
    pub backup: bool,
    /// Time a backup relayer waits before its first submission.
    #[serde(
        rename = "backup_grace_period_ms",
        with = "duration_ms",
        default = "defaults::backup_grace_period"
    )]
    pub backup_grace_period: Duration,
    /// Lookups of attestations pruned from the live state.
    #[serde(default)]
    pub historical: HistoricalConfig,
}

impl Default for RelayerConfig {
    fn default() -> Self {
        Self {
            poll_interval: defaults::poll_interval(),
            quorum_timeout: defaults::quorum_timeout(),
            backup: false,
            backup_grace_period: defaults::backup_grace_period(),
            historical: HistoricalConfig::default(),
        }
    }
}

impl RelayerConfig {
    /// Validates the parsed config.
    ///
    /// # Errors
    /// Fails on zero timers or an unusable historical search.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.poll_interval.is_zero(),
            "Relayer poll interval must be positive"
        );
        anyhow::ensure!(
            !self.quorum_timeout.is_zero(),
            "Quorum timeout must be positive"
        );
        self.historical.validate()
    }
}

/// Bounds of the walk back through archival heights.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct HistoricalConfig {
    /// Heights skipped between two archival queries.
    #[serde(default = "defaults::historical_step")]
    pub step: u64,
    /// Maximum number of archival queries per nonce.
    #[serde(default = "defaults::historical_max_depth")]
    pub max_depth: usize,
    /// Maximum number of nonces searched backwards for a prior valset.
    #[serde(default = "defaults::valset_search_limit")]
    pub valset_search_limit: u64,
}

impl Default for HistoricalConfig {
    fn default() -> Self {
        Self {
            step: defaults::historical_step(),
            max_depth: defaults::historical_max_depth(),
            valset_search_limit: defaults::valset_search_limit(),
        }
    }
}

impl HistoricalConfig {
    fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.step > 0, "Historical step must be positive");
        anyhow::ensure!(
            self.max_depth <= defaults::MAX_HISTORICAL_DEPTH,
            "Historical depth must be at most {}, got {}",
            defaults::MAX_HISTORICAL_DEPTH,
            self.max_depth
        );
        Ok(())
    }
}

mod defaults {
    use std::time::Duration;

    pub const MAX_HISTORICAL_DEPTH: usize = 10_000;

    pub const fn poll_interval() -> Duration {
        Duration::from_secs(10)
    }

    pub const fn quorum_timeout() -> Duration {
        Duration::from_secs(30 * 60)
    }

    pub const fn backup_grace_period() -> Duration {
        Duration::from_secs(15 * 60)
    }

    pub const fn historical_step() -> u64 {
        1_000
    }

    pub const fn historical_max_depth() -> usize {
        100
    }

    pub const fn valset_search_limit() -> u64 {
        1_000
    }
}
