//! Orchestrator configuration.

use std::time::Duration;

use anyhow::Result;
use blobstream_utils::serde::duration_ms;

/// Queue sizes and timers of the orchestrator.
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct OrchestratorConfig {
    /// Capacity of the queue feeding the processor.
    #[serde(default = "defaults::queue_size")]
    pub queue_size: usize,
    /// Capacity of the queue holding nonces waiting for another try.
    #[serde(default = "defaults::requeue_queue_size")]
    pub requeue_queue_size: usize,
    /// A failed nonce is requeued only if it is at most this far behind the
    /// latest nonce.
    #[serde(default = "defaults::requeue_window")]
    pub requeue_window: u64,
    /// How often one requeued nonce is moved back to the processor.
    #[serde(
        rename = "requeue_interval_ms",
        with = "duration_ms",
        default = "defaults::requeue_interval"
    )]
    pub requeue_interval: Duration,
    /// How often the source is pinged while listening.
    #[serde(
        rename = "liveness_interval_ms",
        with = "duration_ms",
        default = "defaults::liveness_interval"
    )]
    pub liveness_interval: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            queue_size: defaults::queue_size(),
            requeue_queue_size: defaults::requeue_queue_size(),
            requeue_window: defaults::requeue_window(),
            requeue_interval: defaults::requeue_interval(),
            liveness_interval: defaults::liveness_interval(),
        }
    }
}

impl OrchestratorConfig {
    /// Validates the parsed config.
    ///
    /// # Errors
    /// Fails on empty queues or zero intervals.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.queue_size > 0, "Orchestrator queue size must be positive");
        anyhow::ensure!(
            self.requeue_queue_size > 0,
            "Orchestrator requeue queue size must be positive"
        );
        anyhow::ensure!(
            !self.requeue_interval.is_zero(),
            "Requeue interval must be positive"
        );
        anyhow::ensure!(
            !self.liveness_interval.is_zero(),
            "Liveness interval must be positive"
        );
        Ok(())
    }
}

mod defaults {
    use std::time::Duration;

    pub const fn queue_size() -> usize {
        1_000
    }

    pub const fn requeue_queue_size() -> usize {
        1_000
    }

    pub const fn requeue_window() -> u64 {
        50
    }

    pub const fn requeue_interval() -> Duration {
        Duration::from_secs(60)
    }

    pub const fn liveness_interval() -> Duration {
        Duration::from_secs(30)
    }
}
