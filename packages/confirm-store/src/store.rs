//! Typed access to the overlay.

use std::{sync::Arc, time::Duration};

use alloy_primitives::{Address, B256};
use blobstream_signature::verify_hex;
use blobstream_types::{LatestValset, Valset};
use futures::future::join_all;
use moka::future::Cache;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    validator::ConfirmValidator, Confirm, ConfirmKey, Namespace, NamespacedValidator, Overlay,
    OverlayError, RecordValidator, StoreError, ValidationError, LATEST_VALSET_KEY,
};

/// Confirm store tuning.
#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct StoreConfig {
    /// Bound on a single overlay request.
    #[serde(
        rename = "request_timeout_ms",
        with = "blobstream_utils::serde::duration_ms",
        default = "defaults::request_timeout"
    )]
    pub request_timeout: Duration,
    /// Delay between two polls of a quorum query.
    #[serde(
        rename = "poll_interval_ms",
        with = "blobstream_utils::serde::duration_ms",
        default = "defaults::poll_interval"
    )]
    pub poll_interval: Duration,
    /// Number of reached quorums kept in memory.
    #[serde(default = "defaults::default_quorum_cache_capacity")]
    pub quorum_cache_capacity: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            request_timeout: defaults::request_timeout(),
            poll_interval: defaults::poll_interval(),
            quorum_cache_capacity: defaults::DEFAULT_QUORUM_CACHE_CAPACITY,
        }
    }
}

impl StoreConfig {
    /// Validates the parsed config.
    ///
    /// # Errors
    /// Fails on zero durations or an oversized cache.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.request_timeout.is_zero(),
            "Store request timeout must be positive"
        );
        anyhow::ensure!(
            !self.poll_interval.is_zero(),
            "Store poll interval must be positive"
        );
        anyhow::ensure!(
            self.quorum_cache_capacity <= defaults::MAX_QUORUM_CACHE_CAPACITY,
            "Quorum cache capacity must be at most {}, got {}",
            defaults::MAX_QUORUM_CACHE_CAPACITY,
            self.quorum_cache_capacity
        );
        Ok(())
    }
}

mod defaults {
    use std::time::Duration;

    pub const DEFAULT_QUORUM_CACHE_CAPACITY: u64 = 1_000;
    pub const MAX_QUORUM_CACHE_CAPACITY: u64 = 1_000_000;

    pub const fn request_timeout() -> Duration {
        Duration::from_secs(10)
    }

    pub const fn poll_interval() -> Duration {
        Duration::from_secs(1)
    }

    pub const fn default_quorum_cache_capacity() -> u64 {
        DEFAULT_QUORUM_CACHE_CAPACITY
    }
}

type QuorumKey = (Namespace, u64, B256);

/// Reads and writes confirms and the latest valset, validating every record
/// on the way in and on the way out.
#[derive(Clone)]
pub struct ConfirmStore<O> {
    overlay: O,
    validator: Arc<NamespacedValidator>,
    quorums: Cache<QuorumKey, Arc<Vec<Vec<u8>>>>,
    request_timeout: Duration,
    poll_interval: Duration,
}

impl<O> std::fmt::Debug for ConfirmStore<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmStore")
            .field("request_timeout", &self.request_timeout)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl<O: Overlay> ConfirmStore<O> {
    /// Creates a store on top of `overlay`.
    #[must_use]
    pub fn new(overlay: O, config: &StoreConfig) -> Self {
        Self {
            overlay,
            validator: Arc::new(NamespacedValidator::default()),
            quorums: Cache::new(config.quorum_cache_capacity),
            request_timeout: config.request_timeout,
            poll_interval: config.poll_interval,
        }
    }

    /// The underlying overlay.
    pub const fn overlay(&self) -> &O {
        &self.overlay
    }

    async fn put_raw(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.validator.validate(key, &value)?;
        timeout(self.request_timeout, self.overlay.put(key, value))
            .await
            .map_err(|_| OverlayError::Timeout(self.request_timeout))??;
        Ok(())
    }

    async fn get_raw(&self, key: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        let candidates = timeout(self.request_timeout, self.overlay.get(key))
            .await
            .map_err(|_| OverlayError::Timeout(self.request_timeout))??;
        Ok(candidates)
    }

    /// Publishes a confirm for `nonce` under its signer's key.
    ///
    /// # Errors
    /// Fails if the confirm does not validate locally or the overlay refuses it.
    #[tracing::instrument(
        skip_all,
        fields(nonce = nonce, namespace = %C::NAMESPACE, address = %confirm.signer())
    )]
    pub async fn put_confirm<C: Confirm>(&self, nonce: u64, confirm: &C) -> Result<(), StoreError> {
        let key = ConfirmKey::new(C::NAMESPACE, nonce, confirm.signer()).to_string();
        let value = serde_json::to_vec(confirm).map_err(StoreError::Encode)?;
        self.put_raw(&key, value).await?;

        tracing::debug!("Published confirm");
        Ok(())
    }

    /// Looks up the confirm `address` published for `nonce`.
    ///
    /// Returns `None` when nothing, or nothing valid, is stored.
    ///
    /// # Errors
    /// Fails if the overlay cannot be reached.
    pub async fn query_one<C: Confirm>(
        &self,
        nonce: u64,
        address: Address,
    ) -> Result<Option<C>, StoreError> {
        let key = ConfirmKey::new(C::NAMESPACE, nonce, address).to_string();
        let candidates = self.get_raw(&key).await?;
        if candidates.is_empty() {
            return Ok(None);
        }

        let validator = ConfirmValidator::<C>::default();
        match validator.select(&key, &candidates) {
            Ok(index) => Ok(Some(validator.decode(&key, &candidates[index])?.1)),
            Err(ValidationError::NoValidCandidate(_)) => {
                tracing::warn!(
                    key,
                    candidates = candidates.len(),
                    "No valid confirm among candidates"
                );
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Publishes `valset` as the latest valset. Replicas holding a newer one
    /// keep it.
    ///
    /// # Errors
    /// Fails if the valset is empty or the overlay refuses it.
    pub async fn put_latest_valset(&self, valset: &Valset) -> Result<(), StoreError> {
        let value = serde_json::to_vec(&LatestValset(valset.clone())).map_err(StoreError::Encode)?;
        self.put_raw(LATEST_VALSET_KEY, value).await
    }

    /// The newest valset known to the overlay.
    ///
    /// # Errors
    /// Fails if the overlay cannot be reached.
    pub async fn latest_valset(&self) -> Result<Option<Valset>, StoreError> {
        let candidates = self.get_raw(LATEST_VALSET_KEY).await?;
        if candidates.is_empty() {
            return Ok(None);
        }

        match self.validator.select(LATEST_VALSET_KEY, &candidates) {
            Ok(index) => {
                let latest: LatestValset = serde_json::from_slice(&candidates[index])
                    .map_err(ValidationError::Decode)?;
                Ok(Some(latest.into_inner()))
            }
            Err(ValidationError::NoValidCandidate(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Waits until members of `valset` holding at least its two thirds
    /// threshold have published a confirm for `nonce` that verifies against
    /// `digest`.
    ///
    /// Returns the valid confirms in member order once the threshold is met.
    /// Confirms from non members carry no weight.
    ///
    /// # Errors
    /// - [`StoreError::EmptyValset`] if the valset has no power.
    /// - [`StoreError::QuorumTimeout`] if the threshold is not met in time.
    /// - [`StoreError::Cancelled`] if the token fires first.
    #[tracing::instrument(skip_all, fields(nonce = nonce, namespace = %C::NAMESPACE))]
    pub async fn query_quorum<C: Confirm>(
        &self,
        nonce: u64,
        valset: &Valset,
        digest: B256,
        deadline: Duration,
        token: &CancellationToken,
    ) -> Result<Vec<C>, StoreError> {
        let threshold = valset.two_thirds_threshold();
        if threshold == 0 {
            return Err(StoreError::EmptyValset(valset.nonce));
        }

        let cache_key = (C::NAMESPACE, nonce, digest);
        if let Some(values) = self.quorums.get(&cache_key).await {
            tracing::debug!("Quorum served from cache");
            return values
                .iter()
                .map(|value| {
                    serde_json::from_slice(value)
                        .map_err(|e| StoreError::from(ValidationError::Decode(e)))
                })
                .collect();
        }

        let started = Instant::now();
        loop {
            if token.is_cancelled() {
                return Err(StoreError::Cancelled);
            }

            let collected = self.collect_confirms::<C>(nonce, valset, digest).await;
            let power = collected
                .iter()
                .fold(0_u64, |sum, (power, _)| sum.saturating_add(*power));

            if power >= threshold {
                tracing::info!(power, threshold, signers = collected.len(), "Quorum reached");
                let confirms: Vec<C> = collected.into_iter().map(|(_, confirm)| confirm).collect();
                let values = confirms
                    .iter()
                    .map(serde_json::to_vec)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(StoreError::Encode)?;
                self.quorums.insert(cache_key, Arc::new(values)).await;
                return Ok(confirms);
            }

            let elapsed = started.elapsed();
            if elapsed >= deadline {
                return Err(StoreError::QuorumTimeout {
                    nonce,
                    power,
                    threshold,
                });
            }

            tracing::debug!(power, threshold, "Waiting for more confirms");
            tokio::select! {
                () = token.cancelled() => return Err(StoreError::Cancelled),
                () = tokio::time::sleep(self.poll_interval.min(deadline - elapsed)) => {}
            }
        }
    }

    /// Fetches the confirm of every member in parallel, keeping the ones whose
    /// signature verifies against `digest`.
    async fn collect_confirms<C: Confirm>(
        &self,
        nonce: u64,
        valset: &Valset,
        digest: B256,
    ) -> Vec<(u64, C)> {
        let lookups = valset.members.iter().map(|member| async move {
            let address = member.evm_address;
            let key = ConfirmKey::new(C::NAMESPACE, nonce, address).to_string();
            let candidates = match self.get_raw(&key).await {
                Ok(candidates) => candidates,
                Err(err) => {
                    tracing::warn!(%address, error = %err, "Failed to fetch confirm");
                    return None;
                }
            };

            let validator = ConfirmValidator::<C>::default();
            candidates.iter().find_map(|value| {
                let (_, confirm) = validator.decode(&key, value).ok()?;
                match verify_hex(digest, confirm.signature(), address) {
                    Ok(()) => Some((member.power, confirm)),
                    Err(err) => {
                        tracing::debug!(%address, error = %err, "Discarding confirm");
                        None
                    }
                }
            })
        });

        join_all(lookups).await.into_iter().flatten().collect()
    }
}
