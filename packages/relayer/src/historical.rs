//! Lookups of attestations pruned from the source chain's live state.

use std::sync::Arc;

use blobstream_types::{Attestation, AttestationSource, SourceError, Valset};

use crate::{HistoricalConfig, RelayerError};

/// Finds attestations by querying the source at older and older heights.
#[derive(Debug)]
pub struct HistoricalResolver<S> {
    source: Arc<S>,
    config: HistoricalConfig,
}

impl<S> Clone for HistoricalResolver<S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            config: self.config,
        }
    }
}

impl<S: AttestationSource> HistoricalResolver<S> {
    /// Creates a resolver over `source`.
    #[must_use]
    pub const fn new(source: Arc<S>, config: HistoricalConfig) -> Self {
        Self { source, config }
    }

    /// Looks up attestation `nonce` at `max_height`, then every `step`
    /// heights below it, at most `max_depth` times.
    ///
    /// # Errors
    /// Returns [`RelayerError::AttestationNotFound`] when no queried height
    /// holds the attestation.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, nonce: u64, max_height: u64) -> Result<Attestation, RelayerError> {
        let mut height = max_height;
        for _ in 0..self.config.max_depth {
            match self.source.get_attestation_at_height(nonce, height).await {
                Ok(Some(attestation)) => {
                    tracing::debug!(height, "Found attestation in history");
                    return Ok(attestation);
                }
                Ok(None) => {}
                Err(err) => tracing::debug!(height, error = %err, "Archival query failed"),
            }

            let Some(next) = height.checked_sub(self.config.step) else {
                break;
            };
            height = next;
        }
        Err(RelayerError::AttestationNotFound(nonce))
    }

    /// Returns the attestation from the live state, or from history if it
    /// was pruned.
    ///
    /// # Errors
    /// Fails if neither holds it.
    pub async fn attestation(&self, nonce: u64) -> Result<Attestation, RelayerError> {
        if let Some(attestation) = self.source.get_attestation(nonce).await? {
            return Ok(attestation);
        }
        let height = self.source.latest_height().await?;
        self.resolve(nonce, height).await
    }

    /// The last valset before `nonce`. Falls back to walking back at most
    /// `valset_search_limit` nonces through history when the live state no
    /// longer has it.
    ///
    /// # Errors
    /// Returns [`SourceError::ValsetNotFound`] if the search finds none.
    pub async fn valset_before(&self, nonce: u64) -> Result<Valset, RelayerError> {
        match self.source.get_valset_before(nonce).await {
            Ok(valset) => return Ok(valset),
            Err(SourceError::ValsetNotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }

        let height = self.source.latest_height().await?;
        let lowest = nonce.saturating_sub(self.config.valset_search_limit).max(1);
        for candidate in (lowest..nonce).rev() {
            match self.resolve(candidate, height).await {
                Ok(Attestation::Valset(valset)) => return Ok(valset),
                Ok(Attestation::DataCommitment(_)) | Err(RelayerError::AttestationNotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Err(SourceError::ValsetNotFound(nonce).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use alloy_primitives::B256;
    use blobstream_types::{test_utils::MockSource, DataCommitment};

    fn resolver(
        source: &Arc<MockSource>,
        step: u64,
        max_depth: usize,
    ) -> HistoricalResolver<MockSource> {
        HistoricalResolver::new(
            source.clone(),
            HistoricalConfig {
                step,
                max_depth,
                valset_search_limit: 10,
            },
        )
    }

    mod resolve {
        use super::*;

        #[tokio::test]
        async fn walks_back_to_archived_height() {
            let source = Arc::new(MockSource::new());
            source.push(DataCommitment::new(2, 1, 10).unwrap());
            source.prune(2, 100..=300);

            let found = resolver(&source, 100, 10).resolve(2, 650).await.unwrap();
            assert_eq!(found.nonce(), 2);
        }

        #[tokio::test]
        async fn gives_up_at_depth_ceiling() {
            let source = Arc::new(MockSource::new());
            source.push(DataCommitment::new(2, 1, 10).unwrap());
            source.prune(2, 100..=300);

            // 650, 550, 450 are all above the visible range.
            assert!(matches!(
                resolver(&source, 100, 3).resolve(2, 650).await,
                Err(RelayerError::AttestationNotFound(2))
            ));
        }

        #[tokio::test]
        async fn stops_at_height_zero() {
            let source = Arc::new(MockSource::new());
            assert!(matches!(
                resolver(&source, 100, 1_000).resolve(7, 250).await,
                Err(RelayerError::AttestationNotFound(7))
            ));
        }
    }

    mod valset_before {
        use super::*;

        #[tokio::test]
        async fn prefers_live_state() {
            let fixture = Fixture::new(3);
            let valset = resolver(&fixture.source, 100, 10).valset_before(5).await.unwrap();
            assert_eq!(valset, fixture.genesis);
        }

        #[tokio::test]
        async fn searches_history_when_pruned() {
            let fixture = Fixture::new(3);
            fixture.source.set_height(500);
            let second = fixture.push_valset(2);
            fixture.push_data_commitment(3, 1, 10, B256::repeat_byte(1));
            fixture.source.prune(1, 0..=500);
            fixture.source.prune(2, 0..=500);

            let found = resolver(&fixture.source, 100, 10).valset_before(4).await.unwrap();
            assert_eq!(found, second);
        }

        #[tokio::test]
        async fn search_is_bounded() {
            let source = Arc::new(MockSource::new());
            assert!(matches!(
                resolver(&source, 100, 2).valset_before(50).await,
                Err(RelayerError::Source(SourceError::ValsetNotFound(50)))
            ));
        }
    }
}
