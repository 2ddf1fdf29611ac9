//! The relay loop.

use std::sync::Arc;

use alloy_primitives::B256;
use blobstream_confirm_store::{Confirm, ConfirmStore, Overlay, StoreError};
use blobstream_signature::{
    data_commitment_digest, decompose_vrs, valset_digest, SignatureError, Vrs,
};
use blobstream_types::{
    Attestation, AttestationSource, AttestationType, DataCommitmentConfirm, Valset, ValsetConfirm,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{metrics, ChainSubmitter, HistoricalResolver, RelayerConfig, RelayerError};

/// Result of one relay iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The contract already holds the latest attestation.
    UpToDate {
        /// Last nonce the contract accepted.
        last_relayed: u64,
    },
    /// The next attestation was committed.
    Relayed {
        /// Nonce committed.
        nonce: u64,
        /// Kind of attestation committed.
        attestation_type: AttestationType,
        /// Hash of the transaction.
        tx_hash: B256,
    },
}

/// Lines confirms up with the members of `current`: one entry per member,
/// [`Vrs::zero`] where the member has no confirm. Confirms from non members
/// are ignored.
///
/// # Errors
/// Fails if a member's signature is malformed.
pub fn order_signatures<C: Confirm>(
    current: &Valset,
    confirms: &[C],
) -> Result<Vec<Vrs>, SignatureError> {
    current
        .members
        .iter()
        .map(|member| {
            confirms
                .iter()
                .find(|confirm| confirm.signer() == member.evm_address)
                .map_or(Ok(Vrs::zero()), |confirm| decompose_vrs(confirm.signature()))
        })
        .collect()
}

/// Moves attestations with a quorum of confirms onto the bridge contract,
/// one nonce at a time.
#[derive(Debug)]
pub struct Relayer<S, O, C> {
    source: Arc<S>,
    store: ConfirmStore<O>,
    submitter: Arc<C>,
    history: HistoricalResolver<S>,
    config: RelayerConfig,
}

impl<S, O, C> Relayer<S, O, C>
where
    S: AttestationSource,
    O: Overlay,
    C: ChainSubmitter,
{
    /// Creates a relayer.
    #[must_use]
    pub fn new(
        source: Arc<S>,
        store: ConfirmStore<O>,
        submitter: Arc<C>,
        config: RelayerConfig,
    ) -> Self {
        Self {
            history: HistoricalResolver::new(source.clone(), config.historical),
            source,
            store,
            submitter,
            config,
        }
    }

    /// Commits the attestation following the contract's last nonce, if the
    /// source has one.
    ///
    /// # Errors
    /// Fails if the attestation, its prior valset or a quorum of confirms
    /// cannot be found, or the submission fails.
    #[tracing::instrument(skip_all)]
    pub async fn relay_next(
        &self,
        token: &CancellationToken,
    ) -> Result<RelayOutcome, RelayerError> {
        let last_relayed = self.submitter.last_relayed_nonce().await?;
        metrics::LAST_RELAYED_NONCE.set(i64::try_from(last_relayed).unwrap_or(i64::MAX));

        let latest = self.source.latest_nonce().await?;
        if last_relayed >= latest {
            tracing::debug!(last_relayed, latest, "Bridge contract is up to date");
            return Ok(RelayOutcome::UpToDate { last_relayed });
        }

        let nonce = last_relayed + 1;
        let attestation = self.history.attestation(nonce).await?;
        let current = self.history.valset_before(nonce).await?;
        tracing::info!(
            nonce,
            latest,
            attestation_type = %attestation.kind(),
            valset_nonce = current.nonce,
            "Relaying attestation"
        );

        let tx_hash = match &attestation {
            Attestation::Valset(new) => {
                let confirms: Vec<ValsetConfirm> =
                    self.quorum(nonce, &current, valset_digest(new), token).await?;
                let signatures = order_signatures(&current, &confirms)?;
                self.submitter
                    .update_validator_set(new, new.two_thirds_threshold(), &current, &signatures)
                    .await?
            }
            Attestation::DataCommitment(commitment) => {
                let root = self
                    .source
                    .get_data_root(commitment.begin_block, commitment.end_block)
                    .await?;
                let confirms: Vec<DataCommitmentConfirm> = self
                    .quorum(nonce, &current, data_commitment_digest(nonce, root), token)
                    .await?;
                let signatures = order_signatures(&current, &confirms)?;
                self.submitter
                    .submit_data_root_tuple_root(nonce, root, &current, &signatures)
                    .await?
            }
        };

        metrics::RELAYED_ATTESTATIONS
            .with_label_values(&[attestation.kind().as_str()])
            .inc();
        tracing::info!(nonce, %tx_hash, "Relayed attestation");
        Ok(RelayOutcome::Relayed {
            nonce,
            attestation_type: attestation.kind(),
            tx_hash,
        })
    }

    async fn quorum<T: Confirm>(
        &self,
        nonce: u64,
        current: &Valset,
        digest: B256,
        token: &CancellationToken,
    ) -> Result<Vec<T>, RelayerError> {
        let started = Instant::now();
        let confirms = self
            .store
            .query_quorum(nonce, current, digest, self.config.quorum_timeout, token)
            .await;
        metrics::QUORUM_WAIT.observe(started.elapsed().as_secs_f64());
        Ok(confirms?)
    }

    /// Relays until `token` is cancelled. Iteration errors are logged and
    /// the loop carries on.
    pub async fn start(self: Arc<Self>, token: CancellationToken) {
        if self.config.backup {
            tracing::info!(
                grace_period = ?self.config.backup_grace_period,
                "Backup relayer waiting before its first submission"
            );
            tokio::select! {
                () = token.cancelled() => return,
                () = tokio::time::sleep(self.config.backup_grace_period) => {}
            }
        }

        tracing::info!("Starting relayer");
        loop {
            let idle = match self.relay_next(&token).await {
                Ok(RelayOutcome::Relayed { .. }) => false,
                Ok(RelayOutcome::UpToDate { .. }) => true,
                Err(RelayerError::Store(StoreError::Cancelled)) => break,
                Err(err) => {
                    metrics::RELAY_FAILURES.inc();
                    tracing::error!(error = %err, "Relay iteration failed");
                    true
                }
            };

            if token.is_cancelled() {
                break;
            }
            if idle {
                tokio::select! {
                    () = token.cancelled() => break,
                    () = tokio::time::sleep(self.config.poll_interval) => {}
                }
            }
        }
        tracing::info!("Relayer stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use blobstream_types::test_utils::MockSource;
    use std::time::Duration;

    mod order_signatures {
        use super::*;

        #[test]
        fn positional_with_zero_gaps() {
            let fixture = Fixture::new(3);
            let confirms = vec![
                fixture.valset_confirm(2, &fixture.genesis),
                fixture.valset_confirm(0, &fixture.genesis),
            ];

            let signatures = order_signatures(&fixture.genesis, &confirms).unwrap();

            assert_eq!(signatures.len(), 3);
            assert_eq!(signatures[0], decompose_vrs(&confirms[1].signature).unwrap());
            assert_eq!(signatures[1], Vrs::zero());
            assert_eq!(signatures[2], decompose_vrs(&confirms[0].signature).unwrap());
        }

        #[test]
        fn ignores_non_members() {
            let fixture = Fixture::new(4);
            let mut current = fixture.genesis.clone();
            current.members.truncate(3);
            let confirms = vec![fixture.valset_confirm(3, &current)];

            assert_eq!(
                order_signatures(&current, &confirms).unwrap(),
                vec![Vrs::zero(); 3]
            );
        }
    }

    mod relay_next {
        use super::*;

        #[tokio::test]
        async fn nothing_to_do_when_level() {
            let fixture = Fixture::new(3);
            let relayer = fixture.relayer(RelayerConfig::default());

            assert_eq!(
                relayer.relay_next(&CancellationToken::new()).await.unwrap(),
                RelayOutcome::UpToDate { last_relayed: 1 }
            );
        }

        #[tokio::test]
        async fn nothing_to_do_when_ahead() {
            let fixture = Fixture::new(3);
            fixture.submitter.set_last_relayed(9);

            assert_eq!(
                fixture
                    .relayer(RelayerConfig::default())
                    .relay_next(&CancellationToken::new())
                    .await
                    .unwrap(),
                RelayOutcome::UpToDate { last_relayed: 9 }
            );
            assert!(fixture.submitter.submissions().is_empty());
        }

        #[tokio::test]
        async fn relays_data_commitment() {
            let fixture = Fixture::new(3);
            let root = B256::repeat_byte(0x42);
            fixture.push_data_commitment(2, 1, 10, root);
            fixture.publish_data_commitment_confirm(0, 2, root).await;
            fixture.publish_data_commitment_confirm(1, 2, root).await;

            let outcome = fixture
                .relayer(RelayerConfig::default())
                .relay_next(&CancellationToken::new())
                .await
                .unwrap();

            assert!(matches!(
                outcome,
                RelayOutcome::Relayed {
                    nonce: 2,
                    attestation_type: AttestationType::DataCommitment,
                    ..
                }
            ));
            let submissions = fixture.submitter.submissions();
            let [Submission::DataRoot {
                nonce,
                root: submitted,
                current_nonce,
                signatures,
            }] = submissions.as_slice()
            else {
                panic!("expected one data root submission");
            };
            assert_eq!((*nonce, *submitted, *current_nonce), (2, root, 1));
            assert_ne!(signatures[0], Vrs::zero());
            assert_ne!(signatures[1], Vrs::zero());
            assert_eq!(signatures[2], Vrs::zero());
            assert_eq!(fixture.submitter.last_relayed(), 2);
        }

        #[tokio::test]
        async fn relays_valset_update() {
            let fixture = Fixture::new(3);
            let next = fixture.push_valset(2);
            for index in 0..3 {
                fixture.publish_valset_confirm(index, &next).await;
            }

            fixture
                .relayer(RelayerConfig::default())
                .relay_next(&CancellationToken::new())
                .await
                .unwrap();

            assert_eq!(
                fixture.submitter.submissions(),
                vec![Submission::ValsetUpdate {
                    nonce: 2,
                    threshold: next.two_thirds_threshold(),
                    current_nonce: 1,
                    signatures: order_signatures(
                        &fixture.genesis,
                        &(0..3).map(|i| fixture.valset_confirm(i, &next)).collect::<Vec<_>>()
                    )
                    .unwrap(),
                }]
            );
        }

        #[tokio::test(start_paused = true)]
        async fn quorum_timeout_is_reported() {
            let fixture = Fixture::new(3);
            let root = B256::repeat_byte(1);
            fixture.push_data_commitment(2, 1, 10, root);
            // 10 of the 24 required.
            fixture.publish_data_commitment_confirm(0, 2, root).await;

            let config = RelayerConfig {
                quorum_timeout: Duration::from_secs(5),
                ..RelayerConfig::default()
            };
            let result = fixture.relayer(config).relay_next(&CancellationToken::new()).await;

            assert!(matches!(
                result,
                Err(RelayerError::Store(StoreError::QuorumTimeout { power: 10, threshold: 24, .. }))
            ));
            assert!(fixture.submitter.submissions().is_empty());
        }

        #[tokio::test]
        async fn resolves_pruned_attestation() {
            let fixture = Fixture::new(3);
            let root = B256::repeat_byte(3);
            fixture.push_data_commitment(2, 1, 10, root);
            fixture.push_data_commitment(3, 10, 20, B256::repeat_byte(4));
            fixture.source.set_height(5_000);
            fixture.source.prune(2, 3_000..=4_500);
            fixture.publish_data_commitment_confirm(0, 2, root).await;
            fixture.publish_data_commitment_confirm(1, 2, root).await;

            let outcome = fixture
                .relayer(RelayerConfig::default())
                .relay_next(&CancellationToken::new())
                .await
                .unwrap();
            assert!(matches!(outcome, RelayOutcome::Relayed { nonce: 2, .. }));
        }

        #[tokio::test]
        async fn reverted_submission() {
            let fixture = Fixture::new(3);
            let root = B256::repeat_byte(5);
            fixture.push_data_commitment(2, 1, 10, root);
            fixture.publish_data_commitment_confirm(0, 2, root).await;
            fixture.publish_data_commitment_confirm(1, 2, root).await;
            fixture.submitter.revert_next();

            assert!(matches!(
                fixture
                    .relayer(RelayerConfig::default())
                    .relay_next(&CancellationToken::new())
                    .await,
                Err(RelayerError::Submitter(crate::SubmitterError::Reverted(_)))
            ));
            assert_eq!(fixture.submitter.last_relayed(), 1);
        }
    }

    mod start {
        use super::*;

        fn spawn(
            fixture: &Fixture,
            config: RelayerConfig,
        ) -> (CancellationToken, tokio::task::JoinHandle<()>) {
            let relayer: Arc<Relayer<MockSource, _, _>> = Arc::new(fixture.relayer(config));
            let token = CancellationToken::new();
            (token.clone(), tokio::spawn(relayer.start(token)))
        }

        #[tokio::test(start_paused = true)]
        async fn catches_up_in_order() {
            let fixture = Fixture::new(3);
            for nonce in 2..=4 {
                let root = B256::with_last_byte(u8::try_from(nonce).unwrap());
                fixture.push_data_commitment(nonce, nonce * 10, nonce * 10 + 10, root);
                fixture.publish_data_commitment_confirm(0, nonce, root).await;
                fixture.publish_data_commitment_confirm(1, nonce, root).await;
            }

            let (token, handle) = spawn(&fixture, RelayerConfig::default());
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel();
            handle.await.unwrap();

            let relayed: Vec<u64> = fixture
                .submitter
                .submissions()
                .iter()
                .map(Submission::nonce)
                .collect();
            assert_eq!(relayed, vec![2, 3, 4]);
        }

        #[tokio::test(start_paused = true)]
        async fn backup_waits_for_grace_period() {
            let fixture = Fixture::new(3);
            let root = B256::repeat_byte(6);
            fixture.push_data_commitment(2, 1, 10, root);
            fixture.publish_data_commitment_confirm(0, 2, root).await;
            fixture.publish_data_commitment_confirm(1, 2, root).await;

            let config = RelayerConfig {
                backup: true,
                backup_grace_period: Duration::from_secs(60),
                ..RelayerConfig::default()
            };
            let (token, handle) = spawn(&fixture, config);

            tokio::time::sleep(Duration::from_secs(30)).await;
            assert!(fixture.submitter.submissions().is_empty());

            tokio::time::sleep(Duration::from_secs(31)).await;
            assert_eq!(fixture.submitter.last_relayed(), 2);

            token.cancel();
            handle.await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn keeps_going_after_failures() {
            let fixture = Fixture::new(3);
            let root = B256::repeat_byte(7);
            fixture.push_data_commitment(2, 1, 10, root);
            fixture.publish_data_commitment_confirm(0, 2, root).await;
            fixture.publish_data_commitment_confirm(1, 2, root).await;
            fixture.submitter.revert_next();

            let (token, handle) = spawn(&fixture, RelayerConfig::default());
            tokio::time::sleep(Duration::from_secs(25)).await;
            token.cancel();
            handle.await.unwrap();

            assert_eq!(fixture.submitter.last_relayed(), 2);
        }
    }
}
