//! Listener, backfiller and processor of the orchestrator.

use std::sync::Arc;

use blobstream_confirm_store::{ConfirmStore, Overlay};
use blobstream_signature::{
    data_commitment_digest, encode_signature, sign, valset_digest, SigningIdentity,
};
use blobstream_types::{
    Attestation, AttestationSource, AttestationType, DataCommitmentConfirm, ErrorKind,
    NonceStream, ValsetConfirm, BOOTSTRAP_NONCE,
};
use blobstream_utils::{RetryError, Retrier};
use futures::StreamExt;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;

use crate::{metrics, OrchestratorConfig, OrchestratorError};

/// Why a nonce needed no signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Nonce 1 is trusted on deployment.
    Bootstrap,
    /// We are not in the valset expected to sign the nonce.
    NotSigner,
    /// Our confirm is already in the store.
    AlreadySigned,
}

impl SkipReason {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bootstrap => "bootstrap",
            Self::NotSigner => "not_signer",
            Self::AlreadySigned => "already_signed",
        }
    }
}

/// Result of processing one nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Nothing to sign.
    Skipped(SkipReason),
    /// A confirm for the attestation was signed and published.
    Published(AttestationType),
}

/// What happened to a nonce whose retries ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequeueDecision {
    /// Put back for a later attempt.
    Requeued,
    /// Given up on.
    Dropped,
}

/// Whether a failed `nonce` is still recent enough, relative to `latest`, to
/// be worth another try.
#[must_use]
pub const fn should_requeue(nonce: u64, latest: u64, window: u64) -> bool {
    latest.saturating_sub(nonce) <= window
}

/// Signs the attestations of one validator.
#[derive(Debug)]
pub struct Orchestrator<S, O> {
    source: Arc<S>,
    store: ConfirmStore<O>,
    identity: Arc<SigningIdentity>,
    retrier: Retrier,
    config: OrchestratorConfig,
}

impl<S: AttestationSource, O: Overlay> Orchestrator<S, O> {
    /// Creates an orchestrator signing as `identity`.
    #[must_use]
    pub const fn new(
        source: Arc<S>,
        store: ConfirmStore<O>,
        identity: Arc<SigningIdentity>,
        retrier: Retrier,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            source,
            store,
            identity,
            retrier,
            config,
        }
    }

    /// The signing identity.
    pub fn identity(&self) -> &SigningIdentity {
        &self.identity
    }

    /// Signs and publishes the confirm for `nonce` if we are expected to.
    ///
    /// # Errors
    /// Fails if the attestation does not exist yet, or on any source, store or
    /// signing failure.
    #[tracing::instrument(skip_all, fields(nonce = nonce))]
    pub async fn process(&self, nonce: u64) -> Result<ProcessOutcome, OrchestratorError> {
        let attestation = self
            .source
            .get_attestation(nonce)
            .await?
            .ok_or(OrchestratorError::AttestationNotFound(nonce))?;

        if nonce == BOOTSTRAP_NONCE {
            return Ok(self.skip(SkipReason::Bootstrap));
        }

        let prior = self.source.get_valset_before(nonce).await?;
        let address = self.identity.address();
        if !prior.contains(&address) {
            return Ok(self.skip(SkipReason::NotSigner));
        }

        if let Err(err) = self.store.put_latest_valset(&prior).await {
            tracing::warn!(
                valset_nonce = prior.nonce,
                error = %err,
                "Failed to publish latest valset"
            );
        }

        let published = match &attestation {
            Attestation::Valset(valset) => {
                if self.store.query_one::<ValsetConfirm>(nonce, address).await?.is_some() {
                    return Ok(self.skip(SkipReason::AlreadySigned));
                }
                let signature = sign(valset_digest(valset), &self.identity)?;
                let confirm = ValsetConfirm::new(address, encode_signature(&signature));
                self.store.put_confirm(nonce, &confirm).await?;
                AttestationType::Valset
            }
            Attestation::DataCommitment(commitment) => {
                if self
                    .store
                    .query_one::<DataCommitmentConfirm>(nonce, address)
                    .await?
                    .is_some()
                {
                    return Ok(self.skip(SkipReason::AlreadySigned));
                }
                let root = self
                    .source
                    .get_data_root(commitment.begin_block, commitment.end_block)
                    .await?;
                let signature = sign(data_commitment_digest(nonce, root), &self.identity)?;
                let confirm = DataCommitmentConfirm::new(
                    address,
                    encode_signature(&signature),
                    root,
                );
                self.store.put_confirm(nonce, &confirm).await?;
                AttestationType::DataCommitment
            }
        };

        metrics::CONFIRMS_PUBLISHED
            .with_label_values(&[published.as_str()])
            .inc();
        tracing::info!(attestation_type = %published, "Signed attestation");
        Ok(ProcessOutcome::Published(published))
    }

    fn skip(&self, reason: SkipReason) -> ProcessOutcome {
        metrics::NONCES_SKIPPED
            .with_label_values(&[reason.as_str()])
            .inc();
        tracing::debug!(
            reason = reason.as_str(),
            address = %self.identity.address(),
            "Skipping nonce"
        );
        ProcessOutcome::Skipped(reason)
    }

    /// Requeues `nonce` if it is within the requeue window of the latest
    /// nonce and there is room, drops it otherwise.
    pub async fn maybe_requeue(&self, nonce: u64, requeue: &mpsc::Sender<u64>) -> RequeueDecision {
        let latest = match self.source.latest_nonce().await {
            Ok(latest) => latest,
            Err(err) => {
                tracing::warn!(
                    nonce,
                    error = %err,
                    "Could not read latest nonce, requeueing anyway"
                );
                nonce
            }
        };

        if !should_requeue(nonce, latest, self.config.requeue_window) {
            metrics::NONCES_DROPPED.inc();
            tracing::error!(nonce, latest, "Nonce fell out of the requeue window, dropping it");
            return RequeueDecision::Dropped;
        }

        match requeue.try_send(nonce) {
            Ok(()) => {
                metrics::NONCES_REQUEUED.inc();
                tracing::warn!(nonce, "Requeued nonce");
                RequeueDecision::Requeued
            }
            Err(TrySendError::Full(_) | TrySendError::Closed(_)) => {
                metrics::NONCES_DROPPED.inc();
                tracing::error!(nonce, "Requeue queue unavailable, dropping nonce");
                RequeueDecision::Dropped
            }
        }
    }
}

impl<S: AttestationSource, O: Overlay + Clone> Orchestrator<S, O> {
    /// Runs the orchestrator until `token` is cancelled or a worker fails
    /// fatally. The signing key is locked before returning.
    ///
    /// # Errors
    /// Returns the first fatal worker error. The token is cancelled when that
    /// happens so the other workers stop too.
    pub async fn start(self: Arc<Self>, token: CancellationToken) -> Result<(), OrchestratorError> {
        tracing::info!(address = %self.identity.address(), "Starting orchestrator");

        let (nonce_tx, nonce_rx) = mpsc::channel(self.config.queue_size);
        let (requeue_tx, requeue_rx) = mpsc::channel(self.config.requeue_queue_size);

        let mut workers = JoinSet::new();
        workers.spawn(self.clone().listen(nonce_tx.clone(), token.clone()));
        workers.spawn(self.clone().backfill(nonce_tx.clone(), token.clone()));
        workers.spawn(self.clone().process_queue(nonce_rx, requeue_tx, token.clone()));
        workers.spawn(self.clone().drain_requeue(requeue_rx, nonce_tx, token.clone()));

        let mut result = Ok(());
        while let Some(joined) = workers.join_next().await {
            let outcome = joined
                .map_err(|e| OrchestratorError::Worker(e.to_string()))
                .and_then(|r| r);
            if let Err(err) = outcome {
                tracing::error!(error = %err, "Orchestrator worker failed, shutting down");
                token.cancel();
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }

        self.identity.lock();
        tracing::info!("Orchestrator stopped");
        result
    }

    async fn subscribe(
        &self,
        token: &CancellationToken,
    ) -> Result<Option<NonceStream>, OrchestratorError> {
        match self
            .retrier
            .retry(token, || self.source.subscribe_new_attestations())
            .await
        {
            Ok(stream) => Ok(Some(stream)),
            Err(RetryError::Cancelled) => Ok(None),
            Err(RetryError::Exhausted { attempts, source }) => {
                tracing::error!(
                    attempts,
                    error = %source,
                    "Could not subscribe to new attestations"
                );
                Err(OrchestratorError::SubscriptionLost(attempts))
            }
            Err(RetryError::Aborted(source)) => Err(source.into()),
        }
    }

    /// Pushes every new nonce to the processor. Reconnects when the
    /// subscription ends or the source stops answering pings, then pushes
    /// the nonces created while it was disconnected.
    async fn listen(
        self: Arc<Self>,
        nonces: mpsc::Sender<u64>,
        token: CancellationToken,
    ) -> Result<(), OrchestratorError> {
        let mut liveness = tokio::time::interval(self.config.liveness_interval);
        liveness.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut last_seen: Option<u64> = None;

        'subscription: loop {
            let Some(mut stream) = self.subscribe(&token).await? else {
                return Ok(());
            };
            let Some(latest) = self.latest_nonce(&token).await? else {
                return Ok(());
            };
            // The backfiller covers everything up to the first subscription.
            if let Some(seen) = last_seen {
                if seen < latest {
                    tracing::info!(
                        from = seen + 1,
                        to = latest,
                        "Catching up on missed attestations"
                    );
                }
                for nonce in seen.saturating_add(1)..=latest {
                    if !Self::forward(&nonces, nonce, &token).await {
                        return Ok(());
                    }
                }
            }
            last_seen = last_seen.max(Some(latest));

            tracing::info!("Listening for new attestations");
            liveness.reset();

            loop {
                tokio::select! {
                    () = token.cancelled() => return Ok(()),
                    _ = liveness.tick() => {
                        if let Err(err) = self.source.health_check().await {
                            tracing::warn!(
                                error = %err,
                                "Attestation source unreachable, reconnecting"
                            );
                            continue 'subscription;
                        }
                    }
                    next = stream.next() => match next {
                        Some(Ok(nonce)) => {
                            tracing::debug!(nonce, "New attestation");
                            if !Self::forward(&nonces, nonce, &token).await {
                                return Ok(());
                            }
                            last_seen = last_seen.max(Some(nonce));
                        }
                        Some(Err(err)) => {
                            tracing::warn!(
                                error = %err,
                                "Attestation subscription failed, reconnecting"
                            );
                            continue 'subscription;
                        }
                        None => {
                            tracing::warn!("Attestation subscription closed, reconnecting");
                            continue 'subscription;
                        }
                    },
                }
            }
        }
    }

    /// Reads the latest nonce, retrying transient failures. `None` when
    /// cancelled.
    async fn latest_nonce(
        &self,
        token: &CancellationToken,
    ) -> Result<Option<u64>, OrchestratorError> {
        match self.retrier.retry(token, || self.source.latest_nonce()).await {
            Ok(latest) => Ok(Some(latest)),
            Err(RetryError::Cancelled) => Ok(None),
            Err(RetryError::Exhausted { attempts, source }) => {
                tracing::error!(attempts, error = %source, "Could not read the latest nonce");
                Err(OrchestratorError::SubscriptionLost(attempts))
            }
            Err(RetryError::Aborted(source)) => Err(source.into()),
        }
    }

    /// Sends `nonce` to the processor. `false` once cancelled or the
    /// processor is gone.
    async fn forward(nonces: &mpsc::Sender<u64>, nonce: u64, token: &CancellationToken) -> bool {
        tokio::select! {
            () = token.cancelled() => false,
            sent = nonces.send(nonce) => sent.is_ok(),
        }
    }

    /// Pushes every nonce from the latest down to the earliest still
    /// available.
    async fn backfill(
        self: Arc<Self>,
        nonces: mpsc::Sender<u64>,
        token: CancellationToken,
    ) -> Result<(), OrchestratorError> {
        let bounds = self
            .retrier
            .retry(&token, || async {
                let latest = self.source.latest_nonce().await?;
                let earliest = self.source.earliest_nonce().await?;
                Ok::<_, OrchestratorError>((earliest, latest))
            })
            .await;

        let (earliest, latest) = match bounds {
            Ok(bounds) => bounds,
            Err(RetryError::Cancelled) => return Ok(()),
            Err(err) => {
                tracing::error!(error = %err, "Backfill could not read nonce bounds, skipping it");
                return Ok(());
            }
        };

        tracing::info!(earliest, latest, "Backfilling attestations");
        for nonce in (earliest.max(BOOTSTRAP_NONCE)..=latest).rev() {
            tokio::select! {
                () = token.cancelled() => return Ok(()),
                sent = nonces.send(nonce) => if sent.is_err() {
                    return Ok(());
                },
            }
        }
        tracing::info!("Backfill done");
        Ok(())
    }

    /// Processes queued nonces one at a time, retrying failures and handing
    /// nonces that still fail to the requeue logic.
    async fn process_queue(
        self: Arc<Self>,
        mut nonces: mpsc::Receiver<u64>,
        requeue: mpsc::Sender<u64>,
        token: CancellationToken,
    ) -> Result<(), OrchestratorError> {
        loop {
            let nonce = tokio::select! {
                () = token.cancelled() => return Ok(()),
                nonce = nonces.recv() => match nonce {
                    Some(nonce) => nonce,
                    None => return Ok(()),
                },
            };

            let result = self
                .retrier
                .retry_if(&token, || self.process(nonce), |err: &OrchestratorError| {
                    err.kind().is_retryable()
                })
                .await;

            match result {
                Ok(_) => {
                    metrics::LAST_PROCESSED_NONCE.set(i64::try_from(nonce).unwrap_or(i64::MAX));
                }
                Err(RetryError::Cancelled) => return Ok(()),
                Err(RetryError::Exhausted { attempts, source }) => {
                    tracing::warn!(nonce, attempts, error = %source, "Failed to process nonce");
                    self.maybe_requeue(nonce, &requeue).await;
                }
                Err(RetryError::Aborted(err)) if err.kind() == ErrorKind::Fatal => {
                    tracing::error!(nonce, error = %err, "Cannot keep signing, stopping processor");
                    return Err(err);
                }
                Err(RetryError::Aborted(err)) => {
                    metrics::NONCES_DROPPED.inc();
                    tracing::error!(nonce, error = %err, "Nonce cannot be processed, dropping it");
                }
            }
        }
    }

    /// Moves one requeued nonce back to the processor per tick, and only when
    /// the processor queue has room.
    async fn drain_requeue(
        self: Arc<Self>,
        mut requeued: mpsc::Receiver<u64>,
        nonces: mpsc::Sender<u64>,
        token: CancellationToken,
    ) -> Result<(), OrchestratorError> {
        let mut ticker = tokio::time::interval(self.config.requeue_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = token.cancelled() => return Ok(()),
                _ = ticker.tick() => {}
            }

            if nonces.capacity() == 0 {
                continue;
            }
            let Ok(nonce) = requeued.try_recv() else {
                continue;
            };
            if let Err(err) = nonces.try_send(nonce) {
                tracing::warn!(nonce, error = %err, "Could not move requeued nonce back");
            }
        }
    }
}
