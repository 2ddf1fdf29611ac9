//! An in-memory [`AttestationSource`] for tests.

use std::{
    collections::{BTreeMap, HashMap},
    ops::RangeInclusive,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, PoisonError,
    },
};

use alloy_primitives::B256;
use futures::{channel::mpsc, StreamExt};

use crate::{Attestation, AttestationSource, NonceStream, SourceError, Valset};

#[derive(Debug, Default)]
struct State {
    live: BTreeMap<u64, Attestation>,
    archive: BTreeMap<u64, (RangeInclusive<u64>, Attestation)>,
    data_roots: HashMap<(u64, u64), B256>,
    subscribers: Vec<mpsc::UnboundedSender<Result<u64, SourceError>>>,
    unhealthy: bool,
    failing_subscriptions: usize,
    failing_lookups: usize,
    height: u64,
}

/// Attestation source backed by maps, with knobs to inject failures.
#[derive(Debug, Default)]
pub struct MockSource {
    state: Mutex<State>,
    lookups: AtomicUsize,
    subscriptions: AtomicUsize,
}

impl MockSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an attestation to the live state and notifies subscribers.
    pub fn push(&self, attestation: impl Into<Attestation>) {
        let attestation = attestation.into();
        let nonce = attestation.nonce();
        let mut state = self.state();
        state.live.insert(nonce, attestation);
        state
            .subscribers
            .retain(|subscriber| subscriber.unbounded_send(Ok(nonce)).is_ok());
    }

    /// Registers the data root tuple root of a block range.
    pub fn set_data_root(&self, begin: u64, end: u64, root: B256) {
        self.state().data_roots.insert((begin, end), root);
    }

    /// Removes an attestation from the live state. It stays queryable at
    /// heights within `visible_at`, but no longer counts for
    /// [`AttestationSource::get_valset_before`].
    pub fn prune(&self, nonce: u64, visible_at: RangeInclusive<u64>) {
        let mut state = self.state();
        if let Some(attestation) = state.live.remove(&nonce) {
            state.archive.insert(nonce, (visible_at, attestation));
        }
    }

    /// Sets the latest source chain height.
    pub fn set_height(&self, height: u64) {
        self.state().height = height;
    }

    /// Makes health checks fail, or succeed again.
    pub fn set_unhealthy(&self, unhealthy: bool) {
        self.state().unhealthy = unhealthy;
    }

    /// Makes the next `count` subscription attempts fail.
    pub fn fail_subscriptions(&self, count: usize) {
        self.state().failing_subscriptions = count;
    }

    /// Makes the next `count` attestation lookups fail with a transport error.
    pub fn fail_lookups(&self, count: usize) {
        self.state().failing_lookups = count;
    }

    /// Ends every open subscription.
    pub fn drop_subscribers(&self) {
        self.state().subscribers.clear();
    }

    /// Number of `get_attestation` calls served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Number of subscriptions handed out so far.
    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    fn all_attestations(state: &State) -> impl Iterator<Item = &Attestation> {
        state
            .live
            .values()
            .chain(state.archive.values().map(|(_, attestation)| attestation))
    }
}

#[async_trait::async_trait]
impl AttestationSource for MockSource {
    async fn get_attestation(&self, nonce: u64) -> Result<Option<Attestation>, SourceError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state();
        if state.failing_lookups > 0 {
            state.failing_lookups -= 1;
            return Err(SourceError::Transport("injected lookup failure".to_string()));
        }
        Ok(state.live.get(&nonce).cloned())
    }

    async fn latest_nonce(&self) -> Result<u64, SourceError> {
        let state = self.state();
        Ok(Self::all_attestations(&state)
            .map(Attestation::nonce)
            .max()
            .unwrap_or_default())
    }

    async fn earliest_nonce(&self) -> Result<u64, SourceError> {
        Ok(self.state().live.keys().next().copied().unwrap_or_default())
    }

    async fn get_valset_before(&self, nonce: u64) -> Result<Valset, SourceError> {
        self.state()
            .live
            .values()
            .filter_map(|attestation| match attestation {
                Attestation::Valset(valset) if valset.nonce < nonce => Some(valset),
                _ => None,
            })
            .max_by_key(|valset| valset.nonce)
            .cloned()
            .ok_or(SourceError::ValsetNotFound(nonce))
    }

    async fn get_data_root(&self, begin: u64, end: u64) -> Result<B256, SourceError> {
        self.state()
            .data_roots
            .get(&(begin, end))
            .copied()
            .ok_or_else(|| SourceError::Transport(format!("no data root for [{begin}, {end})")))
    }

    async fn subscribe_new_attestations(&self) -> Result<NonceStream, SourceError> {
        let mut state = self.state();
        if state.failing_subscriptions > 0 {
            state.failing_subscriptions -= 1;
            return Err(SourceError::Transport("injected subscription failure".to_string()));
        }
        let (sender, receiver) = mpsc::unbounded();
        state.subscribers.push(sender);
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        Ok(receiver.boxed())
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        if self.state().unhealthy {
            return Err(SourceError::Transport("source unreachable".to_string()));
        }
        Ok(())
    }

    async fn latest_height(&self) -> Result<u64, SourceError> {
        Ok(self.state().height)
    }

    async fn get_attestation_at_height(
        &self,
        nonce: u64,
        height: u64,
    ) -> Result<Option<Attestation>, SourceError> {
        let state = self.state();
        if let Some(attestation) = state.live.get(&nonce) {
            return Ok(Some(attestation.clone()));
        }
        Ok(state
            .archive
            .get(&nonce)
            .filter(|(visible_at, _)| visible_at.contains(&height))
            .map(|(_, attestation)| attestation.clone()))
    }
}
