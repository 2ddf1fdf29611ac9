use std::{sync::Arc, time::Duration};

use alloy_primitives::{Address, B256};
use alloy_signer_local::PrivateKeySigner;
use blobstream_confirm_store::{ConfirmStore, MemoryOverlay, StoreConfig};
use blobstream_signature::SigningIdentity;
use blobstream_types::{test_utils::MockSource, BridgeValidator, DataCommitment, Valset};
use blobstream_utils::Retrier;
use time::OffsetDateTime;

use crate::{Orchestrator, OrchestratorConfig};

pub type TestOrchestrator = Orchestrator<MockSource, MemoryOverlay>;

/// A source holding a genesis valset, and a store shared by every
/// orchestrator built from the fixture.
pub struct Fixture {
    pub source: Arc<MockSource>,
    pub store: ConfirmStore<MemoryOverlay>,
    pub identities: Vec<Arc<SigningIdentity>>,
    pub genesis: Valset,
}

impl Fixture {
    pub fn new(members: usize) -> Self {
        let identities: Vec<_> = (0..members)
            .map(|_| Arc::new(SigningIdentity::new(PrivateKeySigner::random())))
            .collect();
        let genesis = Valset::new(
            1,
            identities
                .iter()
                .zip([10, 15, 10].into_iter().cycle())
                .map(|(id, power)| BridgeValidator::new(id.address(), power)),
            100,
            OffsetDateTime::UNIX_EPOCH,
        );

        let source = Arc::new(MockSource::new());
        source.push(genesis.clone());

        let store_config = StoreConfig {
            poll_interval: Duration::from_millis(10),
            ..StoreConfig::default()
        };

        Self {
            source,
            store: ConfirmStore::new(MemoryOverlay::new(), &store_config),
            identities,
            genesis,
        }
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig {
            requeue_interval: Duration::from_millis(50),
            liveness_interval: Duration::from_secs(1),
            ..OrchestratorConfig::default()
        }
    }

    fn build(&self, identity: Arc<SigningIdentity>) -> TestOrchestrator {
        Orchestrator::new(
            self.source.clone(),
            self.store.clone(),
            identity,
            Retrier::new(Duration::from_millis(10), 2),
            Self::config(),
        )
    }

    pub fn orchestrator(&self, index: usize) -> TestOrchestrator {
        self.build(self.identities[index].clone())
    }

    /// An orchestrator whose key is not in the genesis valset.
    pub fn outsider(&self) -> TestOrchestrator {
        self.build(Arc::new(SigningIdentity::new(PrivateKeySigner::random())))
    }

    pub fn push_valset(&self, nonce: u64) -> Valset {
        let valset = Valset {
            nonce,
            ..self.genesis.clone()
        };
        self.source.push(valset.clone());
        valset
    }

    pub fn push_valset_with(&self, nonce: u64, newcomer: Address) -> Valset {
        let mut valset = self.push_valset(nonce);
        valset.members.push(BridgeValidator::new(newcomer, 10));
        self.source.push(valset.clone());
        valset
    }

    pub fn push_data_commitment(&self, nonce: u64, begin: u64, end: u64, root: B256) {
        self.source.set_data_root(begin, end, root);
        self.source
            .push(DataCommitment::new(nonce, begin, end).expect("valid block range"));
    }
}
