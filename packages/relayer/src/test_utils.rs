use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use alloy_primitives::B256;
use alloy_signer_local::PrivateKeySigner;
use blobstream_confirm_store::{ConfirmStore, MemoryOverlay, StoreConfig};
use blobstream_signature::{
    data_commitment_digest, encode_signature, sign, valset_digest, SigningIdentity, Vrs,
};
use blobstream_types::{
    test_utils::MockSource, BridgeValidator, DataCommitment, DataCommitmentConfirm, Valset,
    ValsetConfirm,
};
use time::OffsetDateTime;

use crate::{ChainSubmitter, Relayer, RelayerConfig, SubmitterError};

/// A transaction seen by [`MockSubmitter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    ValsetUpdate {
        nonce: u64,
        threshold: u64,
        current_nonce: u64,
        signatures: Vec<Vrs>,
    },
    DataRoot {
        nonce: u64,
        root: B256,
        current_nonce: u64,
        signatures: Vec<Vrs>,
    },
}

impl Submission {
    pub const fn nonce(&self) -> u64 {
        match self {
            Self::ValsetUpdate { nonce, .. } | Self::DataRoot { nonce, .. } => *nonce,
        }
    }
}

/// An in-memory bridge contract. Accepts exactly the next nonce.
#[derive(Debug)]
pub struct MockSubmitter {
    last_relayed: Mutex<u64>,
    submissions: Mutex<Vec<Submission>>,
    revert_next: AtomicBool,
}

impl MockSubmitter {
    pub const fn new(last_relayed: u64) -> Self {
        Self {
            last_relayed: Mutex::new(last_relayed),
            submissions: Mutex::new(Vec::new()),
            revert_next: AtomicBool::new(false),
        }
    }

    pub fn set_last_relayed(&self, nonce: u64) {
        *self.last_relayed.lock().unwrap() = nonce;
    }

    pub fn last_relayed(&self) -> u64 {
        *self.last_relayed.lock().unwrap()
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    /// The next submission reverts.
    pub fn revert_next(&self) {
        self.revert_next.store(true, Ordering::SeqCst);
    }

    fn commit(&self, submission: Submission) -> Result<B256, SubmitterError> {
        let tx_hash = B256::with_last_byte(u8::try_from(submission.nonce() % 256).unwrap());
        if self.revert_next.swap(false, Ordering::SeqCst) {
            return Err(SubmitterError::Reverted(tx_hash));
        }

        let mut last = self.last_relayed.lock().unwrap();
        assert_eq!(submission.nonce(), *last + 1, "contract only accepts the next nonce");
        *last = submission.nonce();
        self.submissions.lock().unwrap().push(submission);
        Ok(tx_hash)
    }
}

#[async_trait::async_trait]
impl ChainSubmitter for MockSubmitter {
    async fn last_relayed_nonce(&self) -> Result<u64, SubmitterError> {
        Ok(self.last_relayed())
    }

    async fn update_validator_set(
        &self,
        new: &Valset,
        new_threshold: u64,
        current: &Valset,
        signatures: &[Vrs],
    ) -> Result<B256, SubmitterError> {
        assert_eq!(signatures.len(), current.members.len());
        self.commit(Submission::ValsetUpdate {
            nonce: new.nonce,
            threshold: new_threshold,
            current_nonce: current.nonce,
            signatures: signatures.to_vec(),
        })
    }

    async fn submit_data_root_tuple_root(
        &self,
        nonce: u64,
        data_root_tuple_root: B256,
        current: &Valset,
        signatures: &[Vrs],
    ) -> Result<B256, SubmitterError> {
        assert_eq!(signatures.len(), current.members.len());
        self.commit(Submission::DataRoot {
            nonce,
            root: data_root_tuple_root,
            current_nonce: current.nonce,
            signatures: signatures.to_vec(),
        })
    }
}

pub type TestRelayer = Relayer<MockSource, MemoryOverlay, MockSubmitter>;

/// A source holding a genesis valset, a confirm store, and a contract that
/// has accepted the genesis valset.
pub struct Fixture {
    pub source: Arc<MockSource>,
    pub store: ConfirmStore<MemoryOverlay>,
    pub submitter: Arc<MockSubmitter>,
    pub identities: Vec<SigningIdentity>,
    pub genesis: Valset,
}

impl Fixture {
    pub fn new(members: usize) -> Self {
        let identities: Vec<_> = (0..members)
            .map(|_| SigningIdentity::new(PrivateKeySigner::random()))
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
            submitter: Arc::new(MockSubmitter::new(1)),
            identities,
            genesis,
        }
    }

    pub fn relayer(&self, config: RelayerConfig) -> TestRelayer {
        Relayer::new(
            self.source.clone(),
            self.store.clone(),
            self.submitter.clone(),
            config,
        )
    }

    pub fn push_valset(&self, nonce: u64) -> Valset {
        let valset = Valset {
            nonce,
            ..self.genesis.clone()
        };
        self.source.push(valset.clone());
        valset
    }

    pub fn push_data_commitment(&self, nonce: u64, begin: u64, end: u64, root: B256) {
        self.source.set_data_root(begin, end, root);
        self.source
            .push(DataCommitment::new(nonce, begin, end).expect("valid block range"));
    }

    pub fn valset_confirm(&self, index: usize, valset: &Valset) -> ValsetConfirm {
        let identity = &self.identities[index];
        let signature = sign(valset_digest(valset), identity).unwrap();
        ValsetConfirm::new(identity.address(), encode_signature(&signature))
    }

    pub fn data_commitment_confirm(
        &self,
        index: usize,
        nonce: u64,
        root: B256,
    ) -> DataCommitmentConfirm {
        let identity = &self.identities[index];
        let signature = sign(data_commitment_digest(nonce, root), identity).unwrap();
        DataCommitmentConfirm::new(identity.address(), encode_signature(&signature), root)
    }

    pub async fn publish_valset_confirm(&self, index: usize, valset: &Valset) {
        let confirm = self.valset_confirm(index, valset);
        self.store.put_confirm(valset.nonce, &confirm).await.unwrap();
    }

    pub async fn publish_data_commitment_confirm(&self, index: usize, nonce: u64, root: B256) {
        let confirm = self.data_commitment_confirm(index, nonce, root);
        self.store.put_confirm(nonce, &confirm).await.unwrap();
    }
}
