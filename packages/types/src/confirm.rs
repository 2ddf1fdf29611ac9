//! Signed confirmations published by orchestrators.
//!
//! Field names follow the record format the overlay network already stores,
//! hence the Pascal-cased JSON keys.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

use crate::Valset;

/// A validator's signature over a valset digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ValsetConfirm {
    /// Address of the signing orchestrator.
    pub eth_address: Address,
    /// 65-byte `r || s || v` signature, hex encoded without `0x`.
    pub signature: String,
}

impl ValsetConfirm {
    /// Creates a new valset confirm.
    #[must_use]
    pub fn new(eth_address: Address, signature: impl Into<String>) -> Self {
        Self {
            eth_address,
            signature: signature.into(),
        }
    }
}

/// A validator's signature over a data commitment digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DataCommitmentConfirm {
    /// 65-byte `r || s || v` signature, hex encoded without `0x`.
    pub signature: String,
    /// Address of the signing orchestrator.
    pub eth_address: Address,
    /// The data root tuple root that was signed.
    pub commitment: B256,
}

impl DataCommitmentConfirm {
    /// Creates a new data commitment confirm.
    #[must_use]
    pub fn new(eth_address: Address, signature: impl Into<String>, commitment: B256) -> Self {
        Self {
            signature: signature.into(),
            eth_address,
            commitment,
        }
    }
}

/// The most recent valset an orchestrator has seen, shared so that peers
/// can discover the current signer set without querying the source chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LatestValset(pub Valset);

impl LatestValset {
    /// Unwraps the inner valset.
    #[must_use]
    pub fn into_inner(self) -> Valset {
        self.0
    }
}

impl From<Valset> for LatestValset {
    fn from(valset: Valset) -> Self {
        Self(valset)
    }
}
