//! The target chain boundary.

use alloy_primitives::B256;
use blobstream_signature::Vrs;
use blobstream_types::Valset;

use crate::SubmitterError;

/// Write access to the bridge contract.
///
/// Signatures are positional: entry `i` belongs to member `i` of the
/// current valset, with [`Vrs::zero`] for members that did not sign.
#[async_trait::async_trait]
pub trait ChainSubmitter: Send + Sync + 'static {
    /// The nonce of the last attestation the contract accepted.
    async fn last_relayed_nonce(&self) -> Result<u64, SubmitterError>;

    /// Replaces the contract's valset with `new`, signed by `current`.
    ///
    /// Returns the transaction hash once the transaction succeeded.
    async fn update_validator_set(
        &self,
        new: &Valset,
        new_threshold: u64,
        current: &Valset,
        signatures: &[Vrs],
    ) -> Result<B256, SubmitterError>;

    /// Commits the data root tuple root of attestation `nonce`, signed by
    /// `current`.
    ///
    /// Returns the transaction hash once the transaction succeeded.
    async fn submit_data_root_tuple_root(
        &self,
        nonce: u64,
        data_root_tuple_root: B256,
        current: &Valset,
        signatures: &[Vrs],
    ) -> Result<B256, SubmitterError>;
}
