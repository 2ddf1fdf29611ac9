//! [`ChainSubmitter`] for the bridge contract on an EVM chain.

use std::time::Duration;

use alloy::{
    contract::CallBuilder,
    network::{Ethereum, ReceiptResponse},
    providers::{PendingTransactionError, Provider, WatchTxError},
};
use alloy_primitives::{Address, B256, U256};
use blobstream_signature::{validator_set_hash, Vrs};
use blobstream_solidity_types::{Blobstream, Signature, Validator};
use blobstream_types::Valset;

use crate::{ChainSubmitter, SubmitterError};

/// Submits attestations to a deployed `Blobstream` contract.
///
/// The provider must carry a wallet; transactions are signed by it.
#[derive(Debug, Clone)]
pub struct EvmChainSubmitter<P: Provider> {
    contract: Blobstream::BlobstreamInstance<P>,
    receipt_timeout: Duration,
}

impl<P: Provider> EvmChainSubmitter<P> {
    /// Binds the contract at `address`.
    #[must_use]
    pub const fn new(address: Address, provider: P, receipt_timeout: Duration) -> Self {
        Self {
            contract: Blobstream::BlobstreamInstance::new(address, provider),
            receipt_timeout,
        }
    }

    /// Address of the bound contract.
    #[must_use]
    pub const fn address(&self) -> &Address {
        self.contract.address()
    }

    /// Sends a transaction and waits for a successful receipt.
    async fn transact<D>(&self, call: CallBuilder<&P, D, Ethereum>) -> Result<B256, SubmitterError>
    where
        D: alloy::contract::CallDecoder + Send + Sync,
    {
        let pending = call
            .send()
            .await
            .map_err(|e| SubmitterError::Rpc(e.to_string()))?;
        let tx_hash = *pending.tx_hash();
        tracing::debug!(%tx_hash, "Sent transaction");

        let receipt = pending
            .with_timeout(Some(self.receipt_timeout))
            .get_receipt()
            .await
            .map_err(|e| match e {
                PendingTransactionError::TxWatcher(WatchTxError::Timeout) => {
                    SubmitterError::ReceiptTimeout(self.receipt_timeout)
                }
                other => SubmitterError::Rpc(other.to_string()),
            })?;

        if !receipt.status() {
            return Err(SubmitterError::Reverted(tx_hash));
        }
        Ok(receipt.transaction_hash())
    }
}

fn to_contract_signatures(signatures: &[Vrs]) -> Vec<Signature> {
    signatures.iter().copied().map(Signature::from).collect()
}

#[async_trait::async_trait]
impl<P: Provider + 'static> ChainSubmitter for EvmChainSubmitter<P> {
    async fn last_relayed_nonce(&self) -> Result<u64, SubmitterError> {
        let nonce: U256 = self
            .contract
            .state_eventNonce()
            .call()
            .await
            .map_err(|e| SubmitterError::Rpc(e.to_string()))?;
        u64::try_from(nonce)
            .map_err(|_| SubmitterError::Contract(format!("event nonce {nonce} exceeds u64")))
    }

    #[tracing::instrument(skip_all, fields(nonce = new.nonce, current = current.nonce))]
    async fn update_validator_set(
        &self,
        new: &Valset,
        new_threshold: u64,
        current: &Valset,
        signatures: &[Vrs],
    ) -> Result<B256, SubmitterError> {
        let call = self.contract.updateValidatorSet(
            U256::from(new.nonce),
            U256::from(current.nonce),
            U256::from(new_threshold),
            validator_set_hash(new),
            Validator::from_valset(current),
            to_contract_signatures(signatures),
        );
        self.transact(call).await
    }

    #[tracing::instrument(skip_all, fields(nonce = nonce, current = current.nonce))]
    async fn submit_data_root_tuple_root(
        &self,
        nonce: u64,
        data_root_tuple_root: B256,
        current: &Valset,
        signatures: &[Vrs],
    ) -> Result<B256, SubmitterError> {
        let call = self.contract.submitDataRootTupleRoot(
            U256::from(nonce),
            U256::from(current.nonce),
            data_root_tuple_root,
            Validator::from_valset(current),
            to_contract_signatures(signatures),
        );
        self.transact(call).await
    }
}
