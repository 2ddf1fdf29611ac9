//! Digests the bridge contract verifies signatures against.

use alloy_primitives::{b256, keccak256, B256, U256};
use alloy_sol_types::SolCall;
use blobstream_solidity_types::bridge::{
    computeValidatorSetHashCall, domainSeparateDataRootTupleRootCall,
    domainSeparateValidatorSetHashCall, Validator,
};
use blobstream_types::{DataCommitment, Valset};

/// `"checkpoint"` right-padded to 32 bytes.
pub const VALIDATOR_SET_DOMAIN_SEPARATOR: B256 =
    b256!("0x636865636b706f696e7400000000000000000000000000000000000000000000");

/// `"transactionBatch"` right-padded to 32 bytes.
pub const DATA_ROOT_TUPLE_ROOT_DOMAIN_SEPARATOR: B256 =
    b256!("0x7472616e73616374696f6e426174636800000000000000000000000000000000");

const SELECTOR_LENGTH: usize = 4;

/// keccak256 of an ABI encoded call with its selector stripped.
fn hash_call_arguments<C: SolCall>(call: &C) -> B256 {
    let encoded = call.abi_encode();
    keccak256(&encoded[SELECTOR_LENGTH..])
}

/// Hash of the valset's members as the contract stores them.
#[must_use]
pub fn validator_set_hash(valset: &Valset) -> B256 {
    hash_call_arguments(&computeValidatorSetHashCall {
        _validators: Validator::from_valset(valset),
    })
}

/// Digest signed by orchestrators to approve `valset`.
#[must_use]
pub fn valset_digest(valset: &Valset) -> B256 {
    hash_call_arguments(&domainSeparateValidatorSetHashCall {
        _domainSeparator: VALIDATOR_SET_DOMAIN_SEPARATOR,
        _nonce: U256::from(valset.nonce),
        _powerThreshold: U256::from(valset.two_thirds_threshold()),
        _validatorSetHash: validator_set_hash(valset),
    })
}

/// Digest signed by orchestrators to approve the data root tuple root of the
/// commitment at `nonce`.
#[must_use]
pub fn data_commitment_digest(nonce: u64, data_root_tuple_root: B256) -> B256 {
    hash_call_arguments(&domainSeparateDataRootTupleRootCall {
        _domainSeparator: DATA_ROOT_TUPLE_ROOT_DOMAIN_SEPARATOR,
        _nonce: U256::from(nonce),
        _dataRootTupleRoot: data_root_tuple_root,
    })
}

/// Convenience wrapper over [`data_commitment_digest`].
#[must_use]
pub fn digest_for_commitment(commitment: &DataCommitment, data_root_tuple_root: B256) -> B256 {
    data_commitment_digest(commitment.nonce, data_root_tuple_root)
}
