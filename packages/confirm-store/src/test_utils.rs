use alloy_primitives::{uint, B256, U256};
use alloy_signer_local::PrivateKeySigner;
use blobstream_signature::{
    data_commitment_digest, encode_signature, sign, valset_digest, SigningIdentity,
};
use blobstream_types::{BridgeValidator, DataCommitmentConfirm, Valset, ValsetConfirm};
use serde::Serialize;
use time::OffsetDateTime;

const SECP256K1_N: U256 =
    uint!(0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141_U256);

pub fn identities(count: usize) -> Vec<SigningIdentity> {
    (0..count)
        .map(|_| SigningIdentity::new(PrivateKeySigner::random()))
        .collect()
}

/// Valset at nonce 2 over the first three identities with powers 10, 15, 10.
pub fn three_member_valset(ids: &[SigningIdentity]) -> Valset {
    Valset::new(
        2,
        ids.iter()
            .zip([10, 15, 10])
            .map(|(id, power)| BridgeValidator::new(id.address(), power)),
        1_000,
        OffsetDateTime::UNIX_EPOCH,
    )
}

pub fn signed_valset_confirm(identity: &SigningIdentity, valset: &Valset) -> ValsetConfirm {
    let signature = sign(valset_digest(valset), identity).unwrap();
    ValsetConfirm::new(identity.address(), encode_signature(&signature))
}

pub fn signed_data_commitment_confirm(
    identity: &SigningIdentity,
    nonce: u64,
    root: B256,
) -> DataCommitmentConfirm {
    let signature = sign(data_commitment_digest(nonce, root), identity).unwrap();
    DataCommitmentConfirm::new(identity.address(), encode_signature(&signature), root)
}

pub fn to_json<T: Serialize>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).unwrap()
}

/// The high-s twin of a signature: same signer, not canonical.
pub fn malleable_twin(signature_hex: &str) -> String {
    let mut bytes = hex::decode(signature_hex).unwrap();
    let s = U256::from_be_slice(&bytes[32..64]);
    bytes[32..64].copy_from_slice(&(SECP256K1_N - s).to_be_bytes::<32>());
    bytes[64] = if bytes[64] == 27 { 28 } else { 27 };
    hex::encode(bytes)
}
