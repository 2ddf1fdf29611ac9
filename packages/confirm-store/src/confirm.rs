use alloy_primitives::Address;
use blobstream_signature::{data_commitment_digest, decompose_vrs, verify_hex, SignatureError};
use blobstream_types::{DataCommitmentConfirm, ValsetConfirm};
use serde::{de::DeserializeOwned, Serialize};

use crate::Namespace;

/// A signed confirm stored under `/<namespace>/<nonce>:<signer>`.
pub trait Confirm: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Namespace the confirm is stored in.
    const NAMESPACE: Namespace;

    /// Address that signed the confirm.
    fn signer(&self) -> Address;

    /// Hex encoded `r || s || v` signature.
    fn signature(&self) -> &str;

    /// Checks everything about the signature that can be checked from the
    /// confirm and its nonce alone.
    ///
    /// # Errors
    /// Fails if the signature is malformed, not canonical or, where the
    /// confirm carries its own payload, does not verify.
    fn check_signature(&self, nonce: u64) -> Result<(), SignatureError>;
}

impl Confirm for ValsetConfirm {
    const NAMESPACE: Namespace = Namespace::ValsetConfirm;

    fn signer(&self) -> Address {
        self.eth_address
    }

    fn signature(&self) -> &str {
        &self.signature
    }

    // The valset is not part of the confirm, so the digest cannot be rebuilt
    // here. Quorum queries verify against the valset they are given.
    fn check_signature(&self, _nonce: u64) -> Result<(), SignatureError> {
        decompose_vrs(&self.signature).map(|_| ())
    }
}

impl Confirm for DataCommitmentConfirm {
    const NAMESPACE: Namespace = Namespace::DataCommitmentConfirm;

    fn signer(&self) -> Address {
        self.eth_address
    }

    fn signature(&self) -> &str {
        &self.signature
    }

    fn check_signature(&self, nonce: u64) -> Result<(), SignatureError> {
        let digest = data_commitment_digest(nonce, self.commitment);
        verify_hex(digest, &self.signature, self.eth_address)
    }
}
