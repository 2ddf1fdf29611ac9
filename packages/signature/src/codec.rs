//! EIP-191 signing, recovery and the `r || s || v` wire format.

use alloy_primitives::{eip191_hash_message, uint, Address, Signature, B256, U256};
use blobstream_solidity_types::Signature as ContractSignature;

use crate::{SignatureError, SigningIdentity};

/// Length of an `r || s || v` signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// `secp256k1n / 2 + 1`. Signatures with `s` at or above this are malleable.
const MALLEABILITY_BOUND: U256 =
    uint!(0x7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A1_U256);

/// A signature split into the components the bridge contract expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Vrs {
    /// Recovery id, 27 or 28. Zero only for the empty placeholder.
    pub v: u8,
    /// `r` component.
    pub r: B256,
    /// `s` component.
    pub s: B256,
}

impl Vrs {
    /// Placeholder passed to the contract for validators that did not sign.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            v: 0,
            r: B256::ZERO,
            s: B256::ZERO,
        }
    }

    /// Reassembles the `r || s || v` encoding.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; SIGNATURE_LENGTH] {
        let mut bytes = [0_u8; SIGNATURE_LENGTH];
        bytes[..32].copy_from_slice(self.r.as_slice());
        bytes[32..64].copy_from_slice(self.s.as_slice());
        bytes[64] = self.v;
        bytes
    }
}

impl From<Vrs> for ContractSignature {
    fn from(vrs: Vrs) -> Self {
        Self {
            v: vrs.v,
            r: vrs.r,
            s: vrs.s,
        }
    }
}

/// Signs the EIP-191 hash of `digest` with the identity's key.
///
/// # Errors
/// Returns [`SignatureError::InvalidKey`] if the identity is locked.
pub fn sign(
    digest: B256,
    identity: &SigningIdentity,
) -> Result<[u8; SIGNATURE_LENGTH], SignatureError> {
    let signature = identity.sign_hash(&eip191_hash_message(digest))?;

    let mut bytes = [0_u8; SIGNATURE_LENGTH];
    bytes[..32].copy_from_slice(&signature.r().to_be_bytes::<32>());
    bytes[32..64].copy_from_slice(&signature.s().to_be_bytes::<32>());
    bytes[64] = 27 + u8::from(signature.v());
    Ok(bytes)
}

/// Hex encoding used in confirm records, without `0x`.
#[must_use]
pub fn encode_signature(signature: &[u8]) -> String {
    hex::encode(signature)
}

/// Recovers the address that signed the EIP-191 hash of `digest`.
///
/// Only canonical signatures are accepted, see [`decompose_vrs`].
///
/// # Errors
/// Fails if the signature is malformed, malleable or does not recover.
pub fn recover(digest: B256, signature: &[u8]) -> Result<Address, SignatureError> {
    let vrs = decompose_vrs_bytes(signature)?;
    let signature = Signature::new(
        U256::from_be_bytes(vrs.r.0),
        U256::from_be_bytes(vrs.s.0),
        vrs.v == 28,
    );

    signature
        .recover_address_from_prehash(&eip191_hash_message(digest))
        .map_err(|e| SignatureError::MalformedSignature(e.to_string()))
}

/// Checks that `signature` over `digest` was produced by `expected`.
///
/// # Errors
/// Returns [`SignatureError::SignatureMismatch`] if another key signed it, or
/// any error [`recover`] returns.
pub fn verify(digest: B256, signature: &[u8], expected: Address) -> Result<(), SignatureError> {
    let recovered = recover(digest, signature)?;
    if recovered != expected {
        return Err(SignatureError::SignatureMismatch {
            expected,
            recovered,
        });
    }
    Ok(())
}

/// [`verify`] for a hex encoded signature, with or without `0x`.
///
/// # Errors
/// See [`verify`].
pub fn verify_hex(
    digest: B256,
    signature_hex: &str,
    expected: Address,
) -> Result<(), SignatureError> {
    let signature = decode_hex(signature_hex)?;
    verify(digest, &signature, expected)
}

/// Splits a hex encoded signature into its components.
///
/// `v` of 0 or 1 is normalized to 27 or 28. Any other `v`, a zero `s` or an
/// `s` in the upper half of the curve order is rejected.
///
/// # Errors
/// Fails if the signature is malformed or not canonical.
pub fn decompose_vrs(signature_hex: &str) -> Result<Vrs, SignatureError> {
    decompose_vrs_bytes(&decode_hex(signature_hex)?)
}

fn decompose_vrs_bytes(signature: &[u8]) -> Result<Vrs, SignatureError> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(SignatureError::MalformedSignature(format!(
            "expected {SIGNATURE_LENGTH} bytes, got {}",
            signature.len()
        )));
    }

    let v = match signature[64] {
        v @ (0 | 1) => v + 27,
        v @ (27 | 28) => v,
        v => return Err(SignatureError::InvalidRecoveryId(v)),
    };
    let r = B256::from_slice(&signature[..32]);
    let s = B256::from_slice(&signature[32..64]);

    let s_value = U256::from_be_bytes(s.0);
    if s_value.is_zero() || s_value >= MALLEABILITY_BOUND {
        return Err(SignatureError::MalleableSignature);
    }

    Ok(Vrs { v, r, s })
}

fn decode_hex(signature_hex: &str) -> Result<Vec<u8>, SignatureError> {
    let stripped = signature_hex
        .strip_prefix("0x")
        .unwrap_or(signature_hex);
    hex::decode(stripped).map_err(|e| SignatureError::MalformedSignature(e.to_string()))
}
