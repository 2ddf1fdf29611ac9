//! Signing and verification of Blobstream attestation digests.
//!
//! Orchestrators sign the EIP-191 prefixed hash of a 32-byte digest. The
//! digest itself is the keccak256 of the ABI encoded, domain separated
//! attestation payload with the 4-byte function selector removed, which is
//! exactly what the bridge contract recomputes on chain.

#![deny(clippy::nursery, clippy::pedantic)]

pub mod codec;
pub mod digest;
pub mod error;
pub mod identity;

pub use codec::{decompose_vrs, encode_signature, recover, sign, verify, verify_hex, Vrs};
pub use digest::{data_commitment_digest, validator_set_hash, valset_digest};
pub use error::SignatureError;
pub use identity::SigningIdentity;
