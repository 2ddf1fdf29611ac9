//! Core data model for the Blobstream orchestrator and relayer.
//!
//! The source chain produces a strictly ordered stream of attestations, each
//! identified by a nonce. An attestation is either a validator set snapshot or
//! a data commitment over a contiguous block range. Both are signed by the
//! members of the validator set that precedes them.

#![deny(clippy::nursery, clippy::pedantic)]

pub mod attestation;
pub mod confirm;
pub mod error;
pub mod source;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use attestation::{
    Attestation, AttestationError, AttestationType, BridgeValidator, DataCommitment, Valset,
    BOOTSTRAP_NONCE,
};
pub use confirm::{DataCommitmentConfirm, LatestValset, ValsetConfirm};
pub use error::ErrorKind;
pub use source::{AttestationSource, NonceStream, SourceError};
