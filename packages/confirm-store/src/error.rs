use std::time::Duration;

use alloy_primitives::Address;
use blobstream_signature::SignatureError;
use blobstream_types::ErrorKind;
use tonic::{Code, Status};

use crate::Namespace;

/// Errors parsing a record key.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KeyError {
    /// The key does not have the `/<namespace>/<nonce>:<address>` shape.
    #[error("malformed record key {0:?}")]
    Malformed(String),
    /// The namespace segment is empty.
    #[error("record key {0:?} has an empty namespace")]
    EmptyNamespace(String),
    /// The address segment is empty.
    #[error("record key {0:?} has an empty address")]
    EmptyAddress(String),
    /// The namespace is not one we store.
    #[error("unknown namespace {0:?}")]
    UnknownNamespace(String),
    /// The nonce is not valid hex.
    #[error("invalid nonce {0:?} in record key")]
    InvalidNonce(String),
    /// The address is not a `0x` prefixed 20-byte hex string.
    #[error("invalid address {0:?} in record key")]
    InvalidAddress(String),
}

/// Reasons a record is refused by a namespace validator.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// The key could not be parsed.
    #[error(transparent)]
    Key(#[from] KeyError),
    /// The key belongs to another namespace than the validator's.
    #[error("expected a {expected} record, found {found}")]
    WrongNamespace {
        /// Namespace of the validator.
        expected: Namespace,
        /// Namespace of the key.
        found: Namespace,
    },
    /// The value is not valid JSON for the namespace.
    #[error("failed to decode record value: {0}")]
    Decode(#[from] serde_json::Error),
    /// The signer in the value differs from the one in the key.
    #[error("record key names {key} but the value is signed by {value}")]
    AddressMismatch {
        /// Address embedded in the key.
        key: Address,
        /// Address in the value.
        value: Address,
    },
    /// The signature is malformed or does not verify.
    #[error(transparent)]
    Signature(#[from] SignatureError),
    /// The empty valset sentinel cannot be stored.
    #[error("refusing to store the empty valset")]
    EmptyValset,
    /// Another value is already stored under an immutable key.
    #[error("a different record is already stored under {0}")]
    Conflict(String),
    /// None of the candidates for a key passed validation.
    #[error("no valid candidate stored under {0}")]
    NoValidCandidate(String),
}

impl From<ValidationError> for Status {
    fn from(value: ValidationError) -> Self {
        Self::new(Code::InvalidArgument, value.to_string())
    }
}

/// Errors talking to the overlay.
#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    /// Every replica refused the record.
    #[error("record rejected: {0}")]
    Rejected(String),
    /// No replica could be reached.
    #[error("overlay unavailable: {0}")]
    Unavailable(String),
    /// The request did not complete in time.
    #[error("overlay request timed out after {0:?}")]
    Timeout(Duration),
}

impl OverlayError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Rejected(_) => ErrorKind::Invalid,
            Self::Unavailable(_) | Self::Timeout(_) => ErrorKind::Transient,
        }
    }
}

/// Errors returned by the [`crate::ConfirmStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The record failed local validation before it was sent.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    /// The overlay failed.
    #[error(transparent)]
    Overlay(#[from] OverlayError),
    /// The record could not be encoded.
    #[error("failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),
    /// Not enough power signed before the deadline.
    #[error("quorum not reached for nonce {nonce}: {power} of {threshold} required power signed")]
    QuorumTimeout {
        /// Attestation nonce.
        nonce: u64,
        /// Power of the valid confirms collected.
        power: u64,
        /// Power required.
        threshold: u64,
    },
    /// A quorum over a valset without power is meaningless.
    #[error("valset {0} has no voting power")]
    EmptyValset(u64),
    /// The query was cancelled.
    #[error("confirm store query cancelled")]
    Cancelled,
}

impl StoreError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Invalid(_) | Self::Encode(_) | Self::EmptyValset(_) => ErrorKind::Invalid,
            Self::Overlay(err) => err.kind(),
            Self::QuorumTimeout { .. } => ErrorKind::NotFound,
            Self::Cancelled => ErrorKind::Fatal,
        }
    }
}
