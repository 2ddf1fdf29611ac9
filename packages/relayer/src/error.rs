use std::time::Duration;

use alloy_primitives::B256;
use blobstream_confirm_store::StoreError;
use blobstream_signature::SignatureError;
use blobstream_types::{AttestationError, ErrorKind, SourceError};

/// Errors of a [`crate::ChainSubmitter`].
#[derive(Debug, thiserror::Error)]
pub enum SubmitterError {
    /// The RPC call failed.
    #[error("target chain request failed: {0}")]
    Rpc(String),
    /// The transaction was mined but reverted.
    #[error("transaction {0} reverted")]
    Reverted(B256),
    /// No receipt arrived in time.
    #[error("no receipt after {0:?}")]
    ReceiptTimeout(Duration),
    /// The contract returned a value we cannot use.
    #[error("unexpected contract state: {0}")]
    Contract(String),
}

impl SubmitterError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Rpc(_) | Self::ReceiptTimeout(_) => ErrorKind::Transient,
            Self::Reverted(_) | Self::Contract(_) => ErrorKind::Invalid,
        }
    }
}

/// Errors of a relay iteration.
#[derive(Debug, thiserror::Error)]
pub enum RelayerError {
    /// The attestation is neither live nor found at any archival height.
    #[error("attestation {0} not found")]
    AttestationNotFound(u64),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Submitter(#[from] SubmitterError),
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error(transparent)]
    Attestation(#[from] AttestationError),
}

impl RelayerError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AttestationNotFound(_) => ErrorKind::NotFound,
            Self::Source(err) => err.kind(),
            Self::Store(err) => err.kind(),
            Self::Submitter(err) => err.kind(),
            Self::Signature(err) => err.kind(),
            Self::Attestation(_) => ErrorKind::Invalid,
        }
    }
}
