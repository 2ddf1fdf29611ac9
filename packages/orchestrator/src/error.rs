use blobstream_confirm_store::StoreError;
use blobstream_signature::SignatureError;
use blobstream_types::{AttestationError, ErrorKind, SourceError};

/// Errors raised while processing a nonce or running the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// The source has no attestation for the nonce (yet).
    #[error("attestation {0} not found")]
    AttestationNotFound(u64),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error(transparent)]
    Attestation(#[from] AttestationError),
    /// The subscription to new attestations could not be re-established.
    #[error("lost the attestation subscription after {0} reconnection attempts")]
    SubscriptionLost(usize),
    /// A worker task panicked or was aborted.
    #[error("worker task failed: {0}")]
    Worker(String),
}

impl OrchestratorError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AttestationNotFound(_) => ErrorKind::NotFound,
            Self::Source(err) => err.kind(),
            Self::Store(err) => err.kind(),
            Self::Signature(err) => err.kind(),
            Self::Attestation(_) => ErrorKind::Invalid,
            Self::SubscriptionLost(_) | Self::Worker(_) => ErrorKind::Fatal,
        }
    }
}
