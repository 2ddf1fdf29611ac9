//! The attestation source boundary.

use alloy_primitives::B256;
use futures::stream::BoxStream;

use crate::{Attestation, AttestationError, ErrorKind, Valset};

/// Stream of newly observed attestation nonces.
pub type NonceStream = BoxStream<'static, Result<u64, SourceError>>;

/// Errors returned by an [`AttestationSource`].
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The request could not be completed.
    #[error("attestation source request failed: {0}")]
    Transport(String),
    /// No valset precedes the given nonce.
    #[error("no valset found before nonce {0}")]
    ValsetNotFound(u64),
    /// The source returned something we cannot interpret.
    #[error(transparent)]
    Attestation(#[from] AttestationError),
    /// The source returned a malformed response.
    #[error("malformed attestation source response: {0}")]
    Malformed(String),
}

impl SourceError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transient,
            Self::ValsetNotFound(_) => ErrorKind::NotFound,
            Self::Attestation(_) | Self::Malformed(_) => ErrorKind::Invalid,
        }
    }
}

/// Read access to the source chain's attestation state.
#[async_trait::async_trait]
pub trait AttestationSource: Send + Sync + 'static {
    /// Returns the attestation with the given nonce, if it exists.
    async fn get_attestation(&self, nonce: u64) -> Result<Option<Attestation>, SourceError>;

    /// Returns the latest attestation nonce.
    async fn latest_nonce(&self) -> Result<u64, SourceError>;

    /// Returns the earliest attestation nonce still available.
    async fn earliest_nonce(&self) -> Result<u64, SourceError>;

    /// Returns the last valset created before `nonce`.
    async fn get_valset_before(&self, nonce: u64) -> Result<Valset, SourceError>;

    /// Returns the data root tuple root over `[begin, end)`.
    async fn get_data_root(&self, begin: u64, end: u64) -> Result<B256, SourceError>;

    /// Subscribes to new attestation nonces.
    async fn subscribe_new_attestations(&self) -> Result<NonceStream, SourceError>;

    /// Checks that the source is still reachable.
    async fn health_check(&self) -> Result<(), SourceError>;

    /// Returns the latest source chain height.
    async fn latest_height(&self) -> Result<u64, SourceError>;

    /// Returns the attestation with the given nonce as seen at `height`.
    ///
    /// Used to look up attestations that have been pruned from the live state.
    async fn get_attestation_at_height(
        &self,
        nonce: u64,
        height: u64,
    ) -> Result<Option<Attestation>, SourceError>;
}
