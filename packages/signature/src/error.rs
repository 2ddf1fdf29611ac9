use alloy_primitives::Address;
use blobstream_types::ErrorKind;

/// Errors produced while signing or validating signatures.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    /// No signing key is loaded, or it has been locked.
    #[error("signing key is not available")]
    InvalidKey,

    /// The signature is not 65 bytes of valid hex.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// The `v` byte is not one of 0, 1, 27 or 28.
    #[error("invalid signature recovery id: {0}")]
    InvalidRecoveryId(u8),

    /// The `s` value is zero or in the upper half of the curve order.
    #[error("malleable signature: s value is not canonical")]
    MalleableSignature,

    /// The signature recovers to another address.
    #[error("signature mismatch: expected signer {expected}, recovered {recovered}")]
    SignatureMismatch {
        /// Address the signature was expected from.
        expected: Address,
        /// Address the signature actually recovers to.
        recovered: Address,
    },

    /// The signer failed to produce a signature.
    #[error("failed to sign digest: {0}")]
    Signer(#[from] alloy_signer::Error),

    /// The keystore could not be read or written.
    #[error("keystore error: {0}")]
    Keystore(#[from] alloy_signer_local::LocalSignerError),
}

impl SignatureError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidKey | Self::Keystore(_) => ErrorKind::Fatal,
            Self::Signer(_) => ErrorKind::Transient,
            Self::MalformedSignature(_)
            | Self::InvalidRecoveryId(_)
            | Self::MalleableSignature
            | Self::SignatureMismatch { .. } => ErrorKind::Invalid,
        }
    }
}
