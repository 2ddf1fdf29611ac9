//! Error classification shared across crates.

/// Coarse classification of failures, used to decide whether an operation
/// is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The requested record does not exist (yet).
    NotFound,
    /// The input is malformed or fails validation. Retrying cannot help.
    Invalid,
    /// A transient network or RPC failure.
    Transient,
    /// The process cannot continue, e.g. the source connection is gone.
    Fatal,
}

impl ErrorKind {
    /// Whether an operation failing with this kind may succeed on retry.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::NotFound | Self::Transient)
    }
}
