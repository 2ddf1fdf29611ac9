//! Utilities shared by the Blobstream orchestrator, relayer and store.

#![deny(clippy::nursery, clippy::pedantic, missing_docs)]

pub mod retry;
pub mod serde;

pub use retry::{ConstantWithMaxRetryCount, RetryConfig, RetryError, Retrier};

/// Ensure that a condition is true, otherwise return an error.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err);
        }
    };
}
