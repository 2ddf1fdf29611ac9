//! The relayer: watches the bridge contract fall behind the source chain and
//! submits the next attestation together with a quorum of confirms.

#![deny(clippy::nursery, clippy::pedantic)]

pub mod config;
pub mod error;
pub mod evm;
pub mod historical;
pub mod metrics;
pub mod relayer;
pub mod submitter;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{HistoricalConfig, RelayerConfig};
pub use error::{RelayerError, SubmitterError};
pub use evm::EvmChainSubmitter;
pub use historical::HistoricalResolver;
pub use relayer::{order_signatures, RelayOutcome, Relayer};
pub use submitter::ChainSubmitter;
