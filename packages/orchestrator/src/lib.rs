//! The orchestrator: one per validator, it signs every attestation its
//! validator is expected to sign and publishes the confirm to the store.

#![deny(clippy::nursery, clippy::pedantic)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::OrchestratorConfig;
pub use error::OrchestratorError;
pub use orchestrator::{should_requeue, Orchestrator, ProcessOutcome, RequeueDecision, SkipReason};
