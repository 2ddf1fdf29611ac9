//! The `blobstream` binary: orchestrator, relayer, confirm store node and
//! key management behind one CLI.

#![deny(clippy::nursery, clippy::pedantic)]

pub mod cli;
pub mod config;
pub mod metrics;
pub mod observability;
pub mod runners;
