//! Solidity types for the Blobstream bridge contract

#![deny(clippy::nursery, clippy::pedantic)]

pub mod bridge;

pub use bridge::{Blobstream, Signature, Validator};
