//! gRPC client for the attestation state of the Blobstream source chain.

#![deny(clippy::nursery, clippy::pedantic)]

pub mod rpc {
    #![allow(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]

    tonic::include_proto!("blobstream.source.v1");
}

pub mod client;
pub mod config;
mod convert;

pub use client::{GrpcAttestationSource, BLOCK_HEIGHT_HEADER};
pub use config::SourceConfig;
