//! The confirm store: an eventually consistent key/value overlay holding
//! orchestrator confirms and the latest valset.
//!
//! No writer is trusted. Every record is validated against the namespace
//! encoded in its key on write and again on read, and conflicting replicas
//! are resolved by a per-namespace selector.

#![deny(clippy::nursery, clippy::pedantic)]

pub mod rpc {
    #![allow(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]

    tonic::include_proto!("blobstream.store.v1");

    /// Encoded file descriptor set, used for gRPC reflection.
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("replica_descriptor");
}

pub mod confirm;
pub mod error;
pub mod key;
pub mod overlay;
pub mod store;
pub mod validator;

#[cfg(test)]
pub(crate) mod test_utils;

pub use confirm::Confirm;
pub use error::{KeyError, OverlayError, StoreError, ValidationError};
pub use key::{ConfirmKey, Namespace, LATEST_VALSET_KEY};
pub use overlay::{
    grpc::GrpcOverlay, memory::MemoryOverlay, replica::Replica, server::ReplicaNode, Overlay,
};
pub use store::{ConfirmStore, StoreConfig};
pub use validator::{NamespacedValidator, RecordValidator};
