//! Transports for the confirm store.

use std::sync::Arc;

use crate::OverlayError;

pub mod grpc;
pub mod memory;
pub mod replica;
pub mod server;

/// A replicated key/value network.
///
/// Replicas validate what they store, but readers must not rely on it:
/// `get` returns every candidate held for a key and the caller selects.
#[async_trait::async_trait]
pub trait Overlay: Send + Sync + 'static {
    /// Writes a record to the network.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), OverlayError>;

    /// Reads all candidate values held for a key.
    async fn get(&self, key: &str) -> Result<Vec<Vec<u8>>, OverlayError>;
}

#[async_trait::async_trait]
impl<T: Overlay + ?Sized> Overlay for Arc<T> {
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), OverlayError> {
        (**self).put(key, value).await
    }

    async fn get(&self, key: &str) -> Result<Vec<Vec<u8>>, OverlayError> {
        (**self).get(key).await
    }
}
