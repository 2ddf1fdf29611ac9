//! In-process overlay.

use std::sync::Arc;

use crate::{Overlay, OverlayError, Replica};

/// An overlay made of in-process replicas.
///
/// A write succeeds if at least one replica accepts it. Reads return the
/// record of every replica that holds one.
#[derive(Debug, Clone)]
pub struct MemoryOverlay {
    replicas: Vec<Arc<Replica>>,
}

impl MemoryOverlay {
    /// An overlay backed by a single replica.
    #[must_use]
    pub fn new() -> Self {
        Self::with_replicas(vec![Arc::new(Replica::new())])
    }

    /// An overlay backed by the given replicas.
    #[must_use]
    pub const fn with_replicas(replicas: Vec<Arc<Replica>>) -> Self {
        Self { replicas }
    }

    /// The replicas backing the overlay.
    #[must_use]
    pub fn replicas(&self) -> &[Arc<Replica>] {
        &self.replicas
    }
}

impl Default for MemoryOverlay {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Overlay for MemoryOverlay {
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), OverlayError> {
        let mut accepted = 0_usize;
        let mut last_rejection = None;

        for replica in &self.replicas {
            match replica.put(key, value.clone()).await {
                Ok(()) => accepted += 1,
                Err(e) => last_rejection = Some(e.to_string()),
            }
        }

        match (accepted, last_rejection) {
            (0, Some(reason)) => Err(OverlayError::Rejected(reason)),
            (0, None) => Err(OverlayError::Unavailable("no replicas".to_string())),
            _ => Ok(()),
        }
    }

    async fn get(&self, key: &str) -> Result<Vec<Vec<u8>>, OverlayError> {
        let mut values = Vec::new();
        for replica in &self.replicas {
            if let Some(value) = replica.get(key).await {
                values.push(value);
            }
        }
        Ok(values)
    }
}
