//! A single validating key/value node.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::{Namespace, NamespacedValidator, RecordValidator, ValidationError};

/// In-memory record storage that only accepts records passing their
/// namespace validator.
///
/// Confirms are immutable: rewriting one with identical bytes is a no-op and
/// rewriting it with anything else is refused. The latest valset is replaced
/// only by a valset with a higher nonce.
#[derive(Debug, Default)]
pub struct Replica {
    records: RwLock<HashMap<String, Vec<u8>>>,
    validator: NamespacedValidator,
}

impl Replica {
    /// Creates an empty replica.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and stores a record.
    ///
    /// # Errors
    /// Fails if the record is invalid or conflicts with an immutable record.
    pub async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), ValidationError> {
        self.validator.validate(key, &value)?;

        let mut records = self.records.write().await;
        let Some(existing) = records.get(key) else {
            tracing::debug!(key, "Stored record");
            records.insert(key.to_string(), value);
            return Ok(());
        };

        if *existing == value {
            return Ok(());
        }

        let candidates = [existing.clone(), value];
        let chosen = self.validator.select(key, &candidates)?;
        let [_, value] = candidates;
        if chosen == 1 {
            tracing::debug!(key, "Replaced record");
            records.insert(key.to_string(), value);
            return Ok(());
        }

        if Namespace::of_key(key)?.is_confirm() {
            return Err(ValidationError::Conflict(key.to_string()));
        }
        Ok(())
    }

    /// Returns the record stored under `key`.
    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.records.read().await.get(key).cloned()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the replica holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Stores a record without validation, simulating a misbehaving replica.
    #[cfg(test)]
    pub(crate) async fn insert_unchecked(&self, key: &str, value: Vec<u8>) {
        self.records.write().await.insert(key.to_string(), value);
    }
}
