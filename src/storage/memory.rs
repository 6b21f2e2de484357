//! In-memory store backed by a plain `HashMap`.

use super::{Store, StoreError};
use bytes::Bytes;
use std::collections::HashMap;

/// A bare map with no expiry and no locking.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: HashMap<Bytes, Bytes>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Store for MemoryStore {
    fn set(&mut self, key: Bytes, value: Bytes) -> Result<(), StoreError> {
        self.data.insert(key, value);
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Bytes>, StoreError> {
        Ok(self.data.get(key).cloned())
    }
}
