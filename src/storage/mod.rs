//! Storage Module
//!
//! This module defines the contract the Store-class worker calls into, plus
//! the in-memory implementation used by default.
//!
//! ## Ownership
//!
//! ```text
//!   Connection ─┐
//!   Connection ─┼──> Store queue ──> Store worker ──owns──> Box<dyn Store>
//!   Connection ─┘     (bounded)       (exactly one)
//! ```
//!
//! A store holds no locks. It is moved into the single Store-class worker when
//! the server starts, and that task is the only code that ever reads or writes
//! it. Every get/set from every connection is therefore applied in one global
//! order: the order in which the Store queue is drained. Running more than one
//! Store worker would require a store with its own synchronization.
//!
//! ## Example
//!
//! ```
//! use respkv::storage::{MemoryStore, Store};
//! use bytes::Bytes;
//!
//! let mut store = MemoryStore::new();
//! store.set(Bytes::from("name"), Bytes::from("alice")).unwrap();
//! assert_eq!(store.get(b"name").unwrap(), Some(Bytes::from("alice")));
//! assert_eq!(store.get(b"missing").unwrap(), None);
//! ```

pub mod memory;

pub use memory::MemoryStore;

use bytes::Bytes;
use thiserror::Error;

/// Errors a store implementation may report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing storage refused the operation
    #[error("store backend failure: {0}")]
    Backend(String),
}

/// The key-value contract used by the Store-class handlers.
///
/// Implementations need no interior synchronization: the server guarantees a
/// single owner task.
pub trait Store: Send + 'static {
    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: Bytes, value: Bytes) -> Result<(), StoreError>;

    /// Returns the value under `key`, or `None` if it was never set.
    fn get(&self, key: &[u8]) -> Result<Option<Bytes>, StoreError>;
}
