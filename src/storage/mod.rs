//! Durable client-side storage.
//!
//! Every persisted value goes through [`Store`], which only accepts typed
//! [`StorageKey`]s. Backends see opaque strings:
//! - `SqliteBackend` for the real application
//! - `MemoryBackend` for tests

mod backend;
mod keys;
mod store;

#[cfg(test)]
pub use backend::MemoryBackend;
pub use backend::{KvBackend, SqliteBackend};
pub use keys::{Namespace, StorageKey};
pub use store::Store;

/// Errors raised by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
  /// Value is larger than the backend accepts.
  #[error("storage quota exceeded for {key}: {size} bytes (limit {limit})")]
  QuotaExceeded {
    key: String,
    size: usize,
    limit: usize,
  },
  #[error("storage backend error: {0}")]
  Backend(String),
  #[error("storage lock poisoned")]
  Poisoned,
}
