use std::sync::Arc;
use tracing::warn;

use super::{KvBackend, StorageError, StorageKey};

/// Typed boundary over a durable key-value backend.
///
/// Storage is process-wide and last-write-wins; the backend serializes
/// individual calls.
#[derive(Clone)]
pub struct Store {
  backend: Arc<dyn KvBackend>,
}

impl Store {
  pub fn new(backend: impl KvBackend + 'static) -> Self {
    Self {
      backend: Arc::new(backend),
    }
  }

  pub fn get(&self, key: StorageKey) -> Result<Option<String>, StorageError> {
    self.backend.get(key.as_str())
  }

  pub fn set(&self, key: StorageKey, value: &str) -> Result<(), StorageError> {
    self.backend.set(key.as_str(), value)
  }

  pub fn remove(&self, key: StorageKey) -> Result<(), StorageError> {
    self.backend.remove(key.as_str())
  }

  /// Current session token. Read failures count as "no token".
  pub fn token(&self) -> Option<String> {
    match self.get(StorageKey::SessionToken) {
      Ok(token) => token.filter(|t| !t.is_empty()),
      Err(e) => {
        warn!(error = %e, "failed to read session token");
        None
      }
    }
  }

  pub fn set_token(&self, token: &str) -> Result<(), StorageError> {
    self.set(StorageKey::SessionToken, token)
  }

  pub fn clear_token(&self) {
    if let Err(e) = self.remove(StorageKey::SessionToken) {
      warn!(error = %e, "failed to purge session token");
    }
  }

  pub fn welcome_seen(&self) -> bool {
    matches!(self.get(StorageKey::WelcomeSeen), Ok(Some(v)) if v == "true")
  }

  pub fn mark_welcome_seen(&self) {
    if let Err(e) = self.set(StorageKey::WelcomeSeen, "true") {
      warn!(error = %e, "failed to persist welcome flag");
    }
  }
}
