//! Durable key-value backends and their SQLite implementation.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::StorageError;

/// Trait for durable key-value storage backends.
///
/// Values are opaque strings; typing and schema checks live in [`super::Store`].
pub trait KvBackend: Send + Sync {
  /// Read a raw value.
  fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

  /// Write a raw value, replacing any previous one.
  fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

  /// Remove a value. Removing a missing key is not an error.
  fn remove(&self, key: &str) -> Result<(), StorageError>;
}

fn check_quota(key: &str, value: &str, limit: Option<usize>) -> Result<(), StorageError> {
  match limit {
    Some(limit) if value.len() > limit => Err(StorageError::QuotaExceeded {
      key: key.to_string(),
      size: value.len(),
      limit,
    }),
    _ => Ok(()),
  }
}

/// In-memory backend for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryBackend {
  values: Mutex<std::collections::HashMap<String, String>>,
  max_value_bytes: Option<usize>,
}

#[cfg(test)]
impl MemoryBackend {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reject values larger than `limit` bytes with [`StorageError::QuotaExceeded`].
  pub fn with_quota(mut self, limit: usize) -> Self {
    self.max_value_bytes = Some(limit);
    self
  }
}

#[cfg(test)]
impl KvBackend for MemoryBackend {
  fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
    let values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
    Ok(values.get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
    check_quota(key, value, self.max_value_bytes)?;
    let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
    values.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StorageError> {
    let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
    values.remove(key);
    Ok(())
  }
}

/// Schema for the key-value table.
const KV_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// SQLite-based durable storage.
pub struct SqliteBackend {
  conn: Mutex<Connection>,
  max_value_bytes: Option<usize>,
}

impl SqliteBackend {
  /// Open the store at the default location.
  pub fn open() -> Result<Self, StorageError> {
    let path = Self::default_path()?;
    Self::open_at(&path)
  }

  /// Open (or create) the store at `path`.
  pub fn open_at(path: &Path) -> Result<Self, StorageError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).map_err(|e| {
        StorageError::Backend(format!("Failed to create storage directory: {}", e))
      })?;
    }

    let conn = Connection::open(path).map_err(|e| {
      StorageError::Backend(format!(
        "Failed to open storage at {}: {}",
        path.display(),
        e
      ))
    })?;

    conn
      .execute_batch(KV_SCHEMA)
      .map_err(|e| StorageError::Backend(format!("Failed to run storage migrations: {}", e)))?;

    Ok(Self {
      conn: Mutex::new(conn),
      max_value_bytes: None,
    })
  }

  /// Reject values larger than `limit` bytes with [`StorageError::QuotaExceeded`].
  pub fn with_quota(mut self, limit: usize) -> Self {
    self.max_value_bytes = Some(limit);
    self
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf, StorageError> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| StorageError::Backend("Could not determine data directory".to_string()))?;

    Ok(data_dir.join("masal").join("storage.db"))
  }
}

impl KvBackend for SqliteBackend {
  fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
    let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;

    conn
      .query_row("SELECT value FROM kv WHERE key = ?", params![key], |row| {
        row.get(0)
      })
      .optional()
      .map_err(|e| StorageError::Backend(format!("Failed to read {}: {}", key, e)))
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
    check_quota(key, value, self.max_value_bytes)?;
    let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;

    conn
      .execute(
        "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| StorageError::Backend(format!("Failed to write {}: {}", key, e)))?;

    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StorageError> {
    let conn = self.conn.lock().map_err(|_| StorageError::Poisoned)?;

    conn
      .execute("DELETE FROM kv WHERE key = ?", params![key])
      .map_err(|e| StorageError::Backend(format!("Failed to remove {}: {}", key, e)))?;

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_sqlite_roundtrip_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("storage.db");

    {
      let backend = SqliteBackend::open_at(&path).unwrap();
      backend.set("session_token", "abc").unwrap();
    }

    let backend = SqliteBackend::open_at(&path).unwrap();
    assert_eq!(backend.get("session_token").unwrap().as_deref(), Some("abc"));

    backend.remove("session_token").unwrap();
    assert_eq!(backend.get("session_token").unwrap(), None);
  }

  #[test]
  fn test_sqlite_quota() {
    let dir = tempfile::tempdir().unwrap();
    let backend = SqliteBackend::open_at(&dir.path().join("s.db"))
      .unwrap()
      .with_quota(4);

    assert!(backend.set("k", "1234").is_ok());
    let err = backend.set("k", "12345").unwrap_err();
    assert!(matches!(err, StorageError::QuotaExceeded { limit: 4, size: 5, .. }));
    // Previous value is untouched
    assert_eq!(backend.get("k").unwrap().as_deref(), Some("1234"));
  }

  #[test]
  fn test_memory_remove_missing_key() {
    let backend = MemoryBackend::new();
    assert!(backend.remove("nothing").is_ok());
  }
}
