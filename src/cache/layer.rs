//! Freshness-bounded cache over the durable store.

use chrono::Duration;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::traits::Cacheable;
use crate::storage::{Namespace, StorageError, StorageKey, Store};

/// Schema version written into every entry.
pub const SCHEMA_VERSION: u64 = 1;

/// Maximum age per namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
  pub topics_max_age: Duration,
  pub stories_max_age: Duration,
}

impl Default for CachePolicy {
  fn default() -> Self {
    Self {
      topics_max_age: Duration::hours(1),
      stories_max_age: Duration::minutes(5),
    }
  }
}

impl CachePolicy {
  pub fn max_age(&self, ns: Namespace) -> Duration {
    match ns {
      Namespace::Topics => self.topics_max_age,
      Namespace::PopularStories | Namespace::Stories => self.stories_max_age,
    }
  }
}

#[derive(Serialize)]
struct EntryRef<'a, T> {
  version: u64,
  data: &'a [T],
  timestamp: i64,
}

/// Why a read produced nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Miss {
  Absent,
  Corrupt,
  UnknownVersion,
  NotAnArray,
  Expired,
}

/// Cache that serves a namespace's collection only while it is fresh.
///
/// Entries are `{"version": 1, "data": [...], "timestamp": ms}`. Any entry that
/// fails to parse, has an unknown version, holds a non-array `data` or is older
/// than its namespace's max age is removed when read.
#[derive(Clone)]
pub struct FreshnessCache {
  store: Store,
  clock: Arc<dyn Clock>,
  policy: CachePolicy,
  enabled: bool,
}

impl FreshnessCache {
  pub fn new(store: Store, policy: CachePolicy) -> Self {
    Self::with_clock(store, policy, Arc::new(SystemClock))
  }

  pub fn with_clock(store: Store, policy: CachePolicy, clock: Arc<dyn Clock>) -> Self {
    Self {
      store,
      clock,
      policy,
      enabled: true,
    }
  }

  /// A disabled cache misses every read and discards every write.
  pub fn enabled(mut self, enabled: bool) -> Self {
    self.enabled = enabled;
    self
  }

  /// Read `ns` using the namespace's configured max age.
  pub fn read<T: Cacheable>(&self, ns: Namespace) -> Option<Vec<T>> {
    self.read_with_max_age(ns, self.policy.max_age(ns))
  }

  pub fn read_with_max_age<T: Cacheable>(&self, ns: Namespace, max_age: Duration) -> Option<Vec<T>> {
    if !self.enabled {
      return None;
    }

    match self.lookup(ns, max_age) {
      Ok(data) => {
        debug!(namespace = %ns, items = data.len(), "cache hit");
        Some(data)
      }
      Err(Miss::Absent) => {
        debug!(namespace = %ns, "cache miss");
        None
      }
      Err(reason) => {
        debug!(namespace = %ns, ?reason, "discarding cache entry");
        self.invalidate(ns);
        None
      }
    }
  }

  fn lookup<T: Cacheable>(&self, ns: Namespace, max_age: Duration) -> Result<Vec<T>, Miss> {
    let raw = match self.store.get(StorageKey::Cache(ns)) {
      Ok(Some(raw)) => raw,
      Ok(None) => return Err(Miss::Absent),
      Err(e) => {
        warn!(namespace = %ns, error = %e, "cache read failed");
        return Err(Miss::Absent);
      }
    };

    let mut entry: Value = serde_json::from_str(&raw).map_err(|_| Miss::Corrupt)?;
    let obj = entry.as_object_mut().ok_or(Miss::Corrupt)?;

    // Entries written before versioning carry no version field
    let version = match obj.get("version") {
      None => SCHEMA_VERSION,
      Some(v) => v.as_u64().ok_or(Miss::UnknownVersion)?,
    };
    if version != SCHEMA_VERSION {
      return Err(Miss::UnknownVersion);
    }

    let timestamp = obj
      .get("timestamp")
      .and_then(Value::as_i64)
      .ok_or(Miss::Corrupt)?;

    let data = match obj.remove("data") {
      Some(data @ Value::Array(_)) => data,
      Some(_) => return Err(Miss::NotAnArray),
      None => return Err(Miss::Corrupt),
    };

    let age_ms = self.clock.now().timestamp_millis() - timestamp;
    if age_ms >= max_age.num_milliseconds() {
      return Err(Miss::Expired);
    }

    serde_json::from_value(data).map_err(|_| Miss::Corrupt)
  }

  /// Persist `data` under `ns`, stamped with the current time.
  ///
  /// Writes are best-effort: a quota or backend failure is logged and dropped.
  pub fn write<T: Cacheable>(&self, ns: Namespace, data: &[T]) {
    if !self.enabled {
      return;
    }

    let prepared: Vec<T> = data.iter().cloned().map(Cacheable::prepare_for_cache).collect();
    let entry = EntryRef {
      version: SCHEMA_VERSION,
      data: &prepared,
      timestamp: self.clock.now().timestamp_millis(),
    };

    let raw = match serde_json::to_string(&entry) {
      Ok(raw) => raw,
      Err(e) => {
        warn!(namespace = %ns, error = %e, "failed to encode cache entry");
        return;
      }
    };

    match self.store.set(StorageKey::Cache(ns), &raw) {
      Ok(()) => debug!(namespace = %ns, items = prepared.len(), "cache write"),
      Err(e @ StorageError::QuotaExceeded { .. }) => {
        warn!(namespace = %ns, error = %e, "cache write dropped");
      }
      Err(e) => warn!(namespace = %ns, error = %e, "cache write failed"),
    }
  }

  pub fn invalidate(&self, ns: Namespace) {
    if let Err(e) = self.store.remove(StorageKey::Cache(ns)) {
      warn!(namespace = %ns, error = %e, "failed to invalidate cache entry");
    }
  }

  /// A new story changes both story listings.
  pub fn invalidate_after_story_created(&self) {
    self.invalidate(Namespace::Stories);
    self.invalidate(Namespace::PopularStories);
  }
}
