//! Core traits for the caching system.

use serde::{de::DeserializeOwned, Serialize};

use crate::api::types::{Story, Topic};

/// Trait for records that can be stored in a cache namespace.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Shrink a record before it is persisted.
  ///
  /// The default keeps the record unchanged.
  fn prepare_for_cache(self) -> Self {
    self
  }
}

impl Cacheable for Topic {}

impl Cacheable for Story {
  /// Narration audio is large and always re-fetched with the story detail.
  fn prepare_for_cache(mut self) -> Self {
    self.audio_base64 = None;
    self
  }
}
