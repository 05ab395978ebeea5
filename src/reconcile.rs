//! Decides per namespace whether a network call is needed and merges the
//! result into view state and the cache.

use std::future::Future;
use tracing::{debug, warn};

use crate::api::types::{Story, StoryQuery, Topic};
use crate::api::{ApiError, SharedApi};
use crate::cache::{Cacheable, FreshnessCache};
use crate::storage::Namespace;

/// Where a reconciled collection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
  /// Fresh cache entry, no request issued
  Cache,
  /// Fetched because the entry was stale, absent or malformed
  Network,
  /// Non-default view, served without touching the cache
  Bypass,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled<T> {
  pub items: Vec<T>,
  pub source: Source,
  /// Fetch failure; `items` is empty when set
  pub error: Option<ApiError>,
}

impl<T> Reconciled<T> {
  pub fn new(items: Vec<T>, source: Source) -> Self {
    Self {
      items,
      source,
      error: None,
    }
  }

  fn failed(source: Source, error: ApiError) -> Self {
    Self {
      items: Vec::new(),
      source,
      error: Some(error),
    }
  }
}

/// Everything the home view shows.
#[derive(Debug, Clone, PartialEq)]
pub struct HomeData {
  pub topics: Reconciled<Topic>,
  pub popular: Reconciled<Story>,
}

#[derive(Clone)]
pub struct Reconciler {
  api: SharedApi,
  cache: FreshnessCache,
  popular_limit: u32,
}

impl Reconciler {
  pub fn new(api: SharedApi, cache: FreshnessCache, popular_limit: u32) -> Self {
    Self {
      api,
      cache,
      popular_limit,
    }
  }

  pub fn cache(&self) -> &FreshnessCache {
    &self.cache
  }

  /// Synchronous read for instant paint before reconciliation.
  pub fn instant<T: Cacheable>(&self, ns: Namespace) -> Option<Vec<T>> {
    self.cache.read(ns)
  }

  /// Serve `ns` from the cache if fresh, otherwise fetch and rewrite it.
  async fn reconcile<T, F, Fut>(&self, ns: Namespace, fetch: F) -> Reconciled<T>
  where
    T: Cacheable,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>, ApiError>>,
  {
    if let Some(items) = self.cache.read::<T>(ns) {
      return Reconciled::new(items, Source::Cache);
    }

    match fetch().await {
      Ok(items) => {
        self.cache.write(ns, &items);
        Reconciled::new(items, Source::Network)
      }
      Err(e) => {
        warn!(namespace = %ns, error = %e, "fetch failed, showing empty list");
        Reconciled::failed(Source::Network, e)
      }
    }
  }

  pub async fn topics(&self) -> Reconciled<Topic> {
    let api = self.api.clone();
    self
      .reconcile(Namespace::Topics, || async move { api.list_topics().await })
      .await
  }

  pub async fn popular(&self) -> Reconciled<Story> {
    let api = self.api.clone();
    let limit = self.popular_limit;
    self
      .reconcile(Namespace::PopularStories, || async move {
        api.popular_stories(limit).await
      })
      .await
  }

  /// Topics and popular stories, fetched concurrently and independently.
  pub async fn home(&self) -> HomeData {
    let (topics, popular) = futures::join!(self.topics(), self.popular());
    HomeData { topics, popular }
  }

  /// Story listing; only the default view uses the cache.
  pub async fn stories(&self, query: &StoryQuery) -> Reconciled<Story> {
    if query.is_default_view() {
      let api = self.api.clone();
      let query = query.clone();
      return self
        .reconcile(Namespace::Stories, || async move {
          api.list_stories(&query).await
        })
        .await;
    }

    debug!(?query, "filtered view, bypassing cache");
    match self.api.list_stories(query).await {
      Ok(items) => Reconciled::new(items, Source::Bypass),
      Err(e) => {
        warn!(error = %e, "story search failed");
        Reconciled::failed(Source::Bypass, e)
      }
    }
  }

  /// Topic taxonomy for the story creation form.
  pub async fn create_page(&self) -> Reconciled<Topic> {
    self.topics().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fake::{story, topic, FakeApi};
  use crate::cache::CachePolicy;
  use crate::storage::{MemoryBackend, StorageKey, Store};
  use serde_json::json;
  use std::sync::Arc;

  fn setup(fake: FakeApi) -> (Reconciler, Arc<FakeApi>, Store) {
    let fake = Arc::new(fake);
    let store = Store::new(MemoryBackend::new());
    let cache = FreshnessCache::new(store.clone(), CachePolicy::default());
    (Reconciler::new(fake.clone(), cache, 6), fake, store)
  }

  fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
  }

  #[tokio::test]
  async fn test_warm_cache_issues_no_requests() {
    let (reconciler, fake, _) = setup(
      FakeApi::new()
        .with_topics(vec![topic("doga", "Doğa")])
        .with_popular(vec![story("s1", "Orman")]),
    );

    let first = reconciler.home().await;
    assert_eq!(first.topics.source, Source::Network);
    assert_eq!(first.popular.source, Source::Network);
    assert_eq!(fake.total_calls(), 2);

    let second = reconciler.home().await;
    assert_eq!(fake.total_calls(), 2);
    assert_eq!(second.topics.source, Source::Cache);
    assert_eq!(second.topics.items, first.topics.items);
    assert_eq!(second.popular.items.len(), 1);
  }

  #[tokio::test]
  async fn test_preseeded_topics_render_without_network() {
    let (reconciler, fake, store) = setup(FakeApi::new());
    let entry = json!({
      "data": [
        {"id": "doga", "name": "Doğa"},
        {"id": "organlar", "name": "Organlar"},
        {"id": "degerler", "name": "Değerler"}
      ],
      "timestamp": now_ms()
    });
    store
      .set(StorageKey::Cache(Namespace::Topics), &entry.to_string())
      .unwrap();

    let topics = reconciler.topics().await;
    assert_eq!(topics.source, Source::Cache);
    assert_eq!(topics.items.len(), 3);
    assert_eq!(fake.calls("list_topics"), 0);
  }

  #[tokio::test]
  async fn test_non_array_preseed_renders_empty_then_fetches() {
    let (reconciler, fake, store) = setup(FakeApi::new());
    let entry = json!({"data": "not-an-array", "timestamp": now_ms()});
    store
      .set(StorageKey::Cache(Namespace::Stories), &entry.to_string())
      .unwrap();

    let painted: Vec<Story> = reconciler.instant(Namespace::Stories).unwrap_or_default();
    assert!(painted.is_empty());

    let stories = reconciler.stories(&StoryQuery::default()).await;
    assert_eq!(stories.source, Source::Network);
    assert!(stories.items.is_empty());
    assert_eq!(fake.calls("list_stories"), 1);
  }

  #[tokio::test]
  async fn test_filtered_view_bypasses_cache() {
    let (reconciler, fake, store) = setup(FakeApi::new().with_stories(vec![story("s1", "Orman")]));

    reconciler.stories(&StoryQuery::default()).await;
    let cached = store.get(StorageKey::Cache(Namespace::Stories)).unwrap();
    assert_eq!(fake.calls("list_stories"), 1);

    let found = reconciler.stories(&StoryQuery::search("orman")).await;
    assert_eq!(found.source, Source::Bypass);
    assert_eq!(fake.calls("list_stories"), 2);
    assert_eq!(fake.last_query(), Some(StoryQuery::search("orman")));

    // Filtered results never overwrite the default view entry
    assert_eq!(store.get(StorageKey::Cache(Namespace::Stories)).unwrap(), cached);

    let again = reconciler.stories(&StoryQuery::topic("doga")).await;
    assert_eq!(again.source, Source::Bypass);
    assert_eq!(fake.calls("list_stories"), 3);
  }

  #[tokio::test]
  async fn test_malformed_response_is_empty_and_not_cached() {
    let (reconciler, _, store) = setup(
      FakeApi::new().failing("list_topics", ApiError::malformed("/topics", "expected array")),
    );

    let topics = reconciler.topics().await;
    assert!(topics.items.is_empty());
    assert!(topics.error.as_ref().map(ApiError::is_silent).unwrap_or(false));
    assert_eq!(store.get(StorageKey::Cache(Namespace::Topics)).unwrap(), None);
  }

  #[tokio::test]
  async fn test_one_failure_does_not_block_the_other() {
    let (reconciler, _, _) = setup(
      FakeApi::new()
        .with_topics(vec![topic("doga", "Doğa")])
        .failing("popular_stories", ApiError::Transport("connection refused".into())),
    );

    let home = reconciler.home().await;
    assert_eq!(home.topics.items.len(), 1);
    assert!(home.topics.error.is_none());
    assert!(home.popular.items.is_empty());
    assert!(home.popular.error.is_some());
  }

  #[tokio::test]
  async fn test_popular_cache_strips_audio() {
    let (reconciler, _, _) = setup(FakeApi::new().with_popular(vec![story("s1", "Orman")]));

    let fetched = reconciler.popular().await;
    assert!(fetched.items[0].has_audio());

    let cached = reconciler.popular().await;
    assert_eq!(cached.source, Source::Cache);
    assert!(!cached.items[0].has_audio());
  }
}
