//! Async query abstraction for data fetching from the event loop.
//!
//! A `Query<T>` owns the last known data for one view slot and the state of
//! the fetch that will replace it. Every dispatch is tagged with a generation
//! number; when results arrive out of order, only the latest dispatch is
//! applied and older ones are dropped.
//!
//! # Example
//!
//! ```ignore
//! let api = api.clone();
//! let mut topics = Query::new(move || {
//!     let api = api.clone();
//!     async move { api.list_topics().await }
//! });
//!
//! topics.fetch();
//!
//! // In event loop tick
//! if topics.poll() {
//!     // State changed, trigger re-render
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;

use crate::api::ApiError;

/// Status of the most recent dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState {
  /// Nothing dispatched yet
  Idle,
  /// Latest dispatch is in flight
  Loading,
  /// Latest dispatch succeeded
  Success,
  /// Latest dispatch failed
  Error(ApiError),
}

/// A boxed future that returns a Result<T, ApiError>
type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send>>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

type Tagged<T> = (u64, Result<T, ApiError>);

/// Async query with generation-tagged results.
///
/// Previous data stays readable while a newer dispatch is loading or after it
/// fails; it is only replaced by a successful result of the latest dispatch.
pub struct Query<T> {
  state: QueryState,
  data: Option<T>,
  fetcher: Option<FetcherFn<T>>,
  generation: u64,
  tx: mpsc::UnboundedSender<Tagged<T>>,
  rx: mpsc::UnboundedReceiver<Tagged<T>>,
}

impl<T: Send + 'static> Query<T> {
  /// Create a query that refetches with `fetcher`.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let mut query = Self::manual();
    query.fetcher = Some(Box::new(move || Box::pin(fetcher())));
    query
  }

  /// Create a query that is only driven by [`Query::dispatch`].
  pub fn manual() -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      state: QueryState::Idle,
      data: None,
      fetcher: None,
      generation: 0,
      tx,
      rx,
    }
  }

  pub fn state(&self) -> &QueryState {
    &self.state
  }

  /// Latest successfully fetched (or seeded) data.
  pub fn data(&self) -> Option<&T> {
    self.data.as_ref()
  }

  pub fn data_mut(&mut self) -> Option<&mut T> {
    self.data.as_mut()
  }

  pub fn is_loading(&self) -> bool {
    self.state == QueryState::Loading
  }

  pub fn error(&self) -> Option<&ApiError> {
    match &self.state {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }

  #[cfg(test)]
  pub fn generation(&self) -> u64 {
    self.generation
  }

  /// Show `data` immediately, e.g. from a cache read, without a fetch.
  pub fn seed(&mut self, data: T) {
    self.data = Some(data);
    if self.state == QueryState::Idle {
      self.state = QueryState::Success;
    }
  }

  /// Start fetching data if not already loading.
  pub fn fetch(&mut self) {
    if self.is_loading() {
      return;
    }
    self.refetch();
  }

  /// Fetch again, superseding any dispatch in flight.
  pub fn refetch(&mut self) {
    if let Some(fetcher) = &self.fetcher {
      let future = fetcher();
      self.spawn(future);
    }
  }

  /// Run `future` as the latest dispatch, superseding any dispatch in flight.
  pub fn dispatch<Fut>(&mut self, future: Fut)
  where
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    self.spawn(Box::pin(future));
  }

  fn spawn(&mut self, future: BoxFuture<T>) {
    self.generation += 1;
    self.state = QueryState::Loading;

    let generation = self.generation;
    let tx = self.tx.clone();
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - the query may have been dropped
      let _ = tx.send((generation, result));
    });
  }

  /// Apply any result of the latest dispatch.
  ///
  /// Returns `true` if the state changed. Call this in the event loop tick.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    while let Ok((generation, result)) = self.rx.try_recv() {
      if generation != self.generation {
        tracing::debug!(generation, latest = self.generation, "dropping superseded result");
        continue;
      }
      match result {
        Ok(data) => {
          self.data = Some(data);
          self.state = QueryState::Success;
        }
        Err(e) => self.state = QueryState::Error(e),
      }
      changed = true;
    }
    changed
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("data", &self.data)
      .field("generation", &self.generation)
      .finish_non_exhaustive()
  }
}
