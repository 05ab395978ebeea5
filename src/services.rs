//! Shared handles every view receives.

use std::path::PathBuf;
use std::sync::Arc;

use crate::api::SharedApi;
use crate::auth::AuthStore;
use crate::cache::FreshnessCache;
use crate::config::Config;
use crate::create::StoryCreator;
use crate::reconcile::Reconciler;
use crate::storage::Store;

/// Cheap to clone; views clone it into spawned fetches.
#[derive(Clone)]
pub struct Services {
  pub api: SharedApi,
  pub store: Store,
  pub auth: AuthStore,
  pub reconciler: Reconciler,
  pub creator: StoryCreator,
  pub download_dir: PathBuf,
  pub config: Arc<Config>,
}

impl Services {
  pub fn new(api: SharedApi, store: Store, cache: FreshnessCache, config: Config) -> Self {
    let auth = AuthStore::new(api.clone(), store.clone());
    let reconciler = Reconciler::new(api.clone(), cache.clone(), config.popular_limit);
    let creator = StoryCreator::new(api.clone(), auth.clone(), cache, config.generate_timeout());
    Self {
      api,
      store,
      auth,
      reconciler,
      creator,
      download_dir: crate::download::default_dir(),
      config: Arc::new(config),
    }
  }
}
