//! Story generation: form validation and the timed request.

use std::time::Duration;
use tracing::{info, warn};

use crate::api::types::{Story, StoryRequest};
use crate::api::{ApiError, Notice, SharedApi};
use crate::auth::AuthStore;
use crate::cache::FreshnessCache;

pub const GENERATING_MESSAGE: &str = "Creating your story... This can take 30-60 seconds.";
const FAILED_MESSAGE: &str = "Something went wrong while creating the story";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeGroup {
  FourToFive,
  SixToSeven,
  EightPlus,
}

impl AgeGroup {
  pub const ALL: [AgeGroup; 3] = [AgeGroup::FourToFive, AgeGroup::SixToSeven, AgeGroup::EightPlus];

  pub fn as_param(self) -> &'static str {
    match self {
      AgeGroup::FourToFive => "4-5",
      AgeGroup::SixToSeven => "6-7",
      AgeGroup::EightPlus => "8+",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      AgeGroup::FourToFive => "4-5 years",
      AgeGroup::SixToSeven => "6-7 years",
      AgeGroup::EightPlus => "8 years and up",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
  #[error("Please choose a topic")]
  MissingTopic,
  #[error("Please enter a theme")]
  MissingTheme,
  #[error("Please choose an age group")]
  MissingAgeGroup,
}

/// Values entered in the creation form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoryForm {
  pub topic_id: Option<String>,
  pub subtopic_id: Option<String>,
  pub theme: String,
  pub age_group: Option<AgeGroup>,
  pub character: String,
  pub kazanim_based: bool,
}

impl StoryForm {
  /// Validate required fields and build the request body.
  pub fn to_request(&self) -> Result<StoryRequest, FormError> {
    let topic_id = self
      .topic_id
      .clone()
      .filter(|t| !t.is_empty())
      .ok_or(FormError::MissingTopic)?;
    let theme = self.theme.trim();
    if theme.is_empty() {
      return Err(FormError::MissingTheme);
    }
    let age_group = self.age_group.ok_or(FormError::MissingAgeGroup)?;
    let character = self.character.trim();

    Ok(StoryRequest {
      topic_id,
      subtopic_id: self.subtopic_id.clone().filter(|s| !s.is_empty()),
      theme: theme.to_string(),
      age_group: age_group.as_param().to_string(),
      character: (!character.is_empty()).then(|| character.to_string()),
      kazanim_based: self.kazanim_based && self.subtopic_id.is_some(),
    })
  }
}

/// Runs a generation request with a client-side timeout.
#[derive(Clone)]
pub struct StoryCreator {
  api: SharedApi,
  auth: AuthStore,
  cache: FreshnessCache,
  timeout: Duration,
}

impl StoryCreator {
  pub fn new(api: SharedApi, auth: AuthStore, cache: FreshnessCache, timeout: Duration) -> Self {
    Self {
      api,
      auth,
      cache,
      timeout,
    }
  }

  /// Generate a story.
  ///
  /// On success the story caches are invalidated and the user is refreshed so
  /// the credit balance is current. No cancellation reaches the server when
  /// the timeout fires.
  pub async fn create(&self, request: StoryRequest) -> Result<Story, ApiError> {
    info!(topic = %request.topic_id, age_group = %request.age_group, "generating story");
    let story = match tokio::time::timeout(self.timeout, self.api.generate_story(&request)).await {
      Ok(result) => result?,
      Err(_) => {
        warn!(timeout_secs = self.timeout.as_secs(), "story generation timed out");
        return Err(ApiError::Timeout);
      }
    };

    self.cache.invalidate_after_story_created();
    if self.auth.is_authenticated() {
      self.auth.refresh().await;
    }
    info!(story = %story.id, "story created");
    Ok(story)
  }
}

pub fn failure_notice(err: &ApiError) -> Notice {
  err.notice(FAILED_MESSAGE)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::fake::{story, user, FakeApi};
  use crate::api::NoticeLink;
  use crate::cache::CachePolicy;
  use crate::storage::{MemoryBackend, Namespace, StorageKey, Store};
  use std::sync::Arc;

  fn form() -> StoryForm {
    StoryForm {
      topic_id: Some("degerler".into()),
      subtopic_id: Some("paylasma".into()),
      theme: " oyuncaklarını paylaşan ayı ".into(),
      age_group: Some(AgeGroup::FourToFive),
      character: String::new(),
      kazanim_based: true,
    }
  }

  fn setup(fake: FakeApi, timeout: Duration) -> (StoryCreator, Arc<FakeApi>, Store, AuthStore) {
    let fake = Arc::new(fake);
    let store = Store::new(MemoryBackend::new());
    let cache = FreshnessCache::new(store.clone(), CachePolicy::default());
    let auth = AuthStore::new(fake.clone(), store.clone());
    let creator = StoryCreator::new(fake.clone(), auth.clone(), cache, timeout);
    (creator, fake, store, auth)
  }

  #[test]
  fn test_form_requires_fields() {
    let mut f = form();
    f.topic_id = None;
    assert_eq!(f.to_request(), Err(FormError::MissingTopic));

    let mut f = form();
    f.theme = "   ".into();
    assert_eq!(f.to_request(), Err(FormError::MissingTheme));

    let mut f = form();
    f.age_group = None;
    assert_eq!(f.to_request(), Err(FormError::MissingAgeGroup));
  }

  #[test]
  fn test_form_builds_request() {
    let request = form().to_request().unwrap();
    assert_eq!(request.theme, "oyuncaklarını paylaşan ayı");
    assert_eq!(request.age_group, "4-5");
    assert_eq!(request.character, None);
    assert!(request.kazanim_based);

    let mut f = form();
    f.subtopic_id = None;
    f.character = "Pamuk".into();
    let request = f.to_request().unwrap();
    assert_eq!(request.character.as_deref(), Some("Pamuk"));
    assert!(!request.kazanim_based);
  }

  #[tokio::test]
  async fn test_generation_timeout_gives_timeout_notice() {
    let (creator, fake, _, _) = setup(
      FakeApi::new().delayed("generate_story", Duration::from_millis(300)),
      Duration::from_millis(20),
    );

    let err = creator.create(form().to_request().unwrap()).await.unwrap_err();
    assert_eq!(err, ApiError::Timeout);
    assert_eq!(fake.calls("generate_story"), 1);

    let notice = failure_notice(&err);
    assert!(notice.message.contains("timed out"));
    assert_ne!(notice.message, FAILED_MESSAGE);
  }

  #[tokio::test]
  async fn test_insufficient_credits_links_to_profile() {
    let (creator, _, _, _) = setup(
      FakeApi::new().failing(
        "generate_story",
        ApiError::InsufficientCredits {
          detail: "Yetersiz kredi".into(),
        },
      ),
      Duration::from_secs(5),
    );

    let err = creator.create(form().to_request().unwrap()).await.unwrap_err();
    let notice = failure_notice(&err);
    assert_eq!(notice.link, Some(NoticeLink::Profile));
    assert_ne!(notice.message, FAILED_MESSAGE);
  }

  #[tokio::test]
  async fn test_success_invalidates_and_refreshes_credits() {
    let (creator, fake, store, auth) = setup(
      FakeApi::new().with_user(user(3)),
      Duration::from_secs(5),
    );
    store.set_token("tok").unwrap();
    auth.boot().await;

    let cache = FreshnessCache::new(store.clone(), CachePolicy::default());
    cache.write(Namespace::Stories, &[story("s1", "Orman")]);
    cache.write(Namespace::PopularStories, &[story("s1", "Orman")]);

    let created = creator.create(form().to_request().unwrap()).await.unwrap();
    assert_eq!(created.topic_id.as_deref(), Some("degerler"));
    assert_eq!(fake.last_generate().map(|r| r.kazanim_based), Some(true));

    assert_eq!(store.get(StorageKey::Cache(Namespace::Stories)).unwrap(), None);
    assert_eq!(store.get(StorageKey::Cache(Namespace::PopularStories)).unwrap(), None);
    assert_eq!(auth.user().map(|u| u.credits), Some(2));
  }
}
