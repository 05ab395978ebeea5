//! In-memory backend for tests, with per-endpoint call counters.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use super::types::*;
use super::{ApiError, MasalApi};

#[derive(Default)]
struct FakeState {
  topics: Vec<Topic>,
  stories: Vec<Story>,
  popular: Vec<Story>,
  user: Option<UserProfile>,
  session_token: Option<String>,
  favorites: Vec<String>,
  calls: HashMap<&'static str, usize>,
  failures: HashMap<&'static str, ApiError>,
  delays: HashMap<&'static str, Duration>,
  searches: HashMap<String, (Vec<Story>, Duration)>,
  last_query: Option<StoryQuery>,
  last_generate: Option<StoryRequest>,
}

#[derive(Default)]
pub struct FakeApi {
  state: Mutex<FakeState>,
}

pub fn topic(id: &str, name: &str) -> Topic {
  Topic {
    id: id.to_string(),
    name: name.to_string(),
    icon: String::new(),
    color: String::new(),
    description: String::new(),
    image: String::new(),
    subtopic_count: 0,
  }
}

pub fn story(id: &str, title: &str) -> Story {
  Story {
    id: id.to_string(),
    title: title.to_string(),
    content: format!("{} masalı", title),
    topic_id: Some("doga".to_string()),
    topic_name: Some("Doğa".to_string()),
    topic: None,
    subtopic_id: None,
    subtopic_name: None,
    kazanim: None,
    theme: Some("paylaşmak".to_string()),
    age_group: Some("4-5".to_string()),
    character: None,
    audio_base64: Some("SUQzBAAAAAAA".to_string()),
    duration: Some(90),
    play_count: 0,
    created_at: None,
    user_id: None,
  }
}

pub fn user(credits: i64) -> UserProfile {
  UserProfile {
    user_id: "u1".to_string(),
    name: "Ada".to_string(),
    surname: Some("Yılmaz".to_string()),
    email: "ada@example.com".to_string(),
    phone: None,
    picture: None,
    credits,
    role: Role::User,
    created_at: None,
  }
}

fn default_subtopics() -> Vec<Subtopic> {
  vec![Subtopic {
    id: "paylasma".to_string(),
    name: "Paylaşma".to_string(),
    kazanim: "Paylaşmanın önemini kavrar".to_string(),
  }]
}

impl FakeApi {
  pub fn new() -> Self {
    Self::default()
  }

  fn with_state(self, f: impl FnOnce(&mut FakeState)) -> Self {
    if let Ok(mut state) = self.state.lock() {
      f(&mut *state);
    }
    self
  }

  pub fn with_topics(self, topics: Vec<Topic>) -> Self {
    self.with_state(|s| s.topics = topics)
  }

  pub fn with_stories(self, stories: Vec<Story>) -> Self {
    self.with_state(|s| s.stories = stories)
  }

  pub fn with_popular(self, popular: Vec<Story>) -> Self {
    self.with_state(|s| s.popular = popular)
  }

  pub fn with_user(self, user: UserProfile) -> Self {
    self.with_state(|s| s.user = Some(user))
  }

  pub fn with_session_token(self, token: &str) -> Self {
    self.with_state(|s| s.session_token = Some(token.to_string()))
  }

  /// Make every call to `endpoint` fail with `err`.
  pub fn failing(self, endpoint: &'static str, err: ApiError) -> Self {
    self.with_state(|s| {
      s.failures.insert(endpoint, err);
    })
  }

  /// Answer searches for `term` with `stories`, after `delay`.
  pub fn with_search(self, term: &str, stories: Vec<Story>, delay: Duration) -> Self {
    self.with_state(|s| {
      s.searches.insert(term.to_string(), (stories, delay));
    })
  }

  /// Delay every call to `endpoint` by `delay`.
  pub fn delayed(self, endpoint: &'static str, delay: Duration) -> Self {
    self.with_state(|s| {
      s.delays.insert(endpoint, delay);
    })
  }

  pub fn set_user(&self, user: UserProfile) {
    if let Ok(mut state) = self.state.lock() {
      state.user = Some(user);
    }
  }

  pub fn calls(&self, endpoint: &str) -> usize {
    self
      .state
      .lock()
      .map(|s| s.calls.get(endpoint).copied().unwrap_or(0))
      .unwrap_or(0)
  }

  pub fn total_calls(&self) -> usize {
    self
      .state
      .lock()
      .map(|s| s.calls.values().sum())
      .unwrap_or(0)
  }

  pub fn last_query(&self) -> Option<StoryQuery> {
    self.state.lock().ok().and_then(|s| s.last_query.clone())
  }

  pub fn last_generate(&self) -> Option<StoryRequest> {
    self.state.lock().ok().and_then(|s| s.last_generate.clone())
  }

  async fn enter(&self, endpoint: &'static str) -> Result<(), ApiError> {
    let (delay, failure) = {
      let mut state = self.state.lock().map_err(|_| ApiError::Transport("poisoned".into()))?;
      *state.calls.entry(endpoint).or_insert(0) += 1;
      (
        state.delays.get(endpoint).copied(),
        state.failures.get(endpoint).cloned(),
      )
    };
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
    match failure {
      Some(err) => Err(err),
      None => Ok(()),
    }
  }

  fn read<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> Result<T, ApiError> {
    self
      .state
      .lock()
      .map(|mut s| f(&mut *s))
      .map_err(|_| ApiError::Transport("poisoned".into()))
  }

  fn find_topic(&self, topic_id: &str) -> Result<Topic, ApiError> {
    self
      .read(|s| s.topics.iter().find(|t| t.id == topic_id).cloned())?
      .ok_or(ApiError::NotFound {
        detail: "Konu bulunamadı".to_string(),
      })
  }

  fn auth_response(&self) -> Result<AuthResponse, ApiError> {
    self.read(|s| {
      s.user.clone().map(|user| AuthResponse {
        session_token: s.session_token.clone(),
        user,
      })
    })?
    .ok_or(ApiError::Unauthorized)
  }
}

#[async_trait]
impl MasalApi for FakeApi {
  async fn list_topics(&self) -> Result<Vec<Topic>, ApiError> {
    self.enter("list_topics").await?;
    self.read(|s| s.topics.clone())
  }

  async fn get_topic(&self, topic_id: &str) -> Result<TopicDetail, ApiError> {
    self.enter("get_topic").await?;
    let topic = self.find_topic(topic_id)?;
    Ok(TopicDetail {
      id: topic.id,
      name: topic.name,
      icon: topic.icon,
      color: topic.color,
      description: topic.description,
      image: topic.image,
      subtopics: default_subtopics(),
    })
  }

  async fn list_subtopics(&self, topic_id: &str) -> Result<Vec<Subtopic>, ApiError> {
    self.enter("list_subtopics").await?;
    self.find_topic(topic_id)?;
    Ok(default_subtopics())
  }

  async fn list_stories(&self, query: &StoryQuery) -> Result<Vec<Story>, ApiError> {
    self.enter("list_stories").await?;
    let search = self.read(|s| {
      s.last_query = Some(query.clone());
      query.search.as_ref().and_then(|term| s.searches.get(term).cloned())
    })?;
    match search {
      Some((stories, delay)) => {
        tokio::time::sleep(delay).await;
        Ok(stories)
      }
      None => self.read(|s| s.stories.clone()),
    }
  }

  async fn popular_stories(&self, limit: u32) -> Result<Vec<Story>, ApiError> {
    self.enter("popular_stories").await?;
    self.read(|s| s.popular.iter().take(limit as usize).cloned().collect())
  }

  async fn get_story(&self, story_id: &str) -> Result<Story, ApiError> {
    self.enter("get_story").await?;
    self
      .read(|s| {
        s.stories
          .iter()
          .chain(s.popular.iter())
          .find(|st| st.id == story_id)
          .cloned()
      })?
      .ok_or(ApiError::NotFound {
        detail: "Masal bulunamadı".to_string(),
      })
  }

  async fn record_play(&self, _story_id: &str) -> Result<(), ApiError> {
    self.enter("record_play").await
  }

  async fn generate_story(&self, request: &StoryRequest) -> Result<Story, ApiError> {
    self.enter("generate_story").await?;
    self.read(|s| {
      s.last_generate = Some(request.clone());
      if let Some(user) = s.user.as_mut() {
        user.credits -= 1;
      }
      let mut created = story("new-story", "Yeni Masal");
      created.topic_id = Some(request.topic_id.clone());
      created.theme = Some(request.theme.clone());
      created
    })
  }

  async fn me(&self) -> Result<UserProfile, ApiError> {
    self.enter("me").await?;
    self.read(|s| s.user.clone())?.ok_or(ApiError::Unauthorized)
  }

  async fn login(&self, _credentials: &Credentials) -> Result<AuthResponse, ApiError> {
    self.enter("login").await?;
    self.auth_response()
  }

  async fn register(&self, _registration: &Registration) -> Result<(), ApiError> {
    self.enter("register").await
  }

  async fn logout(&self) -> Result<(), ApiError> {
    self.enter("logout").await
  }

  async fn google_session(&self, _session_id: &str) -> Result<AuthResponse, ApiError> {
    self.enter("google_session").await?;
    self.auth_response()
  }

  async fn my_stories(&self) -> Result<Vec<Story>, ApiError> {
    self.enter("my_stories").await?;
    self.read(|s| s.stories.clone())
  }

  async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
    self.enter("update_profile").await?;
    self
      .read(|s| {
        s.user.as_mut().map(|user| {
          user.name = update.name.clone();
          user.surname = Some(update.surname.clone());
          user.phone = Some(update.phone.clone());
          user.clone()
        })
      })?
      .ok_or(ApiError::Unauthorized)
  }

  async fn delete_my_story(&self, story_id: &str) -> Result<(), ApiError> {
    self.enter("delete_my_story").await?;
    self.read(|s| s.stories.retain(|st| st.id != story_id))
  }

  async fn public_profile(&self, _user_id: &str) -> Result<PublicProfile, ApiError> {
    self.enter("public_profile").await?;
    self.read(|s| PublicProfile {
      name: "Ada".to_string(),
      surname: None,
      picture: None,
      member_since: None,
      story_count: s.stories.len() as u64,
      stories: s.stories.clone(),
    })
  }

  async fn add_favorite(&self, story_id: &str) -> Result<(), ApiError> {
    self.enter("add_favorite").await?;
    self.read(|s| s.favorites.push(story_id.to_string()))
  }

  async fn remove_favorite(&self, story_id: &str) -> Result<(), ApiError> {
    self.enter("remove_favorite").await?;
    self.read(|s| s.favorites.retain(|id| id != story_id))
  }

  async fn is_favorite(&self, story_id: &str) -> Result<bool, ApiError> {
    self.enter("is_favorite").await?;
    self.read(|s| s.favorites.iter().any(|id| id == story_id))
  }

  async fn request_credits(&self, _request: &CreditRequestInput) -> Result<(), ApiError> {
    self.enter("request_credits").await
  }

  async fn admin_login(&self, _credentials: &AdminCredentials) -> Result<AuthResponse, ApiError> {
    self.enter("admin_login").await?;
    self.auth_response()
  }

  async fn admin_stats(&self) -> Result<AdminStats, ApiError> {
    self.enter("admin_stats").await?;
    self.read(|s| AdminStats {
      total_users: s.user.iter().count() as u64,
      total_stories: s.stories.len() as u64,
      pending_requests: 0,
      recent_users: s.user.iter().cloned().collect(),
    })
  }

  async fn admin_users(&self) -> Result<Vec<UserProfile>, ApiError> {
    self.enter("admin_users").await?;
    self.read(|s| s.user.iter().cloned().collect())
  }

  async fn admin_update_credits(&self, _user_id: &str, credits: i64) -> Result<(), ApiError> {
    self.enter("admin_update_credits").await?;
    self.read(|s| {
      if let Some(user) = s.user.as_mut() {
        user.credits = credits;
      }
    })
  }

  async fn admin_delete_user(&self, _user_id: &str) -> Result<(), ApiError> {
    self.enter("admin_delete_user").await
  }

  async fn admin_stories(&self) -> Result<Vec<Story>, ApiError> {
    self.enter("admin_stories").await?;
    self.read(|s| s.stories.clone())
  }

  async fn admin_delete_story(&self, story_id: &str) -> Result<(), ApiError> {
    self.enter("admin_delete_story").await?;
    self.read(|s| s.stories.retain(|st| st.id != story_id))
  }

  async fn admin_credit_requests(&self) -> Result<Vec<CreditRequest>, ApiError> {
    self.enter("admin_credit_requests").await?;
    Ok(Vec::new())
  }

  async fn admin_resolve_credit_request(
    &self,
    _request_id: &str,
    _decision: &CreditDecision,
  ) -> Result<(), ApiError> {
    self.enter("admin_resolve_credit_request").await
  }
}
