//! Records mirrored from the Masal Sepeti REST API.
//!
//! Only the fields the client renders or sends are modelled; unknown fields
//! are ignored on deserialization.

use serde::{Deserialize, Serialize};

// ============================================================================
// Topic taxonomy
// ============================================================================

/// Main topic category (`GET /topics`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub icon: String,
  #[serde(default)]
  pub color: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub image: String,
  #[serde(default)]
  pub subtopic_count: u32,
}

/// Subtopic with its pedagogical learning objective (kazanım)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtopic {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub kazanim: String,
}

/// Topic with its subtopics (`GET /topics/{id}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicDetail {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub icon: String,
  #[serde(default)]
  pub color: String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub image: String,
  #[serde(default)]
  pub subtopics: Vec<Subtopic>,
}

// ============================================================================
// Stories
// ============================================================================

/// A generated story. List endpoints and the detail endpoint share this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub content: String,
  pub topic_id: Option<String>,
  pub topic_name: Option<String>,
  /// Legacy topic field on stories created before the taxonomy existed
  pub topic: Option<String>,
  pub subtopic_id: Option<String>,
  pub subtopic_name: Option<String>,
  pub kazanim: Option<String>,
  pub theme: Option<String>,
  pub age_group: Option<String>,
  pub character: Option<String>,
  /// Base64 MP3 narration
  pub audio_base64: Option<String>,
  /// Narration length in seconds
  pub duration: Option<u32>,
  #[serde(default)]
  pub play_count: u64,
  pub created_at: Option<String>,
  pub user_id: Option<String>,
}

impl Story {
  /// Topic name for display, falling back to the legacy field.
  pub fn topic_label(&self) -> &str {
    self
      .topic_name
      .as_deref()
      .or(self.topic.as_deref())
      .unwrap_or("-")
  }

  pub fn has_audio(&self) -> bool {
    self
      .audio_base64
      .as_deref()
      .map(|a| !a.is_empty())
      .unwrap_or(false)
  }

  /// Narration length in seconds, zero without audio.
  ///
  /// Older stories carry no `duration`; their length is estimated from the
  /// text at the narrator's reading pace.
  pub fn narration_secs(&self) -> u32 {
    if !self.has_audio() {
      return 0;
    }
    match self.duration {
      Some(secs) if secs > 0 => secs,
      _ => {
        let words = self.content.split_whitespace().count() as u64;
        let secs = words * 60 / NARRATION_WORDS_PER_MINUTE;
        u32::try_from(secs).unwrap_or(u32::MAX).max(1)
      }
    }
  }
}

const NARRATION_WORDS_PER_MINUTE: u64 = 150;

/// Sort order for story listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorySort {
  /// Most played first (server default)
  #[default]
  Popular,
  Newest,
}

impl StorySort {
  pub fn as_param(self) -> &'static str {
    match self {
      StorySort::Popular => "popular",
      StorySort::Newest => "newest",
    }
  }
}

/// Filters for `GET /stories`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryQuery {
  pub topic_id: Option<String>,
  pub subtopic_id: Option<String>,
  pub search: Option<String>,
  pub sort: StorySort,
}

impl StoryQuery {
  pub fn search(term: impl Into<String>) -> Self {
    Self {
      search: Some(term.into()),
      ..Self::default()
    }
  }

  pub fn topic(topic_id: impl Into<String>) -> Self {
    Self {
      topic_id: Some(topic_id.into()),
      ..Self::default()
    }
  }

  /// True for the unfiltered, default-sorted listing.
  ///
  /// Only this view may be served from the story-list cache.
  pub fn is_default_view(&self) -> bool {
    self.topic_id.is_none()
      && self.subtopic_id.is_none()
      && self
        .search
        .as_deref()
        .map(|s| s.trim().is_empty())
        .unwrap_or(true)
      && self.sort == StorySort::default()
  }

  /// Query string pairs, omitting unset filters.
  pub fn params(&self) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(topic) = &self.topic_id {
      params.push(("topic_id", topic.clone()));
    }
    if let Some(subtopic) = &self.subtopic_id {
      params.push(("subtopic_id", subtopic.clone()));
    }
    if let Some(search) = self.search.as_deref().map(str::trim) {
      if !search.is_empty() {
        params.push(("search", search.to_string()));
      }
    }
    if self.sort != StorySort::default() {
      params.push(("sort", self.sort.as_param().to_string()));
    }
    params
  }
}

/// Body of `POST /stories/generate`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoryRequest {
  pub topic_id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub subtopic_id: Option<String>,
  pub theme: String,
  pub age_group: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub character: Option<String>,
  pub kazanim_based: bool,
}

// ============================================================================
// Users and sessions
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
  #[default]
  User,
  Admin,
}

impl From<String> for Role {
  fn from(value: String) -> Self {
    if value.eq_ignore_ascii_case("admin") {
      Role::Admin
    } else {
      Role::User
    }
  }
}

impl From<Role> for String {
  fn from(role: Role) -> Self {
    match role {
      Role::User => "user".to_string(),
      Role::Admin => "admin".to_string(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
  #[serde(default, alias = "id")]
  pub user_id: String,
  #[serde(default)]
  pub name: String,
  pub surname: Option<String>,
  #[serde(default)]
  pub email: String,
  pub phone: Option<String>,
  pub picture: Option<String>,
  #[serde(default)]
  pub credits: i64,
  #[serde(default)]
  pub role: Role,
  pub created_at: Option<String>,
}

impl UserProfile {
  pub fn display_name(&self) -> String {
    match self.surname.as_deref() {
      Some(surname) if !surname.is_empty() => format!("{} {}", self.name, surname),
      _ => self.name.clone(),
    }
  }

  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }
}

/// Partial profile update applied locally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePatch {
  pub name: Option<String>,
  pub surname: Option<String>,
  pub phone: Option<String>,
  pub credits: Option<i64>,
}

impl UserProfile {
  pub fn apply(&mut self, patch: ProfilePatch) {
    if let Some(name) = patch.name {
      self.name = name;
    }
    if let Some(surname) = patch.surname {
      self.surname = Some(surname);
    }
    if let Some(phone) = patch.phone {
      self.phone = Some(phone);
    }
    if let Some(credits) = patch.credits {
      self.credits = credits;
    }
  }
}

/// Response of the login-style endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
  pub session_token: Option<String>,
  pub user: UserProfile,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
  pub email: String,
  pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminCredentials {
  pub username: String,
  pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
  pub name: String,
  pub surname: String,
  pub email: String,
  pub password: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone: Option<String>,
}

/// Body of `PUT /users/profile`
#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdate {
  pub name: String,
  pub surname: String,
  pub phone: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProfileResponse {
  pub user: UserProfile,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PublicProfile {
  #[serde(default)]
  pub name: String,
  pub surname: Option<String>,
  pub picture: Option<String>,
  pub member_since: Option<String>,
  #[serde(default)]
  pub story_count: u64,
  #[serde(default)]
  pub stories: Vec<Story>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FavoriteStatus {
  #[serde(alias = "favorited", alias = "is_favorited")]
  pub is_favorite: bool,
}

/// Body of `POST /credits/request`
#[derive(Debug, Clone, Serialize)]
pub struct CreditRequestInput {
  pub requested_credits: u32,
  pub message: String,
}

// ============================================================================
// Admin
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AdminStats {
  #[serde(default)]
  pub total_users: u64,
  #[serde(default)]
  pub total_stories: u64,
  #[serde(default)]
  pub pending_requests: u64,
  #[serde(default)]
  pub recent_users: Vec<UserProfile>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreditRequest {
  pub id: String,
  pub user_id: String,
  #[serde(default)]
  pub user_name: String,
  #[serde(default)]
  pub user_email: String,
  pub user_phone: Option<String>,
  #[serde(default)]
  pub requested_credits: i64,
  #[serde(default)]
  pub message: String,
  #[serde(default)]
  pub status: String,
  pub created_at: Option<String>,
}

impl CreditRequest {
  pub fn is_pending(&self) -> bool {
    self.status.is_empty() || self.status == "pending"
  }
}

/// Body of `PUT /admin/credit-requests/{id}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CreditDecision {
  Approved { credits: i64 },
  Rejected,
}
