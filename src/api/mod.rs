//! Masal Sepeti REST API: records, errors, and the backend seam.

mod client;
mod error;
#[cfg(test)]
pub mod fake;
pub mod types;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

pub use client::HttpClient;
pub use error::{ApiError, Notice, NoticeLevel, NoticeLink};
use types::*;

pub type SharedApi = Arc<dyn MasalApi>;

/// Every backend operation the client uses.
///
/// List-returning methods fail with [`ApiError::MalformedResponse`] when the
/// payload is not an array; callers never see a silently substituted list.
#[async_trait]
pub trait MasalApi: Send + Sync {
  // Topics
  async fn list_topics(&self) -> Result<Vec<Topic>, ApiError>;
  async fn get_topic(&self, topic_id: &str) -> Result<TopicDetail, ApiError>;
  async fn list_subtopics(&self, topic_id: &str) -> Result<Vec<Subtopic>, ApiError>;

  // Stories
  async fn list_stories(&self, query: &StoryQuery) -> Result<Vec<Story>, ApiError>;
  async fn popular_stories(&self, limit: u32) -> Result<Vec<Story>, ApiError>;
  async fn get_story(&self, story_id: &str) -> Result<Story, ApiError>;
  async fn record_play(&self, story_id: &str) -> Result<(), ApiError>;
  async fn generate_story(&self, request: &StoryRequest) -> Result<Story, ApiError>;

  // Auth
  async fn me(&self) -> Result<UserProfile, ApiError>;
  async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError>;
  async fn register(&self, registration: &Registration) -> Result<(), ApiError>;
  async fn logout(&self) -> Result<(), ApiError>;
  async fn google_session(&self, session_id: &str) -> Result<AuthResponse, ApiError>;

  // Users
  async fn my_stories(&self) -> Result<Vec<Story>, ApiError>;
  async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError>;
  async fn delete_my_story(&self, story_id: &str) -> Result<(), ApiError>;
  async fn public_profile(&self, user_id: &str) -> Result<PublicProfile, ApiError>;

  // Favorites and credits
  async fn add_favorite(&self, story_id: &str) -> Result<(), ApiError>;
  async fn remove_favorite(&self, story_id: &str) -> Result<(), ApiError>;
  async fn is_favorite(&self, story_id: &str) -> Result<bool, ApiError>;
  async fn request_credits(&self, request: &CreditRequestInput) -> Result<(), ApiError>;

  // Admin
  async fn admin_login(&self, credentials: &AdminCredentials) -> Result<AuthResponse, ApiError>;
  async fn admin_stats(&self) -> Result<AdminStats, ApiError>;
  async fn admin_users(&self) -> Result<Vec<UserProfile>, ApiError>;
  async fn admin_update_credits(&self, user_id: &str, credits: i64) -> Result<(), ApiError>;
  async fn admin_delete_user(&self, user_id: &str) -> Result<(), ApiError>;
  async fn admin_stories(&self) -> Result<Vec<Story>, ApiError>;
  async fn admin_delete_story(&self, story_id: &str) -> Result<(), ApiError>;
  async fn admin_credit_requests(&self) -> Result<Vec<CreditRequest>, ApiError>;
  async fn admin_resolve_credit_request(
    &self,
    request_id: &str,
    decision: &CreditDecision,
  ) -> Result<(), ApiError>;
}

fn kind_of(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

/// Decode a payload that must be a JSON array.
pub fn decode_list<T: DeserializeOwned>(endpoint: &str, value: Value) -> Result<Vec<T>, ApiError> {
  match value {
    Value::Array(items) => items
      .into_iter()
      .map(serde_json::from_value)
      .collect::<Result<Vec<T>, _>>()
      .map_err(|e| ApiError::malformed(endpoint, e.to_string())),
    other => Err(ApiError::malformed(
      endpoint,
      format!("expected array, got {}", kind_of(&other)),
    )),
  }
}

/// Decode an object whose `field` must be a JSON array (e.g. `{"users": [...]}`).
pub fn decode_wrapped_list<T: DeserializeOwned>(
  endpoint: &str,
  value: Value,
  field: &str,
) -> Result<Vec<T>, ApiError> {
  match value {
    Value::Object(mut map) => match map.remove(field) {
      Some(inner) => decode_list(endpoint, inner),
      None => Err(ApiError::malformed(endpoint, format!("missing field {}", field))),
    },
    other => Err(ApiError::malformed(
      endpoint,
      format!("expected object, got {}", kind_of(&other)),
    )),
  }
}

/// Decode a single record.
pub fn decode_one<T: DeserializeOwned>(endpoint: &str, value: Value) -> Result<T, ApiError> {
  serde_json::from_value(value).map_err(|e| ApiError::malformed(endpoint, e.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_decode_list_accepts_arrays() {
    let topics: Vec<Topic> = decode_list(
      "/topics",
      json!([{"id": "doga", "name": "Doğa"}, {"id": "organlar", "name": "Organlar"}]),
    )
    .unwrap();
    assert_eq!(topics.len(), 2);
    assert_eq!(topics[0].name, "Doğa");
  }

  #[test]
  fn test_decode_list_rejects_non_arrays() {
    let err = decode_list::<Topic>("/topics", json!("not-an-array")).unwrap_err();
    assert!(matches!(
      err,
      ApiError::MalformedResponse { ref endpoint, ref reason }
        if endpoint == "/topics" && reason.contains("string")
    ));

    let err = decode_list::<Topic>("/topics", json!({"topics": []})).unwrap_err();
    assert!(err.is_silent());
  }

  #[test]
  fn test_decode_list_rejects_bad_items() {
    let err = decode_list::<Topic>("/topics", json!([{"id": 1}])).unwrap_err();
    assert!(matches!(err, ApiError::MalformedResponse { .. }));
  }

  #[test]
  fn test_decode_wrapped_list() {
    let users: Vec<UserProfile> = decode_wrapped_list(
      "/admin/users",
      json!({"users": [{"user_id": "u1", "name": "Ada"}]}),
      "users",
    )
    .unwrap();
    assert_eq!(users[0].user_id, "u1");

    let err = decode_wrapped_list::<UserProfile>("/admin/users", json!([]), "users").unwrap_err();
    assert!(matches!(err, ApiError::MalformedResponse { .. }));
  }
}
