use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::types::*;
use super::{decode_list, decode_one, decode_wrapped_list, ApiError, MasalApi};
use crate::storage::Store;

/// Origin assumed for a relative backend URL such as the `/api` fallback.
const RELATIVE_ORIGIN: &str = "http://localhost";

/// REST client for the Masal Sepeti backend.
///
/// The session token is read from the [`Store`] on every request, so a login
/// or logout elsewhere takes effect immediately.
#[derive(Clone)]
pub struct HttpClient {
  http: reqwest::Client,
  base: Url,
  store: Store,
}

impl HttpClient {
  pub fn new(base_url: &str, store: Store) -> Result<Self, ApiError> {
    let base = match Url::parse(base_url) {
      Ok(url) => url,
      Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(RELATIVE_ORIGIN)
        .and_then(|origin| origin.join(base_url))
        .map_err(|e| ApiError::Transport(format!("invalid backend URL {}: {}", base_url, e)))?,
      Err(e) => {
        return Err(ApiError::Transport(format!(
          "invalid backend URL {}: {}",
          base_url, e
        )))
      }
    };

    let http = reqwest::Client::builder()
      .connect_timeout(Duration::from_secs(15))
      .user_agent(concat!("masal/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| ApiError::Transport(format!("failed to build HTTP client: {}", e)))?;

    Ok(Self { http, base, store })
  }

  #[cfg(test)]
  pub fn base_url(&self) -> &Url {
    &self.base
  }

  fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = self.base.clone();
    url
      .path_segments_mut()
      .map_err(|_| ApiError::Transport(format!("backend URL {} cannot hold a path", self.base)))?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  /// Build a request, attaching the bearer token when one is stored.
  fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
    let builder = self.http.request(method, self.url(segments)?);
    Ok(match self.store.token() {
      Some(token) => builder.bearer_auth(token),
      None => builder,
    })
  }

  async fn send(&self, endpoint: &str, builder: RequestBuilder) -> Result<Value, ApiError> {
    debug!(endpoint, "request");
    let response = builder.send().await.map_err(ApiError::from_reqwest)?;
    let status = response.status();
    let body = response.bytes().await.map_err(ApiError::from_reqwest)?;

    if !status.is_success() {
      let detail = error_detail(&body);
      warn!(endpoint, status = status.as_u16(), detail = ?detail, "request failed");
      return Err(ApiError::from_status(status, detail));
    }

    if body.is_empty() {
      return Ok(Value::Null);
    }
    serde_json::from_slice(&body).map_err(|e| ApiError::malformed(endpoint, e.to_string()))
  }

  async fn get(&self, endpoint: &str, segments: &[&str]) -> Result<Value, ApiError> {
    let builder = self.request(Method::GET, segments)?;
    self.send(endpoint, builder).await
  }

  async fn delete(&self, endpoint: &str, segments: &[&str]) -> Result<(), ApiError> {
    let builder = self.request(Method::DELETE, segments)?;
    self.send(endpoint, builder).await.map(|_| ())
  }

  async fn send_json<B: Serialize + ?Sized>(
    &self,
    method: Method,
    endpoint: &str,
    segments: &[&str],
    body: &B,
  ) -> Result<Value, ApiError> {
    let builder = self.request(method, segments)?.json(body);
    self.send(endpoint, builder).await
  }
}

/// Extract FastAPI's `{"detail": ...}` message from an error body.
fn error_detail(body: &[u8]) -> Option<String> {
  let value: Value = serde_json::from_slice(body).ok()?;
  match value.get("detail")? {
    Value::String(s) => Some(s.clone()),
    Value::Null => None,
    other => Some(other.to_string()),
  }
}

#[async_trait]
impl MasalApi for HttpClient {
  async fn list_topics(&self) -> Result<Vec<Topic>, ApiError> {
    let value = self.get("/topics", &["topics"]).await?;
    decode_list("/topics", value)
  }

  async fn get_topic(&self, topic_id: &str) -> Result<TopicDetail, ApiError> {
    let value = self.get("/topics/{id}", &["topics", topic_id]).await?;
    decode_one("/topics/{id}", value)
  }

  async fn list_subtopics(&self, topic_id: &str) -> Result<Vec<Subtopic>, ApiError> {
    let endpoint = "/topics/{id}/subtopics";
    let value = self.get(endpoint, &["topics", topic_id, "subtopics"]).await?;
    decode_list(endpoint, value)
  }

  async fn list_stories(&self, query: &StoryQuery) -> Result<Vec<Story>, ApiError> {
    let builder = self
      .request(Method::GET, &["stories"])?
      .query(&query.params());
    let value = self.send("/stories", builder).await?;
    decode_list("/stories", value)
  }

  async fn popular_stories(&self, limit: u32) -> Result<Vec<Story>, ApiError> {
    let builder = self
      .request(Method::GET, &["stories", "popular"])?
      .query(&[("limit", limit)]);
    let value = self.send("/stories/popular", builder).await?;
    decode_list("/stories/popular", value)
  }

  async fn get_story(&self, story_id: &str) -> Result<Story, ApiError> {
    let value = self.get("/stories/{id}", &["stories", story_id]).await?;
    decode_one("/stories/{id}", value)
  }

  async fn record_play(&self, story_id: &str) -> Result<(), ApiError> {
    let builder = self.request(Method::POST, &["stories", story_id, "play"])?;
    self.send("/stories/{id}/play", builder).await.map(|_| ())
  }

  async fn generate_story(&self, request: &StoryRequest) -> Result<Story, ApiError> {
    let endpoint = "/stories/generate";
    let value = self
      .send_json(Method::POST, endpoint, &["stories", "generate"], request)
      .await?;
    decode_one(endpoint, value)
  }

  async fn me(&self) -> Result<UserProfile, ApiError> {
    let value = self.get("/auth/me", &["auth", "me"]).await?;
    decode_one("/auth/me", value)
  }

  async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
    let endpoint = "/auth/login";
    let value = self
      .send_json(Method::POST, endpoint, &["auth", "login"], credentials)
      .await?;
    decode_one(endpoint, value)
  }

  async fn register(&self, registration: &Registration) -> Result<(), ApiError> {
    self
      .send_json(Method::POST, "/auth/register", &["auth", "register"], registration)
      .await
      .map(|_| ())
  }

  async fn logout(&self) -> Result<(), ApiError> {
    let builder = self.request(Method::POST, &["auth", "logout"])?;
    self.send("/auth/logout", builder).await.map(|_| ())
  }

  async fn google_session(&self, session_id: &str) -> Result<AuthResponse, ApiError> {
    let endpoint = "/auth/google/session";
    let value = self
      .send_json(
        Method::POST,
        endpoint,
        &["auth", "google", "session"],
        &json!({ "session_id": session_id }),
      )
      .await?;
    decode_one(endpoint, value)
  }

  async fn my_stories(&self) -> Result<Vec<Story>, ApiError> {
    let value = self.get("/users/stories", &["users", "stories"]).await?;
    decode_list("/users/stories", value)
  }

  async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
    let endpoint = "/users/profile";
    let value = self
      .send_json(Method::PUT, endpoint, &["users", "profile"], update)
      .await?;
    decode_one::<ProfileResponse>(endpoint, value).map(|r| r.user)
  }

  async fn delete_my_story(&self, story_id: &str) -> Result<(), ApiError> {
    self
      .delete("/users/stories/{id}", &["users", "stories", story_id])
      .await
  }

  async fn public_profile(&self, user_id: &str) -> Result<PublicProfile, ApiError> {
    let endpoint = "/users/public/{id}";
    let value = self.get(endpoint, &["users", "public", user_id]).await?;
    decode_one(endpoint, value)
  }

  async fn add_favorite(&self, story_id: &str) -> Result<(), ApiError> {
    let builder = self.request(Method::POST, &["favorites", story_id])?;
    self.send("/favorites/{id}", builder).await.map(|_| ())
  }

  async fn remove_favorite(&self, story_id: &str) -> Result<(), ApiError> {
    self.delete("/favorites/{id}", &["favorites", story_id]).await
  }

  async fn is_favorite(&self, story_id: &str) -> Result<bool, ApiError> {
    let endpoint = "/favorites/check/{id}";
    let value = self.get(endpoint, &["favorites", "check", story_id]).await?;
    decode_one::<FavoriteStatus>(endpoint, value).map(|s| s.is_favorite)
  }

  async fn request_credits(&self, request: &CreditRequestInput) -> Result<(), ApiError> {
    self
      .send_json(Method::POST, "/credits/request", &["credits", "request"], request)
      .await
      .map(|_| ())
  }

  async fn admin_login(&self, credentials: &AdminCredentials) -> Result<AuthResponse, ApiError> {
    let endpoint = "/admin/login";
    let value = self
      .send_json(Method::POST, endpoint, &["admin", "login"], credentials)
      .await?;
    decode_one(endpoint, value)
  }

  async fn admin_stats(&self) -> Result<AdminStats, ApiError> {
    let value = self.get("/admin/stats", &["admin", "stats"]).await?;
    decode_one("/admin/stats", value)
  }

  async fn admin_users(&self) -> Result<Vec<UserProfile>, ApiError> {
    let value = self.get("/admin/users", &["admin", "users"]).await?;
    decode_wrapped_list("/admin/users", value, "users")
  }

  async fn admin_update_credits(&self, user_id: &str, credits: i64) -> Result<(), ApiError> {
    self
      .send_json(
        Method::PUT,
        "/admin/users/{id}",
        &["admin", "users", user_id],
        &json!({ "credits": credits }),
      )
      .await
      .map(|_| ())
  }

  async fn admin_delete_user(&self, user_id: &str) -> Result<(), ApiError> {
    self
      .delete("/admin/users/{id}", &["admin", "users", user_id])
      .await
  }

  async fn admin_stories(&self) -> Result<Vec<Story>, ApiError> {
    let value = self.get("/admin/stories", &["admin", "stories"]).await?;
    decode_wrapped_list("/admin/stories", value, "stories")
  }

  async fn admin_delete_story(&self, story_id: &str) -> Result<(), ApiError> {
    self
      .delete("/admin/stories/{id}", &["admin", "stories", story_id])
      .await
  }

  async fn admin_credit_requests(&self) -> Result<Vec<CreditRequest>, ApiError> {
    let endpoint = "/admin/credit-requests";
    let value = self.get(endpoint, &["admin", "credit-requests"]).await?;
    decode_list(endpoint, value)
  }

  async fn admin_resolve_credit_request(
    &self,
    request_id: &str,
    decision: &CreditDecision,
  ) -> Result<(), ApiError> {
    self
      .send_json(
        Method::PUT,
        "/admin/credit-requests/{id}",
        &["admin", "credit-requests", request_id],
        decision,
      )
      .await
      .map(|_| ())
  }
}
