//! Session lifecycle: the stored token and the user derived from it.

use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};
use url::Url;

use crate::api::types::{
  AdminCredentials, AuthResponse, Credentials, ProfilePatch, ProfileUpdate, Registration,
  UserProfile,
};
use crate::api::{ApiError, SharedApi};
use crate::storage::Store;

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
  /// Before boot
  Uninitialized,
  /// A stored token is being validated
  Checking,
  Authenticated(UserProfile),
  Anonymous,
}

/// Owns the session. The token lives in the durable [`Store`]; the user is
/// only kept in memory and re-derived from the token at boot.
#[derive(Clone)]
pub struct AuthStore {
  api: SharedApi,
  store: Store,
  state: Arc<Mutex<AuthState>>,
}

impl AuthStore {
  pub fn new(api: SharedApi, store: Store) -> Self {
    Self {
      api,
      store,
      state: Arc::new(Mutex::new(AuthState::Uninitialized)),
    }
  }

  fn lock(&self) -> MutexGuard<'_, AuthState> {
    self.state.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn set_state(&self, state: AuthState) {
    *self.lock() = state;
  }

  pub fn state(&self) -> AuthState {
    self.lock().clone()
  }

  pub fn user(&self) -> Option<UserProfile> {
    match &*self.lock() {
      AuthState::Authenticated(user) => Some(user.clone()),
      _ => None,
    }
  }

  pub fn is_authenticated(&self) -> bool {
    matches!(&*self.lock(), AuthState::Authenticated(_))
  }

  pub fn is_admin(&self) -> bool {
    matches!(&*self.lock(), AuthState::Authenticated(user) if user.is_admin())
  }

  /// Validate the stored token, if any.
  pub async fn boot(&self) -> AuthState {
    if self.store.token().is_none() {
      self.set_state(AuthState::Anonymous);
      return AuthState::Anonymous;
    }

    self.set_state(AuthState::Checking);
    self.revalidate().await;
    self.state()
  }

  /// Re-fetch the current user, e.g. after credits changed.
  ///
  /// A failed whoami purges the token and demotes the session.
  pub async fn refresh(&self) -> Option<UserProfile> {
    self.revalidate().await;
    self.user()
  }

  async fn revalidate(&self) {
    match self.api.me().await {
      Ok(user) => {
        info!(user = %user.user_id, "session valid");
        self.set_state(AuthState::Authenticated(user));
      }
      Err(e) => {
        info!(error = %e, "session rejected, purging token");
        self.store.clear_token();
        self.set_state(AuthState::Anonymous);
      }
    }
  }

  fn accept(&self, response: AuthResponse) -> UserProfile {
    if let Some(token) = response.session_token.as_deref().filter(|t| !t.is_empty()) {
      if let Err(e) = self.store.set_token(token) {
        warn!(error = %e, "failed to persist session token");
      }
    }
    info!(user = %response.user.user_id, "logged in");
    self.set_state(AuthState::Authenticated(response.user.clone()));
    response.user
  }

  pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile, ApiError> {
    let response = self.api.login(credentials).await?;
    Ok(self.accept(response))
  }

  /// Create an account, then log in with the same credentials.
  pub async fn register(&self, registration: &Registration) -> Result<UserProfile, ApiError> {
    self.api.register(registration).await?;
    self
      .login(&Credentials {
        email: registration.email.clone(),
        password: registration.password.clone(),
      })
      .await
  }

  /// Trade an OAuth callback `session_id` for a session.
  pub async fn exchange_oauth(&self, session_id: &str) -> Result<UserProfile, ApiError> {
    let response = self.api.google_session(session_id).await?;
    Ok(self.accept(response))
  }

  pub async fn admin_login(&self, credentials: &AdminCredentials) -> Result<UserProfile, ApiError> {
    let response = self.api.admin_login(credentials).await?;
    Ok(self.accept(response))
  }

  /// Tell the server (best-effort), then drop the session regardless.
  pub async fn logout(&self) {
    if self.store.token().is_some() {
      if let Err(e) = self.api.logout().await {
        warn!(error = %e, "logout request failed");
      }
    }
    self.store.clear_token();
    self.set_state(AuthState::Anonymous);
    info!("logged out");
  }

  pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile, ApiError> {
    let user = self.api.update_profile(update).await?;
    self.set_state(AuthState::Authenticated(user.clone()));
    Ok(user)
  }

  /// Merge a partial update into the in-memory user.
  pub fn apply_local_update(&self, patch: ProfilePatch) {
    if let AuthState::Authenticated(user) = &mut *self.lock() {
      user.apply(patch);
    }
  }
}

/// Extract the `session_id` from a pasted OAuth callback.
///
/// Accepts the full callback URL, its `#session_id=...` fragment, or the bare id.
pub fn session_id_from_callback(input: &str) -> Option<String> {
  let input = input.trim();
  if input.is_empty() {
    return None;
  }

  let fragment = if input.contains("://") {
    Url::parse(input).ok()?.fragment()?.to_string()
  } else if let Some(fragment) = input.strip_prefix('#') {
    fragment.to_string()
  } else if input.contains('=') {
    input.to_string()
  } else if input.chars().any(char::is_whitespace) {
    return None;
  } else {
    return Some(input.to_string());
  };

  fragment
    .split('&')
    .filter_map(|pair| pair.split_once('='))
    .find(|(key, _)| *key == "session_id")
    .map(|(_, value)| value.to_string())
    .filter(|value| !value.is_empty())
}
