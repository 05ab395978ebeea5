//! Error taxonomy for backend calls and its mapping to user notices.

use reqwest::StatusCode;

/// Errors produced at the network boundary.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
  #[error("request timed out")]
  Timeout,
  #[error("not authenticated")]
  Unauthorized,
  #[error("not allowed")]
  Forbidden,
  /// HTTP 402 from the generation endpoint
  #[error("insufficient credits: {detail}")]
  InsufficientCredits { detail: String },
  #[error("not found: {detail}")]
  NotFound { detail: String },
  #[error("request rejected ({status}): {detail}")]
  Rejected { status: u16, detail: String },
  /// Payload did not match the expected shape
  #[error("malformed response from {endpoint}: {reason}")]
  MalformedResponse { endpoint: String, reason: String },
  #[error("network error: {0}")]
  Transport(String),
}

impl ApiError {
  /// Map a non-success HTTP status (with the server's `detail`, if any).
  pub fn from_status(status: StatusCode, detail: Option<String>) -> Self {
    let detail = detail.unwrap_or_default();
    match status.as_u16() {
      401 => ApiError::Unauthorized,
      402 => ApiError::InsufficientCredits { detail },
      403 => ApiError::Forbidden,
      404 => ApiError::NotFound { detail },
      408 | 504 => ApiError::Timeout,
      code => ApiError::Rejected {
        status: code,
        detail,
      },
    }
  }

  pub fn from_reqwest(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      ApiError::Timeout
    } else if let Some(status) = err.status() {
      ApiError::from_status(status, None)
    } else {
      ApiError::Transport(err.to_string())
    }
  }

  pub fn malformed(endpoint: &str, reason: impl Into<String>) -> Self {
    ApiError::MalformedResponse {
      endpoint: endpoint.to_string(),
      reason: reason.into(),
    }
  }

  /// Session is missing, expired, or lacks privileges.
  pub fn is_auth_failure(&self) -> bool {
    matches!(self, ApiError::Unauthorized | ApiError::Forbidden)
  }

  /// Malformed payloads are logged but never shown to the user.
  pub fn is_silent(&self) -> bool {
    matches!(self, ApiError::MalformedResponse { .. })
  }

  /// User-facing notice for this error.
  ///
  /// `fallback` is the generic message for the failed operation.
  pub fn notice(&self, fallback: &str) -> Notice {
    match self {
      ApiError::Timeout => Notice::error("The request timed out. Please try again."),
      ApiError::InsufficientCredits { .. } => {
        Notice::error("Not enough credits to create a story. Request more from your profile.")
          .with_link(NoticeLink::Profile)
      }
      ApiError::Unauthorized => Notice::error("Please log in to continue.").with_link(NoticeLink::Login),
      ApiError::Rejected { detail, .. } | ApiError::NotFound { detail } if !detail.is_empty() => {
        Notice::error(detail.clone())
      }
      _ => Notice::error(fallback),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
  Info,
  Success,
  Error,
}

/// Where a notice can take the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLink {
  Profile,
  Login,
}

/// Transient, non-blocking message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub level: NoticeLevel,
  pub message: String,
  pub link: Option<NoticeLink>,
}

impl Notice {
  fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
    Self {
      level,
      message: message.into(),
      link: None,
    }
  }

  pub fn info(message: impl Into<String>) -> Self {
    Self::new(NoticeLevel::Info, message)
  }

  pub fn success(message: impl Into<String>) -> Self {
    Self::new(NoticeLevel::Success, message)
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self::new(NoticeLevel::Error, message)
  }

  pub fn with_link(mut self, link: NoticeLink) -> Self {
    self.link = Some(link);
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_mapping() {
    assert_eq!(
      ApiError::from_status(StatusCode::UNAUTHORIZED, None),
      ApiError::Unauthorized
    );
    assert!(matches!(
      ApiError::from_status(StatusCode::PAYMENT_REQUIRED, Some("Yetersiz kredi".into())),
      ApiError::InsufficientCredits { detail } if detail == "Yetersiz kredi"
    ));
    assert!(matches!(
      ApiError::from_status(StatusCode::BAD_REQUEST, Some("Geçersiz konu".into())),
      ApiError::Rejected { status: 400, .. }
    ));
  }

  #[test]
  fn test_insufficient_credits_notice_links_profile() {
    let notice = ApiError::InsufficientCredits {
      detail: String::new(),
    }
    .notice("Story could not be created");
    assert_eq!(notice.link, Some(NoticeLink::Profile));
    assert_ne!(notice.message, "Story could not be created");
  }

  #[test]
  fn test_timeout_notice_is_specific() {
    let notice = ApiError::Timeout.notice("Story could not be created");
    assert!(notice.message.contains("timed out"));
    assert_eq!(notice.link, None);
  }

  #[test]
  fn test_detail_overrides_fallback() {
    let notice = ApiError::Rejected {
      status: 400,
      detail: "Geçersiz konu".into(),
    }
    .notice("failed");
    assert_eq!(notice.message, "Geçersiz konu");

    let notice = ApiError::Transport("connection refused".into()).notice("failed");
    assert_eq!(notice.message, "failed");
  }
}
