use std::fmt;

/// Cache namespaces for collections fetched from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
  /// Topic taxonomy (`GET /topics`)
  Topics,
  /// Popularity-ordered stories shown on the home view
  PopularStories,
  /// Default (unfiltered, default-sorted) story list view
  Stories,
}

impl Namespace {
  pub const ALL: [Namespace; 3] = [
    Namespace::Topics,
    Namespace::PopularStories,
    Namespace::Stories,
  ];

  /// Storage key for this namespace.
  pub fn key(self) -> &'static str {
    match self {
      Namespace::Topics => "masal_topics_cache",
      Namespace::PopularStories => "masal_popular_cache",
      Namespace::Stories => "masal_stories_cache",
    }
  }
}

impl fmt::Display for Namespace {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.key())
  }
}

/// Every key the client persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
  SessionToken,
  WelcomeSeen,
  Cache(Namespace),
}

impl StorageKey {
  pub fn as_str(self) -> &'static str {
    match self {
      StorageKey::SessionToken => "session_token",
      StorageKey::WelcomeSeen => "masal_welcome_seen",
      StorageKey::Cache(ns) => ns.key(),
    }
  }
}
