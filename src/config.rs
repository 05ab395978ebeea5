use chrono::Duration as ChronoDuration;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CachePolicy;

/// Environment variable holding the backend origin.
pub const BACKEND_ENV: &str = "MASAL_BACKEND_URL";

/// Backend origin baked in at build time, if any.
const BUILD_BACKEND_URL: Option<&str> = option_env!("MASAL_BACKEND_URL");

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Backend origin, without the `/api` suffix
  pub backend_url: Option<String>,
  /// Custom title for header (defaults to "Masal Sepeti")
  pub title: Option<String>,
  /// Number of popular stories on the home view
  pub popular_limit: u32,
  /// Minimum time the sponsor interstitial stays up
  pub interstitial_seconds: u64,
  /// Client-side timeout for story generation
  pub generate_timeout_secs: u64,
  pub cache: CacheConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      backend_url: None,
      title: None,
      popular_limit: 6,
      interstitial_seconds: 5,
      generate_timeout_secs: 120,
      cache: CacheConfig::default(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  pub enabled: bool,
  /// Largest value the store accepts; bigger cache writes are dropped
  pub max_entry_bytes: usize,
  pub topics_max_age_secs: i64,
  pub stories_max_age_secs: i64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      max_entry_bytes: 5 * 1024 * 1024,
      topics_max_age_secs: 3600,
      stories_max_age_secs: 300,
    }
  }
}

impl CacheConfig {
  pub fn policy(&self) -> CachePolicy {
    CachePolicy {
      topics_max_age: ChronoDuration::seconds(self.topics_max_age_secs),
      stories_max_age: ChronoDuration::seconds(self.stories_max_age_secs),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./masal.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/masal/config.yaml
  ///
  /// Without any file the defaults apply.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("masal.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("masal").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    // An empty file parses as null
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Resolve the API base URL.
  ///
  /// `runtime` (the CLI flag, else `MASAL_BACKEND_URL`) wins over the config
  /// file, which wins over the build-time value.
  pub fn api_url(&self, cli_override: Option<&str>) -> String {
    let env = std::env::var(BACKEND_ENV).ok();
    let runtime = cli_override.or(env.as_deref());
    resolve_api_url(runtime, self.backend_url.as_deref(), BUILD_BACKEND_URL)
  }

  pub fn title(&self) -> &str {
    self.title.as_deref().unwrap_or("Masal Sepeti")
  }

  pub fn interstitial(&self) -> Duration {
    Duration::from_secs(self.interstitial_seconds)
  }

  pub fn generate_timeout(&self) -> Duration {
    Duration::from_secs(self.generate_timeout_secs)
  }
}

/// Pick the first configured origin and append `/api`.
///
/// Falls back to a relative `/api` when nothing is configured.
pub fn resolve_api_url(
  runtime: Option<&str>,
  configured: Option<&str>,
  build_time: Option<&str>,
) -> String {
  let origin = [runtime, configured, build_time]
    .into_iter()
    .flatten()
    .map(|url| url.trim().trim_end_matches('/'))
    .find(|url| !url.is_empty());

  match origin {
    Some(origin) => format!("{}/api", origin),
    None => {
      tracing::error!("{} is not configured, falling back to /api", BACKEND_ENV);
      "/api".to_string()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_resolution_order() {
    assert_eq!(
      resolve_api_url(Some("https://a.example"), Some("https://b.example"), Some("https://c.example")),
      "https://a.example/api"
    );
    assert_eq!(
      resolve_api_url(None, Some("https://b.example"), Some("https://c.example")),
      "https://b.example/api"
    );
    assert_eq!(
      resolve_api_url(Some("  "), None, Some("https://c.example")),
      "https://c.example/api"
    );
  }

  #[test]
  fn test_trailing_slashes_trimmed() {
    assert_eq!(
      resolve_api_url(Some("https://a.example//"), None, None),
      "https://a.example/api"
    );
  }

  #[test]
  fn test_fallback_is_relative_api() {
    assert_eq!(resolve_api_url(None, None, None), "/api");
    assert_eq!(resolve_api_url(Some(""), Some("/"), None), "/api");
  }

  #[test]
  fn test_partial_yaml_keeps_defaults() {
    let config: Config = serde_yaml::from_str(
      "backend_url: https://masalsepeti.example\ncache:\n  enabled: false\n",
    )
    .unwrap();
    assert_eq!(config.backend_url.as_deref(), Some("https://masalsepeti.example"));
    assert!(!config.cache.enabled);
    assert_eq!(config.cache.topics_max_age_secs, 3600);
    assert_eq!(config.popular_limit, 6);
    assert_eq!(config.generate_timeout(), Duration::from_secs(120));
  }

  #[test]
  fn test_cache_policy_from_config() {
    let policy = CacheConfig::default().policy();
    assert_eq!(policy, CachePolicy::default());
  }

  #[test]
  fn test_load_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("masal.yaml");
    std::fs::write(&path, "title: Masal Test\ninterstitial_seconds: 2\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.title(), "Masal Test");
    assert_eq!(config.interstitial(), Duration::from_secs(2));

    std::fs::write(&path, "").unwrap();
    assert_eq!(Config::load(Some(&path)).unwrap().title(), "Masal Sepeti");

    assert!(Config::load(Some(&dir.path().join("missing.yaml"))).is_err());
  }
}
