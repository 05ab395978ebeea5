mod api;
mod app;
mod auth;
mod cache;
mod commands;
mod config;
mod create;
mod download;
mod event;
mod gate;
mod logging;
mod player;
mod query;
mod reconcile;
mod services;
mod storage;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::api::HttpClient;
use crate::cache::FreshnessCache;
use crate::services::Services;
use crate::storage::{SqliteBackend, Store};

#[derive(Parser, Debug)]
#[command(name = "masal")]
#[command(about = "A terminal client for Masal Sepeti, the children's story platform")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/masal/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Backend origin, overrides MASAL_BACKEND_URL and the config file
  #[arg(short, long)]
  backend_url: Option<String>,

  /// Skip cached collections and always fetch fresh
  #[arg(long)]
  no_cache: bool,

  /// Open this story on startup
  #[arg(short, long)]
  story: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init()?;

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  let api_url = config.api_url(args.backend_url.as_deref());
  info!(api_url = %api_url, "starting");

  let backend = SqliteBackend::open()?.with_quota(config.cache.max_entry_bytes);
  let store = Store::new(backend);
  let cache = FreshnessCache::new(store.clone(), config.cache.policy())
    .enabled(config.cache.enabled && !args.no_cache);
  let api = Arc::new(HttpClient::new(&api_url, store.clone())?);

  let services = Services::new(api, store, cache, config);

  // Initialize and run the app
  let mut app = app::App::new(services, api_url, args.story);
  app.run().await?;

  Ok(())
}
