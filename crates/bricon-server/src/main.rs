//! bricon-server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`) plus
//! `BRICON_*` environment overrides, opens the SQLite store, and serves the
//! site API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `admin_password_hash`:
//!
//! ```
//! cargo run -p bricon-server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  time::{Duration, Instant},
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use bricon_core::store::SiteStore as _;
use bricon_gemini::{GeminiClient, GeminiConfig};
use bricon_server::{AppState, ServerConfig, session};
use bricon_store_sqlite::SqliteStore;
use chrono::Utc;
use clap::Parser;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// How often expired chat sessions are deleted from the store.
const SESSION_PRUNE_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Parser)]
#[command(author, version, about = "Bricon site server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("BRICON")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read configuration")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let generator = build_generator(&server_cfg)?;
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState::new(store, generator, server_cfg);

  // Warm both caches before accepting connections.
  let knowledge = state.knowledge.load();
  tracing::info!(
    path = %state.knowledge.path().display(),
    products = knowledge.products.len(),
    "knowledge document ready"
  );
  let store = std::sync::Arc::clone(&state.store);
  match state
    .categories
    .get_or_refresh(Instant::now(), || async move { store.list_active_categories().await })
    .await
  {
    Ok(categories) => tracing::info!(count = categories.len(), "active categories cached"),
    Err(e) => tracing::warn!(error = %e, "could not preload categories"),
  }

  let pruner = state.clone();
  tokio::spawn(async move {
    let mut tick = tokio::time::interval(SESSION_PRUNE_INTERVAL);
    loop {
      tick.tick().await;
      match session::prune_expired(&*pruner.store, &pruner.config, Utc::now()).await {
        Ok(0) => {}
        Ok(removed) => tracing::info!(removed, "pruned expired chat sessions"),
        Err(e) => tracing::warn!(error = %e, "could not prune chat sessions"),
      }
    }
  });

  let app = bricon_server::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// The Gemini client, or `None` when no API key is configured.
fn build_generator(cfg: &ServerConfig) -> anyhow::Result<Option<GeminiClient>> {
  let Some(api_key) = cfg.chat.api_key() else {
    tracing::warn!("no chat API key configured; chatbot will answer as unavailable");
    return Ok(None);
  };

  let mut gemini = GeminiConfig::new(api_key);
  gemini.model = cfg.chat.model.clone();
  gemini.timeout = cfg.chat.timeout();

  let client = GeminiClient::new(gemini).context("failed to build Gemini client")?;
  tracing::info!(model = client.model(), "chat generator initialised");
  Ok(Some(client))
}

/// Read a password line from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
