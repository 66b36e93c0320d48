//! HTTP front end for the Bricon site.
//!
//! Exposes an axum [`Router`] serving the chatbot endpoints, the site globals
//! and the admin API, backed by any [`SiteStore`] and [`TextGenerator`].

pub mod auth;
pub mod chat;
pub mod error;
pub mod globals;
pub mod headers;
pub mod session;

pub use error::Error;

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router, middleware,
  routing::{get, post},
};
use bricon_api::AdminState;
use bricon_core::{
  category::CategoryCache,
  generate::TextGenerator,
  knowledge::KnowledgeCache,
  prompt::PromptMode,
  session::RateLimit,
  store::SiteStore,
};
use chrono::TimeDelta;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::AuthConfig;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `BRICON_*` environment variables.
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                    String,
  pub port:                    u16,
  pub store_path:              PathBuf,
  pub site_name:               String,
  /// Lifetime of the active-category cache. `0` disables caching.
  pub category_cache_ttl_secs: u64,
  pub session_cookie_secure:   bool,
  pub session_lifetime_secs:   u64,
  pub admin_username:          String,
  /// Argon2 PHC string. Empty means the admin API rejects every request.
  pub admin_password_hash:     String,
  pub chat:                    ChatConfig,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                    "127.0.0.1".into(),
      port:                    8080,
      store_path:              "bricon.db".into(),
      site_name:               "Briconvn".into(),
      category_cache_ttl_secs: 300,
      session_cookie_secure:   false,
      session_lifetime_secs:   86_400,
      admin_username:          "admin".into(),
      admin_password_hash:     String::new(),
      chat:                    ChatConfig::default(),
    }
  }
}

impl ServerConfig {
  pub fn category_cache_ttl(&self) -> Duration {
    Duration::from_secs(self.category_cache_ttl_secs)
  }

  /// How long a chat session survives without being written.
  pub fn session_lifetime(&self) -> TimeDelta { secs(self.session_lifetime_secs) }
}

/// Saturates instead of panicking on out-of-range values.
fn secs(n: u64) -> TimeDelta {
  i64::try_from(n).ok().and_then(TimeDelta::try_seconds).unwrap_or(TimeDelta::MAX)
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ChatConfig {
  /// When false every `/chat/send` answers 503.
  pub enabled:           bool,
  pub api_key:           Option<String>,
  pub model:             String,
  pub request_limit:     u32,
  pub window_secs:       u64,
  /// Number of history messages included in the prompt.
  pub history_turns:     usize,
  pub default_mode:      PromptMode,
  pub temperature:       f32,
  /// Overrides the per-mode default when set.
  pub max_output_tokens: Option<u32>,
  pub timeout_secs:      u64,
  pub knowledge_path:    PathBuf,
  pub support:           SupportContact,
}

impl Default for ChatConfig {
  fn default() -> Self {
    Self {
      enabled:           true,
      api_key:           None,
      model:             bricon_gemini::DEFAULT_MODEL.into(),
      request_limit:     15,
      window_secs:       3_600,
      history_turns:     5,
      default_mode:      PromptMode::Lite,
      temperature:       0.6,
      max_output_tokens: None,
      timeout_secs:      30,
      knowledge_path:    "data/company_info.json".into(),
      support:           SupportContact::default(),
    }
  }
}

impl ChatConfig {
  pub fn rate_limit(&self) -> RateLimit {
    RateLimit {
      limit:  self.request_limit,
      window: secs(self.window_secs),
    }
  }

  pub fn max_output_tokens_for(&self, mode: PromptMode) -> u32 {
    self.max_output_tokens.unwrap_or_else(|| mode.default_max_output_tokens())
  }

  pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }

  /// The API key, if one is configured and non-blank.
  pub fn api_key(&self) -> Option<&str> {
    self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
  }
}

/// Contact details quoted in chatbot apologies and quota messages.
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct SupportContact {
  pub hotline: String,
  pub zalo:    String,
  pub email:   String,
}

impl Default for SupportContact {
  fn default() -> Self {
    Self {
      hotline: "1900 63 62 94".into(),
      zalo:    "0901.180.094".into(),
      email:   "info@bricon.vn".into(),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, G> {
  pub store:      Arc<S>,
  /// Absent when no API key is configured.
  pub generator:  Option<Arc<G>>,
  pub categories: Arc<CategoryCache>,
  pub knowledge:  Arc<KnowledgeCache>,
  pub config:     Arc<ServerConfig>,
  pub auth:       Arc<AuthConfig>,
}

impl<S, G> Clone for AppState<S, G> {
  fn clone(&self) -> Self {
    Self {
      store:      Arc::clone(&self.store),
      generator:  self.generator.clone(),
      categories: Arc::clone(&self.categories),
      knowledge:  Arc::clone(&self.knowledge),
      config:     Arc::clone(&self.config),
      auth:       Arc::clone(&self.auth),
    }
  }
}

impl<S, G> AppState<S, G> {
  /// Build state from configuration, with fresh category and knowledge
  /// caches.
  pub fn new(store: S, generator: Option<G>, config: ServerConfig) -> Self {
    Self {
      store:      Arc::new(store),
      generator:  generator.map(Arc::new),
      categories: Arc::new(CategoryCache::new(config.category_cache_ttl())),
      knowledge:  Arc::new(KnowledgeCache::new(config.chat.knowledge_path.clone())),
      auth:       Arc::new(AuthConfig {
        username:      config.admin_username.clone(),
        password_hash: config.admin_password_hash.clone(),
      }),
      config:     Arc::new(config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full site router.
pub fn router<S, G>(state: AppState<S, G>) -> Router
where
  S: SiteStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
  G: TextGenerator + 'static,
  G::Error: std::error::Error + Send + Sync + 'static,
{
  let admin = bricon_api::admin_router(AdminState {
    store:      Arc::clone(&state.store),
    categories: Arc::clone(&state.categories),
  })
  .layer(middleware::from_fn_with_state(
    Arc::clone(&state.auth),
    auth::require_admin,
  ));
  let https = headers::Https(state.config.session_cookie_secure);

  Router::new()
    .route("/chat/send",   post(chat::send::<S, G>))
    .route("/chat/reset",  post(chat::reset::<S, G>))
    .route("/chat/status", get(chat::status::<S, G>))
    .route("/api/globals", get(globals::handler::<S, G>))
    .with_state(state)
    .nest("/admin", admin)
    .layer(middleware::from_fn_with_state(https, headers::security_headers))
    .layer(TraceLayer::new_for_http())
}
