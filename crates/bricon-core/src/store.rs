//! The `SiteStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `bricon-store-sqlite`).
//! Higher layers (`bricon-api`, `bricon-server`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  category::{Category, NewCategory},
  session::ChatSession,
  setting::{NewSetting, Setting},
};

/// Abstraction over the site's persistent state.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait SiteStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Settings ──────────────────────────────────────────────────────────

  /// Return the value stored under `key`, or `default` if the key has never
  /// been set. Absence does not create a row.
  fn get_setting<'a>(
    &'a self,
    key: &'a str,
    default: &'a str,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + 'a;

  /// Insert or update the row keyed by `input.key`.
  fn set_setting(
    &self,
    input: NewSetting,
  ) -> impl Future<Output = Result<Setting, Self::Error>> + Send + '_;

  /// List settings ordered by key, optionally restricted to one category.
  fn list_settings(
    &self,
    category: Option<String>,
  ) -> impl Future<Output = Result<Vec<Setting>, Self::Error>> + Send + '_;

  // ── Categories ────────────────────────────────────────────────────────

  /// Insert a category. Returns `None` if another category already uses
  /// `input.slug`; nothing is written in that case.
  fn add_category(
    &self,
    input: NewCategory,
  ) -> impl Future<Output = Result<Option<Category>, Self::Error>> + Send + '_;

  /// Toggle `is_active`. Returns `None` if no category has that id.
  fn set_category_active(
    &self,
    id: i64,
    active: bool,
  ) -> impl Future<Output = Result<Option<Category>, Self::Error>> + Send + '_;

  /// All categories with `is_active = true`, ordered by id.
  fn list_active_categories(
    &self,
  ) -> impl Future<Output = Result<Vec<Category>, Self::Error>> + Send + '_;

  // ── Chat sessions ─────────────────────────────────────────────────────

  /// Load the chat state for a session id. `None` if the session has never
  /// chatted.
  fn load_chat_session(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ChatSession>, Self::Error>> + Send + '_;

  /// Persist the chat state for a session id, replacing any previous state.
  fn save_chat_session<'a>(
    &'a self,
    id: Uuid,
    session: &'a ChatSession,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Delete every session last written before `cutoff`. Returns how many
  /// were removed.
  fn prune_chat_sessions(
    &self,
    cutoff: DateTime<Utc>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
