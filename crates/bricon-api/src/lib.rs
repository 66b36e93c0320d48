//! Admin JSON API for the Bricon site.
//!
//! Exposes an axum [`Router`] backed by any [`bricon_core::store::SiteStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/admin", bricon_api::admin_router(state))
//! ```

pub mod categories;
pub mod error;
pub mod settings;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use bricon_core::{category::CategoryCache, store::SiteStore};

pub use error::ApiError;

/// State shared by the admin handlers.
pub struct AdminState<S> {
  pub store:      Arc<S>,
  /// Invalidated after every category write.
  pub categories: Arc<CategoryCache>,
}

impl<S> Clone for AdminState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), categories: Arc::clone(&self.categories) }
  }
}

/// Build the admin router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn admin_router<S>(state: AdminState<S>) -> Router<()>
where
  S: SiteStore + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Settings
    .route("/settings", get(settings::list::<S>))
    .route("/settings/{key}", put(settings::upsert::<S>))
    // Categories
    .route("/categories", post(categories::create::<S>))
    .route("/categories/{id}/active", put(categories::set_active::<S>))
    .route("/cache/categories/clear", post(categories::clear_cache::<S>))
    .with_state(state)
}
