//! Site-wide values every page needs: branding settings and the active
//! category list.
//!
//! Categories come from the process-wide [`CategoryCache`] and are then
//! pinned in the request extensions, so every consumer within one request
//! sees the same list even if the cache is refreshed or invalidated
//! mid-request.
//!
//! [`CategoryCache`]: bricon_core::category::CategoryCache

use std::{sync::Arc, time::Instant};

use axum::{
  Json,
  extract::{FromRequestParts, State},
  http::request::Parts,
};
use bricon_api::ApiError;
use bricon_core::{
  category::{ActiveCategories, Category},
  generate::TextGenerator,
  store::SiteStore,
};
use chrono::{Datelike as _, Utc};
use serde::Serialize;

use crate::AppState;

/// The active categories as seen by the current request.
#[derive(Debug, Clone)]
pub struct RequestCategories(pub ActiveCategories);

impl<S, G> FromRequestParts<AppState<S, G>> for RequestCategories
where
  S: SiteStore + 'static,
  G: TextGenerator + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, G>,
  ) -> Result<Self, Self::Rejection> {
    if let Some(pinned) = parts.extensions.get::<RequestCategories>() {
      return Ok(pinned.clone());
    }

    let store = Arc::clone(&state.store);
    let categories = state
      .categories
      .get_or_refresh(Instant::now(), || async move {
        let fresh = store.list_active_categories().await;
        tracing::debug!("refreshed active categories");
        fresh
      })
      .await
      .map_err(ApiError::store)?;

    let pinned = RequestCategories(categories);
    parts.extensions.insert(pinned.clone());
    Ok(pinned)
  }
}

#[derive(Debug, Serialize)]
pub struct SiteGlobals {
  pub site_name:      String,
  pub website_name:   String,
  pub logo_url:       String,
  pub hotline:        String,
  pub contact_email:  String,
  pub default_banner: String,
  pub all_categories: Vec<Category>,
  pub current_year:   i32,
}

/// `GET /api/globals`
pub async fn handler<S, G>(
  State(state): State<AppState<S, G>>,
  RequestCategories(categories): RequestCategories,
) -> Result<Json<SiteGlobals>, ApiError>
where
  S: SiteStore + 'static,
  G: TextGenerator + 'static,
{
  let store = &*state.store;
  let setting = |key: &'static str, default: &'static str| async move {
    store.get_setting(key, default).await.map_err(ApiError::store)
  };

  Ok(Json(SiteGlobals {
    site_name:      state.config.site_name.clone(),
    website_name:   setting("website_name", "BRICON VIỆT NAM").await?,
    logo_url:       setting("logo_url", "/static/img/logo.png").await?,
    hotline:        setting("hotline", "0901.180.094").await?,
    contact_email:  setting("contact_email", "info@bricon.vn").await?,
    default_banner: setting("default_banner", "").await?,
    all_categories: categories.as_ref().clone(),
    current_year:   Utc::now().year(),
  }))
}
