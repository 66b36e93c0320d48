//! Handlers for `/settings` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/settings` | Optional `?category=general\|theme\|seo\|…` |
//! | `PUT`  | `/settings/:key` | Body: `{"value":"…","category":"…","description":"…"}` |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use bricon_core::{
  setting::{DEFAULT_CATEGORY, NewSetting, Setting},
  store::SiteStore,
};
use serde::Deserialize;

use crate::{AdminState, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub category: Option<String>,
}

/// `GET /settings[?category=<category>]`
pub async fn list<S>(
  State(state): State<AdminState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Setting>>, ApiError>
where
  S: SiteStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let settings = state
    .store
    .list_settings(params.category)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(settings))
}

// ─── Upsert ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpsertBody {
  #[serde(default)]
  pub value:       String,
  pub category:    Option<String>,
  pub description: Option<String>,
}

/// `PUT /settings/:key`
pub async fn upsert<S>(
  State(state): State<AdminState<S>>,
  Path(key): Path<String>,
  Json(body): Json<UpsertBody>,
) -> Result<Json<Setting>, ApiError>
where
  S: SiteStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let key = key.trim().to_owned();
  if key.is_empty() {
    return Err(ApiError::BadRequest("setting key must not be empty".into()));
  }

  let input = NewSetting {
    key,
    value:       body.value,
    category:    body.category.unwrap_or_else(|| DEFAULT_CATEGORY.to_owned()),
    description: body.description,
  };
  let setting = state.store.set_setting(input).await.map_err(ApiError::store)?;
  tracing::info!(key = %setting.key, category = %setting.category, "setting updated");
  Ok(Json(setting))
}
