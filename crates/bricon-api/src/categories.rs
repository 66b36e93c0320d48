//! Handlers for category writes and the active-category cache.
//!
//! Every successful write invalidates the cache so the public pages pick up
//! the change on their next request.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/categories` | Body: [`NewCategory`]; returns 201, or 409 if the slug is taken |
//! | `PUT`  | `/categories/:id/active` | Body: `{"is_active":false}`; 404 if unknown |
//! | `POST` | `/cache/categories/clear` | 204 |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use bricon_core::{
  category::{Category, NewCategory},
  store::SiteStore,
};
use serde::Deserialize;

use crate::{AdminState, error::ApiError};

/// `POST /categories`
pub async fn create<S>(
  State(state): State<AdminState<S>>,
  Json(body): Json<NewCategory>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SiteStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if body.name.trim().is_empty() || body.slug.trim().is_empty() {
    return Err(ApiError::BadRequest("name and slug are required".into()));
  }

  let slug = body.slug.clone();
  let category = state
    .store
    .add_category(body)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::Conflict(format!("category slug already exists: {slug}")))?;
  state.categories.invalidate();
  Ok((StatusCode::CREATED, Json(category)))
}

#[derive(Debug, Deserialize)]
pub struct ActiveBody {
  pub is_active: bool,
}

/// `PUT /categories/:id/active`
pub async fn set_active<S>(
  State(state): State<AdminState<S>>,
  Path(id): Path<i64>,
  Json(body): Json<ActiveBody>,
) -> Result<Json<Category>, ApiError>
where
  S: SiteStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let category = state
    .store
    .set_category_active(id, body.is_active)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("category {id} not found")))?;
  state.categories.invalidate();
  Ok(Json(category))
}

/// `POST /cache/categories/clear`
pub async fn clear_cache<S>(State(state): State<AdminState<S>>) -> StatusCode
where
  S: SiteStore,
{
  state.categories.invalidate();
  tracing::info!("active-category cache cleared");
  StatusCode::NO_CONTENT
}
