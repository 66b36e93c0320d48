//! Product categories and the process-wide cache of the active ones.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::TtlCache;

/// A product category row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
  pub id:          i64,
  pub name:        String,
  pub slug:        String,
  pub description: Option<String>,
  pub image:       Option<String>,
  pub is_active:   bool,
  pub created_at:  DateTime<Utc>,
}

/// Input for [`SiteStore::add_category`](crate::store::SiteStore::add_category).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
  pub name:        String,
  pub slug:        String,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub image:       Option<String>,
  #[serde(default = "default_active")]
  pub is_active:   bool,
}

fn default_active() -> bool { true }

/// The ordered list of active categories, shared between requests.
pub type ActiveCategories = Arc<Vec<Category>>;

/// Application-scoped cache of [`ActiveCategories`].
pub type CategoryCache = TtlCache<Vec<Category>>;
