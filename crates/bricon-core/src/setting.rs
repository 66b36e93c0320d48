//! Site settings — a flat key/value table edited from the admin panel.
//!
//! Settings are read on every page render (website name, logo, hotline, …).
//! They are never cached individually; every lookup hits the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Grouping label used when a write does not name one.
pub const DEFAULT_CATEGORY: &str = "general";

/// A persisted setting row. `key` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
  pub key:         String,
  /// Free text; may be empty.
  pub value:       String,
  pub category:    String,
  pub description: Option<String>,
  pub updated_at:  DateTime<Utc>,
}

/// Input for [`SiteStore::set_setting`](crate::store::SiteStore::set_setting).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSetting {
  pub key:         String,
  pub value:       String,
  pub category:    String,
  pub description: Option<String>,
}

impl NewSetting {
  /// A setting in the [`DEFAULT_CATEGORY`] with no description.
  pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      key:         key.into(),
      value:       value.into(),
      category:    DEFAULT_CATEGORY.to_owned(),
      description: None,
    }
  }

  pub fn with_category(mut self, category: impl Into<String>) -> Self {
    self.category = category.into();
    self
  }

  pub fn with_description(mut self, description: impl Into<String>) -> Self {
    self.description = Some(description.into());
    self
  }
}
