//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as fixed-width RFC 3339 strings in UTC, so SQL
//! string comparison orders them chronologically. Chat sessions are stored as
//! compact JSON. UUIDs are stored as hyphenated lowercase strings.

use bricon_core::{category::Category, session::ChatSession, setting::Setting};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── ChatSession
// ──────────────────────────────────────────────────────────────

pub fn encode_chat_session(s: &ChatSession) -> Result<String> {
  Ok(serde_json::to_string(s)?)
}

pub fn decode_chat_session(s: &str) -> Result<ChatSession> {
  Ok(serde_json::from_str(s)?)
}

// ─── Raw row types ────────────────────────────────────────────────────────────

/// Raw `settings` row as read from SQLite.
pub struct RawSetting {
  pub key:         String,
  pub value:       String,
  pub category:    String,
  pub description: Option<String>,
  pub updated_at:  String,
}

impl RawSetting {
  pub const COLUMNS: &'static str = "key, value, category, description, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      key:         row.get(0)?,
      value:       row.get(1)?,
      category:    row.get(2)?,
      description: row.get(3)?,
      updated_at:  row.get(4)?,
    })
  }

  pub fn into_setting(self) -> Result<Setting> {
    Ok(Setting {
      key:         self.key,
      value:       self.value,
      category:    self.category,
      description: self.description,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw `categories` row as read from SQLite.
pub struct RawCategory {
  pub id:          i64,
  pub name:        String,
  pub slug:        String,
  pub description: Option<String>,
  pub image:       Option<String>,
  pub is_active:   bool,
  pub created_at:  String,
}

impl RawCategory {
  pub const COLUMNS: &'static str =
    "id, name, slug, description, image, is_active, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      name:        row.get(1)?,
      slug:        row.get(2)?,
      description: row.get(3)?,
      image:       row.get(4)?,
      is_active:   row.get(5)?,
      created_at:  row.get(6)?,
    })
  }

  pub fn into_category(self) -> Result<Category> {
    Ok(Category {
      id:          self.id,
      name:        self.name,
      slug:        self.slug,
      description: self.description,
      image:       self.image,
      is_active:   self.is_active,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}
