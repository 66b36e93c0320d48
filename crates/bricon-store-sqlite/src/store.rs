//! [`SqliteStore`] — the SQLite implementation of [`SiteStore`].

use std::path::Path;

use bricon_core::{
  category::{Category, NewCategory},
  session::ChatSession,
  setting::{NewSetting, Setting},
  store::SiteStore,
};
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  encode::{
    RawCategory, RawSetting, decode_chat_session, encode_chat_session, encode_dt,
    encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Bricon site store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

fn is_unique_violation(e: &tokio_rusqlite::Error) -> bool {
  matches!(
    e,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(f, _))
      if f.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

// ─── SiteStore impl ──────────────────────────────────────────────────────────

impl SiteStore for SqliteStore {
  type Error = Error;

  // ── Settings ──────────────────────────────────────────────────────────────

  async fn get_setting(&self, key: &str, default: &str) -> Result<String> {
    let key_owned = key.to_owned();

    let value: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT value FROM settings WHERE key = ?1",
            rusqlite::params![key_owned],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;

    Ok(value.unwrap_or_else(|| default.to_owned()))
  }

  async fn set_setting(&self, input: NewSetting) -> Result<Setting> {
    let at_str = encode_dt(Utc::now());

    let raw: RawSetting = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO settings (key, value, category, description, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(key) DO UPDATE SET
             value       = excluded.value,
             category    = excluded.category,
             description = excluded.description,
             updated_at  = excluded.updated_at",
          rusqlite::params![
            input.key,
            input.value,
            input.category,
            input.description,
            at_str,
          ],
        )?;
        let sql = format!("SELECT {} FROM settings WHERE key = ?1", RawSetting::COLUMNS);
        Ok(conn.query_row(&sql, rusqlite::params![input.key], RawSetting::from_row)?)
      })
      .await?;

    raw.into_setting()
  }

  async fn list_settings(&self, category: Option<String>) -> Result<Vec<Setting>> {
    let raws: Vec<RawSetting> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(c) = category {
          let sql = format!(
            "SELECT {} FROM settings WHERE category = ?1 ORDER BY key",
            RawSetting::COLUMNS
          );
          let mut stmt = conn.prepare(&sql)?;
          stmt
            .query_map(rusqlite::params![c], RawSetting::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let sql = format!("SELECT {} FROM settings ORDER BY key", RawSetting::COLUMNS);
          let mut stmt = conn.prepare(&sql)?;
          stmt
            .query_map([], RawSetting::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSetting::into_setting).collect()
  }

  // ── Categories ────────────────────────────────────────────────────────────

  async fn add_category(&self, input: NewCategory) -> Result<Option<Category>> {
    let at_str = encode_dt(Utc::now());

    let inserted: Result<RawCategory> = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO categories (name, slug, description, image, is_active, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            input.name,
            input.slug,
            input.description,
            input.image,
            input.is_active,
            at_str,
          ],
        )?;
        let id = conn.last_insert_rowid();
        let sql = format!("SELECT {} FROM categories WHERE id = ?1", RawCategory::COLUMNS);
        Ok(conn.query_row(&sql, rusqlite::params![id], RawCategory::from_row)?)
      })
      .await
      .map_err(Error::Database);

    match inserted {
      Ok(raw) => raw.into_category().map(Some),
      Err(Error::Database(e)) if is_unique_violation(&e) => Ok(None),
      Err(e) => Err(e),
    }
  }

  async fn set_category_active(&self, id: i64, active: bool) -> Result<Option<Category>> {
    let raw: Option<RawCategory> = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE categories SET is_active = ?2 WHERE id = ?1",
          rusqlite::params![id, active],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        let sql = format!("SELECT {} FROM categories WHERE id = ?1", RawCategory::COLUMNS);
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id], RawCategory::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCategory::into_category).transpose()
  }

  async fn list_active_categories(&self) -> Result<Vec<Category>> {
    let raws: Vec<RawCategory> = self
      .conn
      .call(|conn| {
        let sql = format!(
          "SELECT {} FROM categories WHERE is_active = 1 ORDER BY id",
          RawCategory::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawCategory::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCategory::into_category).collect()
  }

  // ── Chat sessions ─────────────────────────────────────────────────────────

  async fn load_chat_session(&self, id: Uuid) -> Result<Option<ChatSession>> {
    let id_str = encode_uuid(id);

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT state_json FROM chat_sessions WHERE session_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?)
      })
      .await?;

    raw.as_deref().map(decode_chat_session).transpose()
  }

  async fn save_chat_session(&self, id: Uuid, session: &ChatSession) -> Result<()> {
    let id_str     = encode_uuid(id);
    let state_json = encode_chat_session(session)?;
    let at_str     = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO chat_sessions (session_id, state_json, updated_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT(session_id) DO UPDATE SET
             state_json = excluded.state_json,
             updated_at = excluded.updated_at",
          rusqlite::params![id_str, state_json, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn prune_chat_sessions(&self, cutoff: DateTime<Utc>) -> Result<usize> {
    let cutoff_str = encode_dt(cutoff);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM chat_sessions WHERE updated_at < ?1",
          rusqlite::params![cutoff_str],
        )?)
      })
      .await?;
    Ok(removed)
  }
}
