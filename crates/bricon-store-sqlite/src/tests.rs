//! Integration tests for `SqliteStore` against an in-memory database.

use bricon_core::{
  category::NewCategory,
  session::{ChatSession, RateLimit},
  setting::NewSetting,
  store::SiteStore,
};
use chrono::{TimeDelta, Utc};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn category(name: &str, slug: &str) -> NewCategory {
  NewCategory {
    name:        name.into(),
    slug:        slug.into(),
    description: None,
    image:       None,
    is_active:   true,
  }
}

// ─── Settings ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_setting_returns_default() {
  let s = store().await;
  let value = s.get_setting("website_name", "BRICON VIỆT NAM").await.unwrap();
  assert_eq!(value, "BRICON VIỆT NAM");

  // The lookup must not have created a row.
  assert!(s.list_settings(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn set_then_get_returns_written_value() {
  let s = store().await;
  s.set_setting(NewSetting::new("hotline", "1900 63 62 94"))
    .await
    .unwrap();

  let value = s.get_setting("hotline", "fallback").await.unwrap();
  assert_eq!(value, "1900 63 62 94");
}

#[tokio::test]
async fn set_setting_overwrites_value_and_metadata() {
  let s = store().await;
  s.set_setting(NewSetting::new("logo_url", "/static/a.png"))
    .await
    .unwrap();
  let updated = s
    .set_setting(
      NewSetting::new("logo_url", "/static/b.png")
        .with_category("theme")
        .with_description("URL logo website"),
    )
    .await
    .unwrap();

  assert_eq!(updated.value, "/static/b.png");
  assert_eq!(updated.category, "theme");
  assert_eq!(updated.description.as_deref(), Some("URL logo website"));
  assert_eq!(s.list_settings(None).await.unwrap().len(), 1);
  assert_eq!(s.get_setting("logo_url", "").await.unwrap(), "/static/b.png");
}

#[tokio::test]
async fn empty_value_is_not_replaced_by_default() {
  let s = store().await;
  s.set_setting(NewSetting::new("default_banner", "")).await.unwrap();
  assert_eq!(s.get_setting("default_banner", "x.jpg").await.unwrap(), "");
}

#[tokio::test]
async fn list_settings_filters_by_category() {
  let s = store().await;
  s.set_setting(NewSetting::new("meta_title", "Bricon").with_category("seo"))
    .await
    .unwrap();
  s.set_setting(NewSetting::new("email", "info@bricon.vn"))
    .await
    .unwrap();
  s.set_setting(NewSetting::new("meta_description", "Keo dán gạch").with_category("seo"))
    .await
    .unwrap();

  let seo = s.list_settings(Some("seo".into())).await.unwrap();
  let keys: Vec<&str> = seo.iter().map(|s| s.key.as_str()).collect();
  assert_eq!(keys, ["meta_description", "meta_title"]);
}

// ─── Categories ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn active_categories_are_ordered_and_filtered() {
  let s = store().await;
  let a = s.add_category(category("Keo dán gạch", "keo-dan-gach")).await.unwrap().unwrap();
  let mut hidden = category("Cũ", "cu");
  hidden.is_active = false;
  s.add_category(hidden).await.unwrap();
  let c = s.add_category(category("Chống thấm", "chong-tham")).await.unwrap().unwrap();

  let active = s.list_active_categories().await.unwrap();
  let ids: Vec<i64> = active.iter().map(|c| c.id).collect();
  assert_eq!(ids, [a.id, c.id]);
}

#[tokio::test]
async fn toggle_category_active() {
  let s = store().await;
  let a = s.add_category(category("Keo chà ron", "keo-cha-ron")).await.unwrap().unwrap();

  let off = s.set_category_active(a.id, false).await.unwrap().unwrap();
  assert!(!off.is_active);
  assert!(s.list_active_categories().await.unwrap().is_empty());

  assert!(s.set_category_active(9_999, true).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_slug_is_rejected() {
  let s = store().await;
  let first = s.add_category(category("A", "same")).await.unwrap().unwrap();
  assert!(s.add_category(category("B", "same")).await.unwrap().is_none());

  let active = s.list_active_categories().await.unwrap();
  assert_eq!(active, [first]);
}

// ─── Chat sessions ───────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_session_loads_none() {
  let s = store().await;
  assert!(s.load_chat_session(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn chat_session_save_and_reload() {
  let s = store().await;
  let id = Uuid::new_v4();
  let rate = RateLimit { limit: 15, window: TimeDelta::seconds(3600) };

  let mut session = ChatSession::new(Utc::now());
  session.admit(Utc::now(), &rate);
  session.record_exchange("xin chào", "Dạ em chào anh/chị");
  s.save_chat_session(id, &session).await.unwrap();

  let loaded = s.load_chat_session(id).await.unwrap().unwrap();
  assert_eq!(loaded, session);

  session.reset(Utc::now());
  s.save_chat_session(id, &session).await.unwrap();
  let reloaded = s.load_chat_session(id).await.unwrap().unwrap();
  assert_eq!(reloaded.request_count, 0);
  assert!(reloaded.history.is_empty());
}

#[tokio::test]
async fn sessions_are_independent() {
  let s = store().await;
  let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

  let mut sa = ChatSession::new(Utc::now());
  sa.record_exchange("a", "b");
  s.save_chat_session(a, &sa).await.unwrap();

  assert!(s.load_chat_session(b).await.unwrap().is_none());
}

#[tokio::test]
async fn prune_removes_only_sessions_older_than_cutoff() {
  let s = store().await;
  let (old, fresh) = (Uuid::new_v4(), Uuid::new_v4());

  s.save_chat_session(old, &ChatSession::new(Utc::now())).await.unwrap();
  let cutoff = Utc::now() + TimeDelta::milliseconds(5);
  tokio::time::sleep(std::time::Duration::from_millis(20)).await;
  s.save_chat_session(fresh, &ChatSession::new(Utc::now())).await.unwrap();

  assert_eq!(s.prune_chat_sessions(cutoff).await.unwrap(), 1);
  assert!(s.load_chat_session(old).await.unwrap().is_none());
  assert!(s.load_chat_session(fresh).await.unwrap().is_some());

  let long_ago = Utc::now() - TimeDelta::days(1);
  assert_eq!(s.prune_chat_sessions(long_ago).await.unwrap(), 0);
}

#[tokio::test]
async fn saving_again_keeps_a_session_from_being_pruned() {
  let s = store().await;
  let id = Uuid::new_v4();
  let session = ChatSession::new(Utc::now());

  s.save_chat_session(id, &session).await.unwrap();
  let cutoff = Utc::now() + TimeDelta::milliseconds(5);
  tokio::time::sleep(std::time::Duration::from_millis(20)).await;
  s.save_chat_session(id, &session).await.unwrap();

  assert_eq!(s.prune_chat_sessions(cutoff).await.unwrap(), 0);
  assert!(s.load_chat_session(id).await.unwrap().is_some());
}
