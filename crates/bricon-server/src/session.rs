//! Chat session cookie.
//!
//! The cookie carries only a random id; the session itself lives in the
//! store. Stored sessions outlive their cookie until [`prune_expired`] runs.

use std::convert::Infallible;

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, HeaderValue, header, request::Parts},
  response::Response,
};
use bricon_core::store::SiteStore;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::ServerConfig;

pub const COOKIE_NAME: &str = "bricon_session";

/// The session id sent by the client, if any.
///
/// A malformed cookie value is treated as absent.
#[derive(Debug, Clone, Copy)]
pub struct SessionId(pub Option<Uuid>);

impl<S: Send + Sync> FromRequestParts<S> for SessionId {
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
    Ok(SessionId(session_id(&parts.headers)))
  }
}

/// Find the session id among all `Cookie` headers.
pub fn session_id(headers: &HeaderMap) -> Option<Uuid> {
  headers
    .get_all(header::COOKIE)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(';'))
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(name, _)| *name == COOKIE_NAME)
    .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// The `Set-Cookie` value issuing `id`.
pub fn set_cookie(id: Uuid, config: &ServerConfig) -> String {
  let mut cookie = format!(
    "{COOKIE_NAME}={id}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
    config.session_lifetime_secs
  );
  if config.session_cookie_secure {
    cookie.push_str("; Secure");
  }
  cookie
}

/// Append the session cookie to `res`.
pub fn attach(res: &mut Response, id: Uuid, config: &ServerConfig) {
  match HeaderValue::from_str(&set_cookie(id, config)) {
    Ok(value) => {
      res.headers_mut().append(header::SET_COOKIE, value);
    }
    Err(e) => tracing::error!(error = %e, "invalid session cookie"),
  }
}

/// Delete stored sessions not written within the cookie lifetime before
/// `now`. Returns how many were removed.
pub async fn prune_expired<S: SiteStore>(
  store: &S,
  config: &ServerConfig,
  now: DateTime<Utc>,
) -> Result<usize, S::Error> {
  match now.checked_sub_signed(config.session_lifetime()) {
    Some(cutoff) => store.prune_chat_sessions(cutoff).await,
    None => Ok(0),
  }
}

#[cfg(test)]
mod tests {
  use bricon_core::session::ChatSession;
  use bricon_store_sqlite::SqliteStore;
  use chrono::TimeDelta;

  use super::*;

  fn cookies(values: &[&str]) -> HeaderMap {
    let mut h = HeaderMap::new();
    for v in values {
      h.append(header::COOKIE, HeaderValue::from_str(v).unwrap());
    }
    h
  }

  #[test]
  fn finds_id_among_other_cookies() {
    let id = Uuid::new_v4();
    let h = cookies(&["theme=dark", &format!("lang=vi; {COOKIE_NAME}={id}")]);
    assert_eq!(session_id(&h), Some(id));
  }

  #[test]
  fn malformed_id_is_absent() {
    let h = cookies(&[&format!("{COOKIE_NAME}=not-a-uuid")]);
    assert_eq!(session_id(&h), None);
    assert_eq!(session_id(&HeaderMap::new()), None);
  }

  #[test]
  fn secure_flag_follows_config() {
    let id = Uuid::nil();
    let mut config = ServerConfig::default();
    let plain = set_cookie(id, &config);
    assert!(plain.contains("HttpOnly; SameSite=Lax; Max-Age=86400"));
    assert!(!plain.contains("Secure"));

    config.session_cookie_secure = true;
    assert!(set_cookie(id, &config).ends_with("; Secure"));
  }

  #[tokio::test]
  async fn prune_expired_uses_cookie_lifetime() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let mut config = ServerConfig::default();
    config.session_lifetime_secs = 60;
    let id = Uuid::new_v4();
    store.save_chat_session(id, &ChatSession::new(Utc::now())).await.unwrap();

    let within = Utc::now() + TimeDelta::seconds(30);
    assert_eq!(prune_expired(&store, &config, within).await.unwrap(), 0);
    assert!(store.load_chat_session(id).await.unwrap().is_some());

    let past_lifetime = Utc::now() + TimeDelta::seconds(120);
    assert_eq!(prune_expired(&store, &config, past_lifetime).await.unwrap(), 1);
    assert!(store.load_chat_session(id).await.unwrap().is_none());
  }

  #[tokio::test]
  async fn huge_lifetime_prunes_nothing() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let mut config = ServerConfig::default();
    config.session_lifetime_secs = u64::MAX;
    store.save_chat_session(Uuid::new_v4(), &ChatSession::new(Utc::now())).await.unwrap();

    assert_eq!(prune_expired(&store, &config, Utc::now()).await.unwrap(), 0);
  }
}
