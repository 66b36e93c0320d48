//! `/chat/*` handlers: quota gate, prompt assembly and the generation call.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use bricon_core::{
  generate::{GenerationRequest, TextGenerator},
  prompt::{self, PromptMode},
  session::{Admission, ChatSession},
  store::SiteStore,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::{AppState, SupportContact, session::{self, SessionId}};

/// Longest accepted message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 500;

// ─── Errors ──────────────────────────────────────────────────────────────────

/// A failure on the chat path. Every variant renders as JSON.
#[derive(Debug, Error)]
pub enum ChatError {
  #[error("chatbot disabled")]
  Disabled,

  #[error("no generator configured")]
  Unavailable,

  #[error("invalid message: {0}")]
  InvalidMessage(&'static str),

  #[error("generation failed: {0}")]
  Upstream(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ChatError {
  fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    ChatError::Store(Box::new(e))
  }

  /// Whether the session may have been written before the failure.
  fn after_gate(&self) -> bool { matches!(self, ChatError::Upstream(_) | ChatError::Store(_)) }

  fn into_reply(self, support: &SupportContact) -> Response {
    let SupportContact { hotline, zalo, email } = support;
    let (status, body) = match self {
      ChatError::Disabled => (
        StatusCode::SERVICE_UNAVAILABLE,
        json!({ "response": format!("⚠️ Chatbot đang bảo trì. Vui lòng liên hệ: 📞 {hotline}") }),
      ),
      ChatError::Unavailable => (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "response": format!("😔 Chatbot tạm thời không khả dụng.\nLiên hệ: 📞 {hotline}") }),
      ),
      ChatError::InvalidMessage(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
      ChatError::Upstream(e) => {
        tracing::error!(error = %e, "text generation failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          json!({
            "response": format!(
              "⚠️ Hệ thống đang quá tải, anh/chị vui lòng thử lại sau vài giây hoặc gọi 📞 {hotline}."
            )
          }),
        )
      }
      ChatError::Store(e) => {
        tracing::error!(error = %e, "chat session store failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          json!({
            "response": format!(
              "😔 Đã có lỗi xảy ra. Vui lòng liên hệ BRICON: 📞 {hotline} | Zalo {zalo} | Email {email}"
            )
          }),
        )
      }
    };
    (status, Json(body)).into_response()
  }
}

fn quota_message(limit: u32, support: &SupportContact) -> String {
  format!(
    "⏰ Anh/chị đã dùng hết {limit} lượt chat/giờ.\nVui lòng thử lại sau hoặc liên hệ 📞 {} | Zalo {}",
    support.hotline, support.zalo
  )
}

fn blank_reply(support: &SupportContact) -> String {
  format!(
    "😔 Dạ xin lỗi, em chưa có đủ thông tin để trả lời.\nAnh/chị vui lòng liên hệ: 📞 {} hoặc Zalo {} để được hỗ trợ nhanh ạ.",
    support.hotline, support.zalo
  )
}

// ─── Bodies ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SendBody {
  message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendReply {
  pub response:           String,
  pub mode:               PromptMode,
  pub remaining_requests: u32,
  pub timestamp:          DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct QuotaReply {
  pub response:           String,
  pub remaining_requests: u32,
  pub timestamp:          DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct StatusReply {
  pub enabled:            bool,
  pub model_initialized:  bool,
  pub request_limit:      u32,
  pub remaining_requests: u32,
  pub history_length:     usize,
  pub timestamp:          DateTime<Utc>,
}

/// Trimmed message text, or the reason it is rejected.
///
/// An unparseable body counts as an empty message.
fn parse_message(body: &[u8]) -> Result<String, ChatError> {
  let parsed: SendBody = serde_json::from_slice(body).unwrap_or_default();
  let message = parsed.message.unwrap_or_default().trim().to_owned();

  if message.is_empty() {
    return Err(ChatError::InvalidMessage("Tin nhắn không được để trống"));
  }
  if message.chars().count() > MAX_MESSAGE_CHARS {
    return Err(ChatError::InvalidMessage("Tin nhắn quá dài (tối đa 500 ký tự)"));
  }
  Ok(message)
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// `POST /chat/send`
pub async fn send<S, G>(
  State(state): State<AppState<S, G>>,
  SessionId(existing): SessionId,
  body: Bytes,
) -> Response
where
  S: SiteStore + 'static,
  G: TextGenerator + 'static,
{
  let (id, is_new) = match existing {
    Some(id) => (id, false),
    None => (Uuid::new_v4(), true),
  };

  let (mut res, touched) = match send_message(&state, id, &body).await {
    Ok(res) => (res, true),
    Err(e) => {
      let touched = e.after_gate();
      (e.into_reply(&state.config.chat.support), touched)
    }
  };

  if is_new && touched {
    session::attach(&mut res, id, &state.config);
  }
  res
}

async fn send_message<S, G>(
  state: &AppState<S, G>,
  id: Uuid,
  body: &[u8],
) -> Result<Response, ChatError>
where
  S: SiteStore + 'static,
  G: TextGenerator + 'static,
{
  let chat = &state.config.chat;
  if !chat.enabled {
    return Err(ChatError::Disabled);
  }
  let Some(generator) = state.generator.as_deref() else {
    return Err(ChatError::Unavailable);
  };
  let message = parse_message(body)?;

  let now  = Utc::now();
  let rate = chat.rate_limit();
  let mut session = state
    .store
    .load_chat_session(id)
    .await
    .map_err(ChatError::store)?
    .unwrap_or_else(|| ChatSession::new(now));

  let Admission::Allowed { remaining } = session.admit(now, &rate) else {
    tracing::debug!(session = %id, limit = rate.limit, "chat quota exhausted");
    return Ok(
      Json(QuotaReply {
        response:           quota_message(rate.limit, &chat.support),
        remaining_requests: 0,
        timestamp:          now,
      })
      .into_response(),
    );
  };

  // A failed generation call still consumes the request.
  state.store.save_chat_session(id, &session).await.map_err(ChatError::store)?;

  let history   = prompt::history_block(session.recent(chat.history_turns));
  let knowledge = state.knowledge.load();
  let mode      = prompt::pick_mode(&message, chat.default_mode);
  let system    = prompt::system_prompt(&knowledge, mode);
  let request   = GenerationRequest::new(
    prompt::compose(&system, &history, &message),
    chat.temperature,
    chat.max_output_tokens_for(mode),
  );

  tracing::debug!(session = %id, %mode, remaining, "calling text generator");
  let reply = match tokio::time::timeout(chat.timeout(), generator.generate(request)).await {
    Ok(Ok(text)) => text,
    Ok(Err(e)) => return Err(ChatError::Upstream(e.to_string())),
    Err(_) => return Err(ChatError::Upstream(format!("timed out after {:?}", chat.timeout()))),
  };

  let reply = match reply.trim() {
    "" => blank_reply(&chat.support),
    text => text.to_owned(),
  };

  session.record_exchange(message, reply.clone());
  state.store.save_chat_session(id, &session).await.map_err(ChatError::store)?;

  Ok(
    Json(SendReply {
      response: reply,
      mode,
      remaining_requests: remaining,
      timestamp: Utc::now(),
    })
    .into_response(),
  )
}

/// `POST /chat/reset`
pub async fn reset<S, G>(
  State(state): State<AppState<S, G>>,
  SessionId(id): SessionId,
) -> Response
where
  S: SiteStore + 'static,
  G: TextGenerator + 'static,
{
  let now = Utc::now();
  let result = match id {
    Some(id) => reset_session(&*state.store, id, now).await,
    None => Ok(()),
  };

  match result {
    Ok(()) => {
      tracing::info!("chat history reset");
      Json(json!({
        "status": "success",
        "message": "✅ Đã làm mới hội thoại",
        "timestamp": now,
      }))
      .into_response()
    }
    Err(e) => {
      tracing::error!(error = %e, "chat reset failed");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "status": "error", "message": "⚠️ Không thể làm mới hội thoại" })),
      )
        .into_response()
    }
  }
}

async fn reset_session<S: SiteStore>(
  store: &S,
  id: Uuid,
  now: DateTime<Utc>,
) -> Result<(), S::Error> {
  if let Some(mut session) = store.load_chat_session(id).await? {
    session.reset(now);
    store.save_chat_session(id, &session).await?;
  }
  Ok(())
}

/// `GET /chat/status`
pub async fn status<S, G>(
  State(state): State<AppState<S, G>>,
  SessionId(id): SessionId,
) -> Response
where
  S: SiteStore + 'static,
  G: TextGenerator + 'static,
{
  let chat = &state.config.chat;
  let now  = Utc::now();
  let rate = chat.rate_limit();

  let session = match id {
    Some(id) => state.store.load_chat_session(id).await,
    None => Ok(None),
  };

  match session {
    Ok(session) => Json(StatusReply {
      enabled:            chat.enabled,
      model_initialized:  state.generator.is_some(),
      request_limit:      rate.limit,
      remaining_requests: session.as_ref().map_or(rate.limit, |s| s.remaining(now, &rate)),
      history_length:     session.as_ref().map_or(0, |s| s.history.len()),
      timestamp:          now,
    })
    .into_response(),
    Err(e) => {
      tracing::error!(error = %e, "chat status check failed");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Unable to check status" })),
      )
        .into_response()
    }
  }
}

#[cfg(test)]
mod tests {
  use std::fs;

  use axum::{
    body::Body,
    http::{Request, header},
  };
  use bricon_core::store::SiteStore as _;
  use serde_json::Value;
  use tempfile::TempDir;

  use super::*;
  use crate::{
    ServerConfig,
    session::COOKIE_NAME,
    testing::{Reply, StubGenerator, call, json_body, make_state},
  };

  fn send_req(message: &str, cookie: Option<&str>) -> Request<Body> {
    let mut b = Request::post("/chat/send").header(header::CONTENT_TYPE, "application/json");
    if let Some(c) = cookie {
      b = b.header(header::COOKIE, c);
    }
    b.body(Body::from(json!({ "message": message }).to_string())).unwrap()
  }

  fn get_req(path: &str, cookie: Option<&str>) -> Request<Body> {
    let mut b = Request::get(path);
    if let Some(c) = cookie {
      b = b.header(header::COOKIE, c);
    }
    b.body(Body::empty()).unwrap()
  }

  fn issued_cookie(res: &Response) -> Option<String> {
    let raw = res.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    raw.split(';').next().map(str::to_owned)
  }

  fn session_uuid(cookie: &str) -> Uuid {
    let value = cookie.strip_prefix(&format!("{COOKIE_NAME}=")).unwrap();
    Uuid::parse_str(value).unwrap()
  }

  fn config(limit: u32) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.chat.request_limit = limit;
    config.chat.knowledge_path = "/nonexistent/company_info.json".into();
    config
  }

  #[tokio::test]
  async fn first_message_issues_cookie_and_counts() {
    let state = make_state(Some(StubGenerator::new(Reply::Text("Dạ em chào anh/chị"))), config(15)).await;

    let res = call(&state, send_req("xin chào", None)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = issued_cookie(&res).expect("session cookie");
    let body = json_body(res).await;

    assert_eq!(body["response"], "Dạ em chào anh/chị");
    assert_eq!(body["mode"], "lite");
    assert_eq!(body["remaining_requests"], 14);

    let saved = state.store.load_chat_session(session_uuid(&cookie)).await.unwrap().unwrap();
    assert_eq!(saved.request_count, 1);
    assert_eq!(saved.history.len(), 2);
  }

  #[tokio::test]
  async fn returning_session_reuses_cookie() {
    let state = make_state(Some(StubGenerator::new(Reply::Text("ok"))), config(15)).await;

    let res = call(&state, send_req("xin chào", None)).await;
    let cookie = issued_cookie(&res).unwrap();

    let res = call(&state, send_req("còn hàng không", Some(&cookie))).await;
    assert!(res.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(json_body(res).await["remaining_requests"], 13);
  }

  #[tokio::test]
  async fn technical_question_uses_full_mode() {
    let generator = StubGenerator::new(Reply::Text("Thông số như sau"));
    let state = make_state(Some(generator), config(15)).await;

    let res = call(&state, send_req("cho tôi thông số kỹ thuật", None)).await;
    assert_eq!(json_body(res).await["mode"], "full");

    let req = state.generator.as_ref().unwrap().last_request().unwrap();
    assert_eq!(req.max_output_tokens, 800);
    assert_eq!(req.top_k, 40);
    assert!(req.prompt.contains("cho tôi thông số kỹ thuật"));
  }

  #[tokio::test]
  async fn configured_token_budget_overrides_mode_default() {
    let mut cfg = config(15);
    cfg.chat.max_output_tokens = Some(256);
    let state = make_state(Some(StubGenerator::new(Reply::Text("ok"))), cfg).await;

    call(&state, send_req("xin chào", None)).await;
    let req = state.generator.as_ref().unwrap().last_request().unwrap();
    assert_eq!(req.max_output_tokens, 256);
  }

  #[tokio::test]
  async fn quota_exhaustion_skips_generator() {
    let state = make_state(Some(StubGenerator::new(Reply::Text("ok"))), config(2)).await;

    let res = call(&state, send_req("một", None)).await;
    let cookie = issued_cookie(&res).unwrap();
    call(&state, send_req("hai", Some(&cookie))).await;

    let res = call(&state, send_req("ba", Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["remaining_requests"], 0);
    assert!(body["response"].as_str().unwrap().contains("hết 2 lượt"));

    let generator = state.generator.as_ref().unwrap();
    assert_eq!(generator.calls(), 2);
    let saved = state.store.load_chat_session(session_uuid(&cookie)).await.unwrap().unwrap();
    assert_eq!(saved.request_count, 2);
    assert_eq!(saved.history.len(), 4);
  }

  #[tokio::test]
  async fn validation_errors_touch_nothing() {
    let state = make_state(Some(StubGenerator::new(Reply::Text("ok"))), config(15)).await;

    let res = call(&state, send_req("   ", None)).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(res.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(json_body(res).await["error"], "Tin nhắn không được để trống");

    let res = call(&state, send_req(&"a".repeat(501), None)).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = call(&state, send_req(&"ạ".repeat(500), None)).await;
    assert_eq!(res.status(), StatusCode::OK);

    assert_eq!(state.generator.as_ref().unwrap().calls(), 1);
  }

  #[tokio::test]
  async fn non_json_body_is_rejected() {
    let state = make_state(Some(StubGenerator::new(Reply::Text("ok"))), config(15)).await;
    let req = Request::post("/chat/send").body(Body::from("message=hi")).unwrap();
    assert_eq!(call(&state, req).await.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn disabled_chat_is_503() {
    let mut cfg = config(15);
    cfg.chat.enabled = false;
    let state = make_state(Some(StubGenerator::new(Reply::Text("ok"))), cfg).await;

    let res = call(&state, send_req("xin chào", None)).await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(json_body(res).await["response"].as_str().unwrap().contains("bảo trì"));
  }

  #[tokio::test]
  async fn missing_generator_is_500() {
    let state = make_state(None, config(15)).await;

    let res = call(&state, send_req("", None)).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json_body(res).await["response"].as_str().unwrap().contains("không khả dụng"));
  }

  #[tokio::test]
  async fn generator_failure_still_consumes_quota() {
    let state = make_state(Some(StubGenerator::new(Reply::Fail)), config(15)).await;

    let res = call(&state, send_req("xin chào", None)).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let cookie = issued_cookie(&res).expect("cookie for consumed request");
    assert!(json_body(res).await["response"].as_str().unwrap().contains("quá tải"));

    let saved = state.store.load_chat_session(session_uuid(&cookie)).await.unwrap().unwrap();
    assert_eq!(saved.request_count, 1);
    assert!(saved.history.is_empty());
  }

  #[tokio::test]
  async fn generator_timeout_is_500() {
    let mut cfg = config(15);
    cfg.chat.timeout_secs = 0;
    let state = make_state(Some(StubGenerator::new(Reply::Hang)), cfg).await;

    let res = call(&state, send_req("xin chào", None)).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
  }

  #[tokio::test]
  async fn blank_reply_falls_back_to_static_text() {
    let state = make_state(Some(StubGenerator::new(Reply::Text("  \n "))), config(15)).await;

    let res = call(&state, send_req("xin chào", None)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert!(body["response"].as_str().unwrap().starts_with("😔 Dạ xin lỗi"));
  }

  #[tokio::test]
  async fn prompt_includes_knowledge_and_history() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("company_info.json");
    fs::write(&path, r#"{ "company_name": "BRICON Test", "contact": { "hotline": "1800 0000" } }"#)
      .unwrap();

    let mut cfg = config(15);
    cfg.chat.knowledge_path = path;
    let state = make_state(Some(StubGenerator::new(Reply::Text("Dạ vâng"))), cfg).await;

    let res = call(&state, send_req("xin chào", None)).await;
    let cookie = issued_cookie(&res).unwrap();
    call(&state, send_req("giao hàng không", Some(&cookie))).await;

    let prompt = state.generator.as_ref().unwrap().last_request().unwrap().prompt;
    assert!(prompt.contains("1800 0000"));
    assert!(prompt.contains("Khách: xin chào"));
    assert!(prompt.contains("Bot: Dạ vâng"));
    assert!(prompt.contains("giao hàng không"));
  }

  #[tokio::test]
  async fn reset_clears_history_and_quota() {
    let state = make_state(Some(StubGenerator::new(Reply::Text("ok"))), config(15)).await;

    let res = call(&state, send_req("xin chào", None)).await;
    let cookie = issued_cookie(&res).unwrap();

    let req = Request::post("/chat/reset").header(header::COOKIE, &cookie).body(Body::empty()).unwrap();
    let res = call(&state, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["status"], "success");

    let saved = state.store.load_chat_session(session_uuid(&cookie)).await.unwrap().unwrap();
    assert_eq!(saved.request_count, 0);
    assert!(saved.history.is_empty());
  }

  #[tokio::test]
  async fn reset_without_session_succeeds() {
    let state = make_state(None, config(15)).await;
    let req = Request::post("/chat/reset").body(Body::empty()).unwrap();
    assert_eq!(call(&state, req).await.status(), StatusCode::OK);
  }

  #[tokio::test]
  async fn status_reports_quota_and_history() {
    let state = make_state(Some(StubGenerator::new(Reply::Text("ok"))), config(15)).await;

    let body: Value = json_body(call(&state, get_req("/chat/status", None)).await).await;
    assert_eq!(body["enabled"], true);
    assert_eq!(body["model_initialized"], true);
    assert_eq!(body["remaining_requests"], 15);
    assert_eq!(body["history_length"], 0);

    let res = call(&state, send_req("xin chào", None)).await;
    let cookie = issued_cookie(&res).unwrap();

    let body = json_body(call(&state, get_req("/chat/status", Some(&cookie))).await).await;
    assert_eq!(body["request_limit"], 15);
    assert_eq!(body["remaining_requests"], 14);
    assert_eq!(body["history_length"], 2);
  }

  #[tokio::test]
  async fn status_without_generator() {
    let state = make_state(None, config(15)).await;
    let body = json_body(call(&state, get_req("/chat/status", None)).await).await;
    assert_eq!(body["model_initialized"], false);
    assert_eq!(body["history_length"], 0);
  }
}
