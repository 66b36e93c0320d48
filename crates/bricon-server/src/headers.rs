//! Security headers added to every response.
//!
//! `Strict-Transport-Security` is only sent when the deployment is marked as
//! HTTPS through `session_cookie_secure`.

use axum::{
  extract::{Request, State},
  http::{HeaderName, HeaderValue, header},
  middleware::Next,
  response::Response,
};

const PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");

/// Whether the site is served over HTTPS.
#[derive(Debug, Clone, Copy)]
pub struct Https(pub bool);

pub async fn security_headers(
  State(Https(https)): State<Https>,
  req: Request,
  next: Next,
) -> Response {
  let mut res = next.run(req).await;
  let h = res.headers_mut();
  h.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
  h.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
  h.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
  h.insert(
    header::REFERRER_POLICY,
    HeaderValue::from_static("strict-origin-when-cross-origin"),
  );
  h.insert(
    PERMISSIONS_POLICY,
    HeaderValue::from_static("geolocation=(), microphone=(), camera=()"),
  );
  if https {
    h.insert(
      header::STRICT_TRANSPORT_SECURITY,
      HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
  }
  res
}
