//! Error type for `bricon-gemini`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("gemini returned {status}: {body}")]
  Api { status: u16, body: String },

  #[error("prompt blocked: {0}")]
  Blocked(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
