//! Error types for `bricon-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("knowledge file unreadable: {0}")]
  Io(#[from] std::io::Error),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
