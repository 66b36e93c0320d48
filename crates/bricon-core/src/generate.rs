//! The text-generation seam.
//!
//! Implemented by `bricon-gemini`; the server depends only on this trait so
//! tests can substitute a canned generator.

use std::future::Future;

use serde::{Deserialize, Serialize};

/// Nucleus-sampling cut-off sent with every request.
pub const TOP_P: f32 = 0.9;
/// Top-k sampling cut-off sent with every request.
pub const TOP_K: u32 = 40;

/// A single-shot generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
  pub prompt:            String,
  pub temperature:       f32,
  pub max_output_tokens: u32,
  pub top_p:             f32,
  pub top_k:             u32,
}

impl GenerationRequest {
  pub fn new(prompt: String, temperature: f32, max_output_tokens: u32) -> Self {
    Self { prompt, temperature, max_output_tokens, top_p: TOP_P, top_k: TOP_K }
  }
}

/// A remote text-generation model.
pub trait TextGenerator: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Generate a completion. An empty string is a valid (blank) answer; the
  /// caller decides how to present it.
  fn generate(
    &self,
    request: GenerationRequest,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;
}
