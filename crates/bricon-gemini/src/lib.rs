//! Gemini `generateContent` client implementing [`TextGenerator`].
//!
//! Only the text-in / text-out subset of the API is modelled.

pub mod error;

use std::time::Duration;

use bricon_core::generate::{GenerationRequest, TextGenerator};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub use error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-lite";

/// Harm categories sent with every request, all set to `BLOCK_NONE`.
const SAFETY_CATEGORIES: [&str; 4] = [
  "HARM_CATEGORY_HARASSMENT",
  "HARM_CATEGORY_HATE_SPEECH",
  "HARM_CATEGORY_SEXUALLY_EXPLICIT",
  "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Connection settings for the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
  pub api_key:  String,
  pub model:    String,
  pub base_url: String,
  pub timeout:  Duration,
}

impl GeminiConfig {
  pub fn new(api_key: impl Into<String>) -> Self {
    Self {
      api_key:  api_key.into(),
      model:    DEFAULT_MODEL.to_owned(),
      base_url: DEFAULT_BASE_URL.to_owned(),
      timeout:  Duration::from_secs(30),
    }
  }
}

/// Async client for Gemini text generation.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct GeminiClient {
  client: Client,
  config: GeminiConfig,
}

impl GeminiClient {
  pub fn new(config: GeminiConfig) -> Result<Self> {
    let client = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { client, config })
  }

  pub fn model(&self) -> &str { &self.config.model }

  fn url(&self) -> String {
    format!(
      "{}/v1beta/models/{}:generateContent",
      self.config.base_url.trim_end_matches('/'),
      self.config.model
    )
  }
}

impl TextGenerator for GeminiClient {
  type Error = Error;

  async fn generate(&self, request: GenerationRequest) -> Result<String> {
    let body = GenerateBody::from_request(&request);

    let resp = self
      .client
      .post(self.url())
      .header("x-goog-api-key", &self.config.api_key)
      .json(&body)
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(Error::Api { status: status.as_u16(), body });
    }

    let parsed: GenerateResponse = resp.json().await?;
    tracing::debug!(model = %self.config.model, "gemini response received");
    parsed.into_text()
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody<'a> {
  contents:          Vec<Content<'a>>,
  generation_config: GenerationConfig,
  safety_settings:   Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
  role:  &'static str,
  parts: Vec<PartOut<'a>>,
}

#[derive(Debug, Serialize)]
struct PartOut<'a> {
  text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  temperature:       f32,
  max_output_tokens: u32,
  top_p:             f32,
  top_k:             u32,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
  category:  &'static str,
  threshold: &'static str,
}

impl<'a> GenerateBody<'a> {
  fn from_request(req: &'a GenerationRequest) -> Self {
    Self {
      contents:          vec![Content {
        role:  "user",
        parts: vec![PartOut { text: &req.prompt }],
      }],
      generation_config: GenerationConfig {
        temperature:       req.temperature,
        max_output_tokens: req.max_output_tokens,
        top_p:             req.top_p,
        top_k:             req.top_k,
      },
      safety_settings:   SAFETY_CATEGORIES
        .iter()
        .map(|&category| SafetySetting { category, threshold: "BLOCK_NONE" })
        .collect(),
    }
  }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct GenerateResponse {
  candidates:      Vec<Candidate>,
  prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
  content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
  parts: Vec<PartIn>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PartIn {
  text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PromptFeedback {
  block_reason: Option<String>,
}

impl GenerateResponse {
  /// Concatenated text of the first candidate. A response with no candidates
  /// is an error only when the prompt itself was blocked.
  fn into_text(self) -> Result<String> {
    if self.candidates.is_empty()
      && let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason)
    {
      return Err(Error::Blocked(reason));
    }

    Ok(
      self
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
        .unwrap_or_default(),
    )
  }
}
