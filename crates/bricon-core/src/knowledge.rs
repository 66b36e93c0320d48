//! The company knowledge document fed to the chatbot, and its file-backed
//! cache.
//!
//! The document is a hand-edited JSON file. Every field is optional so a
//! partially-filled file still produces a usable prompt.

use std::{
  fs,
  path::{Path, PathBuf},
  sync::{Arc, PoisonError, RwLock},
  time::SystemTime,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;

// ─── Document ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeDocument {
  pub company_name:  Option<String>,
  pub slogan:        Option<String>,
  pub company_intro: Option<String>,
  pub contact:       Contact,
  pub products:      Vec<Product>,
  pub strengths:     Vec<String>,
  pub faq:           Vec<FaqEntry>,
  pub return_policy: ReturnPolicy,
  /// Ordering steps, rendered as a numbered list.
  pub process:       Vec<String>,
  pub projects:      Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
  pub phone:         Option<String>,
  pub hotline:       Option<String>,
  pub email:         Option<String>,
  pub zalo:          Option<String>,
  pub address:       Option<String>,
  pub website:       Option<String>,
  pub working_hours: Option<String>,
  pub branches:      Vec<Branch>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Branch {
  pub name:    Option<String>,
  pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
  pub name:            Option<String>,
  pub category:        Option<String>,
  pub description:     Option<String>,
  pub application:     Vec<String>,
  /// Spec name → value, in file order.
  pub technical_specs: Map<String, Value>,
  pub packaging:       Option<String>,
  pub colors:          Vec<String>,
  pub expiry:          Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaqEntry {
  pub question: Option<String>,
  pub answer:   Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReturnPolicy {
  pub policy_summary: Option<String>,
  /// Condition heading → either a sentence or a list of bullet points.
  pub conditions:     Map<String, Value>,
  pub note:           Vec<String>,
}

impl KnowledgeDocument {
  pub fn from_json(raw: &str) -> Result<Self> { Ok(serde_json::from_str(raw)?) }
}

// ─── Cache ───────────────────────────────────────────────────────────────────

struct Loaded {
  modified: SystemTime,
  document: Arc<KnowledgeDocument>,
}

/// Parsed copy of the knowledge file, keyed by the file's modification time.
///
/// [`load`](Self::load) never fails: on any I/O or parse error it logs and
/// falls back to the last good copy, or to an empty document.
pub struct KnowledgeCache {
  path: PathBuf,
  slot: RwLock<Option<Loaded>>,
}

impl KnowledgeCache {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into(), slot: RwLock::new(None) }
  }

  pub fn path(&self) -> &Path { &self.path }

  /// Return the current document, re-reading the file only when its
  /// modification time has changed since the last successful load.
  pub fn load(&self) -> Arc<KnowledgeDocument> {
    match self.try_load() {
      Ok(document) => document,
      Err(e) => {
        tracing::error!(path = %self.path.display(), error = %e, "failed to load knowledge document");
        self.cached().unwrap_or_default()
      }
    }
  }

  fn try_load(&self) -> Result<Arc<KnowledgeDocument>> {
    let modified = fs::metadata(&self.path)?.modified()?;

    if let Some(document) = self.cached_at(modified) {
      return Ok(document);
    }

    let raw = fs::read_to_string(&self.path)?;
    let document = Arc::new(KnowledgeDocument::from_json(&raw)?);

    *self.slot.write().unwrap_or_else(PoisonError::into_inner) =
      Some(Loaded { modified, document: Arc::clone(&document) });
    tracing::info!(path = %self.path.display(), ?modified, "loaded knowledge document");

    Ok(document)
  }

  fn cached(&self) -> Option<Arc<KnowledgeDocument>> {
    self
      .slot
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .as_ref()
      .map(|l| Arc::clone(&l.document))
  }

  fn cached_at(&self, modified: SystemTime) -> Option<Arc<KnowledgeDocument>> {
    self
      .slot
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .as_ref()
      .filter(|l| l.modified == modified)
      .map(|l| Arc::clone(&l.document))
  }
}

#[cfg(test)]
mod tests {
  use std::{
    fs::File,
    io::Write as _,
    time::{Duration, UNIX_EPOCH},
  };

  use tempfile::TempDir;

  use super::*;

  const SAMPLE: &str = r#"{
    "company_name": "Bricon",
    "contact": { "hotline": "1900 1234", "branches": [{ "name": "HCM", "address": "Q.12" }] },
    "products": [{
      "name": "Keo dán gạch",
      "technical_specs": { "Độ bám dính": "≥ 1 N/mm²", "Thời gian mở": "20 phút" },
      "colors": ["xám", "trắng"]
    }],
    "return_policy": { "conditions": { "Thời hạn": "7 ngày", "Yêu cầu": ["còn nguyên bao", "có hoá đơn"] } }
  }"#;

  fn write_file(path: &Path, body: &str, modified_secs: u64) {
    let mut f = File::create(path).unwrap();
    f.write_all(body.as_bytes()).unwrap();
    f.set_modified(UNIX_EPOCH + Duration::from_secs(modified_secs)).unwrap();
  }

  #[test]
  fn parses_partial_document() {
    let doc = KnowledgeDocument::from_json(SAMPLE).unwrap();
    assert_eq!(doc.company_name.as_deref(), Some("Bricon"));
    assert_eq!(doc.contact.hotline.as_deref(), Some("1900 1234"));
    assert!(doc.contact.email.is_none());
    let specs: Vec<&String> = doc.products[0].technical_specs.keys().collect();
    assert_eq!(specs, ["Độ bám dính", "Thời gian mở"]);
    assert!(doc.faq.is_empty());
  }

  #[test]
  fn unchanged_file_returns_cached_object() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("company_info.json");
    write_file(&path, SAMPLE, 1_000);

    let cache = KnowledgeCache::new(&path);
    let first = cache.load();
    let second = cache.load();
    assert!(Arc::ptr_eq(&first, &second));
  }

  #[test]
  fn changed_mtime_triggers_reparse() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("company_info.json");
    write_file(&path, SAMPLE, 1_000);

    let cache = KnowledgeCache::new(&path);
    let first = cache.load();

    write_file(&path, r#"{ "company_name": "Bricon Mới" }"#, 2_000);
    let second = cache.load();

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(second.company_name.as_deref(), Some("Bricon Mới"));
  }

  #[test]
  fn invalid_json_keeps_last_good_copy() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("company_info.json");
    write_file(&path, SAMPLE, 1_000);

    let cache = KnowledgeCache::new(&path);
    let good = cache.load();

    write_file(&path, "{ not json", 2_000);
    let after = cache.load();
    assert!(Arc::ptr_eq(&good, &after));
  }

  #[test]
  fn missing_file_yields_empty_document() {
    let dir = TempDir::new().unwrap();
    let cache = KnowledgeCache::new(dir.path().join("absent.json"));
    assert_eq!(*cache.load(), KnowledgeDocument::default());
  }
}
