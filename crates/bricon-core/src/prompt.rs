//! Prompt mode selection and prompt assembly for the chatbot.
//!
//! Two verbosity tiers exist. `lite` keeps the system prompt short to save
//! tokens for small talk; `full` dumps the whole knowledge document and is
//! selected when the visitor asks about technical or after-sales topics.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  knowledge::{KnowledgeDocument, Product},
  session::{ChatMessage, Role},
};

// ─── Mode ────────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
  strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PromptMode {
  #[default]
  Lite,
  Full,
}

impl PromptMode {
  /// Output-token budget used when configuration does not override it.
  pub fn default_max_output_tokens(self) -> u32 {
    match self {
      PromptMode::Lite => 400,
      PromptMode::Full => 800,
    }
  }
}

/// Phrases that switch a request to [`PromptMode::Full`].
pub const TECH_KEYWORDS: &[&str] = &[
  "thông số",
  "kỹ thuật",
  "tds",
  "định mức",
  "độ bám",
  "bám dính",
  "hạn dùng",
  "hạn sử dụng",
  "date",
  "hsd",
  "đổi trả",
  "quy cách",
  "màu ron",
  "màu chà ron",
  "packaging",
  "bao bì",
  "ứng dụng",
  "hướng dẫn thi công",
];

/// `Full` if the lowercased message contains any [`TECH_KEYWORDS`] entry,
/// otherwise `default`.
pub fn pick_mode(message: &str, default: PromptMode) -> PromptMode {
  let lowered = message.to_lowercase();
  if TECH_KEYWORDS.iter().any(|k| lowered.contains(k)) {
    PromptMode::Full
  } else {
    default
  }
}

// ─── Defaults ────────────────────────────────────────────────────────────────

const DEFAULT_COMPANY: &str = "CÔNG TY TNHH BRICON VIỆT NAM";
const DEFAULT_SLOGAN: &str = "Kết dính bền lâu – Xây dựng niềm tin";
const DEFAULT_PHONE: &str = "0901.180.094";
const DEFAULT_HOTLINE: &str = "1900 63 62 94";
const DEFAULT_EMAIL: &str = "info@bricon.vn";
const DEFAULT_ADDRESS: &str = "171 Đường An Phú Đông 03, P. An Phú Đông, Q.12, TP.HCM";
const DEFAULT_WEBSITE: &str = "https://www.bricon.vn";
const DEFAULT_HOURS: &str = "8:00 - 17:30 (Thứ 2 - Thứ 7)";
const DEFAULT_RETURN_SUMMARY: &str = "Công ty có chính sách đổi trả linh hoạt";

const LITE_PRODUCTS: usize = 10;
const LITE_DESCRIPTION_CHARS: usize = 120;
const LITE_FAQ: usize = 5;
const LITE_ANSWER_CHARS: usize = 150;
const FULL_PROJECTS: usize = 15;

const NONE_MARK: &str = "—";

/// Contact block with company fallbacks applied.
struct ContactLines<'a> {
  company: &'a str,
  hotline: &'a str,
  zalo:    &'a str,
  email:   &'a str,
  address: &'a str,
  website: &'a str,
  hours:   &'a str,
}

impl<'a> ContactLines<'a> {
  fn from_document(doc: &'a KnowledgeDocument) -> Self {
    let c = &doc.contact;
    let phone = c.phone.as_deref().unwrap_or(DEFAULT_PHONE);
    Self {
      company: doc.company_name.as_deref().unwrap_or(DEFAULT_COMPANY),
      hotline: c.hotline.as_deref().unwrap_or(DEFAULT_HOTLINE),
      zalo:    c.zalo.as_deref().unwrap_or(phone),
      email:   c.email.as_deref().unwrap_or(DEFAULT_EMAIL),
      address: c.address.as_deref().unwrap_or(DEFAULT_ADDRESS),
      website: c.website.as_deref().unwrap_or(DEFAULT_WEBSITE),
      hours:   c.working_hours.as_deref().unwrap_or(DEFAULT_HOURS),
    }
  }
}

// ─── System prompt ───────────────────────────────────────────────────────────

/// Render the system prompt for `mode` from the knowledge document.
pub fn system_prompt(doc: &KnowledgeDocument, mode: PromptMode) -> String {
  match mode {
    PromptMode::Lite => lite_prompt(doc),
    PromptMode::Full => full_prompt(doc),
  }
}

fn truncate_chars(s: &str, max: usize) -> &str {
  match s.char_indices().nth(max) {
    Some((idx, _)) => &s[..idx],
    None => s,
  }
}

fn or_none(s: String) -> String {
  if s.is_empty() { NONE_MARK.to_owned() } else { s }
}

fn lite_prompt(doc: &KnowledgeDocument) -> String {
  let c = ContactLines::from_document(doc);

  let products = doc
    .products
    .iter()
    .take(LITE_PRODUCTS)
    .map(|p| {
      let desc = p.description.as_deref().unwrap_or("");
      format!(
        "• {}: {}",
        p.name.as_deref().unwrap_or("N/A"),
        truncate_chars(desc, LITE_DESCRIPTION_CHARS)
      )
    })
    .collect::<Vec<_>>()
    .join("\n");

  let faq = doc
    .faq
    .iter()
    .take(LITE_FAQ)
    .map(|q| {
      let answer = q.answer.as_deref().unwrap_or("");
      format!(
        "Q: {}\nA: {}",
        q.question.as_deref().unwrap_or(""),
        truncate_chars(answer, LITE_ANSWER_CHARS)
      )
    })
    .collect::<Vec<_>>()
    .join("\n");

  format!(
    "BẠN LÀ TRỢ LÝ ẢO {company}

LIÊN HỆ: Hotline {hotline} | Zalo {zalo} | Email {email}
Địa chỉ: {address} | {website}

SẢN PHẨM CHÍNH:
{products}

CÂU HỎI THƯỜNG GẶP:
{faq}

NGUYÊN TẮC:
1) Trả lời ngắn (2–4 câu), đúng trọng tâm
2) Không báo giá cụ thể; mời khách liên hệ hotline/Zalo
3) Thân thiện, chuyên nghiệp
4) Không chắc thì nói thật và đưa thông tin liên hệ",
    company = c.company,
    hotline = c.hotline,
    zalo = c.zalo,
    email = c.email,
    address = c.address,
    website = c.website,
  )
}

fn render_product(p: &Product) -> String {
  let mut out = format!("━━━ {} ━━━", p.name.as_deref().unwrap_or("N/A"));
  if let Some(category) = present(&p.category) {
    let _ = write!(out, "\n• Loại: {category}");
  }
  if let Some(description) = present(&p.description) {
    let _ = write!(out, "\n• Mô tả: {description}");
  }
  if !p.application.is_empty() {
    out.push_str("\n• Ứng dụng:");
    for a in &p.application {
      let _ = write!(out, "\n  - {a}");
    }
  }
  if !p.technical_specs.is_empty() {
    out.push_str("\n• Thông số kỹ thuật:");
    for (k, v) in &p.technical_specs {
      let _ = write!(out, "\n  - {k}: {}", plain(v));
    }
  }
  if let Some(packaging) = present(&p.packaging) {
    let _ = write!(out, "\n• Đóng gói: {packaging}");
  }
  if !p.colors.is_empty() {
    let _ = write!(out, "\n• Màu sắc: {}", p.colors.join(", "));
  }
  if let Some(expiry) = present(&p.expiry) {
    let _ = write!(out, "\n• Hạn sử dụng: {expiry}");
  }
  out
}

/// The field's text, unless it is missing or empty.
fn present(field: &Option<String>) -> Option<&str> {
  field.as_deref().filter(|s| !s.is_empty())
}

/// Strings render without JSON quotes; everything else as compact JSON.
fn plain(v: &Value) -> String {
  match v {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

fn full_prompt(doc: &KnowledgeDocument) -> String {
  let c = ContactLines::from_document(doc);
  let slogan = doc.slogan.as_deref().unwrap_or(DEFAULT_SLOGAN);
  let intro = doc.company_intro.as_deref().unwrap_or("");

  let branches = or_none(
    doc
      .contact
      .branches
      .iter()
      .map(|b| {
        format!(
          "• {}: {}",
          b.name.as_deref().unwrap_or("N/A"),
          b.address.as_deref().unwrap_or("N/A")
        )
      })
      .collect::<Vec<_>>()
      .join("\n"),
  );

  let products = or_none(doc.products.iter().map(render_product).collect::<Vec<_>>().join("\n"));

  let strengths = or_none(
    doc.strengths.iter().map(|s| format!("✓ {s}")).collect::<Vec<_>>().join("\n"),
  );

  let rp = &doc.return_policy;
  let return_summary = rp.policy_summary.as_deref().unwrap_or(DEFAULT_RETURN_SUMMARY);
  let mut conditions = String::new();
  for (heading, value) in &rp.conditions {
    match value {
      Value::Array(items) => {
        let _ = write!(conditions, "\n{heading}:");
        for item in items {
          let _ = write!(conditions, "\n  • {}", plain(item));
        }
      }
      other => {
        let _ = write!(conditions, "\n{heading}: {}", plain(other));
      }
    }
  }
  let notes = rp.note.iter().map(|n| format!("⚠ {n}")).collect::<Vec<_>>().join("\n");

  let process = or_none(
    doc
      .process
      .iter()
      .enumerate()
      .map(|(i, step)| format!("{}. {step}", i + 1))
      .collect::<Vec<_>>()
      .join("\n"),
  );

  let projects = or_none(
    doc
      .projects
      .iter()
      .take(FULL_PROJECTS)
      .map(|p| format!("• {p}"))
      .collect::<Vec<_>>()
      .join("\n"),
  );

  let faq = or_none(
    doc
      .faq
      .iter()
      .map(|q| {
        format!(
          "Hỏi: {}\nĐáp: {}\n",
          q.question.as_deref().unwrap_or(""),
          q.answer.as_deref().unwrap_or("")
        )
      })
      .collect::<Vec<_>>()
      .join("\n"),
  );

  format!(
    "BẠN LÀ TRỢ LÝ ẢO {company} - CHUYÊN GIA VẬT LIỆU XÂY DỰNG

{company} | {slogan}
Hotline {hotline} | Zalo {zalo} | Email {email} | {website}
Địa chỉ: {address} | Giờ làm việc: {hours}

GIỚI THIỆU:
{intro}

— HỆ THỐNG CHI NHÁNH —
{branches}

— DANH MỤC SẢN PHẨM CHI TIẾT —
{products}

— ƯU ĐIỂM NỔI BẬT —
{strengths}

— CHÍNH SÁCH ĐỔI TRẢ —
{return_summary}
Điều kiện:{conditions}
{notes}

— QUY TRÌNH ĐẶT HÀNG —
{process}

— DỰ ÁN TIÊU BIỂU —
{projects}

— CÂU HỎI THƯỜNG GẶP —
{faq}

NGUYÊN TẮC TRẢ LỜI:
1) Trả lời trực tiếp, đúng trọng tâm
2) Không nêu giá; hướng dẫn liên hệ {hotline} hoặc Zalo {zalo}
3) Thân thiện, chuyên nghiệp; chỉ hỏi thêm khi thật sự cần",
    company = c.company,
    hotline = c.hotline,
    zalo = c.zalo,
    email = c.email,
    address = c.address,
    website = c.website,
    hours = c.hours,
  )
}

// ─── Final payload ───────────────────────────────────────────────────────────

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Format history entries as `Khách:` / `Bot:` lines.
pub fn history_block<'a>(history: impl IntoIterator<Item = &'a ChatMessage>) -> String {
  history
    .into_iter()
    .map(|m| {
      let who = match m.role {
        Role::User => "Khách",
        Role::Assistant => "Bot",
      };
      format!("{who}: {}", m.content)
    })
    .collect::<Vec<_>>()
    .join("\n")
}

/// Concatenate the system prompt, conversation so far, and the new message
/// into the text sent to the model.
pub fn compose(system: &str, history: &str, message: &str) -> String {
  let history = if history.is_empty() { "(Hội thoại mới)" } else { history };
  format!(
    "{system}

{RULE}
LỊCH SỬ HỘI THOẠI:
{history}

{RULE}
TIN NHẮN MỚI:
{message}

{RULE}
TRẢ LỜI (tuân thủ nguyên tắc ở trên):
"
  )
}
