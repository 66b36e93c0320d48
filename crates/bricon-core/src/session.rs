//! Per-visitor chat state: a fixed-window request quota plus a bounded
//! conversation history.
//!
//! A [`ChatSession`] is loaded at the start of a chat request, mutated in
//! memory, and written back once. Sessions never share state with each
//! other.

use std::collections::VecDeque;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Maximum number of messages retained in a session's history.
pub const MAX_HISTORY: usize = 20;

// ─── Messages ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  User,
  Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub role:    Role,
  pub content: String,
}

impl ChatMessage {
  pub fn user(content: impl Into<String>) -> Self {
    Self { role: Role::User, content: content.into() }
  }

  pub fn assistant(content: impl Into<String>) -> Self {
    Self { role: Role::Assistant, content: content.into() }
  }
}

// ─── Quota ───────────────────────────────────────────────────────────────────

/// Requests allowed per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
  pub limit:  u32,
  pub window: TimeDelta,
}

/// Outcome of [`ChatSession::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
  Allowed { remaining: u32 },
  QuotaExceeded,
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
  pub request_count: u32,
  pub window_start:  DateTime<Utc>,
  pub history:       VecDeque<ChatMessage>,
}

impl ChatSession {
  /// A fresh session whose window opens at `now`.
  pub fn new(now: DateTime<Utc>) -> Self {
    Self { request_count: 0, window_start: now, history: VecDeque::new() }
  }

  /// Count one request against the quota.
  ///
  /// An expired window is reopened at `now` first. A rejected request leaves
  /// the count and history as they were.
  pub fn admit(&mut self, now: DateTime<Utc>, rate: &RateLimit) -> Admission {
    if now - self.window_start > rate.window {
      self.request_count = 0;
      self.window_start = now;
    }

    if self.request_count >= rate.limit {
      return Admission::QuotaExceeded;
    }

    self.request_count += 1;
    Admission::Allowed { remaining: rate.limit - self.request_count }
  }

  /// Requests still available at `now`, without consuming one.
  pub fn remaining(&self, now: DateTime<Utc>, rate: &RateLimit) -> u32 {
    if now - self.window_start > rate.window {
      rate.limit
    } else {
      rate.limit.saturating_sub(self.request_count)
    }
  }

  /// Append a user/assistant exchange, dropping the oldest entries beyond
  /// [`MAX_HISTORY`].
  pub fn record_exchange(&mut self, user: impl Into<String>, reply: impl Into<String>) {
    self.history.push_back(ChatMessage::user(user));
    self.history.push_back(ChatMessage::assistant(reply));
    while self.history.len() > MAX_HISTORY {
      self.history.pop_front();
    }
  }

  /// The last `n` messages, oldest first.
  pub fn recent(&self, n: usize) -> impl Iterator<Item = &ChatMessage> {
    self.history.iter().skip(self.history.len().saturating_sub(n))
  }

  /// Clear the quota and history unconditionally.
  pub fn reset(&mut self, now: DateTime<Utc>) {
    self.request_count = 0;
    self.window_start = now;
    self.history.clear();
  }
}
