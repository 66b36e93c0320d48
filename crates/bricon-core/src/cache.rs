//! A single-slot cache with a time-to-live.
//!
//! The cache holds one value and the instant it was computed. It is owned at
//! application scope (typically behind an `Arc` in server state) and shared
//! by every request.
//!
//! Concurrent refreshes are not coalesced: two requests that both observe a
//! stale slot will both recompute, and the last writer wins. Values are
//! replaced whole, so readers never see a partially-updated collection.
//!
//! An [`invalidate`](TtlCache::invalidate) that lands while a refresh is in
//! flight wins over it: the refreshed value is returned to its caller but
//! not stored, because it may have been read before the write that caused
//! the invalidation.

use std::{
  future::Future,
  sync::{
    Arc, PoisonError, RwLock,
    atomic::{AtomicU64, Ordering},
  },
  time::{Duration, Instant},
};

struct Slot<T> {
  value:        Arc<T>,
  refreshed_at: Instant,
}

/// A lazily-refreshed value with a staleness bound.
///
/// A `ttl` of zero disables caching: every [`get_or_refresh`] recomputes.
///
/// [`get_or_refresh`]: TtlCache::get_or_refresh
pub struct TtlCache<T> {
  ttl:        Duration,
  slot:       RwLock<Option<Slot<T>>>,
  /// Bumped by every `invalidate`, under the slot's write lock.
  generation: AtomicU64,
}

impl<T> TtlCache<T> {
  pub fn new(ttl: Duration) -> Self {
    Self { ttl, slot: RwLock::new(None), generation: AtomicU64::new(0) }
  }

  pub fn ttl(&self) -> Duration { self.ttl }

  /// Return the cached value if it is still fresh at `now`.
  pub fn get(&self, now: Instant) -> Option<Arc<T>> {
    let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
    slot
      .as_ref()
      .filter(|s| !self.is_stale(s.refreshed_at, now))
      .map(|s| Arc::clone(&s.value))
  }

  /// Return the cached value, recomputing it with `refresh` first if the slot
  /// is empty or stale at `now`.
  ///
  /// A failed refresh leaves the previous slot untouched and returns the
  /// error. A refresh overtaken by [`invalidate`](Self::invalidate) is
  /// returned but not stored.
  pub async fn get_or_refresh<F, Fut, E>(
    &self,
    now: Instant,
    refresh: F,
  ) -> Result<Arc<T>, E>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    if let Some(value) = self.get(now) {
      return Ok(value);
    }

    let generation = self.generation.load(Ordering::Acquire);
    let value = Arc::new(refresh().await?);
    self.put(Arc::clone(&value), now, generation);
    Ok(value)
  }

  /// Drop the cached value; the next lookup recomputes. Refreshes already
  /// in flight will not repopulate the slot.
  pub fn invalidate(&self) {
    let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
    self.generation.fetch_add(1, Ordering::AcqRel);
    *slot = None;
  }

  /// When the slot was last refreshed, if it holds a value.
  pub fn refreshed_at(&self) -> Option<Instant> {
    self
      .slot
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .as_ref()
      .map(|s| s.refreshed_at)
  }

  /// Store `value` unless the cache was invalidated after `generation` was
  /// read.
  fn put(&self, value: Arc<T>, now: Instant, generation: u64) {
    let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
    if self.generation.load(Ordering::Acquire) == generation {
      *slot = Some(Slot { value, refreshed_at: now });
    }
  }

  fn is_stale(&self, refreshed_at: Instant, now: Instant) -> bool {
    self.ttl.is_zero() || now.saturating_duration_since(refreshed_at) > self.ttl
  }
}
