//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.
//! Timestamps use `tokio::time::Instant` so expiry follows the runtime clock.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;

use crate::cache::MAX_TTL;

// == Cache Entry ==
/// A stored value with its creation time and TTL.
///
/// Entries are never mutated in place; a refresh replaces the whole entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored payload
    pub value: Value,
    /// Insertion time
    pub created_at: Instant,
    /// Time-to-live
    pub ttl: Duration,
    /// Always `created_at + ttl`
    pub expires_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry stamped with the current time.
    pub fn new(value: Value, ttl: Duration) -> Self {
        Self::created_at(value, ttl, Instant::now())
    }

    /// Creates an entry with an explicit creation time.
    ///
    /// `ttl` is clamped to [`MAX_TTL`].
    pub fn created_at(value: Value, ttl: Duration, created_at: Instant) -> Self {
        let ttl = ttl.min(MAX_TTL);
        Self {
            value,
            created_at,
            ttl,
            expires_at: created_at + ttl,
        }
    }

    // == Is Expired ==
    /// An entry is expired once `now >= expires_at`.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Time elapsed since the entry was written.
    pub fn age_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    /// Remaining lifetime, zero once expired.
    pub fn ttl_remaining_at(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }

    /// Whether the entry has lived past `threshold` (0.0..=1.0) of `ttl`.
    pub fn needs_refresh_at(&self, now: Instant, ttl: Duration, threshold: f64) -> bool {
        self.age_at(now) >= ttl.mul_f64(threshold.clamp(0.0, 1.0))
    }

    /// Metadata view of this entry.
    pub fn info(&self, key: &str, now: Instant) -> EntryInfo {
        EntryInfo {
            key: key.to_string(),
            value: self.value.clone(),
            age_ms: self.age_at(now).as_millis() as u64,
            ttl_ms: self.ttl.as_millis() as u64,
            ttl_remaining_ms: self.ttl_remaining_at(now).as_millis() as u64,
        }
    }
}

// == Entry Info ==
/// Read-only snapshot of an entry's metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryInfo {
    pub key: String,
    pub value: Value,
    pub age_ms: u64,
    pub ttl_ms: u64,
    pub ttl_remaining_ms: u64,
}
