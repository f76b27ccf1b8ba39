//! Cache Store Module
//!
//! Cache-aside engine: TTL-expiring entries, single-flight population and
//! pattern-based bulk invalidation. All state sits behind one mutex that is
//! never held across an `.await`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::FutureExt;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::flight::{run_compute, Flight, InFlight};
use crate::cache::key::{validate_key, KeyPattern};
use crate::cache::{CacheEntry, CacheStats, EntryInfo, LruTracker, Ttl, TtlTiers, MAX_TTL};
use crate::config::Config;
use crate::error::{CacheError, Result};

// == Store Settings ==
/// Construction-time parameters of a [`CacheStore`].
#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Maximum number of entries; the least recently used is evicted beyond it
    pub max_entries: usize,
    /// TTL used for [`Ttl::Default`]
    pub default_ttl: Duration,
    /// Durations of the named tiers
    pub tiers: TtlTiers,
    /// Fraction of the TTL after which background refresh kicks in
    pub refresh_threshold: f64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            max_entries: 100,
            default_ttl: Duration::from_secs(300),
            tiers: TtlTiers::default(),
            refresh_threshold: 0.8,
        }
    }
}

impl From<&Config> for StoreSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_entries: config.max_entries,
            default_ttl: Duration::from_secs(config.default_ttl),
            tiers: config.ttl_tiers,
            refresh_threshold: config.refresh_threshold,
        }
    }
}

// == Store State ==
#[derive(Debug, Default)]
struct StoreState {
    entries: HashMap<String, CacheEntry>,
    in_flight: HashMap<String, InFlight>,
    lru: LruTracker,
    stats: CacheStats,
    next_generation: u64,
}

impl StoreState {
    /// Returns the live value for `key`.
    ///
    /// An expired entry stays in place, invisible to readers, until it is
    /// replaced or swept, so a failed recomputation leaves it untouched.
    fn live_value(&mut self, key: &str, now: Instant) -> Option<Value> {
        let entry = self.entries.get(key).filter(|entry| !entry.is_expired_at(now))?;
        let value = entry.value.clone();
        self.lru.touch(key);
        Some(value)
    }

    fn remove_entry(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.lru.remove(key);
            true
        } else {
            false
        }
    }

    fn insert(&mut self, key: String, entry: CacheEntry, max_entries: usize) {
        if !self.entries.contains_key(&key) && self.entries.len() >= max_entries {
            self.purge_expired(entry.created_at);
            while self.entries.len() >= max_entries {
                let Some(victim) = self.lru.pop_least_recent() else {
                    break;
                };
                self.entries.remove(&victim);
                self.stats.record_eviction();
                debug!(key = %victim, "evicted least recently used entry");
            }
        }

        self.lru.touch(&key);
        self.entries.insert(key, entry);
    }

    fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - self.entries.len();

        if removed > 0 {
            let entries = &self.entries;
            self.lru.retain(|key| entries.contains_key(key));
            self.stats.record_expirations(removed);
        }
        removed
    }

    fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// Clears the in-flight record if it still belongs to `generation`.
    fn release_flight(&mut self, key: &str, generation: u64) -> bool {
        let current = self
            .in_flight
            .get(key)
            .is_some_and(|in_flight| in_flight.generation == generation);
        if current {
            self.in_flight.remove(key);
        }
        current
    }

    fn settle(
        &mut self,
        key: &str,
        generation: u64,
        ttl: Duration,
        result: &Result<Value>,
        max_entries: usize,
    ) {
        let current = self.release_flight(key, generation);

        match result {
            Ok(value) if current => {
                self.insert(key.to_string(), CacheEntry::new(value.clone(), ttl), max_entries);
                debug!(key, generation, ttl_ms = ttl.as_millis() as u64, "cached computed value");
            }
            Ok(_) => {
                debug!(key, generation, "discarding value of detached computation");
            }
            Err(err) => {
                self.stats.record_compute_failure();
                warn!(key, generation, error = %err, "computation failed, nothing cached");
            }
        }
    }
}

// == Cache Store ==
/// Shared cache handle.
///
/// Cloning is cheap and every clone operates on the same entries, so one
/// store created at startup can be handed to every caller.
#[derive(Debug, Clone)]
pub struct CacheStore {
    state: Arc<Mutex<StoreState>>,
    settings: Arc<StoreSettings>,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::with_settings(StoreSettings::default())
    }
}

impl CacheStore {
    // == Constructors ==
    /// Creates a store with the given capacity and default TTL and the
    /// standard tier durations.
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self::with_settings(StoreSettings {
            max_entries,
            default_ttl,
            ..StoreSettings::default()
        })
    }

    /// Creates a store from explicit settings.
    ///
    /// `max_entries` is raised to at least 1 and `refresh_threshold` is
    /// clamped to `0.0..=1.0`.
    pub fn with_settings(mut settings: StoreSettings) -> Self {
        settings.max_entries = settings.max_entries.max(1);
        settings.refresh_threshold = settings.refresh_threshold.clamp(0.0, 1.0);
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            settings: Arc::new(settings),
        }
    }

    /// Creates a store from the environment-driven [`Config`].
    pub fn from_config(config: &Config) -> Self {
        Self::with_settings(StoreSettings::from(config))
    }

    /// Settings in effect after sanitizing.
    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    fn resolve_ttl(&self, ttl: Ttl) -> Result<Duration> {
        self.settings.tiers.resolve(ttl, self.settings.default_ttl)
    }

    // == Get Or Set ==
    /// Returns the cached value for `key`, computing and caching it on a miss.
    ///
    /// Concurrent callers for the same key share a single invocation of
    /// `compute`. A failed computation is returned to every waiter and leaves
    /// the cache as it was.
    pub async fn get_or_set<T, F, Fut>(&self, key: &str, ttl: impl Into<Ttl>, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let value = self
            .get_or_set_value(key, ttl, move || async move {
                let typed = compute().await?;
                Ok::<Value, anyhow::Error>(serde_json::to_value(typed)?)
            })
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Untyped form of [`CacheStore::get_or_set`].
    pub async fn get_or_set_value<F, Fut>(
        &self,
        key: &str,
        ttl: impl Into<Ttl>,
        compute: F,
    ) -> Result<Value>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        validate_key(key)?;
        let ttl = self.resolve_ttl(ttl.into())?;

        let flight = {
            let mut state = self.state.lock();
            if let Some(value) = state.live_value(key, Instant::now()) {
                state.stats.record_hit();
                return Ok(value);
            }

            match state.in_flight.get(key) {
                Some(in_flight) => {
                    let flight = in_flight.flight.clone();
                    state.stats.record_coalesced();
                    flight
                }
                None => {
                    state.stats.record_miss();
                    self.launch(&mut state, key, ttl, compute)
                }
            }
        };

        flight.await
    }

    // == Background Refresh ==
    /// Stale-while-revalidate read.
    ///
    /// A live entry older than `refresh_threshold` of the `ttl` passed here
    /// is returned immediately while a single-flight refresh runs in the
    /// background. The stored entry's own TTL only decides whether it is live.
    /// Without a live entry this behaves like [`CacheStore::get_or_set`].
    pub async fn get_with_background_refresh<T, F, Fut>(
        &self,
        key: &str,
        ttl: impl Into<Ttl>,
        compute: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let value = self
            .get_with_background_refresh_value(key, ttl, move || async move {
                let typed = compute().await?;
                Ok::<Value, anyhow::Error>(serde_json::to_value(typed)?)
            })
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Untyped form of [`CacheStore::get_with_background_refresh`].
    pub async fn get_with_background_refresh_value<F, Fut>(
        &self,
        key: &str,
        ttl: impl Into<Ttl>,
        compute: F,
    ) -> Result<Value>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        validate_key(key)?;
        let ttl = self.resolve_ttl(ttl.into())?;

        {
            let mut state = self.state.lock();
            let now = Instant::now();
            if let Some(value) = state.live_value(key, now) {
                state.stats.record_hit();

                let ageing = state
                    .entries
                    .get(key)
                    .is_some_and(|entry| entry.needs_refresh_at(now, ttl, self.settings.refresh_threshold));
                if ageing && !state.in_flight.contains_key(key) {
                    state.stats.record_background_refresh();
                    debug!(key, "refreshing ageing entry in background");
                    // The spawned computation settles on its own.
                    let _ = self.launch(&mut state, key, ttl, compute);
                }
                return Ok(value);
            }
        }

        self.get_or_set_value(key, ttl, compute).await
    }

    /// Registers and spawns the computation for `key`.
    ///
    /// Must be called with the state lock held so that the check for an
    /// existing flight and the registration of this one are atomic.
    fn launch<F, Fut>(&self, state: &mut StoreState, key: &str, ttl: Duration, compute: F) -> Flight
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        let generation = state.next_generation();
        state.stats.record_computation();
        debug!(key, generation, "cache miss, starting computation");

        let task_store = self.clone();
        let task_key = key.to_string();
        let handle = tokio::spawn(async move {
            let result = run_compute(compute).await;
            task_store.state.lock().settle(
                &task_key,
                generation,
                ttl,
                &result,
                task_store.settings.max_entries,
            );
            result
        });

        let join_store = self.clone();
        let join_key = key.to_string();
        let flight = async move {
            match handle.await {
                Ok(result) => result,
                Err(join_error) => {
                    join_store.state.lock().release_flight(&join_key, generation);
                    Err(CacheError::Internal(format!(
                        "computation for '{}' did not complete: {}",
                        join_key, join_error
                    )))
                }
            }
        }
        .boxed()
        .shared();

        state.in_flight.insert(
            key.to_string(),
            InFlight {
                generation,
                flight: flight.clone(),
            },
        );
        flight
    }

    // == Direct Access ==
    /// Stores `value` under `key`, replacing any existing entry.
    ///
    /// A computation already in flight for `key` is left running; when it
    /// succeeds its result replaces this value. Use [`CacheStore::invalidate`]
    /// first to discard it.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: impl Into<Ttl>) -> Result<()> {
        validate_key(key)?;
        let ttl = self.resolve_ttl(ttl.into())?;
        let value = serde_json::to_value(value)?;

        let mut state = self.state.lock();
        state.insert(
            key.to_string(),
            CacheEntry::new(value, ttl),
            self.settings.max_entries,
        );
        Ok(())
    }

    /// Returns the live value for `key`, if any. Counts as a hit or miss.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        validate_key(key)?;

        let value = {
            let mut state = self.state.lock();
            let value = state.live_value(key, Instant::now());
            if value.is_some() {
                state.stats.record_hit();
            } else {
                state.stats.record_miss();
            }
            value
        };

        value
            .map(serde_json::from_value)
            .transpose()
            .map_err(CacheError::from)
    }

    /// Entry metadata without touching recency or statistics.
    pub fn inspect(&self, key: &str) -> Result<Option<EntryInfo>> {
        validate_key(key)?;
        let now = Instant::now();
        let state = self.state.lock();
        Ok(state
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.info(key, now)))
    }

    // == Invalidate ==
    /// Removes the entry for `key`. Removing an absent key is a no-op.
    ///
    /// A computation in flight for `key` keeps serving its current waiters
    /// but its result is not written back.
    pub fn invalidate(&self, key: &str) -> Result<bool> {
        validate_key(key)?;

        let mut state = self.state.lock();
        state.in_flight.remove(key);
        let removed = state.remove_entry(key);
        if removed {
            state.stats.record_invalidations(1);
        }
        debug!(key, removed, "invalidated key");
        Ok(removed)
    }

    // == Invalidate Pattern ==
    /// Removes every entry whose key matches `pattern` and returns the count.
    pub fn invalidate_pattern(&self, pattern: &str) -> Result<usize> {
        let pattern = KeyPattern::parse(pattern)?;
        Ok(self.invalidate_matching(&pattern))
    }

    /// Removes every entry matching an already parsed pattern, such as
    /// [`crate::cache::CacheKey::owner_pattern`], and returns the count.
    pub fn invalidate_matching(&self, pattern: &KeyPattern) -> usize {
        let mut state = self.state.lock();

        let doomed: Vec<String> = state
            .entries
            .keys()
            .filter(|key| pattern.matches(key))
            .cloned()
            .collect();
        for key in &doomed {
            state.remove_entry(key);
        }
        state.in_flight.retain(|key, _| !pattern.matches(key));

        let removed = doomed.len();
        state.stats.record_invalidations(removed);
        info!(pattern = %pattern, removed, "invalidated keys matching pattern");
        removed
    }

    // == Maintenance ==
    /// Drops every entry, detaches all computations and resets statistics.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let removed = state.entries.len();
        state.entries.clear();
        state.in_flight.clear();
        state.lru.clear();
        state.stats = CacheStats::new();
        info!(removed, "cache cleared");
    }

    /// Removes all expired entries and returns how many were dropped.
    pub fn cleanup_expired(&self) -> usize {
        self.state.lock().purge_expired(Instant::now())
    }

    /// Current counters together with entry and in-flight totals.
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        let mut stats = state.stats.clone();
        stats.total_entries = state.entries.len();
        stats.in_flight = state.in_flight.len();
        stats
    }

    /// Zeroes the counters without touching entries.
    pub fn reset_stats(&self) {
        self.state.lock().stats = CacheStats::new();
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether no entries are stored, expired or not.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a computation for `key` is registered and will write back.
    pub fn is_in_flight(&self, key: &str) -> bool {
        self.state.lock().in_flight.contains_key(key)
    }

    // == Snapshot Support ==
    /// Live entries as `(key, value, ttl, remaining)`.
    pub(crate) fn export_live(&self) -> Vec<(String, Value, Duration, Duration)> {
        let now = Instant::now();
        let state = self.state.lock();
        state
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, entry)| {
                (
                    key.clone(),
                    entry.value.clone(),
                    entry.ttl,
                    entry.ttl_remaining_at(now),
                )
            })
            .collect()
    }

    /// Inserts an entry that expires after `remaining` while keeping its
    /// original `ttl` for age calculations.
    pub(crate) fn restore(&self, key: String, value: Value, ttl: Duration, remaining: Duration) {
        let now = Instant::now();
        let ttl = ttl.min(MAX_TTL);
        let remaining = remaining.min(MAX_TTL);
        let entry = match (now + remaining).checked_sub(ttl) {
            Some(created_at) if ttl >= remaining => CacheEntry::created_at(value, ttl, created_at),
            _ => CacheEntry::created_at(value, remaining, now),
        };
        self.state
            .lock()
            .insert(key, entry, self.settings.max_entries);
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::cache::TtlTier;

    fn store() -> CacheStore {
        CacheStore::new(100, Duration::from_secs(300))
    }

    #[tokio::test]
    async fn test_get_or_set_computes_once_then_hits() {
        let store = store();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            let value: Vec<u32> = store
                .get_or_set("classes:A", TtlTier::Medium, move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2, 3])
                })
                .await
                .unwrap();
            assert_eq!(value, vec![1, 2, 3]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = store.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.computations, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.in_flight, 0);
    }

    #[tokio::test]
    async fn test_get_or_set_rejects_invalid_key_before_compute() {
        let store = store();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let result = store
            .get_or_set_value("  ", Ttl::Default, move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!(1))
            })
            .await;
        assert!(matches!(result, Err(CacheError::InvalidKey(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.stats().computations, 0);
    }

    #[tokio::test]
    async fn test_get_or_set_rejects_zero_ttl() {
        let store = store();
        let result = store
            .get_or_set_value("classes:A", Duration::ZERO, || async { Ok(json!(1)) })
            .await;
        assert!(matches!(result, Err(CacheError::InvalidTtl(_))));
    }

    #[tokio::test]
    async fn test_failed_compute_leaves_no_entry() {
        let store = store();
        let result = store
            .get_or_set_value("classes:A", Ttl::Default, || async {
                Err(anyhow::anyhow!("offline"))
            })
            .await;

        assert!(matches!(result, Err(CacheError::ComputeFailure(_))));
        assert!(store.is_empty());
        assert!(!store.is_in_flight("classes:A"));
        assert_eq!(store.stats().compute_failures, 1);
    }

    #[tokio::test]
    async fn test_panicking_compute_is_reported_and_cleared() {
        let store = store();
        let result = store
            .get_or_set_value("classes:A", Ttl::Default, || async {
                if true {
                    panic!("bad payload");
                }
                Ok(json!(null))
            })
            .await;

        assert!(matches!(result, Err(CacheError::ComputePanicked(_))));
        assert!(!store.is_in_flight("classes:A"));

        let value = store
            .get_or_set_value("classes:A", Ttl::Default, || async { Ok(json!("ok")) })
            .await
            .unwrap();
        assert_eq!(value, json!("ok"));
    }

    #[tokio::test]
    async fn test_set_get_and_invalidate() {
        let store = store();
        store.set("plans:A", &json!({"plan": "gold"}), TtlTier::Long).unwrap();

        let value: Option<Value> = store.get("plans:A").unwrap();
        assert_eq!(value, Some(json!({"plan": "gold"})));

        assert!(store.invalidate("plans:A").unwrap());
        assert!(!store.invalidate("plans:A").unwrap());
        assert_eq!(store.get::<Value>("plans:A").unwrap(), None);

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.invalidations, 1);
    }

    #[tokio::test]
    async fn test_get_typed_decode_error() {
        let store = store();
        store.set("plans:A", &"not a number", Ttl::Default).unwrap();
        let result = store.get::<u32>("plans:A");
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_invalidate_pattern_counts_matches() {
        let store = store();
        store.set("calendar_classes:A:admin", &1, Ttl::Default).unwrap();
        store.set("calendar_classes:A:student", &2, Ttl::Default).unwrap();
        store.set("calendar_classes:B:admin", &3, Ttl::Default).unwrap();

        assert_eq!(store.invalidate_pattern("calendar_classes:A").unwrap(), 2);
        assert_eq!(store.len(), 1);
        assert!(store.inspect("calendar_classes:B:admin").unwrap().is_some());
        assert_eq!(store.invalidate_pattern("calendar_classes:A").unwrap(), 0);
        assert!(matches!(
            store.invalidate_pattern(""),
            Err(CacheError::InvalidPattern(_))
        ));
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recently_used() {
        let store = CacheStore::new(2, Duration::from_secs(300));
        store.set("students:A", &1, Ttl::Default).unwrap();
        store.set("students:B", &2, Ttl::Default).unwrap();
        let _: Option<u32> = store.get("students:A").unwrap();
        store.set("students:C", &3, Ttl::Default).unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.inspect("students:B").unwrap().is_none());
        assert!(store.inspect("students:A").unwrap().is_some());
        assert_eq!(store.stats().evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_prefers_expired_entries() {
        let store = CacheStore::new(2, Duration::from_secs(300));
        store.set("students:A", &1, Duration::from_secs(10)).unwrap();
        store.set("students:B", &2, Ttl::Default).unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        store.set("students:C", &3, Ttl::Default).unwrap();

        assert!(store.inspect("students:B").unwrap().is_some());
        let stats = store.stats();
        assert_eq!(stats.evictions, 0);
        assert_eq!(stats.expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_expired() {
        let store = store();
        store.set("students:A", &1, Duration::from_secs(1)).unwrap();
        store.set("students:B", &2, Duration::from_secs(60)).unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.stats().expirations, 1);
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let store = store();
        store.set("students:A", &1, Ttl::Default).unwrap();
        let _: Option<u32> = store.get("students:A").unwrap();

        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.stats(), CacheStats::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_inspect_reports_remaining_ttl() {
        let store = store();
        store.set("academy:A", &json!({"name": "Dojo"}), Duration::from_secs(10)).unwrap();
        tokio::time::advance(Duration::from_secs(4)).await;

        let info = store.inspect("academy:A").unwrap().unwrap();
        assert_eq!(info.age_ms, 4000);
        assert_eq!(info.ttl_remaining_ms, 6000);
        assert_eq!(store.stats().hits, 0);
    }

    #[test]
    fn test_settings_are_sanitized() {
        let store = CacheStore::with_settings(StoreSettings {
            max_entries: 0,
            refresh_threshold: 3.0,
            ..StoreSettings::default()
        });
        assert_eq!(store.settings().max_entries, 1);
        assert_eq!(store.settings().refresh_threshold, 1.0);
    }

    #[tokio::test]
    async fn test_oversized_ttl_is_clamped() {
        let store = store();
        let huge = Duration::from_secs(u64::MAX);

        let value = store
            .get_or_set_value("classes:A", huge, || async { Ok(json!(1)) })
            .await
            .unwrap();
        assert_eq!(value, json!(1));
        let info = store.inspect("classes:A").unwrap().unwrap();
        assert_eq!(info.ttl_ms, MAX_TTL.as_millis() as u64);

        store.set("plans:A", &1, huge).unwrap();
        assert_eq!(store.get::<u32>("plans:A").unwrap(), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_refresh_uses_requested_ttl() {
        let store = store();
        store.set("dashboard:A", &"old", Duration::from_secs(1000)).unwrap();
        tokio::time::advance(Duration::from_secs(85)).await;

        let value = store
            .get_with_background_refresh_value("dashboard:A", Duration::from_secs(100), || async {
                Ok(json!("new"))
            })
            .await
            .unwrap();
        assert_eq!(value, json!("old"));
        assert_eq!(store.stats().background_refreshes, 1);

        while store.is_in_flight("dashboard:A") {
            tokio::task::yield_now().await;
        }
        assert_eq!(store.get::<String>("dashboard:A").unwrap().as_deref(), Some("new"));
        let info = store.inspect("dashboard:A").unwrap().unwrap();
        assert_eq!(info.ttl_ms, 100_000);
    }

    #[tokio::test]
    async fn test_set_during_flight_is_replaced_by_computed_value() {
        let store = store();
        let (release, gate) = tokio::sync::oneshot::channel::<()>();

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .get_or_set_value("classes:A", Ttl::Default, move || async move {
                        gate.await?;
                        Ok(json!("computed"))
                    })
                    .await
            })
        };
        while !store.is_in_flight("classes:A") {
            tokio::task::yield_now().await;
        }

        store.set("classes:A", &"manual", Ttl::Default).unwrap();
        assert_eq!(store.get::<String>("classes:A").unwrap().as_deref(), Some("manual"));
        assert!(store.is_in_flight("classes:A"));

        release.send(()).unwrap();
        assert_eq!(waiter.await.unwrap().unwrap(), json!("computed"));
        assert_eq!(store.get::<String>("classes:A").unwrap().as_deref(), Some("computed"));
    }
}
