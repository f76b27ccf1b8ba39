//! Cache Statistics Module
//!
//! Counters describing how the store served its callers. Purely
//! observational; nothing in the store depends on them for correctness.

use serde::Serialize;

// == Cache Stats ==
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Reads served from a live entry
    pub hits: u64,
    /// Reads that found no live entry
    pub misses: u64,
    /// Callers that joined a computation already in flight
    pub coalesced: u64,
    /// Compute functions started
    pub computations: u64,
    /// Compute functions that failed or panicked
    pub compute_failures: u64,
    /// Entries dropped to respect capacity
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
    /// Entries removed by `invalidate`/`invalidate_pattern`
    pub invalidations: u64,
    /// Refreshes started ahead of expiry
    pub background_refreshes: u64,
    /// Current number of stored entries
    pub total_entries: usize,
    /// Computations currently running
    pub in_flight: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// hits / (hits + misses + coalesced), or 0.0 before any read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.coalesced;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_coalesced(&mut self) {
        self.coalesced += 1;
    }

    pub fn record_computation(&mut self) {
        self.computations += 1;
    }

    pub fn record_compute_failure(&mut self) {
        self.compute_failures += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub fn record_invalidations(&mut self, count: usize) {
        self.invalidations += count as u64;
    }

    pub fn record_background_refresh(&mut self) {
        self.background_refreshes += 1;
    }
}
