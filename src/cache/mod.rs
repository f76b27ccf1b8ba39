//! Cache Module
//!
//! Provides the in-process cache-aside store: TTL expiration, single-flight
//! population, pattern invalidation and LRU capacity eviction.

mod entry;
mod flight;
pub mod key;
mod lru;
mod snapshot;
mod stats;
mod store;
mod ttl;


// Re-export public types
pub use entry::{CacheEntry, EntryInfo};
pub use key::{namespace, CacheKey, KeyPattern};
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::{CacheStore, StoreSettings};
pub use ttl::{Ttl, TtlTier, TtlTiers};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Longest TTL an entry can carry; longer TTLs are clamped to it.
pub const MAX_TTL: std::time::Duration = std::time::Duration::from_secs(365 * 24 * 60 * 60);
