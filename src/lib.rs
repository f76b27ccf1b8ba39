//! Academy Cache - An in-process cache-aside store
//!
//! Keeps remotely fetched academy data (classes, rosters, calendars) with
//! tiered TTLs, coalesces concurrent population of the same key into one
//! computation and invalidates every role variant of an owner by pattern.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheKey, CacheStore, KeyPattern, Ttl, TtlTier};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::spawn_cleanup_task;
