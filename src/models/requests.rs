//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::cache::{key::validate_key, Ttl, TtlTier};
use crate::error::{CacheError, Result};

/// Request body for `PUT /entries`
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: Any JSON payload
/// - `ttl`: Optional TTL in seconds, clamped to one year
/// - `tier`: Optional named TTL tier; mutually exclusive with `ttl`
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: Value,
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub tier: Option<TtlTier>,
}

impl SetRequest {
    /// Validates the request data
    pub fn validate(&self) -> Result<()> {
        validate_key(&self.key)?;
        if self.ttl.is_some() && self.tier.is_some() {
            return Err(CacheError::InvalidTtl(
                "Specify either ttl or tier, not both".to_string(),
            ));
        }
        if self.ttl == Some(0) {
            return Err(CacheError::InvalidTtl(
                "TTL must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    /// TTL requested by the client, falling back to the store default.
    pub fn effective_ttl(&self) -> Ttl {
        match (self.ttl, self.tier) {
            (Some(secs), _) => Ttl::Duration(Duration::from_secs(secs)),
            (None, Some(tier)) => Ttl::Tier(tier),
            (None, None) => Ttl::Default,
        }
    }
}

/// Request body for `POST /invalidate`
#[derive(Debug, Clone, Deserialize)]
pub struct InvalidatePatternRequest {
    /// Segment pattern such as `calendar_classes:A`
    pub pattern: String,
}
