//! TTL Module
//!
//! Time-to-live values accepted by the store: a raw duration, a named tier,
//! or the store's configured default.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::MAX_TTL;
use crate::error::{CacheError, Result};

// == TTL Tier ==
/// Named TTL tiers referenced symbolically by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlTier {
    /// Frequently changing data (check-ins, dashboards)
    Short,
    /// Default tier for rosters and class lists
    Medium,
    /// Slowly changing data (plans, modalities)
    Long,
    VeryLong,
    /// Practically static reference data
    Static,
}

// == TTL ==
/// TTL argument for store writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Use the store's default TTL
    Default,
    /// Explicit duration; must be non-zero
    Duration(Duration),
    /// Named tier resolved through [`TtlTiers`]
    Tier(TtlTier),
}

impl From<Duration> for Ttl {
    fn from(duration: Duration) -> Self {
        Ttl::Duration(duration)
    }
}

impl From<TtlTier> for Ttl {
    fn from(tier: TtlTier) -> Self {
        Ttl::Tier(tier)
    }
}

// == TTL Tiers ==
/// Mapping from named tiers to durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlTiers {
    pub short: Duration,
    pub medium: Duration,
    pub long: Duration,
    pub very_long: Duration,
    pub static_data: Duration,
}

impl Default for TtlTiers {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(2 * 60),
            medium: Duration::from_secs(5 * 60),
            long: Duration::from_secs(15 * 60),
            very_long: Duration::from_secs(60 * 60),
            static_data: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl TtlTiers {
    /// Returns the duration configured for a tier.
    pub fn duration(&self, tier: TtlTier) -> Duration {
        match tier {
            TtlTier::Short => self.short,
            TtlTier::Medium => self.medium,
            TtlTier::Long => self.long,
            TtlTier::VeryLong => self.very_long,
            TtlTier::Static => self.static_data,
        }
    }

    /// Resolves a [`Ttl`] to a concrete, non-zero duration no longer than
    /// [`MAX_TTL`].
    pub fn resolve(&self, ttl: Ttl, default_ttl: Duration) -> Result<Duration> {
        let duration = match ttl {
            Ttl::Default => default_ttl,
            Ttl::Duration(duration) => duration,
            Ttl::Tier(tier) => self.duration(tier),
        };

        if duration.is_zero() {
            return Err(CacheError::InvalidTtl(format!(
                "{:?} resolves to a zero duration",
                ttl
            )));
        }

        Ok(duration.min(MAX_TTL))
    }
}
