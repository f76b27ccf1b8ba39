//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::TtlTiers;

/// Cache and admin server configuration.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Default TTL in seconds for writes without an explicit TTL
    pub default_ttl: u64,
    /// Admin HTTP server port
    pub server_port: u16,
    /// Background cleanup task interval in seconds
    pub cleanup_interval: u64,
    /// Fraction of the TTL after which background refresh starts
    pub refresh_threshold: f64,
    /// Durations of the named TTL tiers
    pub ttl_tiers: TtlTiers,
    /// Snapshot file; persistence is disabled when unset
    pub snapshot_path: Option<PathBuf>,
}

fn parse_env<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn tier_env(name: &str, default: Duration) -> Duration {
    parse_env::<u64>(name)
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 100)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 300)
    /// - `SERVER_PORT` - Admin HTTP port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `REFRESH_THRESHOLD` - Background refresh point, 0.0..=1.0 (default: 0.8)
    /// - `TTL_SHORT`, `TTL_MEDIUM`, `TTL_LONG`, `TTL_VERY_LONG`, `TTL_STATIC` -
    ///   tier durations in seconds (defaults: 120, 300, 900, 3600, 86400)
    /// - `SNAPSHOT_PATH` - Snapshot file (default: unset, no persistence)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let tiers = defaults.ttl_tiers;

        Self {
            max_entries: parse_env::<usize>("MAX_ENTRIES")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_entries),
            default_ttl: parse_env::<u64>("DEFAULT_TTL")
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.default_ttl),
            server_port: parse_env("SERVER_PORT").unwrap_or(defaults.server_port),
            cleanup_interval: parse_env::<u64>("CLEANUP_INTERVAL")
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.cleanup_interval),
            refresh_threshold: parse_env::<f64>("REFRESH_THRESHOLD")
                .filter(|t| (0.0..=1.0).contains(t))
                .unwrap_or(defaults.refresh_threshold),
            ttl_tiers: TtlTiers {
                short: tier_env("TTL_SHORT", tiers.short),
                medium: tier_env("TTL_MEDIUM", tiers.medium),
                long: tier_env("TTL_LONG", tiers.long),
                very_long: tier_env("TTL_VERY_LONG", tiers.very_long),
                static_data: tier_env("TTL_STATIC", tiers.static_data),
            },
            snapshot_path: env::var("SNAPSHOT_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 100,
            default_ttl: 300,
            server_port: 3000,
            cleanup_interval: 60,
            refresh_threshold: 0.8,
            ttl_tiers: TtlTiers::default(),
            snapshot_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 11] = [
        "MAX_ENTRIES",
        "DEFAULT_TTL",
        "SERVER_PORT",
        "CLEANUP_INTERVAL",
        "REFRESH_THRESHOLD",
        "TTL_SHORT",
        "TTL_MEDIUM",
        "TTL_LONG",
        "TTL_VERY_LONG",
        "TTL_STATIC",
        "SNAPSHOT_PATH",
    ];

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.max_entries, 100);
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.cleanup_interval, 60);
        assert_eq!(config.refresh_threshold, 0.8);
        assert_eq!(config.ttl_tiers, TtlTiers::default());
        assert!(config.snapshot_path.is_none());
    }

    // Environment mutations live in a single test so parallel tests never race on them.
    #[test]
    fn test_config_from_env() {
        for var in VARS {
            env::remove_var(var);
        }

        let config = Config::from_env();
        assert_eq!(config.max_entries, 100);
        assert_eq!(config.default_ttl, 300);
        assert_eq!(config.cleanup_interval, 60);
        assert!(config.snapshot_path.is_none());

        env::set_var("MAX_ENTRIES", "500");
        env::set_var("TTL_SHORT", "30");
        env::set_var("TTL_LONG", "0");
        env::set_var("REFRESH_THRESHOLD", "1.5");
        env::set_var("SNAPSHOT_PATH", "/tmp/academy-cache.json");

        let config = Config::from_env();
        assert_eq!(config.max_entries, 500);
        assert_eq!(config.ttl_tiers.short, Duration::from_secs(30));
        assert_eq!(config.ttl_tiers.long, Duration::from_secs(900));
        assert_eq!(config.refresh_threshold, 0.8);
        assert_eq!(
            config.snapshot_path,
            Some(PathBuf::from("/tmp/academy-cache.json"))
        );

        for var in VARS {
            env::remove_var(var);
        }
    }
}
