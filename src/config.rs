//! Runtime configuration
//!
//! Read from the environment (after loading `.env` when present).

use chrono::{FixedOffset, Offset, Utc};
use ime_templates::ResolverOptions;
use std::path::PathBuf;

pub const DEFAULT_BLOB_ROOT: &str = "./data/blobs";
pub const DEFAULT_SNAPSHOT_PREFIX: &str = "contracts";

#[derive(Debug, Clone)]
pub struct ContractsConfig {
    /// Root directory for the local blob store
    pub blob_root: PathBuf,
    /// Prefix of snapshot storage keys
    pub snapshot_prefix: String,
    /// Currency for MONEY variables that do not name one
    pub default_currency: String,
    /// Offset applied when formatting `examiner.signature_date_time`
    pub signature_utc_offset_minutes: i32,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            blob_root: PathBuf::from(DEFAULT_BLOB_ROOT),
            snapshot_prefix: DEFAULT_SNAPSHOT_PREFIX.to_string(),
            default_currency: ime_templates::format::DEFAULT_CURRENCY.to_string(),
            signature_utc_offset_minutes: 0,
        }
    }
}

impl ContractsConfig {
    /// Load from `IME_*` environment variables, falling back to defaults
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        Self {
            blob_root: std::env::var("IME_BLOB_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.blob_root),
            snapshot_prefix: std::env::var("IME_SNAPSHOT_PREFIX")
                .ok()
                .map(|p| p.trim_matches('/').to_string())
                .filter(|p| !p.is_empty())
                .unwrap_or(defaults.snapshot_prefix),
            default_currency: std::env::var("IME_DEFAULT_CURRENCY")
                .ok()
                .map(|c| c.trim().to_ascii_uppercase())
                .filter(|c| !c.is_empty())
                .unwrap_or(defaults.default_currency),
            signature_utc_offset_minutes: std::env::var("IME_SIGNATURE_UTC_OFFSET_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.signature_utc_offset_minutes),
        }
    }

    pub fn signature_utc_offset(&self) -> FixedOffset {
        self.signature_utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                tracing::warn!(
                    minutes = self.signature_utc_offset_minutes,
                    "signature offset out of range, using UTC"
                );
                Utc.fix()
            })
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            default_currency: self.default_currency.clone(),
            signature_utc_offset: self.signature_utc_offset(),
        }
    }
}

/// Database configuration
#[cfg(feature = "database")]
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub connection_timeout: std::time::Duration,
}

#[cfg(feature = "database")]
impl Default for DatabaseConfig {
    fn default() -> Self {
        dotenvy::dotenv().ok();
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost:5432/ime".to_string()),
            max_connections: std::env::var("DATABASE_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            connection_timeout: std::time::Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ContractsConfig::default();
        assert_eq!(config.snapshot_prefix, "contracts");
        assert_eq!(config.default_currency, "USD");
        assert_eq!(config.signature_utc_offset(), Utc.fix());
    }

    #[test]
    fn test_offset_out_of_range_falls_back_to_utc() {
        let config = ContractsConfig {
            signature_utc_offset_minutes: 24 * 60,
            ..Default::default()
        };
        assert_eq!(config.signature_utc_offset(), Utc.fix());

        let config = ContractsConfig {
            signature_utc_offset_minutes: -300,
            ..Default::default()
        };
        assert_eq!(
            config.resolver_options().signature_utc_offset.local_minus_utc(),
            -300 * 60
        );
    }

    #[test]
    fn test_offset_overflowing_seconds_falls_back_to_utc() {
        for minutes in [40_000_000, i32::MAX, i32::MIN] {
            let config = ContractsConfig {
                signature_utc_offset_minutes: minutes,
                ..Default::default()
            };
            assert_eq!(config.signature_utc_offset(), Utc.fix(), "minutes = {minutes}");
        }
    }
}
