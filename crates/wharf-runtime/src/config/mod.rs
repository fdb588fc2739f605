//! Env-only configuration (spec §6 "Environment (selected)"), loaded with
//! `figment`'s `env` feature the way `alloy-runtime::config` already does,
//! but pointed only at `Env::raw()` — this server has no YAML/TOML file
//! layer, just the required env vars spec.md names plus the two ambient
//! knobs SPEC_FULL §9 adds.

pub mod error;

use std::path::PathBuf;

use figment::Figment;
use figment::providers::Env;
use serde::Deserialize;

pub use error::{ConfigError, ConfigResult};

/// Mirrors spec.md §6's env var list, plus SPEC_FULL §9's two additions.
/// Every field here except the last two is required — a missing one is a
/// fatal startup error (`ConfigError::Extract`), never a silent default.
#[derive(Debug, Clone, Deserialize)]
pub struct WharfConfig {
    pub port: u16,
    pub batch_size: usize,
    pub saved_connections_valid_for_days: i64,
    pub database_driver: String,
    pub database_datasource_path: PathBuf,
    pub database_migrations_path: PathBuf,

    /// SPEC_FULL §9 Open Question 4 — `ChunkRequest` query timeout,
    /// distinct from the 30s default used everywhere else.
    #[serde(default = "default_chunk_query_timeout_secs")]
    pub chunk_query_timeout_secs: u64,

    /// SPEC_FULL §9 Open Question 1 — whether a reconnect against an id
    /// with no saved record is accepted as a first-time connect.
    #[serde(default = "default_allow_reconnect_without_record")]
    pub allow_reconnect_without_record: bool,
}

fn default_chunk_query_timeout_secs() -> u64 {
    120
}

fn default_allow_reconnect_without_record() -> bool {
    true
}

impl WharfConfig {
    /// Reads every field straight from the process environment. Field
    /// names map to env vars by uppercasing (figment's `Env` provider
    /// default), so `database_migrations_path` reads `DATABASE_MIGRATIONS_PATH`.
    pub fn from_env() -> ConfigResult<Self> {
        let config: WharfConfig = Figment::new().merge(Env::raw()).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.database_driver != "sqlite" {
            return Err(ConfigError::UnsupportedDatabaseDriver(self.database_driver.clone()));
        }
        if self.saved_connections_valid_for_days <= 0 {
            return Err(ConfigError::NonPositiveValidForDays(self.saved_connections_valid_for_days));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // `figment::Jail` would be the idiomatic isolation tool here, but the
    // `env` feature alone doesn't pull it in; a process-wide mutex keeps
    // these tests from racing on the shared env instead (the same
    // constraint `alloy-runtime::config::loader`'s own env tests work
    // around with `unsafe { set_var }`/`remove_var`).
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn set_required_vars() {
        unsafe {
            std::env::set_var("PORT", "8080");
            std::env::set_var("BATCH_SIZE", "4096");
            std::env::set_var("SAVED_CONNECTIONS_VALID_FOR_DAYS", "30");
            std::env::set_var("DATABASE_DRIVER", "sqlite");
            std::env::set_var("DATABASE_DATASOURCE_PATH", "/tmp/wharf.db");
            std::env::set_var("DATABASE_MIGRATIONS_PATH", "/tmp/migrations");
        }
    }

    fn clear_all_vars() {
        unsafe {
            for var in [
                "PORT",
                "BATCH_SIZE",
                "SAVED_CONNECTIONS_VALID_FOR_DAYS",
                "DATABASE_DRIVER",
                "DATABASE_DATASOURCE_PATH",
                "DATABASE_MIGRATIONS_PATH",
                "CHUNK_QUERY_TIMEOUT_SECS",
                "ALLOW_RECONNECT_WITHOUT_RECORD",
            ] {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    fn loads_required_vars_and_applies_defaults_for_the_optional_ones() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all_vars();
        set_required_vars();

        let config = WharfConfig::from_env().unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_driver, "sqlite");
        assert_eq!(config.chunk_query_timeout_secs, 120);
        assert!(config.allow_reconnect_without_record);

        clear_all_vars();
    }

    #[test]
    fn missing_required_var_is_a_fatal_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all_vars();
        set_required_vars();
        unsafe { std::env::remove_var("DATABASE_MIGRATIONS_PATH") };

        assert!(matches!(WharfConfig::from_env(), Err(ConfigError::Extract(_))));

        clear_all_vars();
    }

    #[test]
    fn rejects_an_unsupported_database_driver() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all_vars();
        set_required_vars();
        unsafe { std::env::set_var("DATABASE_DRIVER", "postgres") };

        assert!(matches!(WharfConfig::from_env(), Err(ConfigError::UnsupportedDatabaseDriver(d)) if d == "postgres"));

        clear_all_vars();
    }

    #[test]
    fn explicit_overrides_replace_the_ambient_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all_vars();
        set_required_vars();
        unsafe {
            std::env::set_var("CHUNK_QUERY_TIMEOUT_SECS", "300");
            std::env::set_var("ALLOW_RECONNECT_WITHOUT_RECORD", "false");
        }

        let config = WharfConfig::from_env().unwrap();
        assert_eq!(config.chunk_query_timeout_secs, 300);
        assert!(!config.allow_reconnect_without_record);

        clear_all_vars();
    }
}
