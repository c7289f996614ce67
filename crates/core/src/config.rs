//! Environment-variable configuration shared by every binary.
//!
//! Each service layers its own `Config::from_env()` on top of this (see
//! `pingerus-obs::retry`, and the per-component `config.rs` files), following
//! the same `env::var(..).context(..)` for required fields and
//! `env::var(..).unwrap_or_else(|_| default).parse()` for optional ones.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Settings every component needs regardless of its specific role: how to
/// reach Postgres and the message bus.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub database_url: String,
    pub db_max_conns: u32,
    pub db_min_conns: u32,
    pub db_acquire_timeout: Duration,
    pub db_idle_timeout: Duration,
    pub db_max_lifetime: Duration,
    pub kafka_brokers: String,
}

impl CoreConfig {
    /// Loads configuration from the process environment, initialising
    /// `dotenvy` first so a local `.env` file is honoured in development.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            db_max_conns: parse_env_or("DB_MAX_CONNS", 10)?,
            db_min_conns: parse_env_or("DB_MIN_CONNS", 1)?,
            db_acquire_timeout: Duration::from_secs(parse_env_or("DB_ACQUIRE_TIMEOUT_SECS", 5)?),
            db_idle_timeout: Duration::from_secs(parse_env_or("DB_IDLE_TIMEOUT_SECS", 300)?),
            db_max_lifetime: Duration::from_secs(parse_env_or("DB_MAX_LIFETIME_SECS", 1800)?),
            kafka_brokers: env::var("KAFKA_BROKERS").context("KAFKA_BROKERS must be set")?,
        })
    }
}

/// Parses an optional environment variable, falling back to `default` when
/// unset. Propagates a parse error instead of silently falling back, since a
/// present-but-malformed value is almost always an operator mistake.
pub fn parse_env_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} is set but invalid: {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn parse_env_or_falls_back_when_unset() {
        unsafe {
            env::remove_var("PINGERUS_TEST_VAR");
        }
        let value: u32 = parse_env_or("PINGERUS_TEST_VAR", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    #[serial]
    fn parse_env_or_uses_present_value() {
        unsafe {
            env::set_var("PINGERUS_TEST_VAR", "42");
        }
        let value: u32 = parse_env_or("PINGERUS_TEST_VAR", 7).unwrap();
        assert_eq!(value, 42);
        unsafe {
            env::remove_var("PINGERUS_TEST_VAR");
        }
    }

    #[test]
    #[serial]
    fn parse_env_or_rejects_malformed_value() {
        unsafe {
            env::set_var("PINGERUS_TEST_VAR", "not-a-number");
        }
        let result: Result<u32> = parse_env_or("PINGERUS_TEST_VAR", 7);
        assert!(result.is_err());
        unsafe {
            env::remove_var("PINGERUS_TEST_VAR");
        }
    }
}
