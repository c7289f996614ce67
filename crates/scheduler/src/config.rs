use anyhow::{Context, Result};
use pingerus_core::config::parse_env_or;
use pingerus_core::CoreConfig;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub core: CoreConfig,
    pub tick: Duration,
    pub batch_limit: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            core: CoreConfig::from_env()?,
            tick: Duration::from_millis(
                parse_env_or("SCHEDULER_TICK_MS", 1000u64).context("SCHEDULER_TICK_MS")?,
            ),
            batch_limit: parse_env_or("SCHEDULER_BATCH_LIMIT", 100i64)
                .context("SCHEDULER_BATCH_LIMIT")?,
        })
    }
}
