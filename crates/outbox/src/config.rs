use anyhow::{Context, Result};
use pingerus_core::config::parse_env_or;
use pingerus_core::CoreConfig;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub core: CoreConfig,
    pub workers: usize,
    pub batch_size: i64,
    pub poll_interval: Duration,
    pub in_progress_ttl: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            core: CoreConfig::from_env()?,
            workers: parse_env_or("OUTBOX_WORKERS", 20usize).context("OUTBOX_WORKERS")?,
            batch_size: parse_env_or("OUTBOX_BATCH_SIZE", 100i64).context("OUTBOX_BATCH_SIZE")?,
            poll_interval: Duration::from_millis(
                parse_env_or("OUTBOX_POLL_INTERVAL_MS", 2000u64)
                    .context("OUTBOX_POLL_INTERVAL_MS")?,
            ),
            in_progress_ttl: Duration::from_secs(
                parse_env_or("OUTBOX_IN_PROGRESS_TTL_SECS", 30u64)
                    .context("OUTBOX_IN_PROGRESS_TTL_SECS")?,
            ),
        })
    }
}
