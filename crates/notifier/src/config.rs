use anyhow::{Context, Result};
use pingerus_core::config::parse_env_or;
use pingerus_core::CoreConfig;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub pool_size: u32,
}

impl SmtpConfig {
    fn from_env() -> Result<Self> {
        let username = std::env::var("NOTIFIER_SMTP_USERNAME").ok();
        let password = std::env::var("NOTIFIER_SMTP_PASSWORD").ok();
        Ok(Self {
            host: parse_env_or("NOTIFIER_SMTP_HOST", "127.0.0.1".to_string())
                .context("NOTIFIER_SMTP_HOST")?,
            port: parse_env_or("NOTIFIER_SMTP_PORT", 1025u16).context("NOTIFIER_SMTP_PORT")?,
            username,
            password,
            from: parse_env_or("NOTIFIER_SMTP_FROM", "pingerus@example.com".to_string())
                .context("NOTIFIER_SMTP_FROM")?,
            pool_size: parse_env_or("NOTIFIER_SMTP_POOL_SIZE", 5u32)
                .context("NOTIFIER_SMTP_POOL_SIZE")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub core: CoreConfig,
    pub group_id: String,
    pub smtp: SmtpConfig,
    pub send_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            core: CoreConfig::from_env()?,
            group_id: parse_env_or("NOTIFIER_GROUP_ID", "pingerus-notifier".to_string())
                .context("NOTIFIER_GROUP_ID")?,
            smtp: SmtpConfig::from_env()?,
            send_timeout: Duration::from_millis(
                parse_env_or("NOTIFIER_SEND_TIMEOUT_MS", 5000u64)
                    .context("NOTIFIER_SEND_TIMEOUT_MS")?,
            ),
        })
    }
}
