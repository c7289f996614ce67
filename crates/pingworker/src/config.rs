use anyhow::{Context, Result};
use pingerus_core::config::parse_env_or;
use pingerus_core::CoreConfig;
use std::time::Duration;

/// Probe behaviour: timeout, identification, and the redirect/TLS policy a
/// monitored endpoint is probed under.
#[derive(Debug, Clone)]
pub struct HttpProbeConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub max_redirects: usize,
    pub tls_verify: bool,
}

impl HttpProbeConfig {
    fn from_env() -> Result<Self> {
        Ok(Self {
            timeout: Duration::from_millis(
                parse_env_or("PINGWORKER_PROBE_TIMEOUT_MS", 5000u64)
                    .context("PINGWORKER_PROBE_TIMEOUT_MS")?,
            ),
            user_agent: parse_env_or(
                "PINGWORKER_USER_AGENT",
                "pingerus-pingworker/0.1".to_string(),
            )
            .context("PINGWORKER_USER_AGENT")?,
            max_redirects: parse_env_or("PINGWORKER_MAX_REDIRECTS", 5usize)
                .context("PINGWORKER_MAX_REDIRECTS")?,
            tls_verify: parse_env_or("PINGWORKER_TLS_VERIFY", true)
                .context("PINGWORKER_TLS_VERIFY")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub core: CoreConfig,
    pub group_id: String,
    pub probe: HttpProbeConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            core: CoreConfig::from_env()?,
            group_id: parse_env_or(
                "PINGWORKER_GROUP_ID",
                "pingerus-pingworker".to_string(),
            )
            .context("PINGWORKER_GROUP_ID")?,
            probe: HttpProbeConfig::from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_probe_config_has_sane_defaults() {
        let cfg = HttpProbeConfig {
            timeout: Duration::from_secs(5),
            user_agent: "pingerus-pingworker/0.1".to_string(),
            max_redirects: 5,
            tls_verify: true,
        };
        assert_eq!(cfg.timeout, Duration::from_secs(5));
        assert!(cfg.tls_verify);
    }
}
