//! URL normalization and HTTP probing. Grounded in
//! `examples/original_source/internal/pingworker/prober.go`'s
//! `normalizeURL`/`Probe`: trim whitespace, default to `http://` when no
//! scheme is present, classify 200-399 as up, anything else (including a
//! transport failure) as down.

use crate::config::HttpProbeConfig;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub up: bool,
    pub code: i32,
    pub latency_ms: i64,
}

/// Trims whitespace and prepends `http://` when the URL has no scheme.
/// Idempotent: normalizing an already-normalized URL is a no-op.
#[must_use]
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

/// Executes one probe. Never returns `Err` — a transport failure (DNS,
/// connect, TLS, read, timeout) is itself a down observation with `code=0`,
/// not an error the caller needs to handle separately.
pub async fn probe(client: &reqwest::Client, host: &str) -> ProbeOutcome {
    let url = normalize_url(host);
    let start = std::time::Instant::now();

    match client.get(&url).send().await {
        Ok(response) => {
            let code = response.status().as_u16();
            let latency_ms = start.elapsed().as_millis() as i64;
            ProbeOutcome {
                up: (200..=399).contains(&code),
                code: i32::from(code),
                latency_ms,
            }
        }
        Err(_) => ProbeOutcome {
            up: false,
            code: 0,
            latency_ms: start.elapsed().as_millis() as i64,
        },
    }
}

/// Builds the shared probing client once per process; per-probe state
/// (timeouts, TLS verification, redirect cap) all comes from one config.
pub fn build_client(config: &HttpProbeConfig) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .connect_timeout(Duration::from_secs(5).min(config.timeout))
        .user_agent(&config.user_agent)
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .danger_accept_invalid_certs(!config.tls_verify)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_url_adds_default_scheme() {
        assert_eq!(normalize_url("example.com/health"), "http://example.com/health");
    }

    #[test]
    fn normalize_url_trims_whitespace() {
        assert_eq!(normalize_url("  example.com  "), "http://example.com");
    }

    #[test]
    fn normalize_url_keeps_existing_scheme() {
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
    }

    #[test]
    fn normalize_url_is_idempotent() {
        let once = normalize_url("example.com");
        let twice = normalize_url(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn probe_outcome_classifies_2xx_3xx_as_up() {
        for code in [200u16, 301, 399] {
            let outcome = ProbeOutcome {
                up: (200..=399).contains(&code),
                code: i32::from(code),
                latency_ms: 0,
            };
            assert!(outcome.up, "code {code} should classify as up");
        }
    }

    #[test]
    fn probe_outcome_classifies_4xx_5xx_as_down() {
        for code in [400u16, 404, 500, 503] {
            let outcome = ProbeOutcome {
                up: (200..=399).contains(&code),
                code: i32::from(code),
                latency_ms: 0,
            };
            assert!(!outcome.up, "code {code} should classify as down");
        }
    }
}
