//! Exponential-backoff-with-jitter retry policy, instrumented with
//! Prometheus counters and a histogram, labelled by policy name.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec,
};
use std::future::Future;
use std::time::{Duration, Instant};

static RETRY_ATTEMPTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "retry_attempts_total",
        "Total retry attempts (including the final one).",
        &["name"]
    )
    .expect("retry_attempts_total registers")
});

static RETRY_EXHAUSTED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "retry_exhausted_total",
        "Operations that exhausted all retries.",
        &["name"]
    )
    .expect("retry_exhausted_total registers")
});

static RETRY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "retry_duration_seconds",
        "Total time spent inside retry::Do, success or failure.",
        &["name"]
    )
    .expect("retry_duration_seconds registers")
});

/// Backoff schedule. `Next` is 0-indexed by attempt number.
pub trait Backoff {
    fn next(&self, attempt: u32) -> Duration;
}

/// Exponential backoff with multiplicative jitter, capped at `max`.
#[derive(Debug, Clone, Copy)]
pub struct ExpoJitter {
    pub base: Duration,
    pub max: Duration,
    pub jitter: f64,
}

impl Backoff for ExpoJitter {
    fn next(&self, attempt: u32) -> Duration {
        let mut millis = self.base.as_secs_f64() * 1000.0 * 2f64.powi(attempt as i32);
        let cap_millis = self.max.as_secs_f64() * 1000.0;
        if self.max > Duration::ZERO && millis > cap_millis {
            millis = cap_millis;
        }
        if self.jitter > 0.0 {
            let spread = 1.0 + (rand::random::<f64>() * 2.0 - 1.0) * self.jitter;
            millis *= spread;
        }
        Duration::from_secs_f64((millis / 1000.0).max(0.0))
    }
}

/// The Kafka/outbox publish retry policy used by the outbox dispatcher:
/// 6 attempts, 200ms base, 30s cap, ±20% jitter, regardless of error class.
#[must_use]
pub fn default_kafka_policy(name: &'static str) -> Policy {
    Policy {
        name,
        attempts: 6,
        backoff: ExpoJitter {
            base: Duration::from_millis(200),
            max: Duration::from_secs(30),
            jitter: 0.2,
        },
        retryable: |_| true,
    }
}

/// A named retry policy. `retryable` decides whether a given error is worth
/// another attempt; the Go original treats every error as retryable for the
/// Kafka publish path, and this repo does the same (see DESIGN.md's Open
/// Question decision on retry short-circuiting).
#[derive(Clone, Copy)]
pub struct Policy {
    pub name: &'static str,
    pub attempts: u32,
    pub backoff: ExpoJitter,
    pub retryable: fn(&anyhow::Error) -> bool,
}

/// Runs `op`, retrying per `policy` until it succeeds, exhausts its
/// attempts, or `op`'s error is classified non-retryable. Sleeps are
/// cancellation-aware: a cancelled token short-circuits the wait.
pub async fn retry<F, Fut, T>(
    policy: Policy,
    cancel: &tokio_util::sync::CancellationToken,
    mut op: F,
) -> Result<T, anyhow::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, anyhow::Error>>,
{
    let start = Instant::now();
    let attempts = policy.attempts.max(1);
    let mut last_err = None;

    for attempt in 0..attempts {
        match op().await {
            Ok(value) => {
                RETRY_ATTEMPTS.with_label_values(&[policy.name]).inc();
                RETRY_DURATION
                    .with_label_values(&[policy.name])
                    .observe(start.elapsed().as_secs_f64());
                return Ok(value);
            }
            Err(err) => {
                RETRY_ATTEMPTS.with_label_values(&[policy.name]).inc();
                tracing::warn!(policy = policy.name, attempt, error = %err, "retry attempt failed");
                let retryable = (policy.retryable)(&err);
                last_err = Some(err);
                if !retryable || attempt + 1 == attempts {
                    break;
                }
                let wait = policy.backoff.next(attempt);
                tokio::select! {
                    () = tokio::time::sleep(wait) => {}
                    () = cancel.cancelled() => {
                        RETRY_DURATION
                            .with_label_values(&[policy.name])
                            .observe(start.elapsed().as_secs_f64());
                        return Err(anyhow::anyhow!("retry cancelled"));
                    }
                }
            }
        }
    }

    RETRY_EXHAUSTED.with_label_values(&[policy.name]).inc();
    RETRY_DURATION
        .with_label_values(&[policy.name])
        .observe(start.elapsed().as_secs_f64());
    tracing::error!(policy = policy.name, "retries exhausted");
    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("retry exhausted with no recorded error")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn expo_jitter_caps_at_max() {
        let backoff = ExpoJitter {
            base: Duration::from_millis(200),
            max: Duration::from_secs(30),
            jitter: 0.0,
        };
        // 2^20 * 200ms would dwarf the 30s cap without clamping.
        assert!(backoff.next(20) <= Duration::from_secs(30));
    }

    #[test]
    fn expo_jitter_grows_with_attempt_before_capping() {
        let backoff = ExpoJitter {
            base: Duration::from_millis(200),
            max: Duration::from_secs(30),
            jitter: 0.0,
        };
        assert!(backoff.next(1) > backoff.next(0));
    }

    #[tokio::test]
    async fn retry_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let policy = Policy {
            name: "test-retry-succeeds",
            attempts: 5,
            backoff: ExpoJitter {
                base: Duration::from_millis(1),
                max: Duration::from_millis(5),
                jitter: 0.0,
            },
            retryable: |_| true,
        };
        let cancel = tokio_util::sync::CancellationToken::new();

        let result = retry(policy, &cancel, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(anyhow::anyhow!("not yet"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_exhausts_after_configured_attempts() {
        let calls = AtomicU32::new(0);
        let policy = Policy {
            name: "test-retry-exhausts",
            attempts: 3,
            backoff: ExpoJitter {
                base: Duration::from_millis(1),
                max: Duration::from_millis(2),
                jitter: 0.0,
            },
            retryable: |_| true,
        };
        let cancel = tokio_util::sync::CancellationToken::new();

        let result: Result<(), anyhow::Error> = retry(policy, &cancel, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(anyhow::anyhow!("always fails")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
