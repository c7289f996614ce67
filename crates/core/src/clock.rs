//! Clock injection for the two components that stamp a wall-clock time onto
//! a domain record: the Ping Worker's run/status-change timestamp and the
//! Email Notifier's `Notification.sent_at`. Mirrors the Go original's
//! `notification.Clock` interface, injected into both handlers and backed
//! by `systemClock` in each `cmd/*/main.go`. The scheduler's due-selection
//! and the outbox dispatcher's lease-expiry math stay server-side (SQL
//! `now()` against `updated_at`/`next_run`), since those compare against
//! rows already living in Postgres rather than stamping a fresh value from
//! Rust.

use chrono::{DateTime, Utc};
use std::sync::Mutex;

/// Anything that can report the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real clock, backed by `Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock fixed at construction and advanceable on demand, for tests that
/// need to assert on `next_run` or lease-TTL boundaries deterministically.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    #[must_use]
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(at),
        }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard += delta;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self
            .now
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances_by_delta() {
        let start = Utc::now();
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance(chrono::Duration::seconds(30));
        assert_eq!(clock.now(), start + chrono::Duration::seconds(30));
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
