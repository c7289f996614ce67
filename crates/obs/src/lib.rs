//! Ambient stack shared by every Pingerus binary: logging bootstrap, DB pool
//! construction, the retry policy, the `/healthz`+`/metrics` axum surface,
//! and W3C trace-context carriage helpers.

pub mod bootstrap;
pub mod metrics;
pub mod retry;
pub mod tracectx;

pub use bootstrap::{init_db, init_env, init_tracing};
pub use retry::{default_kafka_policy, retry as retry_with_policy, Backoff, ExpoJitter, Policy};
