//! Scheduler: periodically discovers due checks and publishes a
//! `CheckRequest` for each, advancing `next_run` atomically so no check is
//! dispatched twice per interval even with multiple scheduler replicas.

pub mod config;
pub mod metrics;
pub mod runner;

pub use config::Config;
pub use runner::Runner;
