//! The scheduler tick: fetch due checks (row-locked, `next_run` advanced
//! atomically), publish one `CheckRequest` per check directly to the bus.
//! Grounded in `internal/services/scheduler/runner.go`'s `Runner.tick`.

use crate::{config::Config, metrics};
use pingerus_bus::{partition_key, BusProducer, CHECKS_REQUEST_TOPIC};
use pingerus_core::{CheckRequestMsg, PingerusError};
use pingerus_obs::tracectx;
use sqlx::PgPool;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

pub struct Runner {
    pool: PgPool,
    producer: BusProducer,
    config: Config,
}

impl Runner {
    #[must_use]
    pub const fn new(pool: PgPool, producer: BusProducer, config: Config) -> Self {
        Self {
            pool,
            producer,
            config,
        }
    }

    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.tick);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("scheduler stopping");
                    return;
                }
                _ = interval.tick() => {
                    let start = Instant::now();
                    if let Err(err) = self.tick().await {
                        metrics::ERRORS.inc();
                        tracing::warn!(error = %err, "scheduler tick failed");
                    }
                    metrics::LOOP_DURATION.observe(start.elapsed().as_secs_f64());
                }
            }
        }
    }

    /// Fetches up to `batch_limit` due checks and publishes one
    /// `CheckRequest` each. Delivery here is best-effort: the scheduler
    /// publishes directly without the outbox (it "may skip" rather than
    /// "must deliver" — a dropped tick is caught by the next one).
    async fn tick(&self) -> Result<(), PingerusError> {
        let limit = if self.config.batch_limit <= 0 {
            100
        } else {
            self.config.batch_limit
        };

        let due = pingerus_db::checks::fetch_due_and_advance(&self.pool, limit).await?;
        if due.is_empty() {
            return Ok(());
        }
        metrics::FETCHED.inc_by(due.len() as f64);

        let trace_headers = tracectx::inject(&opentelemetry::Context::current());

        for check in due {
            let msg = CheckRequestMsg { check_id: check.id };
            let key = partition_key(check.id);
            match self
                .producer
                .publish(CHECKS_REQUEST_TOPIC, &key, &msg, &trace_headers)
                .await
            {
                Ok(()) => metrics::SENT.inc(),
                Err(err) => {
                    metrics::ERRORS.inc();
                    tracing::warn!(check_id = check.id, error = %err, "publish failed");
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            core: pingerus_core::CoreConfig {
                database_url: String::new(),
                db_max_conns: 1,
                db_min_conns: 1,
                db_acquire_timeout: std::time::Duration::from_secs(1),
                db_idle_timeout: std::time::Duration::from_secs(1),
                db_max_lifetime: std::time::Duration::from_secs(1),
                kafka_brokers: "localhost:9092".to_string(),
            },
            tick: std::time::Duration::from_secs(1),
            batch_limit: 100,
        }
    }

    #[sqlx::test(migrations = "../db/migrations")]
    async fn tick_is_a_no_op_when_nothing_is_due(pool: PgPool) {
        let producer = BusProducer::new("localhost:9092", "pingerus-scheduler-test").unwrap();
        let runner = Runner::new(pool, producer, test_config());

        runner.tick().await.unwrap();
    }

    /// S1: a tick fetches only due, active checks and advances `next_run`
    /// for exactly those, leaving not-yet-due and inactive checks alone.
    /// `tick()` publishes best-effort (see its doc comment); there is no
    /// broker in this test environment, so this exercises the selection and
    /// the `next_run` advancement tick performs in the same statement, not
    /// delivery. The key/payload tick publishes for each due check are
    /// covered directly below, without a broker, since they're pure
    /// functions of the check id.
    #[sqlx::test(migrations = "../db/migrations")]
    async fn tick_advances_next_run_only_for_due_active_checks(pool: PgPool) {
        let user = pingerus_db::users::create(&pool, "owner@example.com", "hash")
            .await
            .unwrap();

        let due = pingerus_db::checks::create(&pool, user.id, "http://due.example.com", 60)
            .await
            .unwrap();
        let not_due = pingerus_db::checks::create(&pool, user.id, "http://not-due.example.com", 60)
            .await
            .unwrap();
        sqlx::query("UPDATE checks SET next_run = NOW() + INTERVAL '1 hour' WHERE id = $1")
            .bind(not_due.id)
            .execute(&pool)
            .await
            .unwrap();
        let inactive = pingerus_db::checks::create(&pool, user.id, "http://inactive.example.com", 60)
            .await
            .unwrap();
        sqlx::query("UPDATE checks SET active = FALSE WHERE id = $1")
            .bind(inactive.id)
            .execute(&pool)
            .await
            .unwrap();

        let producer = BusProducer::new("localhost:9092", "pingerus-scheduler-test").unwrap();
        let runner = Runner::new(pool.clone(), producer, test_config());

        runner.tick().await.unwrap();

        let due_after = pingerus_db::checks::get_by_id(&pool, due.id).await.unwrap();
        let not_due_after = pingerus_db::checks::get_by_id(&pool, not_due.id).await.unwrap();
        let inactive_after = pingerus_db::checks::get_by_id(&pool, inactive.id).await.unwrap();

        assert!(
            due_after.next_run > due.next_run,
            "due check's next_run must advance"
        );
        assert_eq!(
            not_due_after.next_run, not_due.next_run,
            "not-yet-due check must be left alone"
        );
        assert_eq!(
            inactive_after.next_run, inactive.next_run,
            "inactive check must be left alone"
        );
    }

    #[test]
    fn due_check_publishes_with_its_id_as_the_partition_key_and_body() {
        let msg = CheckRequestMsg { check_id: 42 };
        assert_eq!(partition_key(msg.check_id), "42");
        assert_eq!(serde_json::to_string(&msg).unwrap(), r#"{"check_id":42}"#);
    }
}
