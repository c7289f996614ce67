//! The dispatcher runner: `workers` parallel tasks sharing one pool and
//! producer, each ticking on `poll_interval`. Grounded directly in
//! `internal/outbox/runner.go`'s `Runner.worker`.

use crate::{config::Config, handler, metrics};
use pingerus_bus::BusProducer;
use pingerus_core::{OutboxMessage, PingerusError};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

pub struct Runner {
    pool: PgPool,
    producer: Arc<BusProducer>,
    config: Config,
}

impl Runner {
    #[must_use]
    pub const fn new(pool: PgPool, producer: Arc<BusProducer>, config: Config) -> Self {
        Self {
            pool,
            producer,
            config,
        }
    }

    /// Spawns `config.workers` tasks and waits for all of them to return
    /// (they return only on cancellation).
    pub async fn run(&self, cancel: CancellationToken) {
        let mut tasks = Vec::with_capacity(self.config.workers);
        for worker_id in 0..self.config.workers {
            let pool = self.pool.clone();
            let producer = Arc::clone(&self.producer);
            let config = self.config.clone();
            let cancel = cancel.clone();
            tasks.push(tokio::spawn(async move {
                worker_loop(worker_id, pool, producer, config, cancel).await;
            }));
        }
        for task in tasks {
            if let Err(err) = task.await {
                tracing::error!(error = %err, "outbox worker task panicked");
            }
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    pool: PgPool,
    producer: Arc<BusProducer>,
    config: Config,
    cancel: CancellationToken,
) {
    tracing::info!(worker_id, "outbox worker started");
    let mut interval = tokio::time::interval(config.poll_interval);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!(worker_id, "outbox worker stopping");
                return;
            }
            _ = interval.tick() => {
                if let Err(err) = tick(&pool, &producer, &config, &cancel).await {
                    tracing::error!(worker_id, error = %err, "outbox tick failed");
                }
            }
        }
    }
}

async fn tick(
    pool: &PgPool,
    producer: &Arc<BusProducer>,
    config: &Config,
    cancel: &CancellationToken,
) -> Result<(), PingerusError> {
    let start = Instant::now();

    let picked = pingerus_db::outbox::pick_batch(pool, config.batch_size, config.in_progress_ttl).await?;
    metrics::PICKED.inc_by(picked.len() as f64);
    metrics::LAST_BATCH_SIZE.set(picked.len() as f64);

    if picked.is_empty() {
        metrics::TICK_DURATION.observe(start.elapsed().as_secs_f64());
        return Ok(());
    }

    // Dispatches within a batch are concurrent; ordering across distinct
    // checks is not preserved (see spec §5's ordering guarantees).
    //
    // Each row's `kind` is decoded here, per row, rather than eagerly over
    // the whole batch: a row with an unrecognized kind must not abort every
    // other row already flipped to `IN_PROGRESS` by the same pick. A bad
    // row is counted as an error and left `IN_PROGRESS`, re-leased after its
    // TTL like any other stuck row, mirroring the Go original's `continue`
    // on a per-message decode failure.
    let mut dispatches = tokio::task::JoinSet::new();
    for row in picked {
        let key = row.idempotency_key.clone();
        let message: OutboxMessage = match row.try_into() {
            Ok(message) => message,
            Err(err) => {
                metrics::ERR.inc();
                tracing::error!(key = %key, error = %err, "outbox row has an undecodable kind, skipping");
                continue;
            }
        };

        let producer = Arc::clone(producer);
        let cancel = cancel.clone();
        dispatches.spawn(async move {
            let outcome = handler::dispatch(&producer, &cancel, &message).await;
            (message.idempotency_key, outcome)
        });
    }

    let mut ok_keys = Vec::new();
    while let Some(joined) = dispatches.join_next().await {
        match joined {
            Ok((key, Ok(()))) => {
                metrics::OK.inc();
                ok_keys.push(key);
            }
            Ok((key, Err(err))) => {
                metrics::ERR.inc();
                tracing::error!(key = %key, error = %err, "outbox handler failed");
            }
            Err(join_err) => {
                metrics::ERR.inc();
                tracing::error!(error = %join_err, "outbox dispatch task panicked");
            }
        }
    }

    pingerus_db::outbox::mark_success(pool, &ok_keys).await?;

    metrics::TICK_DURATION.observe(start.elapsed().as_secs_f64());
    Ok(())
}
