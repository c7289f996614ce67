//! Unified Pingerus binary: spawns the Scheduler, Ping Worker, Outbox
//! Dispatcher and Email Notifier under one shared database pool and one
//! shared `CancellationToken`, plus a single `/healthz`+`/metrics` server.
//! Grounded in the teacher's `server::main` (`spawn_api`/`spawn_bot`/
//! `spawn_worker` under one token), generalised to four services instead of
//! three.

use anyhow::Result;
use pingerus_bus::{run_consumer, ConsumerConfig, CHECKS_REQUEST_TOPIC, STATUS_CHANGE_TOPIC};
use pingerus_core::{CheckRequestMsg, CoreConfig, StatusChangeMsg, SystemClock};
use pingerus_db::Transactor;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    pingerus_obs::init_env();
    let _guard = pingerus_obs::init_tracing("server");

    tracing::info!("starting pingerus unified server");

    let core = CoreConfig::from_env()?;
    let pool = pingerus_obs::init_db(&core).await?;
    sqlx::migrate!("../db/migrations").run(&pool).await?;
    tracing::info!("migrations applied");

    let scheduler_config = pingerus_scheduler::Config::from_env()?;
    let pingworker_config = pingerus_pingworker::Config::from_env()?;
    let outbox_config = pingerus_outbox_dispatcher::Config::from_env()?;
    let notifier_config = pingerus_notifier::Config::from_env()?;

    let shutdown = CancellationToken::new();

    let health_shutdown = shutdown.clone();
    let health_pool = pool.clone();
    let health_server = tokio::spawn(async move {
        let app = pingerus_obs::metrics::router(health_pool);
        let listener = tokio::net::TcpListener::bind("0.0.0.0:9090").await?;
        tracing::info!("health/metrics server listening on :9090");
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { health_shutdown.cancelled().await })
            .await?;
        Ok::<(), anyhow::Error>(())
    });

    let scheduler_task = spawn_scheduler(pool.clone(), scheduler_config, shutdown.clone())?;
    let pingworker_task = spawn_pingworker(pool.clone(), pingworker_config, shutdown.clone())?;
    let outbox_task = spawn_outbox(pool.clone(), outbox_config, shutdown.clone())?;
    let notifier_task = spawn_notifier(pool.clone(), notifier_config, shutdown.clone())?;

    tracing::info!("all services started");

    wait_for_shutdown().await;
    tracing::info!("shutdown signal received");
    shutdown.cancel();

    let _ = tokio::join!(
        scheduler_task,
        pingworker_task,
        outbox_task,
        notifier_task,
        health_server,
    );

    tracing::info!("all services stopped");
    Ok(())
}

fn spawn_scheduler(
    pool: PgPool,
    config: pingerus_scheduler::Config,
    shutdown: CancellationToken,
) -> Result<tokio::task::JoinHandle<()>> {
    let producer = pingerus_bus::BusProducer::new(&config.core.kafka_brokers, "pingerus-scheduler")?;
    let runner = pingerus_scheduler::Runner::new(pool, producer, config);
    Ok(tokio::spawn(async move {
        runner.run(shutdown).await;
    }))
}

fn spawn_pingworker(
    pool: PgPool,
    config: pingerus_pingworker::Config,
    shutdown: CancellationToken,
) -> Result<tokio::task::JoinHandle<()>> {
    let transactor = Arc::new(Transactor::new(pool.clone()));
    let client = Arc::new(pingerus_pingworker::prober::build_client(&config.probe)?);
    let clock = Arc::new(SystemClock);
    let consumer_config = ConsumerConfig::new(
        config.core.kafka_brokers.clone(),
        config.group_id.clone(),
        CHECKS_REQUEST_TOPIC,
    );

    Ok(tokio::spawn(async move {
        let result = run_consumer(consumer_config, shutdown, move |msg: CheckRequestMsg, parent_cx| {
            let pool = pool.clone();
            let transactor = Arc::clone(&transactor);
            let client = Arc::clone(&client);
            let clock = Arc::clone(&clock);
            async move {
                pingerus_pingworker::handle_check_request(
                    &pool,
                    &transactor,
                    &client,
                    clock.as_ref(),
                    msg,
                    parent_cx,
                )
                .await
            }
        })
        .await;
        if let Err(err) = result {
            tracing::error!(error = %err, "ping worker consumer exited");
        }
    }))
}

fn spawn_outbox(
    pool: PgPool,
    config: pingerus_outbox_dispatcher::Config,
    shutdown: CancellationToken,
) -> Result<tokio::task::JoinHandle<()>> {
    let producer = Arc::new(pingerus_bus::BusProducer::new(
        &config.core.kafka_brokers,
        "pingerus-outbox",
    )?);
    let runner = pingerus_outbox_dispatcher::Runner::new(pool, producer, config);
    Ok(tokio::spawn(async move {
        runner.run(shutdown).await;
    }))
}

fn spawn_notifier(
    pool: PgPool,
    config: pingerus_notifier::Config,
    shutdown: CancellationToken,
) -> Result<tokio::task::JoinHandle<()>> {
    let mailer = pingerus_notifier::Mailer::new(&config.smtp, config.send_timeout)?;
    let clock = Arc::new(SystemClock);
    let consumer_config = ConsumerConfig::new(
        config.core.kafka_brokers.clone(),
        config.group_id.clone(),
        STATUS_CHANGE_TOPIC,
    );

    Ok(tokio::spawn(async move {
        let result = run_consumer(consumer_config, shutdown, move |msg: StatusChangeMsg, parent_cx| {
            let pool = pool.clone();
            let mailer = mailer.clone();
            let clock = Arc::clone(&clock);
            async move {
                pingerus_notifier::handle_status_change(&pool, &mailer, clock.as_ref(), msg, parent_cx).await
            }
        })
        .await;
        if let Err(err) = result {
            tracing::error!(error = %err, "email notifier consumer exited");
        }
    }))
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install ctrl_c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        _ = terminate => {},
    }
}
