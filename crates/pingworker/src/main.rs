//! Ping Worker binary: one bus-consumer task processing `checks.request`,
//! plus the shared `/healthz`+`/metrics` server, under one cancellation
//! token. Mirrors `server::main`'s spawn-under-one-token shape.

use anyhow::Result;
use pingerus_bus::{run_consumer, ConsumerConfig, CHECKS_REQUEST_TOPIC};
use pingerus_core::{CheckRequestMsg, SystemClock};
use pingerus_db::Transactor;
use pingerus_pingworker::{config::Config, handler::handle_check_request, prober};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    pingerus_obs::init_env();
    let _guard = pingerus_obs::init_tracing("pingworker");

    tracing::info!("starting pingerus ping worker");

    let config = Config::from_env()?;
    let pool = pingerus_obs::init_db(&config.core).await?;
    sqlx::migrate!("../db/migrations").run(&pool).await?;

    let transactor = Arc::new(Transactor::new(pool.clone()));
    let client = Arc::new(prober::build_client(&config.probe)?);
    let clock = Arc::new(SystemClock);

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

    let consumer_config = ConsumerConfig::new(
        config.core.kafka_brokers.clone(),
        config.group_id.clone(),
        CHECKS_REQUEST_TOPIC,
    );
    let consumer_shutdown = shutdown.clone();
    let consumer_task = tokio::spawn(async move {
        run_consumer(
            consumer_config,
            consumer_shutdown,
            move |msg: CheckRequestMsg, parent_cx| {
                let pool = pool.clone();
                let transactor = Arc::clone(&transactor);
                let client = Arc::clone(&client);
                let clock = Arc::clone(&clock);
                async move {
                    handle_check_request(&pool, &transactor, &client, clock.as_ref(), msg, parent_cx).await
                }
            },
        )
        .await
    });

    wait_for_shutdown().await;
    tracing::info!("shutdown signal received, stopping ping worker");
    shutdown.cancel();

    let _ = tokio::join!(consumer_task, health_server);

    tracing::info!("ping worker stopped");
    Ok(())
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
