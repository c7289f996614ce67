//! Outbox dispatcher binary. Grounded in `crates/server/src/main.rs`'s
//! init-then-spawn-under-one-`CancellationToken` shape, scaled down to a
//! single component: load config, build the shared pool and producer, run
//! the dispatcher and the health/metrics server side by side, shut down on
//! ctrl_c or SIGTERM.

use anyhow::Result;
use pingerus_bus::BusProducer;
use pingerus_outbox_dispatcher::{Config, Runner};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    pingerus_obs::init_env();
    let _guard = pingerus_obs::init_tracing("outbox");

    tracing::info!("starting pingerus outbox dispatcher");

    let config = Config::from_env()?;
    let pool = pingerus_obs::init_db(&config.core).await?;
    sqlx::migrate!("../db/migrations").run(&pool).await?;

    let producer = Arc::new(BusProducer::new(&config.core.kafka_brokers, "pingerus-outbox")?);

    let shutdown = CancellationToken::new();
    let runner = Runner::new(pool.clone(), producer, config);

    let health_shutdown = shutdown.clone();
    let health_server = tokio::spawn(async move {
        let app = pingerus_obs::metrics::router(pool);
        let listener = tokio::net::TcpListener::bind("0.0.0.0:9090").await?;
        tracing::info!("health/metrics server listening on :9090");
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { health_shutdown.cancelled().await })
            .await?;
        Ok::<(), anyhow::Error>(())
    });

    let runner_shutdown = shutdown.clone();
    let runner_task = tokio::spawn(async move {
        runner.run(runner_shutdown).await;
    });

    wait_for_shutdown().await;
    tracing::info!("shutdown signal received, stopping outbox dispatcher");
    shutdown.cancel();

    let _ = tokio::join!(runner_task, health_server);

    tracing::info!("outbox dispatcher stopped");
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
