//! Scheduler binary: one ticking runner plus the shared health/metrics
//! server, under one cancellation token.

use anyhow::Result;
use pingerus_bus::BusProducer;
use pingerus_scheduler::{Config, Runner};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    pingerus_obs::init_env();
    let _guard = pingerus_obs::init_tracing("scheduler");

    tracing::info!("starting pingerus scheduler");

    let config = Config::from_env()?;
    let pool = pingerus_obs::init_db(&config.core).await?;
    sqlx::migrate!("../db/migrations").run(&pool).await?;

    let producer = BusProducer::new(&config.core.kafka_brokers, "pingerus-scheduler")?;

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

    let runner = Runner::new(pool, producer, config);
    let runner_shutdown = shutdown.clone();
    let runner_task = tokio::spawn(async move {
        runner.run(runner_shutdown).await;
    });

    wait_for_shutdown().await;
    tracing::info!("shutdown signal received, stopping scheduler");
    shutdown.cancel();

    let _ = tokio::join!(runner_task, health_server);

    tracing::info!("scheduler stopped");
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
