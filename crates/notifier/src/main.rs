//! Email Notifier binary: one bus-consumer task processing `status.change`,
//! plus the shared `/healthz`+`/metrics` server, under one cancellation
//! token. Mirrors `server::main`'s spawn-under-one-token shape.

use anyhow::Result;
use pingerus_bus::{run_consumer, ConsumerConfig, STATUS_CHANGE_TOPIC};
use pingerus_core::{StatusChangeMsg, SystemClock};
use pingerus_notifier::{config::Config, handler::handle_status_change, mailer::Mailer};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    pingerus_obs::init_env();
    let _guard = pingerus_obs::init_tracing("notifier");

    tracing::info!("starting pingerus email notifier");

    let config = Config::from_env()?;
    let pool = pingerus_obs::init_db(&config.core).await?;
    sqlx::migrate!("../db/migrations").run(&pool).await?;

    let mailer = Mailer::new(&config.smtp, config.send_timeout)?;
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
        STATUS_CHANGE_TOPIC,
    );
    let consumer_shutdown = shutdown.clone();
    let consumer_task = tokio::spawn(async move {
        run_consumer(
            consumer_config,
            consumer_shutdown,
            move |msg: StatusChangeMsg, parent_cx| {
                let pool = pool.clone();
                let mailer = mailer.clone();
                let clock = Arc::clone(&clock);
                async move { handle_status_change(&pool, &mailer, clock.as_ref(), msg, parent_cx).await }
            },
        )
        .await
    });

    wait_for_shutdown().await;
    tracing::info!("shutdown signal received, stopping email notifier");
    shutdown.cancel();

    let _ = tokio::join!(consumer_task, health_server);

    tracing::info!("email notifier stopped");
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
