use anyhow::Result;
use pingerus_core::CoreConfig;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize dotenvy so a local `.env` file is honoured in development.
pub fn init_env() {
    dotenvy::dotenv().ok();
}

/// Initialize tracing with a console layer and a non-blocking JSON file
/// layer. Returns the file appender's guard; the caller must keep it alive
/// for the process lifetime or buffered log lines are lost on exit.
pub fn init_tracing(service_name: &str) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "logs/app".to_string());

    let now = chrono::Local::now().format("%y-%m-%d-%H-%M-%S").to_string();
    let filename = format!("pingerus-{service_name}.log.{now}.jsonl");

    let file_appender = tracing_appender::rolling::never(&log_dir, filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_filter = format!("info,{service_name}=debug,sqlx=warn");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    Some(guard)
}

/// Initialize the shared Postgres connection pool.
pub async fn init_db(config: &CoreConfig) -> Result<sqlx::PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_conns)
        .min_connections(config.db_min_conns)
        .acquire_timeout(config.db_acquire_timeout)
        .idle_timeout(config.db_idle_timeout)
        .max_lifetime(config.db_max_lifetime)
        .connect(&config.database_url)
        .await?;

    tracing::info!(max_conns = config.db_max_conns, "database pool established");

    Ok(pool)
}
