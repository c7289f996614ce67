//! A tiny `axum` surface every component exposes: `/healthz` pings the DB
//! pool with a timeout, `/metrics` renders the global Prometheus registry.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use std::time::Duration;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct HealthState {
    pub pool: sqlx::PgPool,
}

/// Builds the `/healthz` + `/metrics` router, wrapped in the teacher's
/// request-tracing layer.
#[must_use]
pub fn router(pool: sqlx::PgPool) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/metrics", get(metrics))
        .with_state(HealthState { pool })
        .layer(TraceLayer::new_for_http())
}

async fn health_check(State(state): State<HealthState>) -> impl IntoResponse {
    let ping = tokio::time::timeout(Duration::from_millis(500), async {
        sqlx::query("SELECT 1").execute(&state.pool).await
    })
    .await;

    match ping {
        Ok(Ok(_)) => (StatusCode::OK, "ok"),
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "healthz: database ping failed");
            (StatusCode::SERVICE_UNAVAILABLE, "db error")
        }
        Err(_) => {
            tracing::warn!("healthz: database ping timed out");
            (StatusCode::SERVICE_UNAVAILABLE, "timeout")
        }
    }
}

async fn metrics() -> impl IntoResponse {
    use prometheus::Encoder;

    let families = prometheus::gather();
    let encoder = prometheus::TextEncoder::new();
    let mut buf = Vec::new();
    if let Err(err) = encoder.encode(&families, &mut buf) {
        tracing::error!(error = %err, "failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, String::new());
    }
    (
        StatusCode::OK,
        String::from_utf8(buf).unwrap_or_default(),
    )
}
