//! `runs` repository. SQL grounded in
//! `internal/repository/postgres/run_repo.go`.

use pingerus_core::{PingerusError, Run};
use sqlx::PgExecutor;

pub async fn insert<'c>(
    executor: impl PgExecutor<'c>,
    check_id: i64,
    ts: chrono::DateTime<chrono::Utc>,
    status: bool,
    code: i32,
    latency_ms: i64,
) -> Result<Run, PingerusError> {
    let run = sqlx::query_as::<_, Run>(
        "INSERT INTO runs (check_id, ts, status, code, latency_ms)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, check_id, ts, status, code, latency_ms",
    )
    .bind(check_id)
    .bind(ts)
    .bind(status)
    .bind(code)
    .bind(latency_ms)
    .fetch_one(executor)
    .await?;

    Ok(run)
}

pub async fn list_by_check<'c>(
    executor: impl PgExecutor<'c>,
    check_id: i64,
    limit: i64,
) -> Result<Vec<Run>, PingerusError> {
    let limit = if limit <= 0 { 50 } else { limit };
    let runs = sqlx::query_as::<_, Run>(
        "SELECT id, check_id, ts, status, code, latency_ms
         FROM runs
         WHERE check_id = $1
         ORDER BY ts DESC
         LIMIT $2",
    )
    .bind(check_id)
    .bind(limit)
    .fetch_all(executor)
    .await?;

    Ok(runs)
}
