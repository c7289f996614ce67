//! `checks` repository. SQL grounded directly in
//! `internal/repository/postgres/check_repo.go`'s query literals.

use chrono::Utc;
use pingerus_core::{Check, CheckRow, PingerusError};
use sqlx::PgExecutor;

const SELECT_COLUMNS: &str =
    "id, user_id, host, interval_sec, last_status, next_run, created_at, updated_at, active";

pub async fn create<'c>(
    executor: impl PgExecutor<'c>,
    user_id: i64,
    host: &str,
    interval_sec: i32,
) -> Result<Check, PingerusError> {
    let row = sqlx::query_as::<_, CheckRow>(&format!(
        "INSERT INTO checks (user_id, host, interval_sec, active, next_run)
         VALUES ($1, $2, $3, TRUE, NOW())
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(user_id)
    .bind(host)
    .bind(interval_sec)
    .fetch_one(executor)
    .await?;

    Ok(row.into())
}

pub async fn get_by_id<'c>(
    executor: impl PgExecutor<'c>,
    id: i64,
) -> Result<Check, PingerusError> {
    let row = sqlx::query_as::<_, CheckRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM checks WHERE id = $1"
    ))
    .bind(id)
    .fetch_one(executor)
    .await?;

    Ok(row.into())
}

pub async fn list_by_user<'c>(
    executor: impl PgExecutor<'c>,
    user_id: i64,
) -> Result<Vec<Check>, PingerusError> {
    let rows = sqlx::query_as::<_, CheckRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM checks WHERE user_id = $1 ORDER BY id DESC"
    ))
    .bind(user_id)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn delete<'c>(executor: impl PgExecutor<'c>, id: i64) -> Result<(), PingerusError> {
    sqlx::query("DELETE FROM checks WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Selects up to `limit` due, active checks and advances `next_run`
/// atomically in the same query (row lock via `FOR UPDATE SKIP LOCKED`), so
/// no two scheduler replicas can dispatch the same check in one tick.
pub async fn fetch_due_and_advance<'c>(
    executor: impl PgExecutor<'c>,
    limit: i64,
) -> Result<Vec<Check>, PingerusError> {
    let rows = sqlx::query_as::<_, CheckRow>(&format!(
        "WITH due AS (
            SELECT id FROM checks
            WHERE active = TRUE AND next_run <= NOW()
            ORDER BY next_run
            FOR UPDATE SKIP LOCKED
            LIMIT $1
        )
        UPDATE checks
        SET next_run = NOW() + (interval_sec * INTERVAL '1 second'),
            updated_at = NOW()
        FROM due
        WHERE checks.id = due.id
        RETURNING {cols}",
        cols = SELECT_COLUMNS
            .split(", ")
            .map(|c| format!("checks.{c}"))
            .collect::<Vec<_>>()
            .join(", ")
    ))
    .bind(limit)
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Updates `last_status` and `updated_at` after a probe. Intended to run
/// inside the Ping Worker's three-write transaction alongside the `Run`
/// insert and outbox enqueue.
pub async fn update_last_status<'c>(
    executor: impl PgExecutor<'c>,
    id: i64,
    last_status: pingerus_core::CheckStatus,
) -> Result<(), PingerusError> {
    sqlx::query("UPDATE checks SET last_status = $2, updated_at = $3 WHERE id = $1")
        .bind(id)
        .bind(last_status.to_db())
        .bind(Utc::now())
        .execute(executor)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_columns_cover_every_check_field() {
        for field in [
            "id",
            "user_id",
            "host",
            "interval_sec",
            "last_status",
            "next_run",
            "created_at",
            "updated_at",
            "active",
        ] {
            assert!(SELECT_COLUMNS.contains(field));
        }
    }
}
