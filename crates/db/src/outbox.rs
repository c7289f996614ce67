//! `outbox` repository: the transactional-outbox core, SQL grounded
//! verbatim in `internal/repository/postgres/outbox.go`'s `qEnqueue`,
//! `qPickLocked`, `qMarkSuccess`.

use pingerus_core::{OutboxKind, OutboxRow, PingerusError};
use sqlx::{PgExecutor, PgPool};
use std::time::Duration;

/// Enqueues an event, deduplicating on `idempotency_key`. A second enqueue
/// with the same key is a silent no-op (`ON CONFLICT DO NOTHING`), so
/// callers can safely retry the enqueue itself.
pub async fn enqueue<'c>(
    executor: impl PgExecutor<'c>,
    idempotency_key: &str,
    kind: OutboxKind,
    data: &[u8],
    traceparent: Option<&str>,
    tracestate: Option<&str>,
    baggage: Option<&str>,
) -> Result<(), PingerusError> {
    sqlx::query(
        "INSERT INTO outbox (idempotency_key, data, status, kind, traceparent, tracestate, baggage)
         VALUES ($1, $2, 'CREATED', $3, $4, $5, $6)
         ON CONFLICT (idempotency_key) DO NOTHING",
    )
    .bind(idempotency_key)
    .bind(data)
    .bind(kind as i32)
    .bind(traceparent)
    .bind(tracestate)
    .bind(baggage)
    .execute(executor)
    .await?;

    Ok(())
}

/// Picks up to `batch` rows that are either fresh (`CREATED`) or abandoned
/// (`IN_PROGRESS` past `in_progress_ttl`), atomically transitioning them to
/// `IN_PROGRESS` with a fresh `updated_at`. Runs in its own transaction so
/// the row-lock/skip-locked selection and the status transition are
/// atomic; a crash between the two can't happen since they're one
/// statement (`UPDATE ... FROM cand`).
///
/// Returns raw rows rather than decoded `OutboxMessage`s: decoding a row's
/// `kind` can fail (see [`OutboxKind::try_from`]), and that failure must be
/// scoped to the one bad row, not fail the whole picked batch — the caller
/// decodes per row and leaves a bad row `IN_PROGRESS` to be re-leased after
/// its TTL.
pub async fn pick_batch(
    pool: &PgPool,
    batch: i64,
    in_progress_ttl: Duration,
) -> Result<Vec<OutboxRow>, PingerusError> {
    if batch <= 0 {
        return Err(PingerusError::InvalidInput("batch must be > 0".to_string()));
    }

    let ttl_seconds = in_progress_ttl.as_secs_f64();

    let rows = sqlx::query_as::<_, OutboxRow>(
        "WITH cand AS (
            SELECT idempotency_key
            FROM outbox
            WHERE
                status = 'CREATED'
                OR (status = 'IN_PROGRESS' AND updated_at < now() - ($2 || ' seconds')::interval)
            ORDER BY created_at
            FOR UPDATE SKIP LOCKED
            LIMIT $1
        ), upd AS (
            UPDATE outbox o
            SET status = 'IN_PROGRESS',
                updated_at = now()
            FROM cand
            WHERE o.idempotency_key = cand.idempotency_key
            RETURNING o.idempotency_key, o.kind, o.data, o.status, o.created_at, o.updated_at,
                      o.traceparent, o.tracestate, o.baggage
        )
        SELECT idempotency_key, kind, data, status, created_at, updated_at,
               traceparent, tracestate, baggage
        FROM upd",
    )
    .bind(batch)
    .bind(ttl_seconds)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Transitions the given keys to `SUCCESS`, guarded by `status =
/// 'IN_PROGRESS'` so a row reclaimed by another worker after this one's
/// lease expired is never clobbered back to `SUCCESS`.
pub async fn mark_success<'c>(
    executor: impl PgExecutor<'c>,
    keys: &[String],
) -> Result<(), PingerusError> {
    if keys.is_empty() {
        return Ok(());
    }

    sqlx::query(
        "UPDATE outbox
         SET status = 'SUCCESS', updated_at = now()
         WHERE idempotency_key = ANY($1)
           AND status = 'IN_PROGRESS'",
    )
    .bind(keys)
    .execute(executor)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[sqlx::test(migrations = "./migrations")]
    async fn pick_batch_rejects_non_positive_batch_size(pool: PgPool) {
        let err = pick_batch(&pool, 0, Duration::from_secs(30))
            .await
            .unwrap_err();
        assert!(matches!(err, PingerusError::InvalidInput(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn enqueue_then_pick_batch_transitions_to_in_progress(pool: PgPool) {
        enqueue(&pool, "status:1:100", OutboxKind::StatusChanged, b"{}", None, None, None)
            .await
            .unwrap();

        let picked = pick_batch(&pool, 10, Duration::from_secs(30)).await.unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].idempotency_key, "status:1:100");
        assert_eq!(picked[0].status, "IN_PROGRESS");

        let picked_again = pick_batch(&pool, 10, Duration::from_secs(30)).await.unwrap();
        assert!(picked_again.is_empty(), "a fresh IN_PROGRESS row must not be re-picked");
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn enqueue_is_idempotent_on_key(pool: PgPool) {
        enqueue(&pool, "status:1:100", OutboxKind::StatusChanged, b"{}", None, None, None)
            .await
            .unwrap();
        enqueue(&pool, "status:1:100", OutboxKind::StatusChanged, b"other", None, None, None)
            .await
            .unwrap();

        let picked = pick_batch(&pool, 10, Duration::from_secs(30)).await.unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].data, b"{}".to_vec());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn pick_batch_returns_raw_rows_so_a_bad_kind_does_not_fail_the_batch(pool: PgPool) {
        enqueue(&pool, "status:1:100", OutboxKind::StatusChanged, b"{}", None, None, None)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO outbox (idempotency_key, data, status, kind)
             VALUES ($1, $2, 'CREATED', $3)",
        )
        .bind("bogus:1")
        .bind(b"{}".as_slice())
        .bind(999i32)
        .execute(&pool)
        .await
        .unwrap();

        let picked = pick_batch(&pool, 10, Duration::from_secs(30)).await.unwrap();
        assert_eq!(picked.len(), 2, "both rows pick and transition regardless of kind validity");

        let bogus = picked.iter().find(|r| r.idempotency_key == "bogus:1").unwrap();
        assert!(pingerus_core::OutboxKind::try_from(bogus.kind).is_err());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn mark_success_only_affects_in_progress_rows(pool: PgPool) {
        enqueue(&pool, "status:1:100", OutboxKind::StatusChanged, b"{}", None, None, None)
            .await
            .unwrap();
        let picked = pick_batch(&pool, 10, Duration::from_secs(30)).await.unwrap();
        let keys: Vec<String> = picked.into_iter().map(|m| m.idempotency_key).collect();

        mark_success(&pool, &keys).await.unwrap();

        let picked_after = pick_batch(&pool, 10, Duration::from_secs(30)).await.unwrap();
        assert!(picked_after.is_empty(), "a SUCCESS row must never be re-picked");
    }
}
