//! `notifications` repository. SQL grounded in
//! `internal/repository/postgres/notification_repo.go`.

use chrono::{DateTime, Utc};
use pingerus_core::{Notification, PingerusError};
use sqlx::PgExecutor;

/// `sent_at` is passed in rather than computed with SQL `now()` so the
/// caller's injected [`pingerus_core::Clock`] is what ends up on the row,
/// matching the Go original's `h.Clock.Now().UTC()`.
pub async fn create<'c>(
    executor: impl PgExecutor<'c>,
    check_id: i64,
    user_id: i64,
    kind: &str,
    sent_at: DateTime<Utc>,
    payload: &str,
) -> Result<Notification, PingerusError> {
    let notification = sqlx::query_as::<_, Notification>(
        "INSERT INTO notifications (check_id, user_id, type, sent_at, payload)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING id, check_id, user_id, type, sent_at, payload",
    )
    .bind(check_id)
    .bind(user_id)
    .bind(kind)
    .bind(sent_at)
    .bind(payload)
    .fetch_one(executor)
    .await?;

    Ok(notification)
}

pub async fn list_by_user<'c>(
    executor: impl PgExecutor<'c>,
    user_id: i64,
    limit: i64,
) -> Result<Vec<Notification>, PingerusError> {
    let limit = if limit <= 0 { 50 } else { limit };
    let notifications = sqlx::query_as::<_, Notification>(
        "SELECT id, check_id, user_id, type, sent_at, payload
         FROM notifications
         WHERE user_id = $1
         ORDER BY sent_at DESC
         LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(executor)
    .await?;

    Ok(notifications)
}
