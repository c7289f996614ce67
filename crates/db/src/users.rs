//! `users` repository. SQL grounded in
//! `internal/repository/postgres/user_repo.go`. Only the reads this
//! workspace's components need (`get_by_id`) are exercised by the Ping
//! Worker/Email Notifier; `create`/`update` are carried for completeness
//! since the admin surface that would call them is out of scope.

use pingerus_core::{PingerusError, User};
use sqlx::PgExecutor;

const SELECT_COLUMNS: &str = "id, email, password_hash, created_at, updated_at, is_active";

pub async fn create<'c>(
    executor: impl PgExecutor<'c>,
    email: &str,
    password_hash: &str,
) -> Result<User, PingerusError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (email, password_hash, is_active)
         VALUES ($1, $2, TRUE)
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(email)
    .bind(password_hash)
    .fetch_one(executor)
    .await?;

    Ok(user)
}

pub async fn get_by_id<'c>(executor: impl PgExecutor<'c>, id: i64) -> Result<User, PingerusError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {SELECT_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_one(executor)
    .await?;

    Ok(user)
}

pub async fn get_by_email<'c>(
    executor: impl PgExecutor<'c>,
    email: &str,
) -> Result<User, PingerusError> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {SELECT_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_one(executor)
    .await?;

    Ok(user)
}
