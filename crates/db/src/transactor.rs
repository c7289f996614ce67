//! Composes multiple repository writes into one transaction: begin, run the
//! closure with a `&mut Transaction`, commit on `Ok`, roll back on `Err`.

use pingerus_core::PingerusError;
use sqlx::{PgPool, Postgres, Transaction};
use std::future::Future;

#[derive(Clone)]
pub struct Transactor {
    pool: PgPool,
}

impl Transactor {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs `f` inside a single transaction. On success the transaction is
    /// committed; on any error (from `f` or from commit) it is rolled back.
    pub async fn with_tx<F, Fut, T>(&self, f: F) -> Result<T, PingerusError>
    where
        F: FnOnce(&mut Transaction<'_, Postgres>) -> Fut,
        Fut: Future<Output = Result<T, PingerusError>>,
    {
        let mut tx = self.pool.begin().await?;
        match f(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
