//! Postgres repositories for every entity in `pingerus_core::model`, plus
//! the transaction-composition helper the Ping Worker's three-write commit
//! uses.
//!
//! Each repository function takes a generic `impl sqlx::PgExecutor<'_>`
//! rather than a concrete `&PgPool`: both `&PgPool` and
//! `&mut sqlx::Transaction<'_, Postgres>` satisfy that bound, so a caller
//! can compose several repository calls into one transaction simply by
//! passing `&mut *tx` instead of the pool. This is the idiomatic-Rust
//! analogue of the original's `context.WithValue`-carried `pgx.Tx` pattern:
//! Rust's trait system lets call sites choose the executor statically
//! instead of type-asserting a value out of a context at runtime.

pub mod checks;
pub mod notifications;
pub mod outbox;
pub mod runs;
pub mod transactor;
pub mod users;

pub use transactor::Transactor;
