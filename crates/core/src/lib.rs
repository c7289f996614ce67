//! Core domain types shared by every Pingerus component.
//!
//! This crate has no knowledge of Postgres connections, Kafka brokers or
//! SMTP transports: it holds the entities, the error taxonomy, the
//! environment-variable config shape, and the clock abstraction that every
//! other crate builds on.

pub mod clock;
pub mod config;
pub mod error;
pub mod model;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::CoreConfig;
pub use error::{PingerusError, PingerusResult};
pub use model::{
    Check, CheckRequestMsg, CheckRow, CheckStatus, Notification, OutboxKind, OutboxMessage,
    OutboxRow, OutboxStatus, RefreshToken, Run, StatusChangeMsg, StatusChangedPayload, User,
};
