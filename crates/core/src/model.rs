//! Domain entities, shaped directly off the schema in `pingerus-db`'s
//! migrations: `users`, `checks`, `runs`, `notifications`, `outbox`,
//! `refresh_tokens`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Owner of one or more checks.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Carried in the schema for completeness; no repository operation reads or
/// writes this beyond what the migration creates (refresh-token issuance is
/// the admin surface's job, out of scope here).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RefreshToken {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
}

/// Tri-valued probe status. The database stores this as a nullable `BOOL`
/// column (`NULL` = never probed); this type makes "never probed" a distinct,
/// exhaustively-matched state instead of a magic `Option<bool>` scattered
/// through change-detection logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    Unknown,
    Up,
    Down,
}

impl CheckStatus {
    #[must_use]
    pub const fn from_db(value: Option<bool>) -> Self {
        match value {
            None => Self::Unknown,
            Some(true) => Self::Up,
            Some(false) => Self::Down,
        }
    }

    #[must_use]
    pub const fn to_db(self) -> Option<bool> {
        match self {
            Self::Unknown => None,
            Self::Up => Some(true),
            Self::Down => Some(false),
        }
    }

    #[must_use]
    pub const fn is_up(self) -> bool {
        matches!(self, Self::Up)
    }
}

/// A monitored HTTP endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Check {
    pub id: i64,
    pub user_id: i64,
    pub host: String,
    pub interval_sec: i32,
    pub active: bool,
    pub last_status: CheckStatus,
    pub next_run: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row shape as it comes off the `checks` table; `last_status` is decoded
/// through [`CheckStatus::from_db`] before the row becomes a [`Check`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CheckRow {
    pub id: i64,
    pub user_id: i64,
    pub host: String,
    pub interval_sec: i32,
    pub active: bool,
    pub last_status: Option<bool>,
    pub next_run: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CheckRow> for Check {
    fn from(row: CheckRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            host: row.host,
            interval_sec: row.interval_sec,
            active: row.active,
            last_status: CheckStatus::from_db(row.last_status),
            next_run: row.next_run,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// One probe outcome.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Run {
    pub id: i64,
    pub check_id: i64,
    pub ts: DateTime<Utc>,
    pub status: bool,
    pub code: i32,
    pub latency_ms: i64,
}

/// A sent notification.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id: i64,
    pub check_id: i64,
    pub user_id: i64,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub sent_at: DateTime<Utc>,
    pub payload: String,
}

/// Outbox event kind. Only `StatusChanged` exists on the wire today; the
/// numeric discriminant is stable across releases since it is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[repr(i32)]
pub enum OutboxKind {
    StatusChanged = 1,
}

impl TryFrom<i32> for OutboxKind {
    type Error = crate::error::PingerusError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::StatusChanged),
            other => Err(crate::error::PingerusError::Permanent(format!(
                "unknown outbox kind {other}"
            ))),
        }
    }
}

/// Lifecycle of an outbox row, exactly the three states a dispatcher moves
/// a row through. The column itself is plain `TEXT` with a `CHECK`
/// constraint (not a native Postgres enum type), so this converts through
/// `&str` rather than deriving `sqlx::Type` against a nonexistent SQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutboxStatus {
    Created,
    InProgress,
    Success,
}

impl OutboxStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::InProgress => "IN_PROGRESS",
            Self::Success => "SUCCESS",
        }
    }
}

impl std::str::FromStr for OutboxStatus {
    type Err = crate::error::PingerusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(Self::Created),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "SUCCESS" => Ok(Self::Success),
            other => Err(crate::error::PingerusError::Permanent(format!(
                "unknown outbox status {other}"
            ))),
        }
    }
}

/// A queued, at-least-once relayed event. `idempotency_key` is the dedup
/// anchor a consumer can key retries on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxMessage {
    pub idempotency_key: String,
    pub kind: OutboxKind,
    pub data: Vec<u8>,
    pub status: OutboxStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub traceparent: Option<String>,
    pub tracestate: Option<String>,
    pub baggage: Option<String>,
}

/// Row shape as it comes off the `outbox` table; `status` is decoded through
/// [`OutboxStatus::from_str`] and `kind` through [`OutboxKind::try_from`]
/// before the row becomes an [`OutboxMessage`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OutboxRow {
    pub idempotency_key: String,
    pub kind: i32,
    pub data: Vec<u8>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub traceparent: Option<String>,
    pub tracestate: Option<String>,
    pub baggage: Option<String>,
}

impl TryFrom<OutboxRow> for OutboxMessage {
    type Error = crate::error::PingerusError;

    fn try_from(row: OutboxRow) -> Result<Self, Self::Error> {
        Ok(Self {
            idempotency_key: row.idempotency_key,
            kind: OutboxKind::try_from(row.kind)?,
            data: row.data,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            traceparent: row.traceparent,
            tracestate: row.tracestate,
            baggage: row.baggage,
        })
    }
}

/// Payload carried by `outbox.data` for a `StatusChanged` event, and by the
/// `status.change` bus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangedPayload {
    pub check_id: i64,
    pub old: bool,
    pub new: bool,
    pub at: DateTime<Utc>,
}

/// Bus message published to `checks.request`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRequestMsg {
    pub check_id: i64,
}

/// Bus message published to `status.change`. Identical in shape to
/// [`StatusChangedPayload`]; kept as a distinct type since the outbox
/// payload and the wire message are conceptually different contracts even
/// though nothing distinguishes them structurally today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangeMsg {
    pub check_id: i64,
    pub old: bool,
    pub new: bool,
    pub ts: DateTime<Utc>,
}

impl From<StatusChangedPayload> for StatusChangeMsg {
    fn from(p: StatusChangedPayload) -> Self {
        Self {
            check_id: p.check_id,
            old: p.old,
            new: p.new,
            ts: p.at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_status_round_trips_through_db_encoding() {
        for (db, status) in [
            (None, CheckStatus::Unknown),
            (Some(true), CheckStatus::Up),
            (Some(false), CheckStatus::Down),
        ] {
            assert_eq!(CheckStatus::from_db(db), status);
            assert_eq!(status.to_db(), db);
        }
    }

    #[test]
    fn check_status_is_up_only_for_up() {
        assert!(CheckStatus::Up.is_up());
        assert!(!CheckStatus::Down.is_up());
        assert!(!CheckStatus::Unknown.is_up());
    }

    #[test]
    fn outbox_kind_rejects_unknown_discriminant() {
        assert!(OutboxKind::try_from(1).is_ok());
        assert!(OutboxKind::try_from(2).is_err());
    }

    #[test]
    fn status_changed_payload_maps_onto_wire_message() {
        let at = Utc::now();
        let payload = StatusChangedPayload {
            check_id: 42,
            old: false,
            new: true,
            at,
        };
        let msg: StatusChangeMsg = payload.into();
        assert_eq!(msg.check_id, 42);
        assert!(!msg.old);
        assert!(msg.new);
        assert_eq!(msg.ts, at);
    }
}
