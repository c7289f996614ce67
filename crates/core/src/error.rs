//! Error taxonomy shared by every component.
//!
//! The four services classify failures into the same six kinds so that
//! retry policies and bus-redelivery decisions can be made on the error
//! variant alone rather than inspecting driver-specific errors.

use thiserror::Error;

/// Domain-level error classification. `Transient` and `Permanent` are the
/// ones a retry policy inspects directly; the rest surface through normal
/// `?` propagation.
#[derive(Error, Debug)]
pub enum PingerusError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("forbidden")]
    Forbidden,

    /// Worth retrying: connection hiccups, timeouts, lock contention.
    #[error("transient: {0}")]
    Transient(String),

    /// Not worth retrying: malformed data, unknown outbox kind, serialization
    /// bugs. Retrying would reproduce the same failure.
    #[error("permanent: {0}")]
    Permanent(String),
}

impl PingerusError {
    /// Whether a retry policy should attempt this again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<sqlx::Error> for PingerusError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("row not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.constraint().is_some() {
                    Self::Conflict(format!("constraint violation: {db_err}"))
                } else {
                    Self::Transient(format!("database error: {db_err}"))
                }
            }
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Self::Transient(err.to_string())
            }
            sqlx::Error::Protocol(_) | sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::Permanent(err.to_string())
            }
            other => Self::Transient(other.to_string()),
        }
    }
}

/// Result type alias used throughout the workspace.
pub type PingerusResult<T> = Result<T, PingerusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(PingerusError::Transient("x".into()).is_retryable());
        assert!(!PingerusError::Permanent("x".into()).is_retryable());
        assert!(!PingerusError::NotFound("x".into()).is_retryable());
        assert!(!PingerusError::Conflict("x".into()).is_retryable());
        assert!(!PingerusError::InvalidInput("x".into()).is_retryable());
        assert!(!PingerusError::Forbidden.is_retryable());
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: PingerusError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, PingerusError::NotFound(_)));
    }
}
