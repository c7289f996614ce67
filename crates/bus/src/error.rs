use thiserror::Error;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("publish failed: {0}")]
    Publish(String),

    #[error("serialize failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("fetch failed: {0}")]
    Fetch(String),
}

impl From<BusError> for pingerus_core::PingerusError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::Serialize(_) => Self::Permanent(err.to_string()),
            BusError::Publish(_) | BusError::Fetch(_) => Self::Transient(err.to_string()),
        }
    }
}
