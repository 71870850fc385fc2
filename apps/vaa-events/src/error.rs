use thiserror::Error;

use crate::vaa::VaaError;

#[derive(Error, Debug)]
pub enum EventsError {
    #[error("malformed message id: {0}")]
    MalformedIdentity(String),

    #[error("VAA decode error: {0}")]
    Decode(#[from] VaaError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{method} RPC failed: {message}")]
    Rpc { method: &'static str, message: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to deserialize: {0}")]
    Toml(#[from] toml::de::Error),
}

impl EventsError {
    /// Storage or control-plane failures the caller cannot fix by changing input.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            EventsError::Unavailable(_) | EventsError::Database(_) | EventsError::Pool(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EventsError>;
