//! Error types for the tracker core.

use thiserror::Error;

use crate::model::DeviceId;

/// Errors surfaced by the tracker facade and its parts.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("connection to {url} failed: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("feed channel disconnected")]
    ChannelDisconnected,

    #[error("request timed out")]
    Timeout,

    #[error("no accessory with id {id}")]
    AccessoryNotFound { id: DeviceId },

    #[error("{message}")]
    ValidationFailed { message: String },

    #[error("registry persistence failed: {message}")]
    Persistence { message: String },

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Internal(String),
}

impl From<waymark_api::Error> for CoreError {
    fn from(err: waymark_api::Error) -> Self {
        match err {
            waymark_api::Error::Timeout { .. } => Self::Timeout,
            waymark_api::Error::SocketGone | waymark_api::Error::SocketClosed { .. } => {
                Self::ChannelDisconnected
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Persistence {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Persistence {
            message: err.to_string(),
        }
    }
}
