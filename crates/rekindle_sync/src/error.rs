//! Error types for the synchronizer.

use rekindle_protocol::{ApiErrorBody, ProtocolError};
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Coarse classification of a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connection or transport failure.
    Network,
    /// 401 from the endpoint.
    Auth,
    /// 5xx from the endpoint.
    Server,
    /// Any other non-success status.
    Rejected,
    /// Malformed request or response.
    Validation,
    /// Invalid client configuration.
    Config,
}

/// Errors that can occur while fetching pages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Network or transport error.
    #[error("network error: {message}")]
    Network {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The endpoint answered 401. Token refresh has already been attempted
    /// by the HTTP layer by the time this surfaces.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The endpoint answered with a 5xx status.
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status.
        status: u16,
        /// Server message or fallback text.
        message: String,
    },

    /// The endpoint rejected the request with a non-401 client error.
    #[error("request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status.
        status: u16,
        /// Server message or fallback text.
        message: String,
    },

    /// Malformed request or page.
    #[error("validation error: {0}")]
    Validation(String),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SyncError {
    /// Creates a retryable network error.
    pub fn network_retryable(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable network error.
    pub fn network_fatal(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            retryable: false,
        }
    }

    /// Maps a non-success HTTP status and its body to an error.
    ///
    /// The server's `message` is preferred; otherwise a fixed text per
    /// status is used.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let server_message = ApiErrorBody::message_from(body);
        match status {
            401 => Self::Auth(server_message.unwrap_or_else(|| "session expired".into())),
            400 => Self::Rejected {
                status,
                message: server_message
                    .map(|m| format!("bad request: {m}"))
                    .unwrap_or_else(|| "bad request".into()),
            },
            403 => Self::Rejected {
                status,
                message: server_message.unwrap_or_else(|| {
                    "you don't have permission to access this resource".into()
                }),
            },
            404 => Self::Rejected {
                status,
                message: server_message.unwrap_or_else(|| "resource not found".into()),
            },
            500..=599 => Self::Server {
                status,
                message: server_message
                    .unwrap_or_else(|| "server error, please try again later".into()),
            },
            _ => Self::Rejected {
                status,
                message: server_message.unwrap_or_else(|| format!("unexpected status {status}")),
            },
        }
    }

    /// Returns the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Network { .. } => ErrorKind::Network,
            SyncError::Auth(_) => ErrorKind::Auth,
            SyncError::Server { .. } => ErrorKind::Server,
            SyncError::Rejected { .. } => ErrorKind::Rejected,
            SyncError::Validation(_) => ErrorKind::Validation,
            SyncError::Config(_) => ErrorKind::Config,
        }
    }

    /// Returns true if a manual retry may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Network { retryable, .. } => *retryable,
            SyncError::Server { .. } => true,
            _ => false,
        }
    }
}

impl From<ProtocolError> for SyncError {
    fn from(err: ProtocolError) -> Self {
        SyncError::Validation(err.to_string())
    }
}
