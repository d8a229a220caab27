//! Error taxonomy for the identity-scoped data client.
//!
//! `StoreError` describes what the remote record store said; `ClientError` is
//! what the coordinator sees (auth failures, sequencing errors, remote
//! failures).

use std::fmt;

use serde_json::Value;

use crate::channel::Generation;

/// Category of a remote store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// The addressed record does not exist.
    NotFound,
    /// The channel's identity was rejected.
    Unauthorized,
    /// Any other non-success status.
    HttpStatus,
    /// Connection failure or timeout.
    Transport,
    /// The response body could not be decoded.
    Parse,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreErrorKind::NotFound => write!(f, "not_found"),
            StoreErrorKind::Unauthorized => write!(f, "unauthorized"),
            StoreErrorKind::HttpStatus => write!(f, "http_status"),
            StoreErrorKind::Transport => write!(f, "transport"),
            StoreErrorKind::Parse => write!(f, "parse"),
        }
    }
}

/// Structured failure reported by a record store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub kind: StoreErrorKind,
    /// One-line summary suitable for display.
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(what: impl fmt::Display) -> Self {
        Self::new(StoreErrorKind::NotFound, format!("{what} not found"))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Unauthorized, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Transport, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Parse, message)
    }

    /// Creates an HTTP status error, pulling a message out of a JSON body
    /// (`{"error": ...}` or `{"message": ...}`) when there is one.
    pub fn http_status(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<Value>(body).ok().and_then(|json| {
            ["error", "message"]
                .iter()
                .find_map(|key| json.get(*key).and_then(Value::as_str).map(str::to_string))
        });
        let message = match detail {
            Some(detail) => format!("HTTP {status}: {detail}"),
            None => format!("HTTP {status}"),
        };
        Self::new(StoreErrorKind::HttpStatus, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == StoreErrorKind::NotFound
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StoreError {}

/// Result type for record store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failures surfaced to the view state coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Sign-in or sign-out did not complete.
    AuthFailure(String),
    /// A record operation was attempted with no channel bound.
    NotBound,
    /// A record operation was attempted on a channel that has been rebound.
    StaleChannel(Generation),
    /// The connector could not build a channel; the previous one is intact.
    Bind(String),
    /// The remote store rejected the call.
    Remote(StoreError),
}

impl ClientError {
    pub fn auth(message: impl Into<String>) -> Self {
        ClientError::AuthFailure(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Remote(err) if err.is_not_found())
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::AuthFailure(message) => write!(f, "authentication failed: {message}"),
            ClientError::NotBound => write!(f, "no channel is bound"),
            ClientError::StaleChannel(generation) => {
                write!(f, "channel {generation} has been superseded")
            }
            ClientError::Bind(message) => write!(f, "failed to bind channel: {message}"),
            ClientError::Remote(err) => write!(f, "record store error: {err}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Remote(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ClientError {
    fn from(err: StoreError) -> Self {
        ClientError::Remote(err)
    }
}

/// Result type for client operations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;
