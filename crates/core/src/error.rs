//! Unified error types for shelfsync.
//!
//! Every variant renders with a stable code prefix so host logs and MCP
//! clients can match on it.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the worker and its host.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., unknown method).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// No cache entry found for the given request.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A pre-cache manifest asset could not be fetched; the install is void.
    #[error("INSTALL_FAILED: {0}")]
    InstallFailed(String),

    /// The live fetch was rejected before any response arrived.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Live fetch failed and the only cached fallback is past its max age.
    #[error("STALE_RESPONSE: {0}")]
    StaleResponse(String),

    /// A live response arrived with a non-success status where success was required.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// The exchange broke off after the request may have reached the server,
    /// e.g. the connection dropped while the response body was being read.
    #[error("INTERRUPTED: {0}")]
    Interrupted(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Event delivered while the worker is in the wrong lifecycle state.
    #[error("INVALID_STATE: {0}")]
    InvalidState(String),
}

impl Error {
    /// Whether this error means the network could not be reached at all.
    ///
    /// Only these failures send a mutation to the durable queue. An
    /// [`Error::Interrupted`] exchange is not one of them: the server may
    /// already have applied the write.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidInput(format!("malformed stored record: {err}"))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::InstallFailed(msg) => (-32020, msg.clone()),
            Error::Network(msg) => (-32021, msg.clone()),
            Error::StaleResponse(msg) => (-32022, msg.clone()),
            Error::HttpError(msg) => (-32008, msg.clone()),
            Error::FetchTooLarge(msg) => (-32007, msg.clone()),
            Error::InvalidState(msg) => (-32023, msg.clone()),
            Error::Interrupted(msg) => (-32024, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
