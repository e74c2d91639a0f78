//! Unified error types for offcache.

use tokio_rusqlite::rusqlite;

/// Unified error types shared by the offcache crates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid URL (unparseable, or relative where an absolute one is required).
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Manifest text could not be parsed.
    #[error("MANIFEST_PARSE: {0}")]
    ManifestParse(String),

    /// Fetching the manifest itself failed. Surfaced to the caller of
    /// `ensure_current`, never retried internally.
    #[error("MANIFEST_FETCH: {0}")]
    ManifestFetch(String),

    /// Database operation failed.
    #[error("STORE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored record could not be decoded.
    #[error("STORE_ERROR: corrupt stored record: {0}")]
    CorruptRecord(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// HTTP transport error.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),
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
        Error::CorruptRecord(err.to_string())
    }
}
