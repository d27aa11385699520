//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the grading collaborator.
///
/// All variants are retryable from the session's point of view: a failed
/// grading round-trip leaves the attempt active with its answers intact.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GradingError {
    #[error("grading endpoint is not configured")]
    Disabled,
    #[error("grading request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("test not found")]
    TestNotFound,
    #[error("session already started")]
    AlreadyStarted,
    #[error("session is not active")]
    NotActive,
    #[error("session already finished")]
    Finished,
    #[error(transparent)]
    Grading(#[from] GradingError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
