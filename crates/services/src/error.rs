//! Shared error types for the services crate.

use thiserror::Error;

use prep_core::model::{
    AccountError, EventError, EventId, ItemError, RoleplayError, SessionError,
};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the results mailbox.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HandoffError {
    #[error("results store unavailable: {0}")]
    Unavailable(String),
}

/// Errors emitted by session starts and the finish pipeline.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudyError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Item(#[from] ItemError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `LeaderboardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LeaderboardError {
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `RoleplayService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RoleplayServiceError {
    #[error(transparent)]
    Prompt(#[from] RoleplayError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `BankSyncService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BankSyncError {
    #[error("bank sync is not configured")]
    Disabled,
    #[error("invalid bank url: {0}")]
    BaseUrl(#[from] url::ParseError),
    #[error("bank request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("bank returned event {received}, requested {requested}")]
    EventMismatch {
        requested: EventId,
        received: EventId,
    },
    #[error(transparent)]
    Domain(#[from] prep_core::Error),
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
    #[error(transparent)]
    Event(#[from] EventError),
}
