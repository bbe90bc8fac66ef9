use thiserror::Error;

use crate::model::{
    AccountError, EventError, ItemError, RoleplayError, SessionError, SummaryError,
};

/// Any domain validation failure, for callers that do not care which model
/// a value came from.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Event(#[from] EventError),
    #[error(transparent)]
    Item(#[from] ItemError),
    #[error(transparent)]
    Roleplay(#[from] RoleplayError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Summary(#[from] SummaryError),
}
