#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    AccountRepository, EventRepository, InMemoryRepository, QuestionRepository,
    RoleplayRepository, Storage, StorageError, SummaryRepository, SummaryRow,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
