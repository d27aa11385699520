#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    InMemoryRepository, SessionSnapshot, SnapshotRepository, Storage, StorageError,
    TestRepository,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
