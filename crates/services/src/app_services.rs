use std::sync::Arc;

use storage::repository::{SnapshotRepository, Storage, TestRepository};

use crate::Clock;
use crate::error::AppServicesError;
use crate::grading::{GradingClient, HttpGradingClient};
use crate::session::AttemptService;

/// Assembles the app-facing services behind one handle.
#[derive(Clone)]
pub struct AppServices {
    attempts: Arc<AttemptService>,
    tests: Arc<dyn TestRepository>,
    snapshots: Arc<dyn SnapshotRepository>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, with the grading endpoint
    /// configured from the environment.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::with_storage(
            storage,
            Arc::new(HttpGradingClient::from_env()),
            clock,
        ))
    }

    /// Build services over in-memory storage, for tests and prototyping.
    #[must_use]
    pub fn in_memory(grading: Arc<dyn GradingClient>, clock: Clock) -> Self {
        Self::with_storage(Storage::in_memory(), grading, clock)
    }

    /// Wire services over an existing storage backend.
    #[must_use]
    pub fn with_storage(storage: Storage, grading: Arc<dyn GradingClient>, clock: Clock) -> Self {
        let attempts = Arc::new(AttemptService::new(
            clock,
            Arc::clone(&storage.tests),
            Arc::clone(&storage.snapshots),
            grading,
        ));
        Self {
            attempts,
            tests: storage.tests,
            snapshots: storage.snapshots,
        }
    }

    #[must_use]
    pub fn attempts(&self) -> &Arc<AttemptService> {
        &self.attempts
    }

    #[must_use]
    pub fn tests(&self) -> &Arc<dyn TestRepository> {
        &self.tests
    }

    #[must_use]
    pub fn snapshots(&self) -> &Arc<dyn SnapshotRepository> {
        &self.snapshots
    }
}
