use chrono::{DateTime, Utc};

use exam_core::model::TestId;
use storage::repository::{SnapshotRepository, StorageError, TestRepository};

use crate::error::SessionError;
use super::state::TestSession;

/// What opening a test produced: a fresh session at the instructions screen,
/// or one resumed straight into `Active` from a surviving snapshot.
#[derive(Debug)]
pub(crate) enum Opened {
    Fresh(TestSession),
    Resumed(TestSession),
}

/// Storage-backed session builders.
pub(crate) struct SessionQueries;

impl SessionQueries {
    /// Fetches the definition and reconciles any surviving snapshot, once,
    /// before any other session operation runs.
    ///
    /// A missing, corrupt, or non-resumable snapshot means a fresh start at
    /// the instructions screen; it is never an error the user sees.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::TestNotFound` for an unknown test id and
    /// `SessionError::Storage` for backend failures.
    pub async fn open_from_storage(
        test_id: TestId,
        tests: &dyn TestRepository,
        snapshots: &dyn SnapshotRepository,
        now: DateTime<Utc>,
    ) -> Result<Opened, SessionError> {
        let definition = tests
            .get_test(test_id)
            .await?
            .ok_or(SessionError::TestNotFound)?;

        let snapshot = match snapshots.load(test_id).await {
            Ok(snapshot) => snapshot,
            // a snapshot that cannot be decoded counts as no prior session
            Err(StorageError::Serialization(_)) => None,
            Err(e) => return Err(e.into()),
        };

        match snapshot {
            Some(snapshot) if snapshot.is_resumable() => {
                Ok(Opened::Resumed(TestSession::resume(definition, &snapshot, now)))
            }
            _ => Ok(Opened::Fresh(TestSession::new(definition))),
        }
    }
}
