use async_trait::async_trait;
use chrono::{DateTime, Utc};
use exam_core::model::{AnswerState, QuestionId, TestDefinition, TestId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Durable copy of one active attempt, keyed by test id.
///
/// Only sessions that are actually active are ever snapshotted; completed and
/// exited attempts clear their snapshot instead. `current_question_index` is
/// part of the durable contract so a reload drops the user back on the
/// question they were looking at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub test_started: bool,
    pub test_completed: bool,
    pub current_question_index: usize,
    pub answers: BTreeMap<QuestionId, AnswerState>,
    pub timer_enabled: bool,
    pub started_at: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
}

impl SessionSnapshot {
    /// True if this snapshot describes an attempt a reload should resume.
    #[must_use]
    pub fn is_resumable(&self) -> bool {
        self.test_started && !self.test_completed
    }
}

/// Durable key-value store for attempt snapshots.
///
/// Keys are namespaced per test id, so attempts at different tests never
/// collide. Two sessions writing under the same test id are last-write-wins;
/// that limitation is documented, not guarded against.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Write (or overwrite) the snapshot for a test id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be stored.
    async fn save(&self, test_id: TestId, snapshot: &SessionSnapshot)
    -> Result<(), StorageError>;

    /// Fetch the last snapshot for a test id, or `None`.
    ///
    /// A stored snapshot that cannot be decoded is reported as `None`, never
    /// as a fatal error; the caller simply starts fresh.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn load(&self, test_id: TestId) -> Result<Option<SessionSnapshot>, StorageError>;

    /// Remove the snapshot for a test id. Removing a missing key is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn clear(&self, test_id: TestId) -> Result<(), StorageError>;
}

/// Read boundary to the authoring subsystem's published tests.
#[async_trait]
pub trait TestRepository: Send + Sync {
    /// Persist or update a test definition with its questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the definition cannot be stored.
    async fn upsert_test(&self, definition: &TestDefinition) -> Result<(), StorageError>;

    /// Fetch a test definition by id, or `None` if unknown.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn get_test(&self, id: TestId) -> Result<Option<TestDefinition>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tests: Arc<Mutex<HashMap<TestId, TestDefinition>>>,
    snapshots: Arc<Mutex<HashMap<TestId, SessionSnapshot>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tests: Arc::new(Mutex::new(HashMap::new())),
            snapshots: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl TestRepository for InMemoryRepository {
    async fn upsert_test(&self, definition: &TestDefinition) -> Result<(), StorageError> {
        let mut guard = self
            .tests
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(definition.id(), definition.clone());
        Ok(())
    }

    async fn get_test(&self, id: TestId) -> Result<Option<TestDefinition>, StorageError> {
        let guard = self
            .tests
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }
}

#[async_trait]
impl SnapshotRepository for InMemoryRepository {
    async fn save(
        &self,
        test_id: TestId,
        snapshot: &SessionSnapshot,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .snapshots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(test_id, snapshot.clone());
        Ok(())
    }

    async fn load(&self, test_id: TestId) -> Result<Option<SessionSnapshot>, StorageError> {
        let guard = self
            .snapshots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&test_id).cloned())
    }

    async fn clear(&self, test_id: TestId) -> Result<(), StorageError> {
        let mut guard = self
            .snapshots
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&test_id);
        Ok(())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub tests: Arc<dyn TestRepository>,
    pub snapshots: Arc<dyn SnapshotRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let tests: Arc<dyn TestRepository> = Arc::new(repo.clone());
        let snapshots: Arc<dyn SnapshotRepository> = Arc::new(repo);
        Self { tests, snapshots }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{AnswerOption, OptionLabel, Question};
    use exam_core::time::fixed_now;

    fn build_definition(id: u64) -> TestDefinition {
        let questions = (1..=3_u64)
            .map(|q| {
                Question::new(
                    QuestionId::new(q),
                    u32::try_from(q).unwrap(),
                    format!("Prompt {q}"),
                    vec![
                        AnswerOption::new(OptionLabel::A, "yes"),
                        AnswerOption::new(OptionLabel::B, "no"),
                    ],
                    OptionLabel::A,
                )
                .unwrap()
            })
            .collect();
        TestDefinition::new(TestId::new(id), format!("Test {id}"), questions, Some(2), 40)
            .unwrap()
    }

    fn build_snapshot() -> SessionSnapshot {
        let mut answers = BTreeMap::new();
        answers.insert(
            QuestionId::new(1),
            AnswerState {
                selected_answer: Some(OptionLabel::A),
                is_flagged: false,
            },
        );
        answers.insert(
            QuestionId::new(2),
            AnswerState {
                selected_answer: None,
                is_flagged: true,
            },
        );
        SessionSnapshot {
            test_started: true,
            test_completed: false,
            current_question_index: 1,
            answers,
            timer_enabled: true,
            started_at: fixed_now(),
            saved_at: fixed_now(),
        }
    }

    #[tokio::test]
    async fn snapshot_round_trips_verbatim() {
        let repo = InMemoryRepository::new();
        let snapshot = build_snapshot();
        repo.save(TestId::new(1), &snapshot).await.unwrap();

        let loaded = repo.load(TestId::new(1)).await.unwrap().unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[tokio::test]
    async fn snapshots_are_namespaced_per_test() {
        let repo = InMemoryRepository::new();
        let snapshot = build_snapshot();
        repo.save(TestId::new(1), &snapshot).await.unwrap();

        assert!(repo.load(TestId::new(2)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_removes_snapshot_and_tolerates_missing_keys() {
        let repo = InMemoryRepository::new();
        repo.save(TestId::new(1), &build_snapshot()).await.unwrap();

        repo.clear(TestId::new(1)).await.unwrap();
        assert!(repo.load(TestId::new(1)).await.unwrap().is_none());

        // clearing again is not an error
        repo.clear(TestId::new(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_definitions_round_trip() {
        let repo = InMemoryRepository::new();
        let definition = build_definition(5);
        repo.upsert_test(&definition).await.unwrap();

        let loaded = repo.get_test(TestId::new(5)).await.unwrap().unwrap();
        assert_eq!(loaded, definition);
        assert!(repo.get_test(TestId::new(6)).await.unwrap().is_none());
    }
}
