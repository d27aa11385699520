use exam_core::model::TestId;

use super::{SqliteRepository, mapping};
use crate::repository::{SessionSnapshot, SnapshotRepository, StorageError};

#[async_trait::async_trait]
impl SnapshotRepository for SqliteRepository {
    async fn save(
        &self,
        test_id: TestId,
        snapshot: &SessionSnapshot,
    ) -> Result<(), StorageError> {
        let answers = serde_json::to_string(&snapshot.answers).map_err(mapping::ser)?;
        let index = i64::try_from(snapshot.current_question_index)
            .map_err(|_| StorageError::Serialization("question index overflow".into()))?;

        sqlx::query(
            r"
            INSERT INTO session_snapshots (
                test_id, test_started, test_completed, current_question_index,
                answers, timer_enabled, started_at, saved_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(test_id) DO UPDATE SET
                test_started = excluded.test_started,
                test_completed = excluded.test_completed,
                current_question_index = excluded.current_question_index,
                answers = excluded.answers,
                timer_enabled = excluded.timer_enabled,
                started_at = excluded.started_at,
                saved_at = excluded.saved_at
            ",
        )
        .bind(mapping::test_id_to_i64(test_id)?)
        .bind(i64::from(snapshot.test_started))
        .bind(i64::from(snapshot.test_completed))
        .bind(index)
        .bind(answers)
        .bind(i64::from(snapshot.timer_enabled))
        .bind(snapshot.started_at)
        .bind(snapshot.saved_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn load(&self, test_id: TestId) -> Result<Option<SessionSnapshot>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT test_started, test_completed, current_question_index,
                   answers, timer_enabled, started_at, saved_at
            FROM session_snapshots
            WHERE test_id = ?1
            ",
        )
        .bind(mapping::test_id_to_i64(test_id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        // A row that no longer decodes is a stale/foreign shape, not a reason
        // to block the attempt: report it as absent.
        match mapping::map_snapshot_row(&row) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(StorageError::Serialization(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn clear(&self, test_id: TestId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM session_snapshots WHERE test_id = ?1")
            .bind(mapping::test_id_to_i64(test_id)?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }
}
