use exam_core::model::{OptionLabel, Question, TestDefinition, TestId};
use sqlx::Row;

use super::{SqliteRepository, mapping};
use crate::repository::{StorageError, TestRepository};

fn option_text(question: &Question, label: OptionLabel) -> Option<String> {
    question
        .options()
        .iter()
        .find(|option| option.label == label)
        .map(|option| option.text.clone())
}

#[async_trait::async_trait]
impl TestRepository for SqliteRepository {
    async fn upsert_test(&self, definition: &TestDefinition) -> Result<(), StorageError> {
        let test_id = mapping::test_id_to_i64(definition.id())?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        sqlx::query(
            r"
            INSERT INTO tests (id, title, time_limit_minutes, passing_score_percent)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                time_limit_minutes = excluded.time_limit_minutes,
                passing_score_percent = excluded.passing_score_percent
            ",
        )
        .bind(test_id)
        .bind(definition.title().to_owned())
        .bind(definition.time_limit_minutes().map(i64::from))
        .bind(i64::from(definition.passing_score_percent()))
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        // replace the question set wholesale; the definition is the source of truth
        sqlx::query("DELETE FROM questions WHERE test_id = ?1")
            .bind(test_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for question in definition.questions() {
            sqlx::query(
                r"
                INSERT INTO questions (
                    id, test_id, position, prompt,
                    option_a, option_b, option_c, option_d, correct_label
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ",
            )
            .bind(mapping::question_id_to_i64(question.id())?)
            .bind(test_id)
            .bind(i64::from(question.position()))
            .bind(question.prompt().to_owned())
            .bind(option_text(question, OptionLabel::A))
            .bind(option_text(question, OptionLabel::B))
            .bind(option_text(question, OptionLabel::C))
            .bind(option_text(question, OptionLabel::D))
            .bind(question.correct_label().as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_test(&self, id: TestId) -> Result<Option<TestDefinition>, StorageError> {
        let test_id = mapping::test_id_to_i64(id)?;

        let Some(test_row) = sqlx::query(
            r"
            SELECT id, title, time_limit_minutes, passing_score_percent
            FROM tests
            WHERE id = ?1
            ",
        )
        .bind(test_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?
        else {
            return Ok(None);
        };

        let question_rows = sqlx::query(
            r"
            SELECT id, test_id, position, prompt,
                   option_a, option_b, option_c, option_d, correct_label
            FROM questions
            WHERE test_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut questions = Vec::with_capacity(question_rows.len());
        for row in &question_rows {
            questions.push(mapping::map_question_row(row)?);
        }

        let title: String = test_row.try_get("title").map_err(mapping::ser)?;
        let time_limit_minutes: Option<i64> = test_row
            .try_get("time_limit_minutes")
            .map_err(mapping::ser)?;
        let time_limit_minutes = time_limit_minutes
            .map(|m| {
                u32::try_from(m).map_err(|_| {
                    StorageError::Serialization(format!("invalid time limit: {m}"))
                })
            })
            .transpose()?;
        let passing_i64: i64 = test_row
            .try_get("passing_score_percent")
            .map_err(mapping::ser)?;
        let passing_score_percent = u32::try_from(passing_i64).map_err(|_| {
            StorageError::Serialization(format!("invalid passing score: {passing_i64}"))
        })?;

        let definition = TestDefinition::new(
            mapping::test_id_from_i64(test_row.try_get::<i64, _>("id").map_err(mapping::ser)?)?,
            title,
            questions,
            time_limit_minutes,
            passing_score_percent,
        )
        .map_err(mapping::ser)?;

        Ok(Some(definition))
    }
}
