use std::collections::BTreeMap;
use std::str::FromStr;

use exam_core::model::{
    AnswerOption, AnswerState, OptionLabel, Question, QuestionId, TestId,
};
use sqlx::Row;

use crate::repository::{SessionSnapshot, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn test_id_from_i64(v: i64) -> Result<TestId, StorageError> {
    Ok(TestId::new(i64_to_u64("test_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn test_id_to_i64(id: TestId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("test_id overflow".into()))
}

pub(crate) fn question_id_to_i64(id: QuestionId) -> Result<i64, StorageError> {
    i64::try_from(id.value())
        .map_err(|_| StorageError::Serialization("question_id overflow".into()))
}

pub(crate) fn parse_label(s: &str) -> Result<OptionLabel, StorageError> {
    OptionLabel::from_str(s).map_err(|_| StorageError::Serialization(format!("invalid label: {s}")))
}

/// Builds a `Question` from a row of the `questions` table.
///
/// Options come from the four nullable label columns in alphabet order.
pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let columns = [
        (OptionLabel::A, "option_a"),
        (OptionLabel::B, "option_b"),
        (OptionLabel::C, "option_c"),
        (OptionLabel::D, "option_d"),
    ];
    let mut options = Vec::new();
    for (label, column) in columns {
        if let Some(text) = row.try_get::<Option<String>, _>(column).map_err(ser)? {
            options.push(AnswerOption::new(label, text));
        }
    }

    let position_i64: i64 = row.try_get("position").map_err(ser)?;
    let position = u32::try_from(position_i64)
        .map_err(|_| StorageError::Serialization(format!("invalid position: {position_i64}")))?;

    let correct: String = row.try_get("correct_label").map_err(ser)?;

    Question::new(
        question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        position,
        row.try_get::<String, _>("prompt").map_err(ser)?,
        options,
        parse_label(&correct)?,
    )
    .map_err(ser)
}

/// Decodes a row of `session_snapshots`. The answers column holds the
/// per-question state as JSON keyed by question id.
pub(crate) fn map_snapshot_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<SessionSnapshot, StorageError> {
    let answers_json: String = row.try_get("answers").map_err(ser)?;
    let answers: BTreeMap<QuestionId, AnswerState> =
        serde_json::from_str(&answers_json).map_err(ser)?;

    let index_i64: i64 = row.try_get("current_question_index").map_err(ser)?;
    let current_question_index = usize::try_from(index_i64).map_err(|_| {
        StorageError::Serialization(format!("invalid question index: {index_i64}"))
    })?;

    Ok(SessionSnapshot {
        test_started: row.try_get::<i64, _>("test_started").map_err(ser)? != 0,
        test_completed: row.try_get::<i64, _>("test_completed").map_err(ser)? != 0,
        current_question_index,
        answers,
        timer_enabled: row.try_get::<i64, _>("timer_enabled").map_err(ser)? != 0,
        started_at: row.try_get("started_at").map_err(ser)?,
        saved_at: row.try_get("saved_at").map_err(ser)?,
    })
}
