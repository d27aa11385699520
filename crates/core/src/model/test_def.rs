use thiserror::Error;

use crate::model::ids::{QuestionId, TestId};
use crate::model::question::Question;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TestDefinitionError {
    #[error("test title cannot be empty")]
    EmptyTitle,

    #[error("test needs at least one question")]
    NoQuestions,

    #[error("duplicate question id: {0}")]
    DuplicateQuestionId(QuestionId),

    #[error("question at index {index} has position {position}, expected {expected}")]
    NonSequentialPosition {
        index: usize,
        position: u32,
        expected: u32,
    },

    #[error("time limit must be >= 1 minute when present")]
    InvalidTimeLimit,

    #[error("passing score must be a percentage <= 100, got {0}")]
    InvalidPassingScore(u32),
}

//
// ─── TEST DEFINITION ───────────────────────────────────────────────────────────
//

/// A published test as the authoring subsystem hands it over: an ordered
/// question sequence plus timing and pass-mark metadata.
///
/// Immutable for the duration of an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestDefinition {
    id: TestId,
    title: String,
    questions: Vec<Question>,
    time_limit_minutes: Option<u32>,
    passing_score_percent: u32,
}

impl TestDefinition {
    /// Creates a validated test definition.
    ///
    /// # Errors
    ///
    /// Returns `TestDefinitionError` if the title is empty, no questions are
    /// given, a question id repeats, positions are not exactly `1..=n` in
    /// order, the time limit is zero, or the passing score exceeds 100.
    pub fn new(
        id: TestId,
        title: impl Into<String>,
        questions: Vec<Question>,
        time_limit_minutes: Option<u32>,
        passing_score_percent: u32,
    ) -> Result<Self, TestDefinitionError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(TestDefinitionError::EmptyTitle);
        }
        if questions.is_empty() {
            return Err(TestDefinitionError::NoQuestions);
        }
        for (index, question) in questions.iter().enumerate() {
            let expected = u32::try_from(index).unwrap_or(u32::MAX).saturating_add(1);
            if question.position() != expected {
                return Err(TestDefinitionError::NonSequentialPosition {
                    index,
                    position: question.position(),
                    expected,
                });
            }
            if questions[..index].iter().any(|q| q.id() == question.id()) {
                return Err(TestDefinitionError::DuplicateQuestionId(question.id()));
            }
        }
        if time_limit_minutes == Some(0) {
            return Err(TestDefinitionError::InvalidTimeLimit);
        }
        if passing_score_percent > 100 {
            return Err(TestDefinitionError::InvalidPassingScore(
                passing_score_percent,
            ));
        }

        Ok(Self {
            id,
            title,
            questions,
            time_limit_minutes,
            passing_score_percent,
        })
    }

    #[must_use]
    pub fn id(&self) -> TestId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> Option<u32> {
        self.time_limit_minutes
    }

    /// Time limit in whole seconds, when the test has one.
    #[must_use]
    pub fn time_limit_secs(&self) -> Option<u32> {
        self.time_limit_minutes.map(|m| m.saturating_mul(60))
    }

    #[must_use]
    pub fn passing_score_percent(&self) -> u32 {
        self.passing_score_percent
    }

    /// Question at a 0-based index.
    #[must_use]
    pub fn question_at(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    /// 0-based index of a question id, if present.
    #[must_use]
    pub fn index_of(&self, id: QuestionId) -> Option<usize> {
        self.questions.iter().position(|q| q.id() == id)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::question::{AnswerOption, OptionLabel};

    fn build_question(id: u64, position: u32) -> Question {
        Question::new(
            QuestionId::new(id),
            position,
            format!("Prompt {id}"),
            vec![
                AnswerOption::new(OptionLabel::A, "yes"),
                AnswerOption::new(OptionLabel::B, "no"),
            ],
            OptionLabel::A,
        )
        .unwrap()
    }

    #[test]
    fn builds_valid_definition() {
        let def = TestDefinition::new(
            TestId::new(1),
            "Constitutional Law Mock",
            vec![build_question(1, 1), build_question(2, 2)],
            Some(30),
            40,
        )
        .unwrap();
        assert_eq!(def.total_questions(), 2);
        assert_eq!(def.time_limit_secs(), Some(1800));
        assert_eq!(def.index_of(QuestionId::new(2)), Some(1));
    }

    #[test]
    fn rejects_out_of_order_positions() {
        let err = TestDefinition::new(
            TestId::new(1),
            "T",
            vec![build_question(1, 2), build_question(2, 1)],
            None,
            40,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            TestDefinitionError::NonSequentialPosition { index: 0, .. }
        ));
    }

    #[test]
    fn rejects_duplicate_question_ids() {
        let err = TestDefinition::new(
            TestId::new(1),
            "T",
            vec![build_question(1, 1), build_question(1, 2)],
            None,
            40,
        )
        .unwrap_err();
        assert_eq!(
            err,
            TestDefinitionError::DuplicateQuestionId(QuestionId::new(1))
        );
    }

    #[test]
    fn rejects_zero_time_limit() {
        let err = TestDefinition::new(
            TestId::new(1),
            "T",
            vec![build_question(1, 1)],
            Some(0),
            40,
        )
        .unwrap_err();
        assert_eq!(err, TestDefinitionError::InvalidTimeLimit);
    }

    #[test]
    fn rejects_passing_score_above_hundred() {
        let err = TestDefinition::new(
            TestId::new(1),
            "T",
            vec![build_question(1, 1)],
            None,
            101,
        )
        .unwrap_err();
        assert_eq!(err, TestDefinitionError::InvalidPassingScore(101));
    }

    #[test]
    fn untimed_definition_has_no_limit() {
        let def = TestDefinition::new(
            TestId::new(1),
            "T",
            vec![build_question(1, 1)],
            None,
            40,
        )
        .unwrap();
        assert_eq!(def.time_limit_secs(), None);
    }
}
