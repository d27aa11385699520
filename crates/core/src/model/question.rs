use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("question position must be >= 1")]
    InvalidPosition,

    #[error("question needs at least two options, got {0}")]
    TooFewOptions(usize),

    #[error("duplicate option label: {0}")]
    DuplicateOptionLabel(OptionLabel),

    #[error("correct answer label {0} is not among the options")]
    CorrectLabelMissing(OptionLabel),

    #[error("invalid option label: {0}")]
    InvalidLabel(String),
}

//
// ─── OPTION LABEL ──────────────────────────────────────────────────────────────
//

/// The fixed four-letter alphabet an answer option can be labeled with.
///
/// Labels match the authoring convention for multiple-choice questions; a
/// question uses a subset of these, each at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    /// All labels in authoring order.
    pub const ALL: [OptionLabel; 4] = [
        OptionLabel::A,
        OptionLabel::B,
        OptionLabel::C,
        OptionLabel::D,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionLabel::A => "A",
            OptionLabel::B => "B",
            OptionLabel::C => "C",
            OptionLabel::D => "D",
        }
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionLabel {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(OptionLabel::A),
            "B" | "b" => Ok(OptionLabel::B),
            "C" | "c" => Ok(OptionLabel::C),
            "D" | "d" => Ok(OptionLabel::D),
            other => Err(QuestionError::InvalidLabel(other.to_string())),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// One labeled answer choice of a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    pub label: OptionLabel,
    pub text: String,
}

impl AnswerOption {
    #[must_use]
    pub fn new(label: OptionLabel, text: impl Into<String>) -> Self {
        Self {
            label,
            text: text.into(),
        }
    }
}

/// A single multiple-choice question of a test.
///
/// `correct_label` is authoring data used by the grading side; nothing in the
/// attempt path reads it and it never appears in snapshots or session views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    position: u32,
    prompt: String,
    options: Vec<AnswerOption>,
    correct_label: OptionLabel,
}

impl Question {
    /// Creates a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the prompt is empty, the position is zero,
    /// fewer than two options are given, a label repeats, or the correct
    /// label does not name one of the options.
    pub fn new(
        id: QuestionId,
        position: u32,
        prompt: impl Into<String>,
        options: Vec<AnswerOption>,
        correct_label: OptionLabel,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if position == 0 {
            return Err(QuestionError::InvalidPosition);
        }
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions(options.len()));
        }
        let mut seen: Vec<OptionLabel> = Vec::with_capacity(options.len());
        for option in &options {
            if seen.contains(&option.label) {
                return Err(QuestionError::DuplicateOptionLabel(option.label));
            }
            seen.push(option.label);
        }
        if !seen.contains(&correct_label) {
            return Err(QuestionError::CorrectLabelMissing(correct_label));
        }

        Ok(Self {
            id,
            position,
            prompt,
            options,
            correct_label,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    /// 1-based ordinal matching the authoring order.
    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[AnswerOption] {
        &self.options
    }

    /// The correct answer label. Authoring/grading data only.
    #[must_use]
    pub fn correct_label(&self) -> OptionLabel {
        self.correct_label
    }

    /// True if `label` names one of this question's options.
    #[must_use]
    pub fn has_option(&self, label: OptionLabel) -> bool {
        self.options.iter().any(|option| option.label == label)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn four_options() -> Vec<AnswerOption> {
        vec![
            AnswerOption::new(OptionLabel::A, "first"),
            AnswerOption::new(OptionLabel::B, "second"),
            AnswerOption::new(OptionLabel::C, "third"),
            AnswerOption::new(OptionLabel::D, "fourth"),
        ]
    }

    #[test]
    fn builds_valid_question() {
        let q = Question::new(
            QuestionId::new(1),
            1,
            "Which article?",
            four_options(),
            OptionLabel::B,
        )
        .unwrap();
        assert_eq!(q.position(), 1);
        assert_eq!(q.options().len(), 4);
        assert!(q.has_option(OptionLabel::D));
    }

    #[test]
    fn rejects_empty_prompt() {
        let err = Question::new(QuestionId::new(1), 1, "  ", four_options(), OptionLabel::A)
            .unwrap_err();
        assert_eq!(err, QuestionError::EmptyPrompt);
    }

    #[test]
    fn rejects_duplicate_labels() {
        let options = vec![
            AnswerOption::new(OptionLabel::A, "one"),
            AnswerOption::new(OptionLabel::A, "two"),
        ];
        let err =
            Question::new(QuestionId::new(1), 1, "Q", options, OptionLabel::A).unwrap_err();
        assert_eq!(err, QuestionError::DuplicateOptionLabel(OptionLabel::A));
    }

    #[test]
    fn rejects_correct_label_outside_options() {
        let options = vec![
            AnswerOption::new(OptionLabel::A, "one"),
            AnswerOption::new(OptionLabel::B, "two"),
        ];
        let err =
            Question::new(QuestionId::new(1), 1, "Q", options, OptionLabel::D).unwrap_err();
        assert_eq!(err, QuestionError::CorrectLabelMissing(OptionLabel::D));
    }

    #[test]
    fn label_parses_case_insensitively() {
        assert_eq!("b".parse::<OptionLabel>().unwrap(), OptionLabel::B);
        assert_eq!("C".parse::<OptionLabel>().unwrap(), OptionLabel::C);
        assert!("E".parse::<OptionLabel>().is_err());
    }
}
