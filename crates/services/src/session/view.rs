use std::collections::BTreeMap;

use exam_core::clock::TimerMode;
use exam_core::model::{AnswerState, OptionLabel, Question, QuestionId};

use super::progress::SessionProgress;
use super::state::{SessionStage, TestSession};

//
// ─── VIEW MODELS ───────────────────────────────────────────────────────────────
//

/// One answer choice as the presentation layer renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView {
    pub label: OptionLabel,
    pub text: String,
}

/// The current question without any grading data: the correct label never
/// crosses this boundary during an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub id: QuestionId,
    pub position: u32,
    pub prompt: String,
    pub options: Vec<OptionView>,
}

impl QuestionView {
    fn from_question(question: &Question) -> Self {
        Self {
            id: question.id(),
            position: question.position(),
            prompt: question.prompt().to_owned(),
            options: question
                .options()
                .iter()
                .map(|option| OptionView {
                    label: option.label,
                    text: option.text.clone(),
                })
                .collect(),
        }
    }
}

/// Timer state for the header display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerView {
    pub mode: TimerMode,
    pub display_secs: u32,
    pub is_expired: bool,
}

/// The observable session state the presentation layer renders and drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub stage: SessionStage,
    pub current_index: usize,
    pub current_question: Option<QuestionView>,
    pub answers: BTreeMap<QuestionId, AnswerState>,
    pub progress: SessionProgress,
    pub timer: Option<TimerView>,
}

impl SessionView {
    /// Snapshot of everything a renderer needs, taken after any operation.
    #[must_use]
    pub fn capture(session: &TestSession) -> Self {
        Self {
            stage: session.stage(),
            current_index: session.current_index(),
            current_question: session.current_question().map(QuestionView::from_question),
            answers: session.sheet().entries().clone(),
            progress: session.progress(),
            timer: session.clock().map(|clock| TimerView {
                mode: clock.mode(),
                display_secs: clock.display_secs(),
                is_expired: clock.is_expired(),
            }),
        }
    }
}
