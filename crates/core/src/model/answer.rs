use serde::{Deserialize, Serialize};

use crate::model::question::OptionLabel;

/// Per-question answer state: the selected option and the review flag.
///
/// "Answered" is not stored; it is derived from the selection, so the
/// invariant `answered == selection present` cannot drift. Wire formats that
/// carry an explicit answered field (snapshot consumers, the grading payload)
/// serialize the derived value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerState {
    pub selected_answer: Option<OptionLabel>,
    pub is_flagged: bool,
}

impl AnswerState {
    /// True iff an option has been selected.
    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.selected_answer.is_some()
    }
}
