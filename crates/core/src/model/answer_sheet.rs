use std::collections::BTreeMap;

use crate::model::answer::AnswerState;
use crate::model::ids::QuestionId;
use crate::model::question::OptionLabel;
use crate::model::test_def::TestDefinition;

/// The in-memory answer sheet for one attempt: one entry per question,
/// created eagerly so navigation never meets a missing entry.
///
/// Aggregate counts are computed on demand from the map, never cached.
/// Mutations on unknown question ids are no-ops; they indicate a caller bug,
/// not a user-facing condition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSheet {
    entries: BTreeMap<QuestionId, AnswerState>,
}

impl AnswerSheet {
    /// Builds a sheet with a default entry for every question of the test.
    #[must_use]
    pub fn for_test(definition: &TestDefinition) -> Self {
        let entries = definition
            .questions()
            .iter()
            .map(|question| (question.id(), AnswerState::default()))
            .collect();
        Self { entries }
    }

    #[must_use]
    pub fn get(&self, id: QuestionId) -> Option<&AnswerState> {
        self.entries.get(&id)
    }

    /// Selects an option for a question.
    ///
    /// Returns whether the sheet changed: unknown ids and re-selecting the
    /// already-selected label leave it untouched. The review flag is never
    /// affected.
    pub fn select(&mut self, id: QuestionId, label: OptionLabel) -> bool {
        match self.entries.get_mut(&id) {
            Some(state) if state.selected_answer != Some(label) => {
                state.selected_answer = Some(label);
                true
            }
            _ => false,
        }
    }

    /// Flips the review flag for a question, independent of answered state.
    ///
    /// Returns whether the sheet changed (false for unknown ids).
    pub fn toggle_flag(&mut self, id: QuestionId) -> bool {
        match self.entries.get_mut(&id) {
            Some(state) => {
                state.is_flagged = !state.is_flagged;
                true
            }
            None => false,
        }
    }

    /// Overwrites the state of a known question verbatim, for reload
    /// recovery. Unknown ids are ignored.
    pub fn restore(&mut self, id: QuestionId, state: AnswerState) -> bool {
        match self.entries.get_mut(&id) {
            Some(slot) => {
                *slot = state;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.entries.values().filter(|s| s.is_answered()).count()
    }

    #[must_use]
    pub fn flagged_count(&self) -> usize {
        self.entries.values().filter(|s| s.is_flagged).count()
    }

    #[must_use]
    pub fn unanswered_count(&self) -> usize {
        self.entries.len() - self.answered_count()
    }

    /// All entries in question-id order.
    #[must_use]
    pub fn entries(&self) -> &BTreeMap<QuestionId, AnswerState> {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionId, &AnswerState)> {
        self.entries.iter()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::TestId;
    use crate::model::question::{AnswerOption, Question};

    fn build_definition(count: u64) -> TestDefinition {
        let questions = (1..=count)
            .map(|id| {
                Question::new(
                    QuestionId::new(id),
                    u32::try_from(id).unwrap(),
                    format!("Prompt {id}"),
                    vec![
                        AnswerOption::new(OptionLabel::A, "yes"),
                        AnswerOption::new(OptionLabel::B, "no"),
                    ],
                    OptionLabel::A,
                )
                .unwrap()
            })
            .collect();
        TestDefinition::new(TestId::new(1), "T", questions, None, 40).unwrap()
    }

    #[test]
    fn sheet_is_created_eagerly() {
        let sheet = AnswerSheet::for_test(&build_definition(3));
        assert_eq!(sheet.len(), 3);
        for id in 1..=3 {
            assert!(sheet.get(QuestionId::new(id)).is_some());
        }
    }

    #[test]
    fn answered_plus_unanswered_equals_total() {
        let mut sheet = AnswerSheet::for_test(&build_definition(4));
        assert_eq!(sheet.answered_count() + sheet.unanswered_count(), 4);
        sheet.select(QuestionId::new(1), OptionLabel::A);
        sheet.select(QuestionId::new(3), OptionLabel::D);
        assert_eq!(sheet.answered_count(), 2);
        assert_eq!(sheet.answered_count() + sheet.unanswered_count(), 4);
    }

    #[test]
    fn reselecting_same_label_is_a_no_op() {
        let mut sheet = AnswerSheet::for_test(&build_definition(1));
        assert!(sheet.select(QuestionId::new(1), OptionLabel::B));
        let before = sheet.clone();
        assert!(!sheet.select(QuestionId::new(1), OptionLabel::B));
        assert_eq!(sheet, before);
    }

    #[test]
    fn selecting_does_not_touch_flag() {
        let mut sheet = AnswerSheet::for_test(&build_definition(1));
        sheet.toggle_flag(QuestionId::new(1));
        sheet.select(QuestionId::new(1), OptionLabel::A);
        let state = sheet.get(QuestionId::new(1)).unwrap();
        assert!(state.is_flagged);
        assert!(state.is_answered());
    }

    #[test]
    fn unanswered_question_can_be_flagged() {
        let mut sheet = AnswerSheet::for_test(&build_definition(2));
        assert!(sheet.toggle_flag(QuestionId::new(2)));
        let state = sheet.get(QuestionId::new(2)).unwrap();
        assert!(state.is_flagged);
        assert!(!state.is_answered());
        assert_eq!(sheet.flagged_count(), 1);
    }

    #[test]
    fn unknown_question_is_ignored() {
        let mut sheet = AnswerSheet::for_test(&build_definition(1));
        let before = sheet.clone();
        assert!(!sheet.select(QuestionId::new(99), OptionLabel::A));
        assert!(!sheet.toggle_flag(QuestionId::new(99)));
        assert_eq!(sheet, before);
    }

    #[test]
    fn restore_overwrites_known_entries_only() {
        let mut sheet = AnswerSheet::for_test(&build_definition(2));
        let restored = AnswerState {
            selected_answer: Some(OptionLabel::C),
            is_flagged: true,
        };
        assert!(sheet.restore(QuestionId::new(1), restored.clone()));
        assert!(!sheet.restore(QuestionId::new(99), restored.clone()));
        assert_eq!(sheet.get(QuestionId::new(1)), Some(&restored));
        assert_eq!(sheet.len(), 2);
    }
}
