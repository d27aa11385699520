use std::fmt;

use chrono::{DateTime, Utc};
use exam_core::clock::{ClockTick, SessionClock, TimerMode};
use exam_core::model::{AnswerSheet, OptionLabel, Question, QuestionId, TestDefinition};
use storage::repository::SessionSnapshot;

use crate::error::SessionError;
use super::progress::SessionProgress;

//
// ─── LIFECYCLE ─────────────────────────────────────────────────────────────────
//

/// Lifecycle stage of one attempt.
///
/// `Instructions` is where a fresh session waits for the timer choice;
/// `Submitting` covers the grading round-trip; `Completed` and `Exited` are
/// terminal, so a new attempt gets a fresh session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    Instructions,
    Active,
    Submitting,
    Completed,
    Exited,
}

impl SessionStage {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStage::Completed | SessionStage::Exited)
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One user's attempt at one test.
///
/// Owns the answer sheet, the current position, and the session clock; the
/// clock is started and stopped on stage transitions, so there is never a
/// ticking source outside `Active`. All operations here are synchronous and
/// in-memory; persistence and grading wrap them in `AttemptService`.
pub struct TestSession {
    definition: TestDefinition,
    stage: SessionStage,
    sheet: AnswerSheet,
    clock: Option<SessionClock>,
    current: usize,
}

impl TestSession {
    /// Fresh session at the instructions screen.
    #[must_use]
    pub fn new(definition: TestDefinition) -> Self {
        Self {
            definition,
            stage: SessionStage::Instructions,
            sheet: AnswerSheet::default(),
            clock: None,
            current: 0,
        }
    }

    /// Reconstructs an `Active` session from a snapshot in one step.
    ///
    /// Answers are restored verbatim for questions that still exist; entries
    /// for questions the definition no longer has are dropped, missing ones
    /// stay at the default. The index is clamped into range and the clock
    /// value is recomputed from the stored start timestamp, so reloads can
    /// never stretch a countdown.
    pub(crate) fn resume(
        definition: TestDefinition,
        snapshot: &SessionSnapshot,
        now: DateTime<Utc>,
    ) -> Self {
        let mode = match (snapshot.timer_enabled, definition.time_limit_secs()) {
            (true, Some(limit_secs)) => TimerMode::Countdown { limit_secs },
            _ => TimerMode::Elapsed,
        };
        let clock = SessionClock::resume(mode, snapshot.started_at, now);

        let mut sheet = AnswerSheet::for_test(&definition);
        for (id, state) in &snapshot.answers {
            sheet.restore(*id, state.clone());
        }

        let last = definition.total_questions().saturating_sub(1);
        let current = snapshot.current_question_index.min(last);

        Self {
            definition,
            stage: SessionStage::Active,
            sheet,
            clock: Some(clock),
            current,
        }
    }

    /// Confirms the timer choice and enters `Active`.
    ///
    /// Initializes every question's answer state to the default and seeds the
    /// clock: a countdown when the timer is enabled and the test carries a
    /// limit, the open-ended counter otherwise.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyStarted` outside `Instructions`.
    pub fn begin(&mut self, timer_enabled: bool, now: DateTime<Utc>) -> Result<(), SessionError> {
        if self.stage != SessionStage::Instructions {
            return Err(SessionError::AlreadyStarted);
        }

        self.sheet = AnswerSheet::for_test(&self.definition);
        self.current = 0;
        self.clock = Some(match (timer_enabled, self.definition.time_limit_secs()) {
            (true, Some(limit_secs)) => SessionClock::countdown(limit_secs, now),
            _ => SessionClock::elapsed(now),
        });
        self.stage = SessionStage::Active;
        Ok(())
    }

    #[must_use]
    pub fn definition(&self) -> &TestDefinition {
        &self.definition
    }

    #[must_use]
    pub fn stage(&self) -> SessionStage {
        self.stage
    }

    #[must_use]
    pub fn sheet(&self) -> &AnswerSheet {
        &self.sheet
    }

    #[must_use]
    pub fn clock(&self) -> Option<&SessionClock> {
        self.clock.as_ref()
    }

    /// 0-based index of the question currently shown.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.definition.question_at(self.current)
    }

    /// Selects an option for a question.
    ///
    /// Returns whether anything changed. Outside `Active`, for unknown
    /// question ids, for labels the question does not offer, and for
    /// re-selection of the same label this is a no-op; those are caller
    /// bugs, not user-facing conditions. The review flag is untouched.
    pub fn select_answer(&mut self, id: QuestionId, label: OptionLabel) -> bool {
        if self.stage != SessionStage::Active {
            return false;
        }
        let valid = self
            .definition
            .question(id)
            .is_some_and(|question| question.has_option(label));
        if !valid {
            return false;
        }
        self.sheet.select(id, label)
    }

    /// Flips a question's review flag. No-op outside `Active` and for
    /// unknown ids. Returns whether anything changed.
    pub fn toggle_flag(&mut self, id: QuestionId) -> bool {
        if self.stage != SessionStage::Active {
            return false;
        }
        self.sheet.toggle_flag(id)
    }

    /// Moves to a question by 0-based index, clamping out-of-range requests.
    /// Returns whether the position changed.
    pub fn go_to(&mut self, index: usize) -> bool {
        if self.stage != SessionStage::Active {
            return false;
        }
        let last = self.definition.total_questions().saturating_sub(1);
        let clamped = index.min(last);
        if clamped == self.current {
            return false;
        }
        self.current = clamped;
        true
    }

    /// Advances the clock by one second while `Active`; idle otherwise.
    ///
    /// Outside `Active` the clock is stopped, so an expiry can never race a
    /// submission already in flight.
    pub fn record_tick(&mut self) -> ClockTick {
        if self.stage != SessionStage::Active {
            return ClockTick::Idle;
        }
        match self.clock.as_mut() {
            Some(clock) => clock.tick(),
            None => ClockTick::Idle,
        }
    }

    /// `Active → Submitting`; stops the clock so the answer set is frozen
    /// for the grading round-trip.
    pub(crate) fn begin_submit(&mut self) -> Result<(), SessionError> {
        match self.stage {
            SessionStage::Active => {
                if let Some(clock) = self.clock.as_mut() {
                    clock.stop();
                }
                self.stage = SessionStage::Submitting;
                Ok(())
            }
            SessionStage::Instructions | SessionStage::Submitting => Err(SessionError::NotActive),
            SessionStage::Completed | SessionStage::Exited => Err(SessionError::Finished),
        }
    }

    /// `Submitting → Completed`.
    pub(crate) fn complete_submit(&mut self) {
        if self.stage == SessionStage::Submitting {
            self.stage = SessionStage::Completed;
        }
    }

    /// `Submitting → Active` after a failed grading round-trip; the sheet is
    /// untouched and the clock resumes unless it already expired.
    pub(crate) fn abort_submit(&mut self) {
        if self.stage == SessionStage::Submitting {
            self.stage = SessionStage::Active;
            if let Some(clock) = self.clock.as_mut() {
                clock.restart();
            }
        }
    }

    /// Abandons the attempt, discarding progress.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finished` if the session already ended.
    pub(crate) fn mark_exited(&mut self) -> Result<(), SessionError> {
        if self.stage.is_terminal() {
            return Err(SessionError::Finished);
        }
        if let Some(clock) = self.clock.as_mut() {
            clock.stop();
        }
        self.stage = SessionStage::Exited;
        Ok(())
    }

    /// Aggregate counts for the navigator and submit-confirmation views.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.definition.total_questions();
        let answered = self.sheet.answered_count();
        SessionProgress {
            total,
            answered,
            flagged: self.sheet.flagged_count(),
            unanswered: total.saturating_sub(answered),
            is_complete: self.stage == SessionStage::Completed,
        }
    }

    /// Seconds spent on the attempt so far; zero before `begin`.
    #[must_use]
    pub fn time_spent_secs(&self) -> u32 {
        self.clock.as_ref().map_or(0, SessionClock::time_spent_secs)
    }

    /// Serializable copy of the session for reload recovery.
    ///
    /// Only `Active` sessions snapshot; every other stage returns `None`.
    #[must_use]
    pub fn snapshot(&self, saved_at: DateTime<Utc>) -> Option<SessionSnapshot> {
        if self.stage != SessionStage::Active {
            return None;
        }
        let clock = self.clock.as_ref()?;
        Some(SessionSnapshot {
            test_started: true,
            test_completed: false,
            current_question_index: self.current,
            answers: self.sheet.entries().clone(),
            timer_enabled: clock.mode().is_countdown(),
            started_at: clock.started_at(),
            saved_at,
        })
    }
}

impl fmt::Debug for TestSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSession")
            .field("test_id", &self.definition.id())
            .field("stage", &self.stage)
            .field("current", &self.current)
            .field("answered", &self.sheet.answered_count())
            .field("flagged", &self.sheet.flagged_count())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{AnswerOption, AnswerState, TestId};
    use exam_core::time::fixed_now;
    use std::collections::BTreeMap;

    fn build_definition(count: u64, time_limit_minutes: Option<u32>) -> TestDefinition {
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
        TestDefinition::new(TestId::new(1), "T", questions, time_limit_minutes, 40).unwrap()
    }

    fn active_session(count: u64, timed: bool) -> TestSession {
        let limit = if timed { Some(2) } else { None };
        let mut session = TestSession::new(build_definition(count, limit));
        session.begin(timed, fixed_now()).unwrap();
        session
    }

    #[test]
    fn begin_moves_to_active_with_eager_sheet() {
        let session = active_session(3, false);
        assert_eq!(session.stage(), SessionStage::Active);
        assert_eq!(session.sheet().len(), 3);
        assert_eq!(session.current_index(), 0);
        assert!(!session.clock().unwrap().mode().is_countdown());
    }

    #[test]
    fn begin_twice_is_rejected() {
        let mut session = active_session(1, false);
        let err = session.begin(false, fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::AlreadyStarted));
    }

    #[test]
    fn timed_begin_seeds_countdown_from_definition() {
        let session = active_session(1, true);
        let clock = session.clock().unwrap();
        assert!(clock.mode().is_countdown());
        assert_eq!(clock.display_secs(), 120);
    }

    #[test]
    fn timer_request_without_limit_falls_back_to_elapsed() {
        let mut session = TestSession::new(build_definition(1, None));
        session.begin(true, fixed_now()).unwrap();
        assert!(!session.clock().unwrap().mode().is_countdown());
    }

    #[test]
    fn select_validates_question_and_label() {
        let mut session = active_session(2, false);
        assert!(session.select_answer(QuestionId::new(1), OptionLabel::B));
        // label the question does not offer
        assert!(!session.select_answer(QuestionId::new(1), OptionLabel::D));
        // unknown question
        assert!(!session.select_answer(QuestionId::new(99), OptionLabel::A));
        assert_eq!(session.sheet().answered_count(), 1);
    }

    #[test]
    fn mutations_are_ignored_while_submitting() {
        let mut session = active_session(2, false);
        session.select_answer(QuestionId::new(1), OptionLabel::A);
        session.begin_submit().unwrap();

        assert!(!session.select_answer(QuestionId::new(2), OptionLabel::B));
        assert!(!session.toggle_flag(QuestionId::new(1)));
        assert!(!session.go_to(1));
        assert_eq!(session.record_tick(), ClockTick::Idle);
        assert_eq!(session.sheet().answered_count(), 1);
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn go_to_clamps_out_of_range() {
        let mut session = active_session(3, false);
        assert!(session.go_to(2));
        assert_eq!(session.current_index(), 2);
        // beyond the end clamps to the last question (already there: no change)
        assert!(!session.go_to(10));
        assert_eq!(session.current_index(), 2);
        assert!(session.go_to(0));
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn submit_lifecycle_round_trip() {
        let mut session = active_session(1, true);
        session.begin_submit().unwrap();
        assert_eq!(session.stage(), SessionStage::Submitting);
        assert!(!session.clock().unwrap().is_running());

        session.abort_submit();
        assert_eq!(session.stage(), SessionStage::Active);
        assert!(session.clock().unwrap().is_running());

        session.begin_submit().unwrap();
        session.complete_submit();
        assert_eq!(session.stage(), SessionStage::Completed);
        assert!(session.begin_submit().is_err());
    }

    #[test]
    fn expiry_cannot_fire_while_submitting() {
        let mut session = active_session(1, true);
        // run the countdown near expiry, then freeze it by submitting
        for _ in 0..119 {
            session.record_tick();
        }
        assert_eq!(session.clock().unwrap().display_secs(), 1);
        session.begin_submit().unwrap();
        assert_eq!(session.record_tick(), ClockTick::Idle);
        assert!(!session.clock().unwrap().is_expired());
    }

    #[test]
    fn exit_stops_clock_and_is_terminal() {
        let mut session = active_session(1, true);
        session.mark_exited().unwrap();
        assert_eq!(session.stage(), SessionStage::Exited);
        assert!(!session.clock().unwrap().is_running());
        assert!(session.mark_exited().is_err());
    }

    #[test]
    fn progress_counts_add_up() {
        let mut session = active_session(3, false);
        session.select_answer(QuestionId::new(1), OptionLabel::A);
        session.toggle_flag(QuestionId::new(2));
        let progress = session.progress();
        assert_eq!(progress.total, 3);
        assert_eq!(progress.answered, 1);
        assert_eq!(progress.flagged, 1);
        assert_eq!(progress.unanswered, 2);
        assert!(!progress.is_complete);
    }

    #[test]
    fn snapshot_only_exists_while_active() {
        let mut session = TestSession::new(build_definition(2, Some(2)));
        assert!(session.snapshot(fixed_now()).is_none());

        session.begin(true, fixed_now()).unwrap();
        session.select_answer(QuestionId::new(1), OptionLabel::B);
        session.go_to(1);
        let snapshot = session.snapshot(fixed_now()).unwrap();
        assert!(snapshot.test_started);
        assert!(!snapshot.test_completed);
        assert_eq!(snapshot.current_question_index, 1);
        assert!(snapshot.timer_enabled);
        assert_eq!(
            snapshot.answers.get(&QuestionId::new(1)).unwrap().selected_answer,
            Some(OptionLabel::B)
        );

        session.begin_submit().unwrap();
        assert!(session.snapshot(fixed_now()).is_none());
    }

    #[test]
    fn resume_restores_answers_index_and_clock() {
        let definition = build_definition(3, Some(2));
        let started = fixed_now();
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
        // an entry for a question that no longer exists is dropped
        answers.insert(QuestionId::new(44), AnswerState::default());
        let snapshot = SessionSnapshot {
            test_started: true,
            test_completed: false,
            current_question_index: 7,
            answers,
            timer_enabled: true,
            started_at: started,
            saved_at: started,
        };

        let now = started + chrono::Duration::seconds(70);
        let session = TestSession::resume(definition, &snapshot, now);

        assert_eq!(session.stage(), SessionStage::Active);
        assert_eq!(session.sheet().len(), 3);
        assert_eq!(session.sheet().answered_count(), 1);
        assert_eq!(session.sheet().flagged_count(), 1);
        // stored index 7 clamps to the last question
        assert_eq!(session.current_index(), 2);
        // 2-minute countdown started 70s ago: about 50s remain
        assert_eq!(session.clock().unwrap().display_secs(), 50);
        assert_eq!(session.time_spent_secs(), 70);
    }

    #[test]
    fn resume_past_expiry_comes_back_expired() {
        let definition = build_definition(1, Some(2));
        let started = fixed_now();
        let snapshot = SessionSnapshot {
            test_started: true,
            test_completed: false,
            current_question_index: 0,
            answers: BTreeMap::new(),
            timer_enabled: true,
            started_at: started,
            saved_at: started,
        };

        let now = started + chrono::Duration::seconds(500);
        let session = TestSession::resume(definition, &snapshot, now);
        let clock = session.clock().unwrap();
        assert!(clock.is_expired());
        assert!(!clock.is_running());
        assert_eq!(clock.display_secs(), 0);
    }
}
