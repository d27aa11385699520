use std::sync::Arc;

use exam_core::Clock;
use exam_core::clock::ClockTick;
use exam_core::model::{OptionLabel, QuestionId, TestId};
use storage::repository::{SnapshotRepository, TestRepository};

use crate::error::{GradingError, SessionError};
use crate::grading::{AttemptSubmission, GradingClient, GradingReceipt, SubmittedAnswer};
use super::queries::{Opened, SessionQueries};
use super::state::{SessionStage, TestSession};

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Result of opening a test at mount time.
#[derive(Debug)]
pub enum OpenOutcome {
    /// No prior attempt; the session waits at the instructions screen.
    Fresh(TestSession),
    /// A surviving snapshot was reconciled; the session is active.
    Resumed(TestSession),
    /// The recovered countdown was already past its limit, so the attempt
    /// was submitted on the spot.
    AutoSubmitted {
        session: TestSession,
        receipt: GradingReceipt,
    },
    /// The forced submission after an expired recovery failed; the session
    /// is active with its answers intact and `submit` can be retried.
    AutoSubmitFailed {
        session: TestSession,
        error: GradingError,
    },
}

/// Result of one clock tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// Nothing happened (session not active or clock stopped).
    Idle,
    /// The clock advanced; carries the new display seconds.
    Running(u32),
    /// The countdown expired and the attempt was submitted.
    Expired(GradingReceipt),
}

//
// ─── ATTEMPT SERVICE ───────────────────────────────────────────────────────────
//

/// Drives one attempt end to end: open with recovery, start, answer, flag,
/// navigate, tick, submit, exit.
///
/// Every mutation that changes durable state writes a snapshot before
/// returning, in call order, so a reload after rapid answering always
/// recovers the latest state.
#[derive(Clone)]
pub struct AttemptService {
    clock: Clock,
    tests: Arc<dyn TestRepository>,
    snapshots: Arc<dyn SnapshotRepository>,
    grading: Arc<dyn GradingClient>,
}

impl AttemptService {
    #[must_use]
    pub fn new(
        clock: Clock,
        tests: Arc<dyn TestRepository>,
        snapshots: Arc<dyn SnapshotRepository>,
        grading: Arc<dyn GradingClient>,
    ) -> Self {
        Self {
            clock,
            tests,
            snapshots,
            grading,
        }
    }

    /// Opens a test for an attempt, reconciling any surviving snapshot first.
    ///
    /// A countdown that comes back already expired is submitted immediately
    /// rather than resuming with a zero display.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::TestNotFound` for unknown test ids and
    /// `SessionError::Storage` for backend failures.
    pub async fn open(&self, test_id: TestId) -> Result<OpenOutcome, SessionError> {
        let opened = SessionQueries::open_from_storage(
            test_id,
            self.tests.as_ref(),
            self.snapshots.as_ref(),
            self.clock.now(),
        )
        .await?;

        let mut session = match opened {
            Opened::Fresh(session) => return Ok(OpenOutcome::Fresh(session)),
            Opened::Resumed(session) => session,
        };

        let expired = session.clock().is_some_and(exam_core::SessionClock::is_expired);
        if !expired {
            return Ok(OpenOutcome::Resumed(session));
        }

        match self.submit(&mut session).await {
            Ok(receipt) => Ok(OpenOutcome::AutoSubmitted { session, receipt }),
            Err(SessionError::Grading(error)) => {
                Ok(OpenOutcome::AutoSubmitFailed { session, error })
            }
            Err(other) => Err(other),
        }
    }

    /// Confirms the timer choice, drops any stale snapshot for this test,
    /// and writes the first snapshot of the new attempt.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyStarted` outside `Instructions` and
    /// `SessionError::Storage` for backend failures.
    pub async fn start(
        &self,
        session: &mut TestSession,
        timer_enabled: bool,
    ) -> Result<(), SessionError> {
        if session.stage() != SessionStage::Instructions {
            return Err(SessionError::AlreadyStarted);
        }
        self.snapshots.clear(session.definition().id()).await?;
        session.begin(timer_enabled, self.clock.now())?;
        self.persist(session).await
    }

    /// Selects an option and snapshots when the sheet changed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the snapshot write fails.
    pub async fn select_answer(
        &self,
        session: &mut TestSession,
        id: QuestionId,
        label: OptionLabel,
    ) -> Result<bool, SessionError> {
        let changed = session.select_answer(id, label);
        if changed {
            self.persist(session).await?;
        }
        Ok(changed)
    }

    /// Toggles a review flag and snapshots when the sheet changed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the snapshot write fails.
    pub async fn toggle_flag(
        &self,
        session: &mut TestSession,
        id: QuestionId,
    ) -> Result<bool, SessionError> {
        let changed = session.toggle_flag(id);
        if changed {
            self.persist(session).await?;
        }
        Ok(changed)
    }

    /// Moves to a question and snapshots when the position changed, so a
    /// reload drops the user back on the question they were looking at.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the snapshot write fails.
    pub async fn go_to(
        &self,
        session: &mut TestSession,
        index: usize,
    ) -> Result<bool, SessionError> {
        let changed = session.go_to(index);
        if changed {
            self.persist(session).await?;
        }
        Ok(changed)
    }

    /// Advances the session clock by one second; an expiring countdown
    /// forces submission.
    ///
    /// # Errors
    ///
    /// Propagates submission failures from the forced submit; the session
    /// stays active with its answers intact and `submit` can be retried.
    pub async fn tick(&self, session: &mut TestSession) -> Result<TickOutcome, SessionError> {
        match session.record_tick() {
            ClockTick::Idle => Ok(TickOutcome::Idle),
            ClockTick::Running(secs) => Ok(TickOutcome::Running(secs)),
            ClockTick::Expired => {
                let receipt = self.submit(session).await?;
                Ok(TickOutcome::Expired(receipt))
            }
        }
    }

    /// Hands the answer set to grading.
    ///
    /// Success clears the snapshot and completes the session. Failure rolls
    /// the stage back to `Active` with the sheet untouched, so the user can
    /// retry without re-answering.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive`/`Finished` for lifecycle misuse,
    /// `SessionError::Grading` for a failed round-trip, and
    /// `SessionError::Storage` if the snapshot cannot be cleared.
    pub async fn submit(&self, session: &mut TestSession) -> Result<GradingReceipt, SessionError> {
        session.begin_submit()?;
        let submission = build_submission(session);

        match self.grading.grade(&submission).await {
            Ok(receipt) => {
                if let Err(e) = self.snapshots.clear(session.definition().id()).await {
                    session.abort_submit();
                    return Err(e.into());
                }
                session.complete_submit();
                Ok(receipt)
            }
            Err(error) => {
                session.abort_submit();
                Err(SessionError::Grading(error))
            }
        }
    }

    /// Abandons the attempt: clears the snapshot and discards all progress.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finished` if the session already ended and
    /// `SessionError::Storage` for backend failures.
    pub async fn exit(&self, session: &mut TestSession) -> Result<(), SessionError> {
        if session.stage().is_terminal() {
            return Err(SessionError::Finished);
        }
        self.snapshots.clear(session.definition().id()).await?;
        session.mark_exited()
    }

    async fn persist(&self, session: &TestSession) -> Result<(), SessionError> {
        if let Some(snapshot) = session.snapshot(self.clock.now()) {
            self.snapshots
                .save(session.definition().id(), &snapshot)
                .await?;
        }
        Ok(())
    }
}

fn build_submission(session: &TestSession) -> AttemptSubmission {
    AttemptSubmission {
        test_id: session.definition().id(),
        answers: session
            .sheet()
            .iter()
            .map(|(id, state)| (*id, SubmittedAnswer::from(state)))
            .collect(),
        time_spent_seconds: session.time_spent_secs(),
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
