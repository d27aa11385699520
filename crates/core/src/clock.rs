use chrono::{DateTime, Utc};

use crate::time::elapsed_secs_since;

//
// ─── TIMER MODE ────────────────────────────────────────────────────────────────
//

/// How a session measures time. Chosen once when the attempt starts and
/// immutable for the lifetime of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    /// Fixed budget in whole seconds, counting down to expiry.
    Countdown { limit_secs: u32 },
    /// Open-ended counter from zero. Never expires.
    Elapsed,
}

impl TimerMode {
    /// True for the countdown variant.
    #[must_use]
    pub fn is_countdown(&self) -> bool {
        matches!(self, TimerMode::Countdown { .. })
    }
}

//
// ─── TICK ──────────────────────────────────────────────────────────────────────
//

/// Outcome of advancing the clock by one whole second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockTick {
    /// The clock is not running; nothing changed.
    Idle,
    /// The clock advanced. Carries the new display value in seconds
    /// (remaining for countdown, elapsed for open-ended).
    Running(u32),
    /// The countdown reached zero on this tick. Fired at most once per
    /// clock; the clock stops itself afterwards.
    Expired,
}

//
// ─── SESSION CLOCK ─────────────────────────────────────────────────────────────
//

/// The single timer source for one attempt.
///
/// Owned by the session and started/stopped on its lifecycle transitions, so
/// there is never more than one ticking source per attempt. Whole-second
/// resolution: the driving event loop calls [`SessionClock::tick`] once per
/// second while the session is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionClock {
    mode: TimerMode,
    started_at: DateTime<Utc>,
    display_secs: u32,
    running: bool,
    expired: bool,
}

impl SessionClock {
    /// Starts a countdown of `limit_secs` at `started_at`.
    ///
    /// A zero limit is treated as already expired, not as a one-tick grace.
    #[must_use]
    pub fn countdown(limit_secs: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            mode: TimerMode::Countdown { limit_secs },
            started_at,
            display_secs: limit_secs,
            running: limit_secs > 0,
            expired: limit_secs == 0,
        }
    }

    /// Starts an open-ended elapsed counter at `started_at`.
    #[must_use]
    pub fn elapsed(started_at: DateTime<Utc>) -> Self {
        Self {
            mode: TimerMode::Elapsed,
            started_at,
            display_secs: 0,
            running: true,
            expired: false,
        }
    }

    /// Rebuilds a clock after a reload.
    ///
    /// The value is recomputed from `now - started_at`, never from a stored
    /// counter, so missed ticks while the page was away cannot stretch a
    /// countdown and repeated reloads cannot extend it. A countdown restored
    /// at or past its limit comes back already expired and stopped; the
    /// caller must treat that as expiry having fired.
    #[must_use]
    pub fn resume(mode: TimerMode, started_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let elapsed = elapsed_secs_since(started_at, now);
        match mode {
            TimerMode::Countdown { limit_secs } => {
                let remaining = limit_secs.saturating_sub(elapsed);
                Self {
                    mode,
                    started_at,
                    display_secs: remaining,
                    running: remaining > 0,
                    expired: remaining == 0,
                }
            }
            TimerMode::Elapsed => Self {
                mode,
                started_at,
                display_secs: elapsed,
                running: true,
                expired: false,
            },
        }
    }

    /// Advances the clock by one whole second.
    ///
    /// Countdown: decrements and fires [`ClockTick::Expired`] exactly once
    /// when the value reaches zero, then stops. Elapsed: increments forever.
    /// Returns [`ClockTick::Idle`] while stopped.
    pub fn tick(&mut self) -> ClockTick {
        if !self.running {
            return ClockTick::Idle;
        }
        match self.mode {
            TimerMode::Countdown { .. } => {
                self.display_secs = self.display_secs.saturating_sub(1);
                if self.display_secs == 0 {
                    self.running = false;
                    self.expired = true;
                    ClockTick::Expired
                } else {
                    ClockTick::Running(self.display_secs)
                }
            }
            TimerMode::Elapsed => {
                self.display_secs = self.display_secs.saturating_add(1);
                ClockTick::Running(self.display_secs)
            }
        }
    }

    /// Stops ticking. Idempotent.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Resumes ticking after a [`SessionClock::stop`], unless the countdown
    /// has already expired.
    pub fn restart(&mut self) {
        if !self.expired {
            self.running = true;
        }
    }

    #[must_use]
    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Current display value: remaining seconds for countdown, elapsed
    /// seconds otherwise.
    #[must_use]
    pub fn display_secs(&self) -> u32 {
        self.display_secs
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// True once a countdown has reached zero. Always false for elapsed mode.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Seconds the user has spent on the attempt so far.
    ///
    /// Countdown: `limit - remaining`. Elapsed: the counter itself.
    #[must_use]
    pub fn time_spent_secs(&self) -> u32 {
        match self.mode {
            TimerMode::Countdown { limit_secs } => limit_secs.saturating_sub(self.display_secs),
            TimerMode::Elapsed => self.display_secs,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
