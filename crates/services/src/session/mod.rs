mod progress;
mod queries;
mod state;
mod view;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use state::{SessionStage, TestSession};
pub use view::{OptionView, QuestionView, SessionView, TimerView};
pub use workflow::{AttemptService, OpenOutcome, TickOutcome};
