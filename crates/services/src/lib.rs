#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod grading;
pub mod session;

pub use exam_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, GradingError, SessionError};
pub use grading::{
    AttemptSubmission, GradingClient, GradingConfig, GradingReceipt, HttpGradingClient,
    SubmittedAnswer,
};
pub use session::{
    AttemptService, OpenOutcome, SessionProgress, SessionStage, SessionView, TestSession,
    TickOutcome,
};
