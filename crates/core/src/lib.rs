#![forbid(unsafe_code)]

pub mod clock;
pub mod error;
pub mod model;
pub mod time;

pub use clock::{ClockTick, SessionClock, TimerMode};
pub use error::Error;
pub use time::Clock;
