//! Live workout sessions.

pub mod engine;

pub use engine::{format_clock, SessionEngine, SessionError, SessionState, SessionStatus};
