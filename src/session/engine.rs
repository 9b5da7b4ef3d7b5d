//! Live workout session timer.

use crate::schedule::{Effort, RoutineSummary};
use crate::storage::config::SessionSettings;

/// Session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    NotStarted,
    InProgress,
    Paused,
    Stopped,
}

/// State of the loaded session.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub routine: RoutineSummary,
    pub status: SessionStatus,
    pub elapsed_seconds: u32,
    /// Index into the routine's exercise list
    pub exercise_index: usize,
}

/// Session execution engine.
///
/// Time only advances while in progress. The caller drives `tick` once per
/// second and turns the finished session into an `Effort` for completion.
pub struct SessionEngine {
    state: Option<SessionState>,
    calories_per_minute: u32,
}

impl SessionEngine {
    /// Create a new session engine.
    pub fn new(settings: &SessionSettings) -> Self {
        Self {
            state: None,
            calories_per_minute: settings.calories_per_minute,
        }
    }

    /// Load a routine, replacing any previous session.
    pub fn load(&mut self, routine: RoutineSummary) {
        tracing::info!(routine = %routine.name, "Session loaded");
        self.state = Some(SessionState {
            routine,
            status: SessionStatus::NotStarted,
            elapsed_seconds: 0,
            exercise_index: 0,
        });
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        let state = self.state.as_mut().ok_or(SessionError::NoSessionLoaded)?;

        if state.status != SessionStatus::NotStarted {
            return Err(SessionError::EngineError(
                "Session already started".to_string(),
            ));
        }

        state.status = SessionStatus::InProgress;
        tracing::info!("Session started");
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), SessionError> {
        let state = self.state.as_mut().ok_or(SessionError::NoSessionLoaded)?;

        if state.status != SessionStatus::InProgress {
            return Err(SessionError::EngineError(
                "Session not in progress".to_string(),
            ));
        }

        state.status = SessionStatus::Paused;
        tracing::info!(elapsed = state.elapsed_seconds, "Session paused");
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), SessionError> {
        let state = self.state.as_mut().ok_or(SessionError::NoSessionLoaded)?;

        if state.status != SessionStatus::Paused {
            return Err(SessionError::EngineError("Session not paused".to_string()));
        }

        state.status = SessionStatus::InProgress;
        tracing::info!("Session resumed");
        Ok(())
    }

    /// Pause a running session or resume a paused one.
    pub fn toggle_pause(&mut self) -> Result<SessionStatus, SessionError> {
        match self.state.as_ref().map(|s| s.status) {
            Some(SessionStatus::Paused) => self.resume()?,
            _ => self.pause()?,
        }
        Ok(self.state.as_ref().map_or(SessionStatus::NotStarted, |s| s.status))
    }

    /// Stop the clock. The session can still be finished.
    pub fn stop(&mut self) -> Result<(), SessionError> {
        let state = self.state.as_mut().ok_or(SessionError::NoSessionLoaded)?;

        state.status = SessionStatus::Stopped;
        tracing::info!(elapsed = state.elapsed_seconds, "Session stopped");
        Ok(())
    }

    /// Advance the session by one second.
    pub fn tick(&mut self) {
        if let Some(state) = self.state.as_mut() {
            if state.status == SessionStatus::InProgress {
                state.elapsed_seconds += 1;
            }
        }
    }

    /// Move to the next exercise. Returns `false` on the last one.
    pub fn next_exercise(&mut self) -> Result<bool, SessionError> {
        let state = self.state.as_mut().ok_or(SessionError::NoSessionLoaded)?;

        if state.exercise_index + 1 >= state.routine.exercises.len() {
            return Ok(false);
        }

        state.exercise_index += 1;
        tracing::debug!(index = state.exercise_index, "Next exercise");
        Ok(true)
    }

    /// Current exercise name.
    pub fn current_exercise(&self) -> Option<&str> {
        let state = self.state.as_ref()?;
        state
            .routine
            .exercises
            .get(state.exercise_index)
            .map(String::as_str)
    }

    /// Rounded percent of exercises already passed.
    pub fn exercise_progress(&self) -> u8 {
        match self.state.as_ref() {
            Some(state) if !state.routine.exercises.is_empty() => {
                let total = state.routine.exercises.len() as f64;
                (state.exercise_index as f64 / total * 100.0).round() as u8
            }
            _ => 0,
        }
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.state.as_ref().map_or(0, |s| s.elapsed_seconds)
    }

    /// Calories estimated from elapsed time.
    pub fn estimated_calories(&self) -> u32 {
        let minutes = f64::from(self.elapsed_seconds()) / 60.0;
        (minutes * f64::from(self.calories_per_minute)).round() as u32
    }

    /// Elapsed time as `MM:SS`.
    pub fn format_elapsed(&self) -> String {
        format_clock(self.elapsed_seconds())
    }

    pub fn state(&self) -> Option<&SessionState> {
        self.state.as_ref()
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.state.as_ref().map(|s| s.status),
            Some(SessionStatus::InProgress | SessionStatus::Paused)
        )
    }

    /// End the session and measure its effort. The engine is left empty.
    pub fn finish(&mut self) -> Result<Effort, SessionError> {
        let status = self
            .state
            .as_ref()
            .ok_or(SessionError::NoSessionLoaded)?
            .status;
        if status == SessionStatus::NotStarted {
            return Err(SessionError::EngineError(
                "Session never started".to_string(),
            ));
        }

        let effort = Effort {
            duration_minutes: self.elapsed_seconds().div_ceil(60),
            calories_burned: self.estimated_calories(),
        };
        self.state = None;

        tracing::info!(
            minutes = effort.duration_minutes,
            calories = effort.calories_burned,
            "Session finished"
        );
        Ok(effort)
    }
}

/// Format seconds as `MM:SS`; minutes are not wrapped into hours.
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Session errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No session loaded")]
    NoSessionLoaded,

    #[error("Session error: {0}")]
    EngineError(String),
}
