//! Error types for statekit core systems.

use std::fmt;

/// The main error type for core operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Timer-related error.
    Timer(TimerError),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timer(err) => write!(f, "Timer error: {err}"),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Timer(err) => Some(err),
        }
    }
}

/// Timer-specific errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    /// The timer ID is invalid, already fired, or has already been stopped.
    InvalidTimerId,
    /// No async runtime is running on the calling thread, so nothing can be armed.
    NoRuntime,
    /// The registry has been shut down and accepts no new timers.
    RegistryClosed,
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTimerId => write!(f, "Invalid or expired timer ID"),
            Self::NoRuntime => write!(f, "No async runtime available to drive the timer"),
            Self::RegistryClosed => write!(f, "Timer registry has been shut down"),
        }
    }
}

impl std::error::Error for TimerError {}

impl From<TimerError> for CoreError {
    fn from(err: TimerError) -> Self {
        Self::Timer(err)
    }
}

/// A specialized Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
