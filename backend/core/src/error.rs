use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// The two readiness facts a run waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessSignal {
    Navigation,
    PeriodId,
}

impl fmt::Display for ReadinessSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigation => write!(f, "initial navigation"),
            Self::PeriodId => write!(f, "attendance period id"),
        }
    }
}

/// A table row did not have the shape of a day entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("row {index}: {message}")]
pub struct RowParseError {
    pub index: usize,
    pub message: String,
}

impl RowParseError {
    pub fn new(index: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            message: message.into(),
        }
    }
}

/// Top-level error type for a clock-in run.
#[derive(Debug, Error)]
pub enum ClockInError {
    #[error("timed out after {waited:?} waiting for {signal}")]
    ReadinessTimeout {
        signal: ReadinessSignal,
        waited: Duration,
    },

    #[error("could not parse row: {0}")]
    RowParse(#[from] RowParseError),

    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("could not log in: {0}")]
    LoginFailed(String),

    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    #[error("run cancelled")]
    Cancelled,

    #[error(transparent)]
    Session(#[from] anyhow::Error),
}
