//! Error types for the scheduler module

use std::fmt;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// Time of day not in HH:MM format
    InvalidTime {
        value: String,
    },

    /// Calendar date not in YYYY-MM-DD format
    InvalidDate {
        value: String,
    },

    /// Unknown weekday name
    InvalidDay {
        value: String,
        valid_options: Vec<String>,
    },

    /// Scheduler configuration error
    ConfigError {
        field: String,
        reason: String,
    },

    /// The background task ended abnormally
    TaskFailed {
        reason: String,
    },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTime { value } => {
                write!(f, "Invalid time '{}'. Expected HH:MM", value)
            }
            Self::InvalidDate { value } => {
                write!(f, "Invalid date '{}'. Expected YYYY-MM-DD", value)
            }
            Self::InvalidDay {
                value,
                valid_options,
            } => {
                write!(
                    f,
                    "Invalid day '{}'. Valid options: {}",
                    value,
                    valid_options.join(", ")
                )
            }
            Self::ConfigError { field, reason } => {
                write!(f, "Scheduler config error in '{}': {}", field, reason)
            }
            Self::TaskFailed { reason } => {
                write!(f, "Scheduler task failed: {}", reason)
            }
        }
    }
}

impl std::error::Error for SchedulerError {}

impl SchedulerError {
    /// Create an invalid time error
    pub fn invalid_time(value: impl Into<String>) -> Self {
        Self::InvalidTime {
            value: value.into(),
        }
    }

    /// Create an invalid date error
    pub fn invalid_date(value: impl Into<String>) -> Self {
        Self::InvalidDate {
            value: value.into(),
        }
    }

    /// Create an invalid day error
    pub fn invalid_day(value: impl Into<String>) -> Self {
        Self::InvalidDay {
            value: value.into(),
            valid_options: [
                "sunday",
                "monday",
                "tuesday",
                "wednesday",
                "thursday",
                "friday",
                "saturday",
            ]
            .iter()
            .map(|d| d.to_string())
            .collect(),
        }
    }

    /// Create a config error
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigError {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::TaskFailed { .. })
    }
}
