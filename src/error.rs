//! Unified error handling for the ez-redirect crate
//!
//! This module provides a unified error type that consolidates the
//! domain-specific errors of the state manager, the cue publisher and the
//! event scheduler into a single `Error` enum.
//!
//! # Architecture
//!
//! - [`RedirectErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use ez_redirect::error::{Error, ErrorCategory, RedirectErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     match err.category() {
//!         ErrorCategory::Validation => eprintln!("Bad request: {err}"),
//!         _ if err.is_recoverable() => eprintln!("Try again later: {err}"),
//!         _ => eprintln!("Fatal error: {err}"),
//!     }
//! }
//! ```

use std::io;
use std::path::PathBuf;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::cue::PublishError;
pub use crate::scheduler::error::SchedulerError;

/// Common trait for all ez-redirect error types
///
/// This trait provides a unified interface for error handling across
/// all modules, enabling consistent error processing strategies.
pub trait RedirectErrorTrait: std::error::Error {
    /// Check if this error is recoverable (the same call may succeed later)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Caller supplied a missing or malformed value
    Validation,
    /// Referenced preset or event does not exist
    NotFound,
    /// Security gate rejected the caller
    Authorization,
    /// Remote cue/event API failures
    Remote,
    /// Persistence and I/O errors
    Storage,
    /// Service configuration errors
    Config,
    /// Scheduler and event definition errors
    Scheduler,
    /// Other/unknown errors
    Other,
}

/// Unified error type for the ez-redirect crate
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed input, rejected before touching state
    #[error("{0}")]
    Validation(String),

    /// Unknown preset or event index
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    /// Security gate mismatch
    #[error("Invalid or missing API key")]
    Unauthorized,

    /// Remote API failure surfaced to the caller
    #[error("Remote API error: {0}")]
    Remote(#[from] PublishError),

    /// Scheduler and event definition errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// A document could not be written or read
    #[error("Persistence error at {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl RedirectErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::NotFound { .. } | Self::Unauthorized => false,
            Self::Remote(e) => e.is_recoverable(),
            Self::Scheduler(e) => e.is_recoverable(),
            Self::Persistence { .. } => true,
            Self::Json(_) => false,
            Self::Http(_) => true,
            Self::Config(_) => false,
            Self::Other(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::Unauthorized => ErrorCategory::Authorization,
            Self::Remote(_) | Self::Http(_) => ErrorCategory::Remote,
            Self::Scheduler(_) => ErrorCategory::Scheduler,
            Self::Persistence { .. } | Self::Json(_) => ErrorCategory::Storage,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other(_) => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a "missing field" validation error
    pub fn missing(field: &str) -> Self {
        Self::Validation(format!("Missing '{field}'"))
    }

    /// Create a not-found error for a preset
    pub fn preset_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Preset",
            key: name.into(),
        }
    }

    /// Create a not-found error for an event index
    pub fn event_not_found(kind: &'static str, index: usize) -> Self {
        Self::NotFound {
            kind,
            key: index.to_string(),
        }
    }

    /// Create a persistence error for a document path
    pub fn persistence(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other(context.into())
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category() {
        let err = Error::missing("url");
        assert_eq!(err.category(), ErrorCategory::Validation);

        let err = Error::preset_not_found("Giving");
        assert_eq!(err.category(), ErrorCategory::NotFound);

        assert_eq!(Error::Unauthorized.category(), ErrorCategory::Authorization);
    }

    #[test]
    fn test_is_recoverable() {
        let err = Error::persistence("/tmp/config.json", io::Error::other("disk full"));
        assert!(err.is_recoverable());
        assert_eq!(err.category(), ErrorCategory::Storage);

        assert!(!Error::validation("bad port").is_recoverable());
        assert!(!Error::Unauthorized.is_recoverable());
    }

    #[test]
    fn test_messages() {
        assert_eq!(Error::missing("url").to_string(), "Missing 'url'");
        assert_eq!(
            Error::preset_not_found("Easter").to_string(),
            "Preset not found: Easter"
        );
        assert_eq!(
            Error::event_not_found("Manual event", 3).to_string(),
            "Manual event not found: 3"
        );
    }

    #[test]
    fn test_remote_conversion() {
        let unified: Error = PublishError::NotConfigured.into();
        assert!(matches!(unified, Error::Remote(_)));
        assert_eq!(unified.category(), ErrorCategory::Remote);
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("poll interval must be positive");
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_other_error() {
        let err = Error::other("Something went wrong");
        assert_eq!(err.category(), ErrorCategory::Other);
        assert_eq!(err.to_string(), "Something went wrong");
        assert!(std::error::Error::source(&err).is_none());
    }
}
