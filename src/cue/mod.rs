//! Remote cue and event publishing
//!
//! Activating a preset posts a "cue" (headline, body and button shown to
//! people on the landing page) to the remote REST API, scoped to the event of
//! the day. The scheduler creates those events ahead of time.
//!
//! Publishing is best-effort: every call resolves to a [`PublishOutcome`]
//! rather than an error, and callers decide whether a failure matters.

pub mod publisher;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::{CuePayload, RemoteConfig};

pub use publisher::CuePublisher;

/// Why a remote call did not succeed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// URL or key missing; nothing was sent
    #[error("Remote API not configured")]
    NotConfigured,

    /// The remote answered with an unexpected status
    #[error("HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Connection, timeout or protocol failure
    #[error("Request failed: {0}")]
    Transport(String),
}

impl PublishError {
    /// Whether repeating the same call later may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::NotConfigured => false,
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            Self::Transport(_) => true,
        }
    }
}

impl From<reqwest::Error> for PublishError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Result of a single publish or create call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    Delivered { event_id: String, status: u16 },
    Failed { event_id: String, error: PublishError },
}

impl PublishOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    pub fn event_id(&self) -> &str {
        match self {
            Self::Delivered { event_id, .. } | Self::Failed { event_id, .. } => event_id,
        }
    }

    pub fn error(&self) -> Option<&PublishError> {
        match self {
            Self::Delivered { .. } => None,
            Self::Failed { error, .. } => Some(error),
        }
    }

    /// Turn a failure into an error, keeping the event id on success
    pub fn into_result(self) -> Result<String, PublishError> {
        match self {
            Self::Delivered { event_id, .. } => Ok(event_id),
            Self::Failed { error, .. } => Err(error),
        }
    }
}

/// Row posted to the `cues` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueRecord {
    pub event_id: String,
    pub cue_type: String,
    pub headline: String,
    pub body_text: String,
    pub button_text: String,
    pub button_url: String,
}

impl CueRecord {
    /// Build the row for `event_date`
    ///
    /// A missing payload posts empty fields, which hides the cue remotely.
    pub fn new(cue_type: &str, payload: Option<&CuePayload>, event_date: NaiveDate) -> Self {
        let payload = payload.cloned().unwrap_or_default();
        Self {
            event_id: crate::models::format_event_id(event_date),
            cue_type: cue_type.to_string(),
            headline: payload.headline,
            body_text: payload.body_text,
            button_text: payload.button_text,
            button_url: payload.button_url,
        }
    }
}

/// Remote operations used by the service and the scheduler
///
/// Implemented by [`CuePublisher`]; tests substitute recording fakes.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Post a cue for the event on `event_date`
    async fn publish_cue(
        &self,
        remote: &RemoteConfig,
        cue_type: &str,
        payload: Option<&CuePayload>,
        event_date: NaiveDate,
    ) -> PublishOutcome;

    /// Create the event `event_id`, optionally recording its start time
    async fn create_event(
        &self,
        remote: &RemoteConfig,
        event_id: &str,
        start_time: Option<NaiveDateTime>,
    ) -> PublishOutcome;

    /// Check that the remote answers with the configured credentials
    async fn test_connection(&self, remote: &RemoteConfig) -> Result<(), PublishError>;
}
