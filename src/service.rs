//! Preset activation and on-demand remote operations
//!
//! [`RedirectService`] combines the shared state with the remote publisher
//! for the operations that touch both.

use chrono::Timelike;
use serde::Serialize;
use std::sync::Arc;

use crate::cue::{EventPublisher, PublishOutcome};
use crate::error::{Error, Result};
use crate::models::format_event_id;
use crate::state::RedirectState;

/// Result of switching the redirect to a preset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    /// Stored preset name (original casing)
    pub active_preset: String,
    pub active_url: String,
    pub cue_outcome: PublishOutcome,
}

impl Activation {
    pub fn cue_posted(&self) -> bool {
        self.cue_outcome.is_delivered()
    }

    /// Response body shape used by the HTTP adapter
    pub fn summary(&self) -> ActivationSummary {
        ActivationSummary {
            status: "ok",
            active_preset: self.active_preset.clone(),
            active_url: self.active_url.clone(),
            cue_posted: self.cue_posted(),
            cue_error: self.cue_outcome.error().map(|e| e.to_string()),
            event_id: self.cue_outcome.event_id().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivationSummary {
    pub status: &'static str,
    pub active_preset: String,
    pub active_url: String,
    pub cue_posted: bool,
    pub cue_error: Option<String>,
    pub event_id: String,
}

/// Operations spanning the redirect state and the remote API
#[derive(Clone)]
pub struct RedirectService {
    state: Arc<RedirectState>,
    publisher: Arc<dyn EventPublisher>,
}

impl RedirectService {
    pub fn new(state: Arc<RedirectState>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { state, publisher }
    }

    pub fn state(&self) -> &Arc<RedirectState> {
        &self.state
    }

    pub fn publisher(&self) -> &Arc<dyn EventPublisher> {
        &self.publisher
    }

    /// Make a preset the permanent redirect and post its cue
    ///
    /// A failed cue is reported in the result; the redirect change stands.
    pub async fn activate_preset(&self, name: &str) -> Result<Activation> {
        if name.trim().is_empty() {
            return Err(Error::missing("name"));
        }
        let preset = self
            .state
            .preset(name)
            .ok_or_else(|| Error::preset_not_found(name))?;

        self.state.set_current_url(&preset.url)?;
        tracing::info!(preset = %preset.name, url = %preset.url, "Preset activated");

        let remote = self.state.remote_config();
        let today = self.state.clock().local_now().date();
        let cue_outcome = self
            .publisher
            .publish_cue(&remote, &preset.name, preset.cue.as_ref(), today)
            .await;

        Ok(Activation {
            active_preset: preset.name,
            active_url: preset.url,
            cue_outcome,
        })
    }

    /// Like [`Self::activate_preset`], behind the security gate
    pub async fn activate_preset_with_key(&self, name: &str, key: Option<&str>) -> Result<Activation> {
        self.state.authorize(key)?;
        self.activate_preset(name).await
    }

    /// Create today's event immediately, starting now
    ///
    /// Returns the event id.
    pub async fn create_event_now(&self) -> Result<String> {
        let now = self.state.clock().local_now();
        let start = now.with_nanosecond(0).unwrap_or(now);
        let event_id = format_event_id(now.date());

        let remote = self.state.remote_config();
        let outcome = self
            .publisher
            .create_event(&remote, &event_id, Some(start))
            .await;
        Ok(outcome.into_result()?)
    }

    /// Check the stored remote credentials
    pub async fn test_connection(&self) -> Result<()> {
        let remote = self.state.remote_config();
        self.publisher.test_connection(&remote).await?;
        Ok(())
    }
}

impl std::fmt::Debug for RedirectService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedirectService")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
