//! HTTP client for the remote REST API
//!
//! # Requests
//!
//! | Operation | Request |
//! |-----------|---------|
//! | publish cue | `POST {base}/cues` with a [`CueRecord`] |
//! | create event | `POST {base}/rpc/create_event` with `{"p_event_id": ...}` |
//! | set start time | `PATCH {base}/events?event_id=eq.{id}` with `{"service_start_time": ...}` |
//! | test connection | `GET {base}/events?limit=1` |
//!
//! `{base}` is `{url}/rest/v1`. Every request carries the key both as the
//! `apikey` header and as a bearer token.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;

use super::{CueRecord, EventPublisher, PublishError, PublishOutcome};
use crate::clock::local_iso8601;
use crate::error::Result;
use crate::models::{CuePayload, RemoteConfig};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

fn is_accepted(status: StatusCode) -> bool {
    matches!(status.as_u16(), 200 | 201 | 204)
}

/// Remote API client
#[derive(Debug, Clone)]
pub struct CuePublisher {
    client: Client,
}

impl CuePublisher {
    /// Create a publisher whose requests give up after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ez-redirect/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn authorized(&self, request: RequestBuilder, remote: &RemoteConfig) -> RequestBuilder {
        let key = remote.api_key.trim();
        request.header("apikey", key).bearer_auth(key)
    }

    /// Send `request` and classify the response
    async fn send(&self, request: RequestBuilder) -> std::result::Result<u16, PublishError> {
        let response = request.send().await?;
        let status = response.status();
        if is_accepted(status) {
            return Ok(status.as_u16());
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response body".to_string());
        Err(PublishError::Rejected {
            status: status.as_u16(),
            body,
        })
    }

    /// Post a cue for the event on `event_date`
    pub async fn publish_cue(
        &self,
        remote: &RemoteConfig,
        cue_type: &str,
        payload: Option<&CuePayload>,
        event_date: NaiveDate,
    ) -> PublishOutcome {
        let record = CueRecord::new(cue_type, payload, event_date);
        let event_id = record.event_id.clone();

        if !remote.is_configured() {
            tracing::debug!(cue_type, "Remote API not configured, skipping cue");
            return PublishOutcome::Failed {
                event_id,
                error: PublishError::NotConfigured,
            };
        }

        let url = format!("{}/cues", remote.rest_base());
        let request = self.authorized(self.client.post(&url), remote).json(&record);

        match self.send(request).await {
            Ok(status) => {
                tracing::info!(cue_type, event_id = %event_id, status, "Cue published");
                PublishOutcome::Delivered { event_id, status }
            }
            Err(error) => {
                tracing::warn!(cue_type, event_id = %event_id, error = %error, "Cue publish failed");
                PublishOutcome::Failed { event_id, error }
            }
        }
    }

    /// Create the event `event_id`
    ///
    /// With a start time, a follow-up PATCH records it on the event row. That
    /// step is best-effort and never changes the outcome.
    pub async fn create_event(
        &self,
        remote: &RemoteConfig,
        event_id: &str,
        start_time: Option<NaiveDateTime>,
    ) -> PublishOutcome {
        let event_id = event_id.to_string();

        if !remote.is_configured() {
            tracing::debug!(event_id = %event_id, "Remote API not configured, skipping event");
            return PublishOutcome::Failed {
                event_id,
                error: PublishError::NotConfigured,
            };
        }

        let url = format!("{}/rpc/create_event", remote.rest_base());
        let request = self
            .authorized(self.client.post(&url), remote)
            .json(&serde_json::json!({ "p_event_id": event_id }));

        let status = match self.send(request).await {
            Ok(status) => status,
            Err(error) => {
                tracing::warn!(event_id = %event_id, error = %error, "Event creation failed");
                return PublishOutcome::Failed { event_id, error };
            }
        };
        tracing::info!(event_id = %event_id, status, "Event created");

        if let Some(start_time) = start_time {
            if let Err(e) = self.set_start_time(remote, &event_id, start_time).await {
                tracing::warn!(event_id = %event_id, error = %e, "Failed to record event start time");
            }
        }

        PublishOutcome::Delivered { event_id, status }
    }

    async fn set_start_time(
        &self,
        remote: &RemoteConfig,
        event_id: &str,
        start_time: NaiveDateTime,
    ) -> std::result::Result<(), PublishError> {
        let url = format!("{}/events", remote.rest_base());
        let request = self
            .authorized(self.client.patch(&url), remote)
            .query(&[("event_id", format!("eq.{event_id}"))])
            .json(&serde_json::json!({ "service_start_time": local_iso8601(start_time) }));
        self.send(request).await.map(|_| ())
    }

    /// Fetch one event row to prove the URL and key work
    pub async fn test_connection(&self, remote: &RemoteConfig) -> std::result::Result<(), PublishError> {
        if !remote.is_configured() {
            return Err(PublishError::NotConfigured);
        }

        let url = format!("{}/events", remote.rest_base());
        let response = self
            .authorized(self.client.get(&url), remote)
            .query(&[("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::OK {
            tracing::info!(url = %remote.url, "Remote API connection successful");
            Ok(())
        } else {
            Err(PublishError::Rejected {
                status: status.as_u16(),
                body: String::new(),
            })
        }
    }
}

#[async_trait]
impl EventPublisher for CuePublisher {
    async fn publish_cue(
        &self,
        remote: &RemoteConfig,
        cue_type: &str,
        payload: Option<&CuePayload>,
        event_date: NaiveDate,
    ) -> PublishOutcome {
        CuePublisher::publish_cue(self, remote, cue_type, payload, event_date).await
    }

    async fn create_event(
        &self,
        remote: &RemoteConfig,
        event_id: &str,
        start_time: Option<NaiveDateTime>,
    ) -> PublishOutcome {
        CuePublisher::create_event(self, remote, event_id, start_time).await
    }

    async fn test_connection(&self, remote: &RemoteConfig) -> std::result::Result<(), PublishError> {
        CuePublisher::test_connection(self, remote).await
    }
}
