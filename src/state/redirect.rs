//! Redirect target operations
//!
//! Expiry is lazy: a temporary URL is only reverted when somebody reads the
//! state at or after `expires_at`. Nothing runs when the timer elapses.

use chrono::{DateTime, TimeZone, Utc};

use super::{RedirectState, StateInner};
use crate::error::{Error, Result};
use crate::models::RedirectInfo;

/// Check that `url` is an absolute URL and return it trimmed
pub fn validate_url(url: &str) -> Result<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(Error::missing("url"));
    }
    url::Url::parse(trimmed)
        .map_err(|e| Error::validation(format!("Invalid URL '{trimmed}': {e}")))?;
    Ok(trimmed.to_string())
}

fn unix_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}

fn from_unix_seconds(secs: f64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt((secs * 1000.0).round() as i64).single()
}

impl RedirectState {
    /// Effective redirect target
    ///
    /// Reverts an expired temporary URL to the default (and persists that)
    /// before answering.
    pub fn current_url(&self) -> Result<String> {
        let mut inner = self.lock();
        self.apply_expiry(&mut inner)?;
        Ok(inner.config.current_url.clone())
    }

    /// Current/default URL and timer status
    pub fn info(&self) -> Result<RedirectInfo> {
        let mut inner = self.lock();
        self.apply_expiry(&mut inner)?;
        let config = &inner.config;
        Ok(RedirectInfo {
            current_url: config.current_url.clone(),
            default_url: config.default_url.clone(),
            expires_at: config.expires_at,
            is_temporary: config.expires_at.is_some(),
        })
    }

    /// When the current temporary URL reverts, if it is temporary
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.lock().config.expires_at.and_then(from_unix_seconds)
    }

    /// Permanently redirect to `url`, cancelling any timer
    pub fn set_current_url(&self, url: &str) -> Result<()> {
        let url = validate_url(url)?;
        let mut inner = self.lock();
        let mut draft = inner.config.clone();
        draft.current_url = url;
        draft.expires_at = None;
        self.commit_config(&mut inner, draft)?;
        tracing::info!(url = %inner.config.current_url, "Redirect set");
        Ok(())
    }

    /// Change the fallback target
    ///
    /// The current URL is left alone.
    pub fn set_default_url(&self, url: &str) -> Result<()> {
        let url = validate_url(url)?;
        let mut inner = self.lock();
        let mut draft = inner.config.clone();
        draft.default_url = url;
        self.commit_config(&mut inner, draft)?;
        tracing::info!(url = %inner.config.default_url, "Default redirect set");
        Ok(())
    }

    /// Redirect to `url` for `seconds`, then revert to the default
    ///
    /// Returns the expiry instant.
    pub fn set_temporary_url(&self, url: &str, seconds: u64) -> Result<DateTime<Utc>> {
        let url = validate_url(url)?;
        let seconds = i64::try_from(seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| Error::validation("'seconds' is too large"))?;
        let expires = self
            .clock
            .now()
            .checked_add_signed(seconds)
            .ok_or_else(|| Error::validation("'seconds' is too large"))?;

        let mut inner = self.lock();
        let mut draft = inner.config.clone();
        draft.current_url = url;
        draft.expires_at = Some(unix_seconds(expires));
        self.commit_config(&mut inner, draft)?;

        tracing::info!(
            url = %inner.config.current_url,
            expires_at = %expires,
            "Temporary redirect set"
        );
        Ok(expires)
    }

    /// Make the current URL permanent
    pub fn clear_timer(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.config.expires_at.is_none() {
            return Ok(());
        }
        let mut draft = inner.config.clone();
        draft.expires_at = None;
        self.commit_config(&mut inner, draft)?;
        tracing::info!("Redirect timer cleared");
        Ok(())
    }

    fn apply_expiry(&self, inner: &mut StateInner) -> Result<()> {
        let Some(expires_at) = inner.config.expires_at else {
            return Ok(());
        };
        if unix_seconds(self.clock.now()) < expires_at {
            return Ok(());
        }

        let mut draft = inner.config.clone();
        draft.current_url = draft.default_url.clone();
        draft.expires_at = None;
        self.commit_config(inner, draft)?;
        tracing::info!(url = %inner.config.current_url, "Temporary redirect expired, reverted to default");
        Ok(())
    }
}
