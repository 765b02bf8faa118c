//! Remote API credentials and the listening port

use super::redirect::validate_url;
use super::RedirectState;
use crate::error::{Error, Result};
use crate::models::{RemoteConfig, MIN_PORT};

impl RedirectState {
    pub fn remote_config(&self) -> RemoteConfig {
        self.lock().config.remote()
    }

    /// Store the remote endpoint and key
    ///
    /// Either value may be empty, which leaves the remote unconfigured.
    pub fn set_remote_config(&self, url: &str, api_key: &str) -> Result<RemoteConfig> {
        let url = match url.trim() {
            "" => String::new(),
            raw => validate_url(raw)?,
        };
        let api_key = api_key.trim().to_string();

        let mut inner = self.lock();
        let mut draft = inner.config.clone();
        draft.supabase_url = url;
        draft.supabase_api_key = api_key;
        self.commit_config(&mut inner, draft)?;

        let remote = inner.config.remote();
        tracing::info!(
            url = %remote.url,
            configured = remote.is_configured(),
            "Remote API configuration updated"
        );
        Ok(remote)
    }

    /// Port the HTTP adapter should listen on
    pub fn port(&self) -> u16 {
        self.lock().config.port
    }

    /// Record a new listening port; takes effect on the next start
    pub fn set_port(&self, port: u16) -> Result<()> {
        if port < MIN_PORT {
            return Err(Error::validation(format!(
                "Port must be between {MIN_PORT} and 65535"
            )));
        }

        let mut inner = self.lock();
        let mut draft = inner.config.clone();
        draft.port = port;
        self.commit_config(&mut inner, draft)?;
        tracing::info!(port, "Port updated, restart required");
        Ok(())
    }
}
