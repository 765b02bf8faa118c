pub mod manage;
pub mod serve;

use anyhow::{Context, Result};
use std::sync::Arc;

use ez_redirect::config::Config;
use ez_redirect::cue::CuePublisher;
use ez_redirect::service::RedirectService;
use ez_redirect::state::RedirectState;
use ez_redirect::storage::DocumentStore;

// Re-export command functions for convenience
pub use manage::{activate, create_event, rotate_key, status};
pub use serve::serve;

/// Load the redirect documents and build the service around them
pub(crate) fn open_service(config: &Config) -> Result<RedirectService> {
    let data_dir = &config.storage.data_dir;
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

    let state = RedirectState::load(DocumentStore::new(data_dir))
        .context("Failed to load redirect state")?;
    let publisher =
        CuePublisher::new(config.request_timeout()).context("Failed to build HTTP client")?;

    Ok(RedirectService::new(Arc::new(state), Arc::new(publisher)))
}
