//! ez-redirect - Live-switchable NFC redirect service
//!
//! Every NFC tag points at one fixed address served by this crate. Operators
//! decide where that address currently leads: a permanent URL, a temporary
//! URL that reverts on its own, or a named preset that also posts a cue to a
//! remote REST API. A background scheduler creates remote events on weekly
//! and one-off schedules.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Process configuration (env, TOML, CLI)
//! - [`models`] - Core data structures and the persisted document shapes
//! - [`storage`] - JSON document persistence
//! - [`state`] - The single source of truth for redirect, presets and security
//! - [`cue`] - Remote REST publisher for cues and events
//! - [`scheduler`] - Background event scheduler
//! - [`service`] - Operations spanning state and remote API
//! - [`server`] - HTTP surface
//! - [`clock`] - Time source abstraction
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ez_redirect::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let state = Arc::new(RedirectState::load(DocumentStore::new(&config.storage.data_dir))?);
//!     let publisher = Arc::new(CuePublisher::new(config.request_timeout())?);
//!     let server = AppServer::new(config, RedirectService::new(state, publisher))?;
//!     server.start_with_shutdown(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//!     Ok(())
//! }
//! ```

pub mod clock;
pub mod config;
pub mod cue;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod server;
pub mod service;
pub mod state;
pub mod storage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::config::Config;
    pub use crate::cue::{CuePublisher, EventPublisher, PublishError, PublishOutcome};
    pub use crate::error::{Error, ErrorCategory, RedirectErrorTrait, Result};
    pub use crate::models::{CuePayload, ManualEvent, Preset, RecurringEvent, RedirectConfig};
    pub use crate::scheduler::{EventScheduler, SchedulerConfig};
    pub use crate::server::AppServer;
    pub use crate::service::RedirectService;
    pub use crate::state::RedirectState;
    pub use crate::storage::DocumentStore;
}

// Direct re-exports for convenience
pub use models::{CuePayload, ManualEvent, Preset, RecurringEvent, RedirectConfig};
