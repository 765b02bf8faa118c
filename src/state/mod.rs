//! Shared redirect state
//!
//! [`RedirectState`] is the single authority over the configuration and
//! preset documents. Every accessor, read or write, takes the same mutex for
//! the whole logical operation, including the document write, so
//! "mutate then persist" is atomic with respect to other callers.
//!
//! Mutations are applied to a working copy which is persisted first and only
//! then committed to memory. A failed write therefore leaves the in-memory
//! state exactly as it was on disk.
//!
//! # Modules
//!
//! - [`redirect`] - current/default/temporary URL and lazy expiry
//! - [`presets`] - ordered preset registry
//! - [`security`] - shared-secret gate
//! - [`events`] - recurring and manual event definitions
//! - [`remote`] - remote API credentials and the listening port

pub mod events;
pub mod presets;
pub mod redirect;
pub mod remote;
pub mod security;

use std::sync::{Arc, Mutex, MutexGuard};

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::models::{Preset, RedirectConfig};
use crate::storage::DocumentStore;

pub use events::ScheduleSnapshot;
pub use presets::normalize_name;
pub use redirect::validate_url;
pub use security::generate_key;

/// Everything guarded by the state lock
#[derive(Debug, Clone)]
struct StateInner {
    config: RedirectConfig,
    presets: Vec<Preset>,
}

/// Process-wide redirect state, shared by handle
pub struct RedirectState {
    inner: Mutex<StateInner>,
    store: DocumentStore,
    clock: Arc<dyn Clock>,
}

impl RedirectState {
    /// Load both documents using the system clock
    pub fn load(store: DocumentStore) -> Result<Self> {
        Self::load_with_clock(store, Arc::new(SystemClock))
    }

    /// Load both documents, repairing and persisting them when needed
    ///
    /// A missing API key is generated here, and presets that needed a
    /// migration are written back once.
    pub fn load_with_clock(store: DocumentStore, clock: Arc<dyn Clock>) -> Result<Self> {
        let mut config = store.load_config();
        let mut dirty = config.normalize();

        if config.api_key.is_empty() {
            config.api_key = generate_key();
            dirty = true;
            tracing::info!("Generated a new API key");
        }
        if dirty {
            store.save_config(&config)?;
        }

        let decoded = store.load_presets();
        if decoded.needs_rewrite() {
            tracing::info!(
                upgraded = decoded.upgraded,
                dropped = decoded.dropped,
                "Rewriting migrated preset document"
            );
            store.save_presets(&decoded.presets)?;
        }

        tracing::info!(
            config = %store.config_path().display(),
            presets = decoded.presets.len(),
            scheduled_events = config.scheduled_events.len(),
            manual_events = config.manual_events.len(),
            "Redirect state loaded"
        );

        Ok(Self {
            inner: Mutex::new(StateInner {
                config,
                presets: decoded.presets,
            }),
            store,
            clock,
        })
    }

    /// Clock used for expiry and scheduling
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Document store backing this state
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Copy of the whole configuration document
    pub fn config_snapshot(&self) -> RedirectConfig {
        self.lock().config.clone()
    }

    fn lock(&self) -> MutexGuard<'_, StateInner> {
        // A panicking holder cannot leave a half-applied mutation behind
        // (drafts are committed only after a successful write).
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Persist `draft` and make it the live configuration
    fn commit_config(&self, inner: &mut StateInner, draft: RedirectConfig) -> Result<()> {
        self.store.save_config(&draft)?;
        inner.config = draft;
        Ok(())
    }

    /// Persist `draft` and make it the live preset list
    fn commit_presets(&self, inner: &mut StateInner, draft: Vec<Preset>) -> Result<()> {
        self.store.save_presets(&draft)?;
        inner.presets = draft;
        Ok(())
    }
}

impl std::fmt::Debug for RedirectState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedirectState")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
