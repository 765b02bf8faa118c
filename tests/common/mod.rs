//! Common test utilities

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use ez_redirect::clock::ManualClock;
use ez_redirect::cue::{EventPublisher, PublishError, PublishOutcome};
use ez_redirect::models::{format_event_id, CuePayload, RemoteConfig};
use ez_redirect::state::RedirectState;
use ez_redirect::storage::DocumentStore;

/// Local wall-clock time
pub fn local(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
}

/// State over a temporary data directory driven by a manual clock
pub struct Harness {
    pub dir: TempDir,
    pub clock: Arc<ManualClock>,
    pub state: Arc<RedirectState>,
}

impl Harness {
    /// Sunday 2024-06-02 09:00 local time
    pub fn new() -> Self {
        Self::at(local(2024, 6, 2, 9, 0, 0))
    }

    pub fn at(now: NaiveDateTime) -> Self {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::at_local(now));
        let state = Arc::new(
            RedirectState::load_with_clock(DocumentStore::new(dir.path()), clock.clone()).unwrap(),
        );
        Self { dir, clock, state }
    }

    /// Load a fresh state from the same documents, as after a restart
    #[allow(dead_code)]
    pub fn restart(&mut self) {
        self.state = Arc::new(
            RedirectState::load_with_clock(DocumentStore::new(self.dir.path()), self.clock.clone())
                .unwrap(),
        );
    }
}

/// A recorded remote call
#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub enum Call {
    Cue {
        cue_type: String,
        payload: Option<CuePayload>,
        event_id: String,
    },
    Event {
        event_id: String,
        start_time: Option<NaiveDateTime>,
    },
}

/// Publisher that records every call and fails while `failing` is set
#[derive(Default)]
pub struct RecordingPublisher {
    pub calls: Mutex<Vec<Call>>,
    pub failing: AtomicBool,
}

#[allow(dead_code)]
impl RecordingPublisher {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn event_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Event { .. }))
            .count()
    }

    fn outcome(&self, event_id: String) -> PublishOutcome {
        if self.failing.load(Ordering::SeqCst) {
            PublishOutcome::Failed {
                event_id,
                error: PublishError::Rejected {
                    status: 503,
                    body: "unavailable".to_string(),
                },
            }
        } else {
            PublishOutcome::Delivered {
                event_id,
                status: 201,
            }
        }
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish_cue(
        &self,
        _remote: &RemoteConfig,
        cue_type: &str,
        payload: Option<&CuePayload>,
        event_date: NaiveDate,
    ) -> PublishOutcome {
        let event_id = format_event_id(event_date);
        self.calls.lock().unwrap().push(Call::Cue {
            cue_type: cue_type.to_string(),
            payload: payload.cloned(),
            event_id: event_id.clone(),
        });
        self.outcome(event_id)
    }

    async fn create_event(
        &self,
        _remote: &RemoteConfig,
        event_id: &str,
        start_time: Option<NaiveDateTime>,
    ) -> PublishOutcome {
        self.calls.lock().unwrap().push(Call::Event {
            event_id: event_id.to_string(),
            start_time,
        });
        self.outcome(event_id.to_string())
    }

    async fn test_connection(&self, _remote: &RemoteConfig) -> Result<(), PublishError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(PublishError::Rejected {
                status: 401,
                body: String::new(),
            })
        } else {
            Ok(())
        }
    }
}
