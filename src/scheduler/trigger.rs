//! Tick evaluation and the polling task

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::error::{SchedulerError, SchedulerResult};
use crate::cue::EventPublisher;
use crate::models::{format_event_id, EventDay, ManualEvent, RecurringEvent, RemoteConfig};
use crate::state::RedirectState;

/// Poll interval used when none is configured
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

// ============================================================================
// Configuration
// ============================================================================

/// Scheduler settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Run the background task at all
    pub enabled: bool,

    /// Seconds between two ticks
    pub poll_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

impl SchedulerConfig {
    /// Validate the configuration
    ///
    /// The interval must be positive and short enough that every minute
    /// gets at least one tick.
    pub fn validate(&self) -> SchedulerResult<()> {
        if self.poll_interval_secs == 0 {
            return Err(SchedulerError::config(
                "poll_interval_secs",
                "must be greater than 0",
            ));
        }
        if self.poll_interval_secs > 60 {
            return Err(SchedulerError::config(
                "poll_interval_secs",
                format!(
                    "{} would skip minutes; use at most 60",
                    self.poll_interval_secs
                ),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

// ============================================================================
// Fired set
// ============================================================================

/// Dedup keys of events fired today
///
/// Cleared when the local date changes.
#[derive(Debug, Default)]
pub struct FiredSet {
    date: Option<NaiveDate>,
    keys: HashSet<String>,
}

impl FiredSet {
    /// Forget yesterday's keys when `today` is a new date
    pub fn roll_over(&mut self, today: NaiveDate) {
        if self.date != Some(today) {
            if !self.keys.is_empty() {
                tracing::debug!(cleared = self.keys.len(), %today, "Clearing fired events");
            }
            self.keys.clear();
            self.date = Some(today);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn insert(&mut self, key: impl Into<String>) {
        self.keys.insert(key.into());
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn recurring_key(date: NaiveDate, time: NaiveTime) -> String {
    format!("{} {}", format_event_id(date), time.format("%H:%M"))
}

/// `occurrence` tells apart identical definitions (0 for the first one)
fn manual_key(date: NaiveDate, time: NaiveTime, occurrence: usize) -> String {
    format!("manual {} #{occurrence}", recurring_key(date, time))
}

fn same_minute(a: NaiveTime, b: NaiveTime) -> bool {
    a.hour() == b.hour() && a.minute() == b.minute()
}

// ============================================================================
// Tick report
// ============================================================================

/// Why an event could not be evaluated or created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickFailure {
    /// Human readable event description
    pub event: String,
    pub reason: String,
}

/// What a single tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Dedup keys of recurring events created this tick
    pub recurring_fired: Vec<String>,

    /// Manual events created this tick
    pub manual_fired: Vec<ManualEvent>,

    pub failures: Vec<TickFailure>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.recurring_fired.is_empty() && self.manual_fired.is_empty() && self.failures.is_empty()
    }

    fn fail(&mut self, event: impl Into<String>, reason: impl ToString) {
        let failure = TickFailure {
            event: event.into(),
            reason: reason.to_string(),
        };
        tracing::warn!(event = %failure.event, reason = %failure.reason, "Scheduled event failed");
        self.failures.push(failure);
    }
}

// ============================================================================
// Scheduler
// ============================================================================

/// Evaluates event definitions against the clock
pub struct EventScheduler {
    state: Arc<RedirectState>,
    publisher: Arc<dyn EventPublisher>,
    config: SchedulerConfig,
    fired: Mutex<FiredSet>,
}

impl EventScheduler {
    pub fn new(
        state: Arc<RedirectState>,
        publisher: Arc<dyn EventPublisher>,
        config: SchedulerConfig,
    ) -> SchedulerResult<Self> {
        config.validate()?;
        Ok(Self {
            state,
            publisher,
            config,
            fired: Mutex::new(FiredSet::default()),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    fn fired(&self) -> std::sync::MutexGuard<'_, FiredSet> {
        self.fired.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Evaluate one tick at the state clock's local time
    pub async fn tick(&self) -> TickReport {
        let now = self.state.clock().local_now();
        self.tick_at(now).await
    }

    /// Evaluate one tick at an explicit local wall-clock time
    pub async fn tick_at(&self, now: NaiveDateTime) -> TickReport {
        let today = now.date();
        self.fired().roll_over(today);

        let snapshot = self.state.schedule_snapshot();
        let mut report = TickReport::default();

        for (index, event) in snapshot.recurring.iter().enumerate() {
            self.check_recurring(index, event, now, &snapshot.remote, &mut report)
                .await;
        }
        for (index, event) in snapshot.manual.iter().enumerate() {
            let occurrence = snapshot.manual[..index]
                .iter()
                .filter(|e| e.date == event.date && e.time == event.time)
                .count();
            self.check_manual(index, occurrence, event, now, &snapshot.remote, &mut report)
                .await;
        }

        report
    }

    async fn check_recurring(
        &self,
        index: usize,
        event: &RecurringEvent,
        now: NaiveDateTime,
        remote: &RemoteConfig,
        report: &mut TickReport,
    ) {
        if !event.enabled {
            return;
        }
        let label = format!("{} {}", event.day, event.time);

        let day = match event.weekday() {
            Ok(day) => day,
            Err(e) => return report.fail(label, e),
        };
        let time = match event.scheduled_time() {
            Ok(time) => time,
            Err(e) => return report.fail(label, e),
        };
        if day != EventDay::from(now.weekday()) || !same_minute(time, now.time()) {
            return;
        }

        let today = now.date();
        let key = recurring_key(today, time);
        if self.fired().contains(&key) || event.last_fired.as_deref() == Some(key.as_str()) {
            return;
        }

        tracing::info!(event = %label, key = %key, "Recurring event due");
        let outcome = self
            .publisher
            .create_event(remote, &format_event_id(today), Some(today.and_time(time)))
            .await;
        if let Err(e) = outcome.into_result() {
            return report.fail(label, e);
        }

        self.fired().insert(key.clone());
        if let Err(e) = self.state.record_recurring_fired(index, event, &key) {
            report.fail(label, e);
        }
        report.recurring_fired.push(key);
    }

    async fn check_manual(
        &self,
        index: usize,
        occurrence: usize,
        event: &ManualEvent,
        now: NaiveDateTime,
        remote: &RemoteConfig,
        report: &mut TickReport,
    ) {
        if event.created {
            return;
        }
        let label = format!("{} {}", event.date, event.time);

        let date = match event.scheduled_date() {
            Ok(date) => date,
            Err(e) => return report.fail(label, e),
        };
        let time = match event.scheduled_time() {
            Ok(time) => time,
            Err(e) => return report.fail(label, e),
        };
        if date != now.date() || !same_minute(time, now.time()) {
            return;
        }

        let key = manual_key(date, time, occurrence);
        if self.fired().contains(&key) {
            return;
        }

        tracing::info!(event = %label, "Manual event due");
        let outcome = self
            .publisher
            .create_event(remote, &format_event_id(date), Some(date.and_time(time)))
            .await;
        if let Err(e) = outcome.into_result() {
            return report.fail(label, e);
        }

        self.fired().insert(key);
        if let Err(e) = self.state.mark_manual_created(index, event) {
            report.fail(label, e);
        }
        report.manual_fired.push(event.clone());
    }

    /// Start the polling task
    pub fn spawn(self: Arc<Self>) -> SchedulerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let interval = self.config.poll_interval();

        let task = tokio::spawn(async move {
            tracing::info!(interval_secs = interval.as_secs(), "Event scheduler started");

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = self.tick().await;
                        if !report.is_empty() {
                            tracing::info!(
                                recurring = report.recurring_fired.len(),
                                manual = report.manual_fired.len(),
                                failures = report.failures.len(),
                                "Scheduler tick finished"
                            );
                        }
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::info!("Event scheduler stopped");
        });

        SchedulerHandle { stop_tx, task }
    }
}

/// Handle to the running polling task
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Signal the task and wait for it to finish
    pub async fn stop(self) -> SchedulerResult<()> {
        let _ = self.stop_tx.send(true);
        self.task.await.map_err(|e| SchedulerError::TaskFailed {
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::cue::{PublishError, PublishOutcome};
    use crate::models::CuePayload;
    use crate::storage::DocumentStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    /// Records create_event calls; fails while `failing` is set
    #[derive(Default)]
    struct FakePublisher {
        calls: Mutex<Vec<(String, Option<NaiveDateTime>)>>,
        failing: AtomicBool,
    }

    impl FakePublisher {
        fn calls(&self) -> Vec<(String, Option<NaiveDateTime>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl EventPublisher for FakePublisher {
        async fn publish_cue(
            &self,
            _remote: &RemoteConfig,
            _cue_type: &str,
            _payload: Option<&CuePayload>,
            event_date: NaiveDate,
        ) -> PublishOutcome {
            PublishOutcome::Delivered {
                event_id: format_event_id(event_date),
                status: 201,
            }
        }

        async fn create_event(
            &self,
            _remote: &RemoteConfig,
            event_id: &str,
            start_time: Option<NaiveDateTime>,
        ) -> PublishOutcome {
            self.calls
                .lock()
                .unwrap()
                .push((event_id.to_string(), start_time));
            if self.failing.load(Ordering::SeqCst) {
                PublishOutcome::Failed {
                    event_id: event_id.to_string(),
                    error: PublishError::Transport("connection refused".to_string()),
                }
            } else {
                PublishOutcome::Delivered {
                    event_id: event_id.to_string(),
                    status: 200,
                }
            }
        }

        async fn test_connection(&self, _remote: &RemoteConfig) -> Result<(), PublishError> {
            Ok(())
        }
    }

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn setup() -> (TempDir, Arc<RedirectState>, Arc<FakePublisher>, EventScheduler) {
        let dir = TempDir::new().unwrap();
        let clock = Arc::new(ManualClock::at_local(at("2024-06-02", "09:00:00")));
        let state = Arc::new(
            RedirectState::load_with_clock(DocumentStore::new(dir.path()), clock).unwrap(),
        );
        let publisher = Arc::new(FakePublisher::default());
        let scheduler =
            EventScheduler::new(state.clone(), publisher.clone(), SchedulerConfig::default())
                .unwrap();
        (dir, state, publisher, scheduler)
    }

    #[test]
    fn test_config_validation() {
        assert!(SchedulerConfig::default().validate().is_ok());
        let zero = SchedulerConfig {
            poll_interval_secs: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());
        let slow = SchedulerConfig {
            poll_interval_secs: 120,
            ..Default::default()
        };
        assert!(slow.validate().is_err());
    }

    #[test]
    fn test_fired_set_rolls_over() {
        let mut fired = FiredSet::default();
        let day1 = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        fired.roll_over(day1);
        fired.insert("2024-06-02 10:45");
        fired.roll_over(day1);
        assert!(fired.contains("2024-06-02 10:45"));

        fired.roll_over(day1.succ_opt().unwrap());
        assert!(fired.is_empty());
    }

    #[tokio::test]
    async fn test_recurring_fires_once_per_minute() {
        // 2024-06-02 is a Sunday
        let (_dir, state, publisher, scheduler) = setup();
        state.add_scheduled_event("sunday", "10:45", true).unwrap();

        assert!(scheduler.tick_at(at("2024-06-02", "10:44:50")).await.is_empty());

        let report = scheduler.tick_at(at("2024-06-02", "10:45:10")).await;
        assert_eq!(report.recurring_fired, vec!["2024-06-02 10:45".to_string()]);
        let report = scheduler.tick_at(at("2024-06-02", "10:45:40")).await;
        assert!(report.is_empty());

        let calls = publisher.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "2024-06-02");
        assert_eq!(calls[0].1, Some(at("2024-06-02", "10:45:00")));
        assert_eq!(
            state.scheduled_events()[0].last_fired.as_deref(),
            Some("2024-06-02 10:45")
        );
    }

    #[tokio::test]
    async fn test_recurring_skips_wrong_day_and_disabled() {
        let (_dir, state, publisher, scheduler) = setup();
        state.add_scheduled_event("monday", "10:45", true).unwrap();
        state.add_scheduled_event("sunday", "10:45", false).unwrap();

        let report = scheduler.tick_at(at("2024-06-02", "10:45:00")).await;
        assert!(report.is_empty());
        assert!(publisher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_recurring_failure_retried_next_tick() {
        let (_dir, state, publisher, scheduler) = setup();
        state.add_scheduled_event("sunday", "10:45", true).unwrap();

        publisher.failing.store(true, Ordering::SeqCst);
        let report = scheduler.tick_at(at("2024-06-02", "10:45:05")).await;
        assert!(report.recurring_fired.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert!(state.scheduled_events()[0].last_fired.is_none());

        publisher.failing.store(false, Ordering::SeqCst);
        let report = scheduler.tick_at(at("2024-06-02", "10:45:35")).await;
        assert_eq!(report.recurring_fired.len(), 1);
        assert_eq!(publisher.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_recurring_fires_again_next_week() {
        let (_dir, state, publisher, scheduler) = setup();
        state.add_scheduled_event("sunday", "10:45", true).unwrap();

        scheduler.tick_at(at("2024-06-02", "10:45:00")).await;
        scheduler.tick_at(at("2024-06-09", "10:45:00")).await;
        assert_eq!(publisher.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_manual_fires_once() {
        let (_dir, state, publisher, scheduler) = setup();
        state.add_manual_event("2024-06-02", "18:00").unwrap();

        for second in ["18:00:00", "18:00:30", "18:00:59"] {
            scheduler.tick_at(at("2024-06-02", second)).await;
        }
        assert_eq!(publisher.calls().len(), 1);
        assert!(state.manual_events()[0].created);

        // Another day at the same time is not a match
        scheduler.tick_at(at("2024-06-03", "18:00:00")).await;
        assert_eq!(publisher.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_identical_manual_events_each_fire() {
        let (_dir, state, publisher, scheduler) = setup();
        state.add_manual_event("2024-06-02", "18:00").unwrap();
        state.add_manual_event("2024-06-02", "18:00").unwrap();

        let report = scheduler.tick_at(at("2024-06-02", "18:00:00")).await;
        assert_eq!(report.manual_fired.len(), 2);
        scheduler.tick_at(at("2024-06-02", "18:00:30")).await;

        assert_eq!(publisher.calls().len(), 2);
        assert!(state.manual_events().iter().all(|e| e.created));
    }

    #[tokio::test]
    async fn test_bad_definition_reported_not_fatal() {
        let (_dir, state, publisher, _scheduler) = setup();
        state.add_manual_event("2024-06-02", "18:00").unwrap();

        // Simulate a hand-edited document with a broken time
        let mut config = state.config_snapshot();
        config.scheduled_events.push(RecurringEvent {
            day: "sunday".to_string(),
            time: "quarter past".to_string(),
            enabled: true,
            last_fired: None,
        });
        state.store().save_config(&config).unwrap();
        let reloaded = Arc::new(
            RedirectState::load_with_clock(state.store().clone(), state.clock().clone()).unwrap(),
        );
        let scheduler2 =
            EventScheduler::new(reloaded, publisher.clone(), SchedulerConfig::default()).unwrap();

        let report = scheduler2.tick_at(at("2024-06-02", "18:00:00")).await;
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.manual_fired.len(), 1);
    }

    #[tokio::test]
    async fn test_spawn_and_stop() {
        let (_dir, _state, _publisher, scheduler) = setup();
        let handle = Arc::new(scheduler).spawn();
        assert!(handle.is_running());
        handle.stop().await.unwrap();
    }
}
