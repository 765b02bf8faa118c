//! Recurring and manual event definitions
//!
//! Definitions are validated and canonicalized on write (lowercase day,
//! zero-padded `HH:MM`, `YYYY-MM-DD`). The scheduler reads them through
//! [`RedirectState::schedule_snapshot`] and records successful fires through
//! the `record_*`/`mark_*` hooks, which re-locate the event by value so an
//! edit made while a remote call was in flight is never clobbered.

use super::RedirectState;
use crate::error::{Error, Result};
use crate::models::{
    format_event_id, parse_date, parse_time, EventDay, ManualEvent, RecurringEvent, RemoteConfig,
};

/// Everything the scheduler needs for one tick, copied out of the lock
#[derive(Debug, Clone, Default)]
pub struct ScheduleSnapshot {
    pub recurring: Vec<RecurringEvent>,
    pub manual: Vec<ManualEvent>,
    pub remote: RemoteConfig,
}

fn canonical_recurring(day: &str, time: &str, enabled: bool) -> Result<RecurringEvent> {
    if day.trim().is_empty() {
        return Err(Error::missing("day"));
    }
    if time.trim().is_empty() {
        return Err(Error::missing("time"));
    }
    let day = day.parse::<EventDay>().map_err(|e| Error::validation(e.to_string()))?;
    let time = parse_time(time).map_err(|e| Error::validation(e.to_string()))?;
    Ok(RecurringEvent::new(
        day,
        time.format("%H:%M").to_string(),
        enabled,
    ))
}

fn canonical_manual(date: &str, time: &str) -> Result<ManualEvent> {
    if date.trim().is_empty() {
        return Err(Error::missing("date"));
    }
    if time.trim().is_empty() {
        return Err(Error::missing("time"));
    }
    let date = parse_date(date).map_err(|e| Error::validation(e.to_string()))?;
    let time = parse_time(time).map_err(|e| Error::validation(e.to_string()))?;
    Ok(ManualEvent::new(
        format_event_id(date),
        time.format("%H:%M").to_string(),
    ))
}

impl RedirectState {
    pub fn scheduled_events(&self) -> Vec<RecurringEvent> {
        self.lock().config.scheduled_events.clone()
    }

    pub fn add_scheduled_event(&self, day: &str, time: &str, enabled: bool) -> Result<RecurringEvent> {
        let event = canonical_recurring(day, time, enabled)?;

        let mut inner = self.lock();
        let mut draft = inner.config.clone();
        draft.scheduled_events.push(event.clone());
        self.commit_config(&mut inner, draft)?;

        tracing::info!(day = %event.day, time = %event.time, enabled, "Scheduled event added");
        Ok(event)
    }

    /// Replace the recurring event at `index`
    ///
    /// The fire marker survives only when day and time are unchanged.
    pub fn update_scheduled_event(
        &self,
        index: usize,
        day: &str,
        time: &str,
        enabled: bool,
    ) -> Result<RecurringEvent> {
        let mut event = canonical_recurring(day, time, enabled)?;

        let mut inner = self.lock();
        let Some(existing) = inner.config.scheduled_events.get(index) else {
            return Err(Error::event_not_found("Scheduled event", index));
        };
        if existing.same_rule(&event) {
            event.last_fired = existing.last_fired.clone();
        }

        let mut draft = inner.config.clone();
        draft.scheduled_events[index] = event.clone();
        self.commit_config(&mut inner, draft)?;

        tracing::info!(index, day = %event.day, time = %event.time, enabled, "Scheduled event updated");
        Ok(event)
    }

    pub fn remove_scheduled_event(&self, index: usize) -> Result<RecurringEvent> {
        let mut inner = self.lock();
        if index >= inner.config.scheduled_events.len() {
            return Err(Error::event_not_found("Scheduled event", index));
        }

        let mut draft = inner.config.clone();
        let removed = draft.scheduled_events.remove(index);
        self.commit_config(&mut inner, draft)?;

        tracing::info!(index, day = %removed.day, time = %removed.time, "Scheduled event removed");
        Ok(removed)
    }

    pub fn manual_events(&self) -> Vec<ManualEvent> {
        self.lock().config.manual_events.clone()
    }

    pub fn add_manual_event(&self, date: &str, time: &str) -> Result<ManualEvent> {
        let event = canonical_manual(date, time)?;

        let mut inner = self.lock();
        let mut draft = inner.config.clone();
        draft.manual_events.push(event.clone());
        self.commit_config(&mut inner, draft)?;

        tracing::info!(date = %event.date, time = %event.time, "Manual event added");
        Ok(event)
    }

    pub fn remove_manual_event(&self, index: usize) -> Result<ManualEvent> {
        let mut inner = self.lock();
        if index >= inner.config.manual_events.len() {
            return Err(Error::event_not_found("Manual event", index));
        }

        let mut draft = inner.config.clone();
        let removed = draft.manual_events.remove(index);
        self.commit_config(&mut inner, draft)?;

        tracing::info!(index, date = %removed.date, time = %removed.time, "Manual event removed");
        Ok(removed)
    }

    /// Copy event definitions and credentials for one scheduler tick
    pub fn schedule_snapshot(&self) -> ScheduleSnapshot {
        let inner = self.lock();
        ScheduleSnapshot {
            recurring: inner.config.scheduled_events.clone(),
            manual: inner.config.manual_events.clone(),
            remote: inner.config.remote(),
        }
    }

    /// Flag a manual event as created
    ///
    /// `index` is a hint from the snapshot; if the list changed meanwhile the
    /// first pending event with the same date and time is used. Returns false
    /// when no such event remains.
    pub fn mark_manual_created(&self, index: usize, fired: &ManualEvent) -> Result<bool> {
        let mut inner = self.lock();
        let matches = |e: &ManualEvent| !e.created && e.date == fired.date && e.time == fired.time;
        let events = &inner.config.manual_events;
        let target = match events.get(index) {
            Some(e) if matches(e) => Some(index),
            _ => events.iter().position(|e| matches(e)),
        };
        let Some(target) = target else {
            return Ok(false);
        };

        let mut draft = inner.config.clone();
        draft.manual_events[target].created = true;
        self.commit_config(&mut inner, draft)?;
        Ok(true)
    }

    /// Persist the dedup key of a successful recurring fire
    ///
    /// Located like [`Self::mark_manual_created`]. Returns false when the
    /// event was removed or edited in the meantime.
    pub fn record_recurring_fired(
        &self,
        index: usize,
        fired: &RecurringEvent,
        key: &str,
    ) -> Result<bool> {
        let mut inner = self.lock();
        let events = &inner.config.scheduled_events;
        let target = match events.get(index) {
            Some(e) if e.same_rule(fired) => Some(index),
            _ => events.iter().position(|e| e.same_rule(fired)),
        };
        let Some(target) = target else {
            return Ok(false);
        };

        let mut draft = inner.config.clone();
        draft.scheduled_events[target].last_fired = Some(key.to_string());
        self.commit_config(&mut inner, draft)?;
        Ok(true)
    }
}
