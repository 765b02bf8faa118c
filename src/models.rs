// Core data structures for the redirect state documents

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::scheduler::error::{SchedulerError, SchedulerResult};

/// Fallback redirect target used when no document exists yet
pub const DEFAULT_URL: &str = "https://example.com";

/// Port the service listens on when none is configured
pub const DEFAULT_PORT: u16 = 8000;

/// Lowest port accepted by `set_port`
pub const MIN_PORT: u16 = 1024;

const TIME_FORMAT: &str = "%H:%M";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Day of week for recurring events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventDay {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl EventDay {
    /// All days, Sunday first
    pub const ALL: [EventDay; 7] = [
        Self::Sunday,
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
    ];

    /// Lowercase name as stored on disk
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sunday => "sunday",
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
        }
    }
}

impl From<Weekday> for EventDay {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Sun => Self::Sunday,
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
        }
    }
}

impl FromStr for EventDay {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == lowered)
            .ok_or_else(|| SchedulerError::invalid_day(s))
    }
}

impl fmt::Display for EventDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse an `HH:MM` time of day
pub fn parse_time(value: &str) -> SchedulerResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT)
        .map_err(|_| SchedulerError::invalid_time(value))
}

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_date(value: &str) -> SchedulerResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| SchedulerError::invalid_date(value))
}

/// Format a date the way event identifiers are written
pub fn format_event_id(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Weekly rule that creates a remote event every matching day/time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringEvent {
    /// Lowercase weekday name ("sunday".."saturday")
    pub day: String,

    /// Time of day in HH:MM
    pub time: String,

    /// Disabled events are skipped by the scheduler
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Dedup key ("YYYY-MM-DD HH:MM") of the last successful fire
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fired: Option<String>,
}

impl RecurringEvent {
    pub fn new(day: EventDay, time: impl Into<String>, enabled: bool) -> Self {
        Self {
            day: day.as_str().to_string(),
            time: time.into(),
            enabled,
            last_fired: None,
        }
    }

    pub fn weekday(&self) -> SchedulerResult<EventDay> {
        self.day.parse()
    }

    pub fn scheduled_time(&self) -> SchedulerResult<NaiveTime> {
        parse_time(&self.time)
    }

    /// Same rule, ignoring the fire marker
    pub fn same_rule(&self, other: &RecurringEvent) -> bool {
        self.day == other.day && self.time == other.time
    }
}

/// One-off dated event, created at most once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualEvent {
    /// Calendar date in YYYY-MM-DD
    pub date: String,

    /// Time of day in HH:MM
    pub time: String,

    /// Set once the remote event exists; never fires again afterwards
    #[serde(default)]
    pub created: bool,
}

impl ManualEvent {
    pub fn new(date: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            time: time.into(),
            created: false,
        }
    }

    pub fn scheduled_date(&self) -> SchedulerResult<NaiveDate> {
        parse_date(&self.date)
    }

    pub fn scheduled_time(&self) -> SchedulerResult<NaiveTime> {
        parse_time(&self.time)
    }
}

/// Announcement posted alongside a preset activation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CuePayload {
    pub headline: String,
    pub body_text: String,
    pub button_text: String,
    pub button_url: String,
}

/// Named, reusable redirect target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    /// Display name, original casing
    pub name: String,

    /// Redirect target
    pub url: String,

    /// Optional cue published on activation
    #[serde(default)]
    pub cue: Option<CuePayload>,
}

impl Preset {
    pub fn new(name: impl Into<String>, url: impl Into<String>, cue: Option<CuePayload>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            cue,
        }
    }
}

/// The persisted configuration document
///
/// Every field defaults individually so partially written or older documents
/// still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectConfig {
    pub default_url: String,
    pub current_url: String,

    /// Unix seconds; `None` means the current URL is permanent
    pub expires_at: Option<f64>,

    pub port: u16,
    pub api_key_enabled: bool,
    pub api_key: String,
    pub supabase_url: String,
    pub supabase_api_key: String,
    pub scheduled_events: Vec<RecurringEvent>,
    pub manual_events: Vec<ManualEvent>,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            default_url: DEFAULT_URL.to_string(),
            current_url: DEFAULT_URL.to_string(),
            expires_at: None,
            port: DEFAULT_PORT,
            api_key_enabled: false,
            api_key: String::new(),
            supabase_url: String::new(),
            supabase_api_key: String::new(),
            scheduled_events: Vec::new(),
            manual_events: Vec::new(),
        }
    }
}

impl RedirectConfig {
    /// Repair values that would break invariants after a lenient load
    ///
    /// Returns true when anything was changed.
    pub fn normalize(&mut self) -> bool {
        let mut changed = false;
        if self.default_url.trim().is_empty() {
            self.default_url = DEFAULT_URL.to_string();
            changed = true;
        }
        if self.current_url.trim().is_empty() {
            self.current_url = self.default_url.clone();
            self.expires_at = None;
            changed = true;
        }
        if self.port < MIN_PORT {
            self.port = DEFAULT_PORT;
            changed = true;
        }
        changed
    }

    /// Snapshot of the remote endpoint credentials
    pub fn remote(&self) -> RemoteConfig {
        RemoteConfig {
            url: self.supabase_url.clone(),
            api_key: self.supabase_api_key.clone(),
        }
    }
}

/// Remote cue/event API credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub url: String,
    pub api_key: String,
}

impl RemoteConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    /// Both the URL and the key are required
    pub fn is_configured(&self) -> bool {
        !self.url.trim().is_empty() && !self.api_key.trim().is_empty()
    }

    /// REST root (`{url}/rest/v1`)
    pub fn rest_base(&self) -> String {
        format!("{}/rest/v1", self.url.trim().trim_end_matches('/'))
    }

    /// Key shortened for display
    pub fn masked_key(&self) -> String {
        if self.api_key.is_empty() {
            return String::new();
        }
        let prefix: String = self.api_key.chars().take(10).collect();
        format!("{prefix}...")
    }
}

/// Snapshot of the redirect target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RedirectInfo {
    pub current_url: String,
    pub default_url: String,
    pub expires_at: Option<f64>,
    pub is_temporary: bool,
}

/// Security gate status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityInfo {
    pub api_key_enabled: bool,
    pub api_key: String,
}

fn default_true() -> bool {
    true
}
