//! Background event scheduler
//!
//! One task polls the configured recurring and manual events on a fixed
//! interval and asks the remote API to create each due event exactly once.
//!
//! # Overview
//!
//! - **Recurring events** (weekday + `HH:MM`) fire at most once per calendar
//!   day per configured time. An in-memory fired-set, cleared at midnight,
//!   dedups ticks within the minute; the durable `last_fired` marker on the
//!   event dedups across restarts.
//! - **Manual events** (date + `HH:MM`) fire once and are then flagged
//!   `created` in the configuration document.
//! - A failed remote call records nothing, so the next tick in the same
//!   minute tries again.
//!
//! The state lock is only taken to snapshot definitions and to record a
//! success. Remote calls run without it.
//!
//! # Modules
//!
//! - [`trigger`] - tick evaluation, fired-set and the polling task
//! - [`error`] - scheduler error types
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ez_redirect::scheduler::{EventScheduler, SchedulerConfig};
//!
//! let scheduler = Arc::new(EventScheduler::new(state, publisher, SchedulerConfig::default())?);
//! let handle = scheduler.spawn();
//! // ...
//! handle.stop().await?;
//! ```

pub mod error;
pub mod trigger;

pub use error::{SchedulerError, SchedulerResult};
pub use trigger::{
    EventScheduler, FiredSet, SchedulerConfig, SchedulerHandle, TickFailure, TickReport,
    DEFAULT_POLL_INTERVAL_SECS,
};
