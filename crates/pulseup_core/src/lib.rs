//! Core domain logic for PulseUp.
//! This crate is the single source of truth for reminder and mood invariants.

pub mod clock;
pub mod db;
pub mod logging;
pub mod model;
pub mod prefs;
pub mod service;
pub mod task;

pub use clock::{Clock, FixedClock, SystemClock};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::mood::{MonthKey, MoodDate, MoodMap, MoodMonthSummary, MOOD_PREFS_SCOPE};
pub use model::reminder::{
    format_reminder_time, initial_delay_minutes, next_reminder_candidate, ReminderNotification,
    ReminderPreset, ReminderSettings, ReminderTime, HYDRATION_PREFS_SCOPE, REMINDER_TASK_NAME,
};
pub use prefs::{
    InMemoryPrefs, KeyValueStore, KvError, KvResult, PrefValue, PrefsEdit, SqlitePrefs,
};
pub use service::mood_service::MoodStore;
pub use service::reminder_service::{ReminderError, ReminderResult, ReminderScheduler};
pub use task::{
    ExistingTaskPolicy, InMemoryTaskScheduler, PeriodicTaskRequest, SqliteTaskRegistry,
    TaskError, TaskRegistration, TaskScheduler,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
