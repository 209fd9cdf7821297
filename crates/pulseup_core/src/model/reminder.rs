//! Hydration reminder settings and schedule arithmetic.
//!
//! # Responsibility
//! - Name the persisted `hydration_prefs` keys and their defaults.
//! - Provide the pure time math behind scheduling and display text.
//!
//! # Invariants
//! - `interval_hours >= 1`; `start_hour`, `end_hour` and override hours are in
//!   `0..=23`; override minutes are in `0..=59`.
//! - Hour math ignores minutes when computing the first-run delay.
//! - No ordering between start and end hour is enforced. An end hour below
//!   the start hour is kept and the next-time snap only fires when a
//!   candidate hour is numerically greater than the end hour.

use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const HYDRATION_PREFS_SCOPE: &str = "hydration_prefs";

pub const KEY_ENABLED: &str = "enabled";
pub const KEY_INTERVAL_HOURS: &str = "interval_hours";
pub const KEY_START_HOUR: &str = "start_hour";
pub const KEY_END_HOUR: &str = "end_hour";
pub const KEY_LAST_SCHEDULED_AT: &str = "last_scheduled_at";
pub const KEY_NEXT_HOUR: &str = "next_hour";
pub const KEY_NEXT_MINUTE: &str = "next_minute";

/// Unique name of the recurring reminder registration.
pub const REMINDER_TASK_NAME: &str = "hydration_reminder_work";
/// Host callback the registration should invoke.
pub const REMINDER_CALLBACK_ID: &str = "hydration_reminder";

pub const DEFAULT_INTERVAL_HOURS: i32 = 2;
pub const DEFAULT_START_HOUR: i32 = 8;
pub const DEFAULT_END_HOUR: i32 = 22;
/// Stored in override keys when no override exists.
pub const NO_OVERRIDE: i32 = -1;

pub const REMINDERS_OFF_TEXT: &str = "Reminders off";

/// Clamps an interval to at least one hour.
pub fn clamp_interval_hours(hours: i32) -> i32 {
    hours.max(1)
}

/// Clamps an hour-of-day to `0..=23`.
pub fn clamp_hour(hour: i32) -> i32 {
    hour.clamp(0, 23)
}

/// Clamps a minute-of-hour to `0..=59`.
pub fn clamp_minute(minute: i32) -> i32 {
    minute.clamp(0, 59)
}

/// Hour and minute of day, always in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReminderTime {
    hour: u32,
    minute: u32,
}

impl ReminderTime {
    /// Builds a time, clamping both components into range.
    pub fn clamped(hour: i32, minute: i32) -> Self {
        Self {
            hour: clamp_hour(hour).unsigned_abs(),
            minute: clamp_minute(minute).unsigned_abs(),
        }
    }

    /// Reads a stored override pair. Any out-of-range component means "unset".
    pub fn from_stored(hour: i32, minute: i32) -> Option<Self> {
        if (0..=23).contains(&hour) && (0..=59).contains(&minute) {
            Some(Self::clamped(hour, minute))
        } else {
            None
        }
    }

    /// Hour and minute of a wall-clock instant.
    pub fn from_datetime(at: NaiveDateTime) -> Self {
        Self {
            hour: at.hour(),
            minute: at.minute(),
        }
    }

    pub fn hour(self) -> u32 {
        self.hour
    }

    pub fn minute(self) -> u32 {
        self.minute
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or_default()
    }
}

impl Display for ReminderTime {
    /// 12-hour clock, e.g. `1:05 PM`, `12:00 AM`.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let meridiem = if self.hour >= 12 { "PM" } else { "AM" };
        let display_hour = (self.hour + 11) % 12 + 1;
        write!(f, "{display_hour}:{:02} {meridiem}", self.minute)
    }
}

/// Snapshot of every persisted reminder setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSettings {
    pub enabled: bool,
    pub interval_hours: u32,
    pub start_hour: u32,
    pub end_hour: u32,
    /// Epoch milliseconds of the last registration; `None` if never scheduled.
    pub last_scheduled_at_ms: Option<i64>,
    pub next_override: Option<ReminderTime>,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_hours: DEFAULT_INTERVAL_HOURS.unsigned_abs(),
            start_hour: DEFAULT_START_HOUR.unsigned_abs(),
            end_hour: DEFAULT_END_HOUR.unsigned_abs(),
            last_scheduled_at_ms: None,
            next_override: None,
        }
    }
}

/// Quick-setup frequencies offered when creating a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderPreset {
    /// Window collapses to the chosen hour, hourly interval.
    Once,
    /// Until 22:00, every 2 hours.
    Daily,
    /// Until 20:00, every 3 hours.
    Custom,
}

impl ReminderPreset {
    /// Returns `(end_hour, interval_hours)` for a window starting at `start_hour`.
    pub fn window(self, start_hour: i32) -> (i32, i32) {
        match self {
            Self::Once => (start_hour, 1),
            Self::Daily => (22, 2),
            Self::Custom => (20, 3),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "once" => Some(Self::Once),
            "daily" => Some(Self::Daily),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// Content a host shows when the reminder callback fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderNotification {
    pub channel_id: &'static str,
    pub channel_name: &'static str,
    pub channel_description: &'static str,
    pub notification_id: i32,
    pub title: &'static str,
    pub body: &'static str,
}

pub const HYDRATION_NOTIFICATION: ReminderNotification = ReminderNotification {
    channel_id: "hydration_reminders",
    channel_name: "Hydration Reminders",
    channel_description: "Reminds you to stay hydrated",
    notification_id: 1001,
    title: "Stay Hydrated! 💧",
    body: "Time for your water break. Your body will thank you!",
};

/// Minutes from the top of `current_hour` until the next `start_hour:00`.
///
/// Returns a whole number of hours in minutes. When `current_hour` is at or
/// past `start_hour` the delay wraps to tomorrow.
pub fn initial_delay_minutes(current_hour: u32, start_hour: u32) -> i64 {
    let current = i64::from(current_hour);
    let start = i64::from(start_hour);
    let delay_hours = if current < start {
        start - current
    } else {
        24 - current + start
    };
    delay_hours * 60
}

/// Computed next reminder time when no override is set.
///
/// Starts from `now + interval_hours`. Before the window opens it snaps to
/// `start_hour:00` today. A candidate whose hour is past `end_hour` snaps to
/// `start_hour:00` on the day after `now`.
pub fn next_reminder_candidate(
    now: NaiveDateTime,
    interval_hours: u32,
    start_hour: u32,
    end_hour: u32,
) -> NaiveDateTime {
    let window_open = NaiveTime::from_hms_opt(start_hour, 0, 0).unwrap_or_default();

    let mut candidate = now + Duration::hours(i64::from(interval_hours));
    if now.hour() < start_hour {
        candidate = now.date().and_time(window_open);
    }
    if candidate.hour() > end_hour {
        candidate = (now.date() + Duration::days(1)).and_time(window_open);
    }
    candidate
}

/// Renders `Next reminder: H:MM AM/PM`.
pub fn next_reminder_text(time: ReminderTime) -> String {
    format!("Next reminder: {time}")
}

/// Formats an hour and minute as 12-hour display text.
pub fn format_reminder_time(hour: u32, minute: u32) -> String {
    ReminderTime {
        hour: hour.min(23),
        minute: minute.min(59),
    }
    .to_string()
}
