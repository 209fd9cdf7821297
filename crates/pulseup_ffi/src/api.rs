//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose hydration reminder and mood log use cases to Dart via FRB.
//! - Hand the host the task registration it must mirror into the OS scheduler.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Failures come back inside response envelopes, never as panics.
//! - Every call opens its own connection to the resolved database file.

use pulseup_core::db::open_db;
use pulseup_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    MoodStore, ReminderPreset, ReminderResult, ReminderScheduler, SqlitePrefs,
    SqliteTaskRegistry, TaskRegistration, HYDRATION_PREFS_SCOPE, MOOD_PREFS_SCOPE,
};
use std::path::PathBuf;
use std::sync::OnceLock;

const PREFS_DB_FILE_NAME: &str = "pulseup_prefs.sqlite3";
static PREFS_DB_PATH: OnceLock<PathBuf> = OnceLock::new();

type SqliteReminders<'conn> = ReminderScheduler<SqlitePrefs<'conn>, SqliteTaskRegistry<'conn>>;

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl ActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }

    fn from_result(op: &str, result: Result<(), String>, message: &str) -> Self {
        match result {
            Ok(()) => Self::success(message),
            Err(err) => Self::failure(format!("{op} failed: {err}")),
        }
    }
}

/// Hydration reminder settings as shown on the settings screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HydrationSettingsResponse {
    pub ok: bool,
    pub enabled: bool,
    pub interval_hours: u32,
    pub start_hour: u32,
    pub end_hour: u32,
    /// Epoch milliseconds of the last registration.
    pub last_scheduled_at_ms: Option<i64>,
    /// `"Next reminder: H:MM AM/PM"` or `"Reminders off"`.
    pub next_reminder_text: String,
    pub message: String,
}

/// Periodic task the host must mirror into its OS job scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRegistrationItem {
    pub registration_id: String,
    pub name: String,
    pub callback_id: String,
    pub period_minutes: u64,
    pub initial_delay_minutes: u64,
    pub requires_network: bool,
    pub tags: Vec<String>,
    pub registered_at_ms: i64,
}

/// Registration lookup envelope. `item` is `None` while reminders are off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRegistrationResponse {
    pub ok: bool,
    pub item: Option<TaskRegistrationItem>,
    pub message: String,
}

/// Notification content the host shows when the reminder fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HydrationNotificationItem {
    pub channel_id: String,
    pub channel_name: String,
    pub channel_description: String,
    pub notification_id: i32,
    pub title: String,
    pub body: String,
}

/// One logged day of a month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoodEntryItem {
    pub day: u32,
    pub label: String,
}

/// Per-month mood summary for the share sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoodSummaryResponse {
    pub days_tracked: u32,
    /// Labels in day order.
    pub labels: Vec<String>,
    pub dominant_label: Option<String>,
}

/// Whether hydration reminders are enabled.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics; storage failures read as `false`.
#[flutter_rust_bridge::frb(sync)]
pub fn hydration_is_enabled() -> bool {
    with_reminders(|reminders| reminders.is_enabled()).unwrap_or(false)
}

/// Turns reminders on (registering the periodic task) or off (cancelling it).
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Idempotent; never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn hydration_set_enabled(enabled: bool) -> ActionResponse {
    let message = if enabled {
        "Reminders enabled."
    } else {
        "Reminders disabled."
    };
    ActionResponse::from_result(
        "hydration_set_enabled",
        with_reminders(|reminders| reminders.set_enabled(enabled)),
        message,
    )
}

/// Stores the reminder interval, raised to at least one hour.
#[flutter_rust_bridge::frb(sync)]
pub fn hydration_set_interval_hours(hours: i32) -> ActionResponse {
    ActionResponse::from_result(
        "hydration_set_interval_hours",
        with_reminders(|reminders| reminders.set_interval_hours(hours)),
        "Interval saved.",
    )
}

/// Stores the active window start hour, clamped to `0..=23`.
#[flutter_rust_bridge::frb(sync)]
pub fn hydration_set_start_hour(hour: i32) -> ActionResponse {
    ActionResponse::from_result(
        "hydration_set_start_hour",
        with_reminders(|reminders| reminders.set_start_hour(hour)),
        "Start hour saved.",
    )
}

/// Stores the active window end hour, clamped to `0..=23`.
#[flutter_rust_bridge::frb(sync)]
pub fn hydration_set_end_hour(hour: i32) -> ActionResponse {
    ActionResponse::from_result(
        "hydration_set_end_hour",
        with_reminders(|reminders| reminders.set_end_hour(hour)),
        "End hour saved.",
    )
}

/// Pins the displayed next reminder time until cleared.
#[flutter_rust_bridge::frb(sync)]
pub fn hydration_set_next_reminder_time(hour: i32, minute: i32) -> ActionResponse {
    ActionResponse::from_result(
        "hydration_set_next_reminder_time",
        with_reminders(|reminders| reminders.set_next_reminder_time(hour, minute)),
        "Next reminder time saved.",
    )
}

/// Drops the pinned next reminder time.
#[flutter_rust_bridge::frb(sync)]
pub fn hydration_clear_next_reminder_time() -> ActionResponse {
    ActionResponse::from_result(
        "hydration_clear_next_reminder_time",
        with_reminders(|reminders| reminders.clear_next_reminder_time()),
        "Next reminder time cleared.",
    )
}

/// Enables reminders with a named preset (`once|daily|custom`) starting at
/// `hour:minute`.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Unknown preset names fail without touching stored settings.
#[flutter_rust_bridge::frb(sync)]
pub fn hydration_apply_preset(preset: String, hour: i32, minute: i32) -> ActionResponse {
    let Some(preset) = ReminderPreset::parse(preset.trim()) else {
        return ActionResponse::failure(format!(
            "hydration_apply_preset failed: unknown preset `{}`; expected once|daily|custom",
            preset.trim()
        ));
    };
    ActionResponse::from_result(
        "hydration_apply_preset",
        with_reminders(|reminders| reminders.apply_preset(preset, hour, minute)),
        "Reminder created.",
    )
}

/// Current settings plus the next reminder text.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics; on failure `ok=false` with default values.
#[flutter_rust_bridge::frb(sync)]
pub fn hydration_settings() -> HydrationSettingsResponse {
    let result = with_reminders(|reminders| {
        Ok((reminders.snapshot()?, reminders.next_reminder_text()?))
    });
    match result {
        Ok((settings, text)) => HydrationSettingsResponse {
            ok: true,
            enabled: settings.enabled,
            interval_hours: settings.interval_hours,
            start_hour: settings.start_hour,
            end_hour: settings.end_hour,
            last_scheduled_at_ms: settings.last_scheduled_at_ms,
            next_reminder_text: text,
            message: String::new(),
        },
        Err(err) => {
            let defaults = pulseup_core::ReminderSettings::default();
            HydrationSettingsResponse {
                ok: false,
                enabled: defaults.enabled,
                interval_hours: defaults.interval_hours,
                start_hour: defaults.start_hour,
                end_hour: defaults.end_hour,
                last_scheduled_at_ms: None,
                next_reminder_text: String::new(),
                message: format!("hydration_settings failed: {err}"),
            }
        }
    }
}

/// `"Next reminder: H:MM AM/PM"`, or `"Reminders off"` while disabled.
///
/// # FFI contract
/// - Never panics; returns an empty string when storage is unreadable.
#[flutter_rust_bridge::frb(sync)]
pub fn hydration_next_reminder_text() -> String {
    with_reminders(|reminders| reminders.next_reminder_text()).unwrap_or_default()
}

/// Registration the host should mirror, if reminders are enabled.
#[flutter_rust_bridge::frb(sync)]
pub fn hydration_registration() -> TaskRegistrationResponse {
    match with_reminders(|reminders| reminders.active_registration()) {
        Ok(registration) => TaskRegistrationResponse {
            ok: true,
            item: registration.map(to_registration_item),
            message: String::new(),
        },
        Err(err) => TaskRegistrationResponse {
            ok: false,
            item: None,
            message: format!("hydration_registration failed: {err}"),
        },
    }
}

/// Channel and text for the hydration notification.
#[flutter_rust_bridge::frb(sync)]
pub fn hydration_notification() -> HydrationNotificationItem {
    let notification = pulseup_core::model::reminder::HYDRATION_NOTIFICATION;
    HydrationNotificationItem {
        channel_id: notification.channel_id.to_string(),
        channel_name: notification.channel_name.to_string(),
        channel_description: notification.channel_description.to_string(),
        notification_id: notification.notification_id,
        title: notification.title.to_string(),
        body: notification.body.to_string(),
    }
}

/// Sets one day's mood; `None` or empty clears it.
///
/// `month` is zero-based, as stored.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Storage failures are logged by core; only DB open failure is reported.
#[flutter_rust_bridge::frb(sync)]
pub fn mood_set(year: i32, month: u32, day: u32, label: Option<String>) -> ActionResponse {
    let cleared = label.as_deref().map_or(true, str::is_empty);
    let result = with_moods(|moods| moods.set_mood(year, month, day, label.as_deref()));
    let message = if cleared { "Mood cleared." } else { "Mood saved." };
    ActionResponse::from_result("mood_set", result, message)
}

/// One day's mood, if any.
#[flutter_rust_bridge::frb(sync)]
pub fn mood_get(year: i32, month: u32, day: u32) -> Option<String> {
    with_moods(|moods| moods.mood(year, month, day))
        .ok()
        .flatten()
}

/// Every logged day of the month, in day order.
#[flutter_rust_bridge::frb(sync)]
pub fn mood_load_month(month: u32, year: i32) -> Vec<MoodEntryItem> {
    with_moods(|moods| moods.load_moods(month, year))
        .map(|moods| {
            moods
                .into_iter()
                .map(|(day, label)| MoodEntryItem { day, label })
                .collect()
        })
        .unwrap_or_default()
}

/// Raw monthly blob, for diagnostics.
#[flutter_rust_bridge::frb(sync)]
pub fn mood_raw_json(month: u32, year: i32) -> Option<String> {
    with_moods(|moods| moods.raw_json(month, year)).ok().flatten()
}

/// Days tracked and labels for the share sheet.
#[flutter_rust_bridge::frb(sync)]
pub fn mood_month_summary(month: u32, year: i32) -> MoodSummaryResponse {
    match with_moods(|moods| moods.month_summary(month, year)) {
        Ok(summary) => MoodSummaryResponse {
            days_tracked: u32::try_from(summary.days_tracked).unwrap_or(u32::MAX),
            dominant_label: summary.dominant_label().map(str::to_string),
            labels: summary.labels,
        },
        Err(_) => MoodSummaryResponse {
            days_tracked: 0,
            labels: Vec::new(),
            dominant_label: None,
        },
    }
}

fn resolve_prefs_db_path() -> PathBuf {
    PREFS_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var("PULSEUP_DB_PATH") {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(PREFS_DB_FILE_NAME)
        })
        .clone()
}

fn with_reminders<R>(
    f: impl FnOnce(&SqliteReminders<'_>) -> ReminderResult<R>,
) -> Result<R, String> {
    let db_path = resolve_prefs_db_path();
    let conn = open_db(&db_path).map_err(|err| format!("prefs DB open failed: {err}"))?;
    let reminders = ReminderScheduler::new(
        SqlitePrefs::new(&conn, HYDRATION_PREFS_SCOPE),
        SqliteTaskRegistry::new(&conn),
    );
    f(&reminders).map_err(|err| err.to_string())
}

fn with_moods<R>(f: impl FnOnce(&MoodStore<SqlitePrefs<'_>>) -> R) -> Result<R, String> {
    let db_path = resolve_prefs_db_path();
    let conn = open_db(&db_path).map_err(|err| format!("prefs DB open failed: {err}"))?;
    let moods = MoodStore::new(SqlitePrefs::new(&conn, MOOD_PREFS_SCOPE));
    Ok(f(&moods))
}

fn to_registration_item(registration: TaskRegistration) -> TaskRegistrationItem {
    let request = registration.request;
    TaskRegistrationItem {
        registration_id: registration.id.to_string(),
        name: request.name,
        callback_id: request.callback_id,
        period_minutes: request.period.as_secs() / 60,
        initial_delay_minutes: request.initial_delay.as_secs() / 60,
        requires_network: request.constraints.network
            == pulseup_core::task::NetworkRequirement::Connected,
        tags: request.tags,
        registered_at_ms: registration.registered_at_ms,
    }
}
