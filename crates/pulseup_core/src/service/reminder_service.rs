//! Hydration reminder use-case service.
//!
//! # Responsibility
//! - Read and write reminder settings in the `hydration_prefs` scope.
//! - Keep the periodic task registration in step with those settings.
//! - Produce the "next reminder" display text.
//!
//! # Invariants
//! - Enabled implies exactly one registration named `REMINDER_TASK_NAME`;
//!   disabled implies none.
//! - Every settings write made while enabled re-registers with `Replace`.
//!   A failed registration keeps the previous one, and a failed enable
//!   restores the previous flag.
//! - Setters clamp out-of-range input and never reject it.
//! - The next-time override is sticky: only `set_next_reminder_time`,
//!   `clear_next_reminder_time` and `apply_preset` change it.

use crate::clock::{Clock, SystemClock};
use crate::model::reminder::{
    clamp_hour, clamp_interval_hours, clamp_minute, initial_delay_minutes,
    next_reminder_candidate, next_reminder_text, ReminderNotification, ReminderPreset,
    ReminderSettings, ReminderTime, DEFAULT_END_HOUR, DEFAULT_INTERVAL_HOURS, DEFAULT_START_HOUR,
    HYDRATION_NOTIFICATION, KEY_ENABLED, KEY_END_HOUR, KEY_INTERVAL_HOURS, KEY_LAST_SCHEDULED_AT,
    KEY_NEXT_HOUR, KEY_NEXT_MINUTE, KEY_START_HOUR, NO_OVERRIDE, REMINDERS_OFF_TEXT,
    REMINDER_CALLBACK_ID, REMINDER_TASK_NAME,
};
use crate::prefs::{KeyValueStore, KvError, PrefsEdit};
use crate::task::{
    ExistingTaskPolicy, NetworkRequirement, PeriodicTaskRequest, TaskConstraints, TaskError,
    TaskRegistration, TaskScheduler,
};
use chrono::{NaiveDateTime, Timelike};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub type ReminderResult<T> = Result<T, ReminderError>;

/// Reminder service error.
#[derive(Debug)]
pub enum ReminderError {
    /// Preference read or write failed.
    Prefs(KvError),
    /// Task registration or cancellation failed.
    Task(TaskError),
}

impl Display for ReminderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prefs(err) => write!(f, "reminder settings: {err}"),
            Self::Task(err) => write!(f, "reminder scheduling: {err}"),
        }
    }
}

impl Error for ReminderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Prefs(err) => Some(err),
            Self::Task(err) => Some(err),
        }
    }
}

impl From<KvError> for ReminderError {
    fn from(value: KvError) -> Self {
        Self::Prefs(value)
    }
}

impl From<TaskError> for ReminderError {
    fn from(value: TaskError) -> Self {
        Self::Task(value)
    }
}

/// Hydration reminder settings plus their task registration.
pub struct ReminderScheduler<S, T, C = SystemClock>
where
    S: KeyValueStore,
    T: TaskScheduler,
    C: Clock,
{
    prefs: S,
    tasks: T,
    clock: C,
}

impl<S: KeyValueStore, T: TaskScheduler> ReminderScheduler<S, T, SystemClock> {
    /// Creates a scheduler reading the system clock.
    pub fn new(prefs: S, tasks: T) -> Self {
        Self::with_clock(prefs, tasks, SystemClock)
    }
}

impl<S: KeyValueStore, T: TaskScheduler, C: Clock> ReminderScheduler<S, T, C> {
    pub fn with_clock(prefs: S, tasks: T, clock: C) -> Self {
        Self {
            prefs,
            tasks,
            clock,
        }
    }

    pub fn prefs(&self) -> &S {
        &self.prefs
    }

    pub fn tasks(&self) -> &T {
        &self.tasks
    }

    pub fn is_enabled(&self) -> ReminderResult<bool> {
        Ok(self.prefs.get_bool(KEY_ENABLED, false)?)
    }

    /// Turns reminders on (register) or off (cancel). Repeated calls are safe.
    ///
    /// A failed registration restores the previous flag.
    pub fn set_enabled(&self, enabled: bool) -> ReminderResult<()> {
        if enabled {
            return self.enable_with(PrefsEdit::new());
        }
        self.prefs
            .commit(PrefsEdit::new().put_bool(KEY_ENABLED, false))?;
        self.cancel_reminders()
    }

    pub fn interval_hours(&self) -> ReminderResult<u32> {
        let stored = self
            .prefs
            .get_int(KEY_INTERVAL_HOURS, DEFAULT_INTERVAL_HOURS)?;
        Ok(clamp_interval_hours(stored).unsigned_abs())
    }

    /// Stores `max(hours, 1)`.
    pub fn set_interval_hours(&self, hours: i32) -> ReminderResult<()> {
        self.update(PrefsEdit::new().put_int(KEY_INTERVAL_HOURS, clamp_interval_hours(hours)))
    }

    pub fn start_hour(&self) -> ReminderResult<u32> {
        self.read_hour(KEY_START_HOUR, DEFAULT_START_HOUR)
    }

    /// Stores `hour` clamped to `0..=23`.
    pub fn set_start_hour(&self, hour: i32) -> ReminderResult<()> {
        self.update(PrefsEdit::new().put_int(KEY_START_HOUR, clamp_hour(hour)))
    }

    pub fn end_hour(&self) -> ReminderResult<u32> {
        self.read_hour(KEY_END_HOUR, DEFAULT_END_HOUR)
    }

    /// Stores `hour` clamped to `0..=23`. May be below the start hour.
    pub fn set_end_hour(&self, hour: i32) -> ReminderResult<()> {
        self.update(PrefsEdit::new().put_int(KEY_END_HOUR, clamp_hour(hour)))
    }

    /// Explicit next-time override, if one is stored and in range.
    pub fn next_override(&self) -> ReminderResult<Option<ReminderTime>> {
        let hour = self.prefs.get_int(KEY_NEXT_HOUR, NO_OVERRIDE)?;
        let minute = self.prefs.get_int(KEY_NEXT_MINUTE, NO_OVERRIDE)?;
        Ok(ReminderTime::from_stored(hour, minute))
    }

    /// Stores a clamped override shown instead of the computed next time.
    pub fn set_next_reminder_time(&self, hour: i32, minute: i32) -> ReminderResult<()> {
        self.update(
            PrefsEdit::new()
                .put_int(KEY_NEXT_HOUR, clamp_hour(hour))
                .put_int(KEY_NEXT_MINUTE, clamp_minute(minute)),
        )
    }

    /// Drops the override so the computed schedule is shown again.
    pub fn clear_next_reminder_time(&self) -> ReminderResult<()> {
        self.update(PrefsEdit::new().remove(KEY_NEXT_HOUR).remove(KEY_NEXT_MINUTE))
    }

    /// Epoch milliseconds of the last registration, if any.
    pub fn last_scheduled_at(&self) -> ReminderResult<Option<i64>> {
        if !self.prefs.contains(KEY_LAST_SCHEDULED_AT)? {
            return Ok(None);
        }
        Ok(Some(self.prefs.get_long(KEY_LAST_SCHEDULED_AT, 0)?))
    }

    pub fn snapshot(&self) -> ReminderResult<ReminderSettings> {
        Ok(ReminderSettings {
            enabled: self.is_enabled()?,
            interval_hours: self.interval_hours()?,
            start_hour: self.start_hour()?,
            end_hour: self.end_hour()?,
            last_scheduled_at_ms: self.last_scheduled_at()?,
            next_override: self.next_override()?,
        })
    }

    /// Enables reminders with a preset window starting at `hour`, and shows
    /// `hour:minute` as the next reminder.
    ///
    /// Writes all settings in one commit and registers once.
    pub fn apply_preset(&self, preset: ReminderPreset, hour: i32, minute: i32) -> ReminderResult<()> {
        let start_hour = clamp_hour(hour);
        let (end_hour, interval_hours) = preset.window(start_hour);
        self.enable_with(
            PrefsEdit::new()
                .put_int(KEY_START_HOUR, start_hour)
                .put_int(KEY_END_HOUR, clamp_hour(end_hour))
                .put_int(KEY_INTERVAL_HOURS, clamp_interval_hours(interval_hours))
                .put_int(KEY_NEXT_HOUR, start_hour)
                .put_int(KEY_NEXT_MINUTE, clamp_minute(minute)),
        )
    }

    /// Next reminder wall-clock time, or `None` while disabled.
    ///
    /// An override is reported as that time today.
    pub fn next_reminder_at(&self) -> ReminderResult<Option<NaiveDateTime>> {
        if !self.is_enabled()? {
            return Ok(None);
        }
        let now = self.clock.now();
        if let Some(time) = self.next_override()? {
            return Ok(Some(now.date().and_time(time.to_naive_time())));
        }
        Ok(Some(next_reminder_candidate(
            now,
            self.interval_hours()?,
            self.start_hour()?,
            self.end_hour()?,
        )))
    }

    /// `"Next reminder: H:MM AM/PM"`, or `"Reminders off"` while disabled.
    pub fn next_reminder_text(&self) -> ReminderResult<String> {
        Ok(match self.next_reminder_at()? {
            Some(at) => next_reminder_text(ReminderTime::from_datetime(at)),
            None => REMINDERS_OFF_TEXT.to_string(),
        })
    }

    /// Registration currently held by the task scheduler, if any.
    pub fn active_registration(&self) -> ReminderResult<Option<TaskRegistration>> {
        Ok(self.tasks.registration(REMINDER_TASK_NAME)?)
    }

    /// Content the host displays when the reminder fires.
    pub fn reminder_notification(&self) -> ReminderNotification {
        HYDRATION_NOTIFICATION
    }

    /// Replaces the reminder registration using current settings and records
    /// when it happened.
    ///
    /// The old registration is only dropped by a successful `Replace`, so a
    /// failure here leaves it in place.
    pub(crate) fn schedule_reminders(&self) -> ReminderResult<TaskRegistration> {
        let interval_hours = self.interval_hours()?;
        let start_hour = self.start_hour()?;
        let delay_minutes = initial_delay_minutes(self.clock.now().hour(), start_hour);

        let request = PeriodicTaskRequest::new(
            REMINDER_TASK_NAME,
            REMINDER_CALLBACK_ID,
            Duration::from_secs(u64::from(interval_hours) * 3600),
        )
        .with_initial_delay(Duration::from_secs(delay_minutes.unsigned_abs() * 60))
        .with_constraints(TaskConstraints {
            network: NetworkRequirement::NotRequired,
        })
        .with_tag(REMINDER_TASK_NAME);
        request.validate()?;

        let scheduled_at_ms = self.clock.epoch_ms();
        let registration = self.tasks.register_periodic(
            &request,
            ExistingTaskPolicy::Replace,
            scheduled_at_ms,
        )?;

        self.prefs
            .apply(PrefsEdit::new().put_long(KEY_LAST_SCHEDULED_AT, scheduled_at_ms));

        info!(
            "event=reminder_schedule module=reminder status=ok interval_hours={} start_hour={} delay_minutes={}",
            interval_hours, start_hour, delay_minutes
        );
        Ok(registration)
    }

    /// Commits `edit` with `enabled = true`, then registers. A failed
    /// registration restores the previous flag.
    fn enable_with(&self, edit: PrefsEdit) -> ReminderResult<()> {
        let was_enabled = self.is_enabled()?;
        self.prefs.commit(edit.put_bool(KEY_ENABLED, true))?;

        if let Err(err) = self.schedule_reminders() {
            if let Err(restore_err) = self
                .prefs
                .commit(PrefsEdit::new().put_bool(KEY_ENABLED, was_enabled))
            {
                error!(
                    "event=reminder_enable module=reminder status=error error_code=restore_failed error={restore_err}"
                );
            }
            warn!(
                "event=reminder_enable module=reminder status=error restored={was_enabled} error={err}"
            );
            return Err(err);
        }
        Ok(())
    }

    fn cancel_reminders(&self) -> ReminderResult<()> {
        let removed = self.tasks.cancel(REMINDER_TASK_NAME)?;
        info!("event=reminder_cancel module=reminder status=ok removed={removed}");
        Ok(())
    }

    fn update(&self, edit: PrefsEdit) -> ReminderResult<()> {
        self.prefs.commit(edit)?;
        if self.is_enabled()? {
            self.schedule_reminders()?;
        }
        Ok(())
    }

    fn read_hour(&self, key: &str, default: i32) -> ReminderResult<u32> {
        Ok(clamp_hour(self.prefs.get_int(key, default)?).unsigned_abs())
    }
}
