use chrono::{NaiveDate, NaiveDateTime};
use pulseup_core::model::reminder::{KEY_NEXT_HOUR, KEY_NEXT_MINUTE, KEY_START_HOUR};
use pulseup_core::task::TaskResult;
use pulseup_core::{
    Clock, ExistingTaskPolicy, FixedClock, InMemoryPrefs, InMemoryTaskScheduler, KeyValueStore,
    PeriodicTaskRequest, PrefsEdit, ReminderError, ReminderPreset, ReminderScheduler, TaskError,
    TaskRegistration, TaskScheduler, HYDRATION_PREFS_SCOPE, REMINDER_TASK_NAME,
};
use std::cell::Cell;
use std::time::Duration;

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 12)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn fixtures() -> (InMemoryPrefs, InMemoryTaskScheduler) {
    (
        InMemoryPrefs::new(HYDRATION_PREFS_SCOPE),
        InMemoryTaskScheduler::new(),
    )
}

#[test]
fn defaults_match_documented_values() {
    let (prefs, tasks) = fixtures();
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(9, 0)));

    let settings = scheduler.snapshot().unwrap();
    assert!(!settings.enabled);
    assert_eq!(settings.interval_hours, 2);
    assert_eq!(settings.start_hour, 8);
    assert_eq!(settings.end_hour, 22);
    assert_eq!(settings.last_scheduled_at_ms, None);
    assert_eq!(settings.next_override, None);
}

#[test]
fn hour_setters_clamp_into_day_range() {
    let (prefs, tasks) = fixtures();
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(9, 0)));

    scheduler.set_start_hour(-5).unwrap();
    assert_eq!(scheduler.start_hour().unwrap(), 0);
    assert_eq!(prefs.get_int(KEY_START_HOUR, -1).unwrap(), 0);

    scheduler.set_start_hour(99).unwrap();
    assert_eq!(scheduler.start_hour().unwrap(), 23);

    scheduler.set_end_hour(-1).unwrap();
    assert_eq!(scheduler.end_hour().unwrap(), 0);
    scheduler.set_end_hour(24).unwrap();
    assert_eq!(scheduler.end_hour().unwrap(), 23);
}

#[test]
fn interval_setter_keeps_at_least_one_hour() {
    let (prefs, tasks) = fixtures();
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(9, 0)));

    scheduler.set_interval_hours(0).unwrap();
    assert_eq!(scheduler.interval_hours().unwrap(), 1);
    scheduler.set_interval_hours(-3).unwrap();
    assert_eq!(scheduler.interval_hours().unwrap(), 1);
    scheduler.set_interval_hours(5).unwrap();
    assert_eq!(scheduler.interval_hours().unwrap(), 5);
}

#[test]
fn enabling_twice_leaves_exactly_one_registration() {
    let (prefs, tasks) = fixtures();
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(10, 0)));

    scheduler.set_enabled(true).unwrap();
    scheduler.set_enabled(true).unwrap();

    let active = tasks.registrations().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].request.name, REMINDER_TASK_NAME);
}

#[test]
fn disabling_cancels_and_is_idempotent() {
    let (prefs, tasks) = fixtures();
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(10, 0)));

    scheduler.set_enabled(true).unwrap();
    scheduler.set_enabled(false).unwrap();
    scheduler.set_enabled(false).unwrap();

    assert!(!scheduler.is_enabled().unwrap());
    assert!(tasks.registration(REMINDER_TASK_NAME).unwrap().is_none());
}

#[test]
fn registration_uses_interval_and_wrapped_start_delay() {
    let (prefs, tasks) = fixtures();
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(10, 30)));

    scheduler.set_enabled(true).unwrap();
    let registration = scheduler.active_registration().unwrap().unwrap();
    assert_eq!(registration.request.period, Duration::from_secs(2 * 3600));
    // 10:30 with start 8 wraps to tomorrow: 24 - 10 + 8 = 22 whole hours.
    assert_eq!(registration.request.initial_delay, Duration::from_secs(79_200));
    assert_eq!(registration.request.callback_id, "hydration_reminder");
}

#[test]
fn registration_before_window_waits_until_start() {
    let (prefs, tasks) = fixtures();
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(6, 50)));

    scheduler.set_enabled(true).unwrap();
    let registration = scheduler.active_registration().unwrap().unwrap();
    assert_eq!(registration.request.initial_delay, Duration::from_secs(120 * 60));
}

#[test]
fn settings_changes_while_enabled_replace_registration() {
    let (prefs, tasks) = fixtures();
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(10, 0)));

    scheduler.set_enabled(true).unwrap();
    let first = scheduler.active_registration().unwrap().unwrap();

    scheduler.set_interval_hours(4).unwrap();
    let second = scheduler.active_registration().unwrap().unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(second.request.period, Duration::from_secs(4 * 3600));

    scheduler.set_next_reminder_time(15, 30).unwrap();
    let third = scheduler.active_registration().unwrap().unwrap();
    assert_ne!(second.id, third.id);
    assert_eq!(tasks.registrations().unwrap().len(), 1);
}

#[test]
fn settings_changes_while_disabled_do_not_register() {
    let (prefs, tasks) = fixtures();
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(10, 0)));

    scheduler.set_interval_hours(4).unwrap();
    scheduler.set_start_hour(7).unwrap();
    scheduler.set_end_hour(21).unwrap();
    scheduler.set_next_reminder_time(9, 0).unwrap();

    assert!(tasks.registrations().unwrap().is_empty());
    assert_eq!(scheduler.last_scheduled_at().unwrap(), None);
}

#[test]
fn scheduling_records_timestamp() {
    let (prefs, tasks) = fixtures();
    let now = at(10, 0);
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(now));

    scheduler.set_enabled(true).unwrap();
    assert_eq!(
        scheduler.last_scheduled_at().unwrap(),
        Some(now.and_utc().timestamp_millis())
    );
}

#[test]
fn disabled_text_ignores_other_settings() {
    let (prefs, tasks) = fixtures();
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(10, 0)));

    scheduler.set_next_reminder_time(7, 15).unwrap();
    scheduler.set_interval_hours(3).unwrap();

    assert_eq!(scheduler.next_reminder_text().unwrap(), "Reminders off");
    assert_eq!(scheduler.next_reminder_at().unwrap(), None);
}

#[test]
fn computed_text_adds_interval_inside_window() {
    let (prefs, tasks) = fixtures();
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(13, 5)));

    scheduler.set_enabled(true).unwrap();
    assert_eq!(
        scheduler.next_reminder_text().unwrap(),
        "Next reminder: 3:05 PM"
    );
}

#[test]
fn computed_text_snaps_to_start_before_window() {
    let (prefs, tasks) = fixtures();
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(5, 20)));

    scheduler.set_enabled(true).unwrap();
    assert_eq!(
        scheduler.next_reminder_text().unwrap(),
        "Next reminder: 8:00 AM"
    );
}

#[test]
fn computed_text_rolls_to_next_day_after_window() {
    let (prefs, tasks) = fixtures();
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(21, 10)));

    scheduler.set_enabled(true).unwrap();
    scheduler.set_start_hour(0).unwrap();
    assert_eq!(
        scheduler.next_reminder_text().unwrap(),
        "Next reminder: 12:00 AM"
    );
    let next = scheduler.next_reminder_at().unwrap().unwrap();
    assert_eq!(next.date(), at(0, 0).date().succ_opt().unwrap());
}

#[test]
fn override_is_sticky_and_formatted() {
    let (prefs, tasks) = fixtures();
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(10, 0)));

    scheduler.set_enabled(true).unwrap();
    scheduler.set_next_reminder_time(23, 0).unwrap();
    assert_eq!(
        scheduler.next_reminder_text().unwrap(),
        "Next reminder: 11:00 PM"
    );

    scheduler.set_interval_hours(1).unwrap();
    scheduler.set_start_hour(6).unwrap();
    assert_eq!(
        scheduler.next_reminder_text().unwrap(),
        "Next reminder: 11:00 PM"
    );
}

#[test]
fn override_input_is_clamped() {
    let (prefs, tasks) = fixtures();
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(10, 0)));

    scheduler.set_enabled(true).unwrap();
    scheduler.set_next_reminder_time(30, -4).unwrap();
    assert_eq!(
        scheduler.next_reminder_text().unwrap(),
        "Next reminder: 11:00 PM"
    );
    assert_eq!(prefs.get_int(KEY_NEXT_HOUR, -1).unwrap(), 23);
    assert_eq!(prefs.get_int(KEY_NEXT_MINUTE, -1).unwrap(), 0);
}

#[test]
fn half_stored_override_is_ignored() {
    let (prefs, tasks) = fixtures();
    prefs
        .commit(PrefsEdit::new().put_int(KEY_NEXT_HOUR, 9))
        .unwrap();
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(13, 5)));

    scheduler.set_enabled(true).unwrap();
    assert_eq!(scheduler.next_override().unwrap(), None);
    assert_eq!(
        scheduler.next_reminder_text().unwrap(),
        "Next reminder: 3:05 PM"
    );
}

#[test]
fn clearing_override_restores_computed_text() {
    let (prefs, tasks) = fixtures();
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(13, 5)));

    scheduler.set_enabled(true).unwrap();
    scheduler.set_next_reminder_time(0, 0).unwrap();
    assert_eq!(
        scheduler.next_reminder_text().unwrap(),
        "Next reminder: 12:00 AM"
    );

    scheduler.clear_next_reminder_time().unwrap();
    assert_eq!(scheduler.next_override().unwrap(), None);
    assert_eq!(
        scheduler.next_reminder_text().unwrap(),
        "Next reminder: 3:05 PM"
    );
}

#[test]
fn once_preset_collapses_window_to_chosen_hour() {
    let (prefs, tasks) = fixtures();
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(7, 0)));

    scheduler.apply_preset(ReminderPreset::Once, 9, 30).unwrap();

    let settings = scheduler.snapshot().unwrap();
    assert!(settings.enabled);
    assert_eq!(settings.start_hour, 9);
    assert_eq!(settings.end_hour, 9);
    assert_eq!(settings.interval_hours, 1);
    assert_eq!(
        scheduler.next_reminder_text().unwrap(),
        "Next reminder: 9:30 AM"
    );

    let registration = scheduler.active_registration().unwrap().unwrap();
    assert_eq!(registration.request.period, Duration::from_secs(3600));
    assert_eq!(registration.request.initial_delay, Duration::from_secs(2 * 3600));
}

#[test]
fn daily_and_custom_presets_set_their_windows() {
    let (prefs, tasks) = fixtures();
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(7, 0)));

    scheduler.apply_preset(ReminderPreset::Daily, 8, 0).unwrap();
    let daily = scheduler.snapshot().unwrap();
    assert_eq!((daily.end_hour, daily.interval_hours), (22, 2));

    scheduler.apply_preset(ReminderPreset::Custom, 10, 15).unwrap();
    let custom = scheduler.snapshot().unwrap();
    assert_eq!((custom.start_hour, custom.end_hour, custom.interval_hours), (10, 20, 3));
    assert_eq!(tasks.registrations().unwrap().len(), 1);
}

#[test]
fn notification_content_is_fixed() {
    let (prefs, tasks) = fixtures();
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(7, 0)));

    let notification = scheduler.reminder_notification();
    assert_eq!(notification.channel_id, "hydration_reminders");
    assert_eq!(notification.notification_id, 1001);
    assert!(notification.title.starts_with("Stay Hydrated!"));
}

/// Task scheduler whose registrations can be switched to fail.
#[derive(Default)]
struct FailingTasks {
    inner: InMemoryTaskScheduler,
    fail_registrations: Cell<bool>,
}

impl TaskScheduler for FailingTasks {
    fn register_periodic(
        &self,
        request: &PeriodicTaskRequest,
        policy: ExistingTaskPolicy,
        registered_at_ms: i64,
    ) -> TaskResult<TaskRegistration> {
        if self.fail_registrations.get() {
            return Err(TaskError::InvalidData("database is locked".to_string()));
        }
        self.inner.register_periodic(request, policy, registered_at_ms)
    }

    fn cancel(&self, name: &str) -> TaskResult<bool> {
        self.inner.cancel(name)
    }

    fn registration(&self, name: &str) -> TaskResult<Option<TaskRegistration>> {
        self.inner.registration(name)
    }

    fn registrations(&self) -> TaskResult<Vec<TaskRegistration>> {
        self.inner.registrations()
    }
}

#[test]
fn failed_enable_leaves_reminders_disabled() {
    let prefs = InMemoryPrefs::new(HYDRATION_PREFS_SCOPE);
    let tasks = FailingTasks::default();
    tasks.fail_registrations.set(true);
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(9, 0)));

    let err = scheduler.set_enabled(true).unwrap_err();
    assert!(matches!(err, ReminderError::Task(_)));
    assert!(!scheduler.is_enabled().unwrap());
    assert!(scheduler.active_registration().unwrap().is_none());
    assert_eq!(scheduler.next_reminder_text().unwrap(), "Reminders off");
}

#[test]
fn failed_preset_restores_disabled_flag() {
    let prefs = InMemoryPrefs::new(HYDRATION_PREFS_SCOPE);
    let tasks = FailingTasks::default();
    tasks.fail_registrations.set(true);
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(9, 0)));

    assert!(scheduler.apply_preset(ReminderPreset::Daily, 9, 30).is_err());
    assert!(!scheduler.is_enabled().unwrap());
    assert!(scheduler.active_registration().unwrap().is_none());
}

#[test]
fn failed_reschedule_keeps_previous_registration() {
    let prefs = InMemoryPrefs::new(HYDRATION_PREFS_SCOPE);
    let tasks = FailingTasks::default();
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, FixedClock(at(6, 0)));

    scheduler.set_enabled(true).unwrap();
    let before = scheduler.active_registration().unwrap().unwrap();

    tasks.fail_registrations.set(true);
    assert!(scheduler.set_start_hour(7).is_err());
    assert!(scheduler.set_enabled(true).is_err());

    assert!(scheduler.is_enabled().unwrap());
    let after = scheduler.active_registration().unwrap().unwrap();
    assert_eq!(after.id, before.id);
    assert_eq!(after.request.initial_delay, Duration::from_secs(120 * 60));
}

#[test]
fn registration_timestamp_comes_from_injected_clock() {
    let (prefs, tasks) = fixtures();
    let clock = FixedClock(at(11, 0));
    let scheduler = ReminderScheduler::with_clock(&prefs, &tasks, clock);

    scheduler.set_enabled(true).unwrap();
    let registration = scheduler.active_registration().unwrap().unwrap();
    assert_eq!(registration.registered_at_ms, clock.epoch_ms());
    assert_eq!(
        scheduler.last_scheduled_at().unwrap(),
        Some(registration.registered_at_ms)
    );
}
