//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `pulseup_core` linkage.
//! - Exercise the reminder and mood services against in-memory backends.

use pulseup_core::{
    InMemoryPrefs, InMemoryTaskScheduler, MoodStore, ReminderScheduler, HYDRATION_PREFS_SCOPE,
    MOOD_PREFS_SCOPE,
};

fn main() {
    println!("pulseup_core ping={}", pulseup_core::ping());
    println!("pulseup_core version={}", pulseup_core::core_version());

    let reminders = ReminderScheduler::new(
        InMemoryPrefs::new(HYDRATION_PREFS_SCOPE),
        InMemoryTaskScheduler::new(),
    );
    match reminders
        .set_enabled(true)
        .and_then(|()| reminders.next_reminder_text())
    {
        Ok(text) => println!("reminders {text}"),
        Err(err) => {
            eprintln!("reminders error={err}");
            std::process::exit(1);
        }
    }

    let moods = MoodStore::new(InMemoryPrefs::new(MOOD_PREFS_SCOPE));
    moods.set_mood(2024, 0, 1, Some("😊"));
    let summary = moods.month_summary(0, 2024);
    println!("moods month={} days_tracked={}", summary.month, summary.days_tracked);
}
