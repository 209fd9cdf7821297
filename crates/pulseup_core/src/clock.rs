//! Wall-clock source for reminder arithmetic.
//!
//! Reminder math works on local naive date-times (hour-of-day semantics), so
//! the clock hands out `NaiveDateTime` in the device's local zone.

use chrono::{Local, NaiveDateTime, Utc};

/// Source of "now".
pub trait Clock {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;

    /// Current Unix epoch milliseconds.
    fn epoch_ms(&self) -> i64;
}

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn epoch_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock frozen at one instant. Epoch values treat the instant as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }

    fn epoch_ms(&self) -> i64 {
        self.0.and_utc().timestamp_millis()
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }

    fn epoch_ms(&self) -> i64 {
        (**self).epoch_ms()
    }
}
