//! Mood log use-case service.
//!
//! # Responsibility
//! - Persist a month of moods twice: one blob per month plus one slot per day.
//! - Merge both layers on read.
//!
//! # Invariants
//! - Read path: a non-empty per-day slot wins over the blob for that day.
//! - Write path: every save commits the blob, then the slots of every day in
//!   the map. Slots of days missing from the map are left as they are.
//! - Clearing a day through `set_mood` also deletes that day's slot, so a
//!   cleared mood cannot come back through the slot layer.
//! - Storage failures are logged and swallowed; callers always get a value.

use crate::model::mood::{
    decode_blob, encode_blob, MonthKey, MoodDate, MoodMap, MoodMonthSummary, MAX_DAY_OF_MONTH,
};
use crate::prefs::{KeyValueStore, PrefsEdit};
use log::{debug, error, warn};

/// Day-to-mood log over a `mood_prefs` store.
pub struct MoodStore<S: KeyValueStore> {
    prefs: S,
}

impl<S: KeyValueStore> MoodStore<S> {
    pub fn new(prefs: S) -> Self {
        Self { prefs }
    }

    pub fn prefs(&self) -> &S {
        &self.prefs
    }

    /// Writes `moods` as the month's blob and into each day's slot.
    ///
    /// Both commits are synchronous. A failure in one is logged and the
    /// other is still attempted.
    pub fn save_moods(&self, month: u32, year: i32, moods: &MoodMap) {
        self.write_month(MonthKey::new(month, year), moods, None);
    }

    /// Raw stored blob for diagnostics. `None` when absent or unreadable.
    pub fn raw_json(&self, month: u32, year: i32) -> Option<String> {
        let key = MonthKey::new(month, year).blob_key();
        match self.prefs.get_string(&key) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("event=mood_raw_read module=mood status=error key={key} error={err}");
                None
            }
        }
    }

    /// Month map from the blob with per-day slots laid over it.
    pub fn load_moods(&self, month: u32, year: i32) -> MoodMap {
        let month_key = MonthKey::new(month, year);
        let mut moods = self.read_blob(month_key);
        for day in 1..=MAX_DAY_OF_MONTH {
            if let Some(label) = self.read_slot(month_key.day(day)) {
                moods.insert(day, label);
            }
        }
        moods
    }

    /// Sets (`Some` non-empty) or clears (`None` or empty) one day's mood.
    pub fn set_mood(&self, year: i32, month: u32, day: u32, label: Option<&str>) {
        let month_key = MonthKey::new(month, year);
        let mut moods = self.load_moods(month, year);

        match label.filter(|label| !label.is_empty()) {
            Some(label) => {
                moods.insert(day, label.to_string());
                debug!("event=mood_set module=mood action=set month={month_key} day={day}");
                self.write_month(month_key, &moods, None);
            }
            None => {
                moods.remove(&day);
                debug!("event=mood_set module=mood action=clear month={month_key} day={day}");
                self.write_month(month_key, &moods, Some(day));
            }
        }
    }

    /// One day's mood: its slot if non-empty, else the merged month map.
    pub fn mood(&self, year: i32, month: u32, day: u32) -> Option<String> {
        self.read_slot(MoodDate::new(year, month, day))
            .or_else(|| self.load_moods(month, year).remove(&day))
    }

    /// Days tracked and label counts for one month.
    pub fn month_summary(&self, month: u32, year: i32) -> MoodMonthSummary {
        let month_key = MonthKey::new(month, year);
        MoodMonthSummary::from_moods(month_key, &self.load_moods(month, year))
    }

    /// Every month with a stored blob, oldest first.
    pub fn logged_months(&self) -> Vec<MonthKey> {
        let keys = match self.prefs.keys() {
            Ok(keys) => keys,
            Err(err) => {
                warn!("event=mood_list_months module=mood status=error error={err}");
                return Vec::new();
            }
        };
        let mut months = keys
            .iter()
            .filter_map(|key| MonthKey::parse_blob_key(key))
            .collect::<Vec<_>>();
        months.sort();
        months
    }

    fn write_month(&self, month: MonthKey, moods: &MoodMap, cleared_day: Option<u32>) {
        match encode_blob(moods) {
            Ok(blob) => {
                if let Err(err) = self
                    .prefs
                    .commit(PrefsEdit::new().put_string(month.blob_key(), blob))
                {
                    error!(
                        "event=mood_save module=mood layer=blob status=error month={month} error={err}"
                    );
                }
            }
            Err(err) => {
                error!(
                    "event=mood_save module=mood layer=blob status=error month={month} error_code=encode_failed error={err}"
                );
            }
        }

        let mut slots = moods.iter().fold(PrefsEdit::new(), |edit, (day, label)| {
            edit.put_string(month.day(*day).slot_key(), label.as_str())
        });
        if let Some(day) = cleared_day {
            slots = slots.remove(month.day(day).slot_key());
        }
        if slots.is_empty() {
            return;
        }

        let entries = slots.len();
        match self.prefs.commit(slots) {
            Ok(()) => debug!(
                "event=mood_save module=mood layer=slots status=ok month={month} entries={entries}"
            ),
            Err(err) => error!(
                "event=mood_save module=mood layer=slots status=error month={month} error={err}"
            ),
        }
    }

    fn read_blob(&self, month: MonthKey) -> MoodMap {
        let Some(raw) = self.raw_json(month.month, month.year) else {
            return MoodMap::new();
        };
        if raw.is_empty() {
            return MoodMap::new();
        }

        match decode_blob(&raw) {
            Ok(decoded) => {
                if decoded.skipped > 0 {
                    warn!(
                        "event=mood_load module=mood layer=blob status=partial month={month} skipped={}",
                        decoded.skipped
                    );
                }
                decoded.moods
            }
            Err(err) => {
                warn!(
                    "event=mood_load module=mood layer=blob status=error month={month} error_code=decode_failed error={err}"
                );
                MoodMap::new()
            }
        }
    }

    fn read_slot(&self, date: MoodDate) -> Option<String> {
        match self.prefs.get_string(&date.slot_key()) {
            Ok(label) => label.filter(|label| !label.is_empty()),
            Err(err) => {
                warn!(
                    "event=mood_load module=mood layer=slot status=error day={} error={err}",
                    date.day
                );
                None
            }
        }
    }
}
