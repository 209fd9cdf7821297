//! Mood log keys, blob codec and month summaries.
//!
//! # Responsibility
//! - Own the persisted key names for the monthly blob and per-day slots.
//! - Encode and decode the monthly blob (flat JSON object, day -> label).
//!
//! # Invariants
//! - Key formats are a storage contract with existing installs:
//!   `moods_<month>_<year>` for blobs, `mood_<year>_<month>_<day>` for slots.
//! - `month` is used verbatim; hosts that count months from zero keep doing
//!   so and their keys stay stable.
//! - Labels held in a `MoodMap` are non-empty.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

pub const MOOD_PREFS_SCOPE: &str = "mood_prefs";

/// Highest day number probed for per-day slots in any month.
pub const MAX_DAY_OF_MONTH: u32 = 31;

static MONTH_BLOB_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^moods_(\d{1,2})_(-?\d{1,6})$").expect("valid month blob key regex"));

/// Day-of-month to mood label, ordered by day.
pub type MoodMap = BTreeMap<u32, String>;

/// One month of one year, as used in blob keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(month: u32, year: i32) -> Self {
        Self { year, month }
    }

    /// Storage key of this month's blob.
    pub fn blob_key(self) -> String {
        format!("moods_{}_{}", self.month, self.year)
    }

    /// Parses a blob key back into its month. `None` for any other key.
    pub fn parse_blob_key(key: &str) -> Option<Self> {
        let captures = MONTH_BLOB_KEY_RE.captures(key)?;
        let month = captures.get(1)?.as_str().parse().ok()?;
        let year = captures.get(2)?.as_str().parse().ok()?;
        Some(Self::new(month, year))
    }

    /// Calendar date of `day` within this month.
    pub fn day(self, day: u32) -> MoodDate {
        MoodDate {
            year: self.year,
            month: self.month,
            day,
        }
    }
}

impl Display for MonthKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.month, self.year)
    }
}

/// One calendar day, as used in per-day slot keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MoodDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl MoodDate {
    pub fn new(year: i32, month: u32, day: u32) -> Self {
        Self { year, month, day }
    }

    /// Storage key of this day's slot.
    pub fn slot_key(self) -> String {
        format!("mood_{}_{}_{}", self.year, self.month, self.day)
    }

    pub fn month_key(self) -> MonthKey {
        MonthKey::new(self.month, self.year)
    }
}

/// Result of decoding a monthly blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedBlob {
    pub moods: MoodMap,
    /// Entries dropped because the day key or the label was unusable.
    pub skipped: usize,
}

/// Serializes `moods` as a flat JSON object keyed by decimal day number.
pub fn encode_blob(moods: &MoodMap) -> serde_json::Result<String> {
    let object = moods
        .iter()
        .map(|(day, label)| (day.to_string(), Value::String(label.clone())))
        .collect::<serde_json::Map<_, _>>();
    serde_json::to_string(&Value::Object(object))
}

/// Parses a monthly blob.
///
/// Fails only when the text is not a JSON object. Individual entries with a
/// non-numeric key, an empty label, or a structured value are skipped and
/// counted. Scalar numbers and booleans are kept in their text form.
pub fn decode_blob(raw: &str) -> serde_json::Result<DecodedBlob> {
    let object: serde_json::Map<String, Value> = serde_json::from_str(raw)?;
    let mut decoded = DecodedBlob::default();

    for (key, value) in object {
        let Ok(day) = key.trim().parse::<u32>() else {
            decoded.skipped += 1;
            continue;
        };
        let label = match value {
            Value::String(text) => text,
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            Value::Null | Value::Array(_) | Value::Object(_) => {
                decoded.skipped += 1;
                continue;
            }
        };
        if label.is_empty() {
            decoded.skipped += 1;
            continue;
        }
        decoded.moods.insert(day, label);
    }

    Ok(decoded)
}

/// Per-month roll-up used for sharing and charts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodMonthSummary {
    pub month: MonthKey,
    pub days_tracked: usize,
    /// Labels in day order.
    pub labels: Vec<String>,
    /// Occurrences per distinct label.
    pub counts: BTreeMap<String, usize>,
}

impl MoodMonthSummary {
    pub fn from_moods(month: MonthKey, moods: &MoodMap) -> Self {
        let labels = moods.values().cloned().collect::<Vec<_>>();
        let mut counts = BTreeMap::new();
        for label in &labels {
            *counts.entry(label.clone()).or_insert(0) += 1;
        }
        Self {
            month,
            days_tracked: moods.len(),
            labels,
            counts,
        }
    }

    /// Label logged on the most days; ties go to the one logged first.
    pub fn dominant_label(&self) -> Option<&str> {
        let mut best: Option<(&str, usize)> = None;
        for label in &self.labels {
            let count = self.counts.get(label).copied().unwrap_or(0);
            if best.map_or(true, |(_, best_count)| count > best_count) {
                best = Some((label.as_str(), count));
            }
        }
        best.map(|(label, _)| label)
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_blob, encode_blob, MonthKey, MoodDate, MoodMap, MoodMonthSummary};

    #[test]
    fn key_formats_match_storage_contract() {
        assert_eq!(MonthKey::new(2, 2024).blob_key(), "moods_2_2024");
        assert_eq!(MoodDate::new(2024, 2, 15).slot_key(), "mood_2024_2_15");
        assert_eq!(MoodDate::new(2024, 0, 1).month_key(), MonthKey::new(0, 2024));
    }

    #[test]
    fn parse_blob_key_accepts_only_blob_keys() {
        assert_eq!(
            MonthKey::parse_blob_key("moods_11_2023"),
            Some(MonthKey::new(11, 2023))
        );
        assert_eq!(MonthKey::parse_blob_key("mood_2023_11_4"), None);
        assert_eq!(MonthKey::parse_blob_key("moods_x_2023"), None);
    }

    #[test]
    fn encoded_blob_is_flat_string_object() {
        let mut moods = MoodMap::new();
        moods.insert(3, "😊".to_string());
        moods.insert(12, "😡".to_string());

        let raw = encode_blob(&moods).expect("encode");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
        assert_eq!(value["3"], "😊");
        assert_eq!(value["12"], "😡");
    }

    #[test]
    fn decode_skips_malformed_entries() {
        let decoded =
            decode_blob(r#"{"1":"🙂","x":"😴","2":"","3":7,"4":null,"5":["a"]}"#).expect("object");
        assert_eq!(decoded.moods.get(&1).map(String::as_str), Some("🙂"));
        assert_eq!(decoded.moods.get(&3).map(String::as_str), Some("7"));
        assert_eq!(decoded.moods.len(), 2);
        assert_eq!(decoded.skipped, 4);
    }

    #[test]
    fn decode_rejects_non_object_text() {
        assert!(decode_blob("not json").is_err());
        assert!(decode_blob("[1,2]").is_err());
    }

    #[test]
    fn summary_counts_labels_in_day_order() {
        let mut moods = MoodMap::new();
        moods.insert(9, "😐".to_string());
        moods.insert(1, "😊".to_string());
        moods.insert(5, "😊".to_string());

        let summary = MoodMonthSummary::from_moods(MonthKey::new(4, 2024), &moods);
        assert_eq!(summary.days_tracked, 3);
        assert_eq!(summary.labels, vec!["😊", "😊", "😐"]);
        assert_eq!(summary.counts.get("😊"), Some(&2));
        assert_eq!(summary.dominant_label(), Some("😊"));
    }
}
