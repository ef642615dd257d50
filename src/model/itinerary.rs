use serde::{Deserialize, Serialize};

use super::category::Category;
use super::clock::ClockTime;

/// Prefix carried by the activity of an item that could not be placed on the clock.
pub const BACKUP_PREFIX: &str = "备选：";

/// Day-note text for a lodging entry, which never occupies a clock slot
pub fn lodging_note(text: &str) -> String {
    if text.contains("住宿") {
        text.to_string()
    } else {
        format!("住宿：{}", text)
    }
}

/// One scheduled (or backup) row within a day
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_start: Option<ClockTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_end: Option<ClockTime>,
    pub activity: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub note: String,
}

impl Item {
    /// A timed row with activity and location
    pub fn timed(
        start: ClockTime,
        end: Option<ClockTime>,
        activity: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Item {
            time_start: Some(start),
            time_end: end,
            activity: activity.into(),
            location: location.into(),
            note: String::new(),
        }
    }

    /// A backup row: kept in the document but not on the clock
    pub fn untimed(activity: impl Into<String>) -> Self {
        Item {
            activity: activity.into(),
            ..Item::default()
        }
    }

    pub fn is_timed(&self) -> bool {
        self.time_start.is_some()
    }

    pub fn is_backup(&self) -> bool {
        self.activity.starts_with(BACKUP_PREFIX)
    }

    pub fn category(&self) -> Category {
        Category::of_item(&self.activity, &self.location, &self.note)
    }

    pub fn clear_times(&mut self) {
        self.time_start = None;
        self.time_end = None;
    }

    /// Relabel as a backup (`备选：<activity>`) and drop the clock fields.
    pub fn demote_to_backup(&mut self) {
        self.clear_times();
        if !self.is_backup() {
            self.activity = format!("{}{}", BACKUP_PREFIX, self.activity);
        }
    }

    /// Append a remark to the note column, separated from existing text.
    pub fn push_note(&mut self, text: &str) {
        if self.note.is_empty() {
            self.note = text.to_string();
        } else {
            self.note.push('；');
            self.note.push_str(text);
        }
    }

    /// All text columns joined, used for substring presence checks
    pub fn text(&self) -> String {
        format!("{}\n{}\n{}", self.activity, self.location, self.note)
    }
}

/// A single day of the itinerary
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Day {
    /// 1-based day number
    pub index: u32,
    /// Free-text date label exactly as found in the source, never guessed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_label: Option<String>,
    #[serde(default)]
    pub items: Vec<Item>,
    /// Non-schedule lines attached to this day (lodging, remarks)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl Day {
    pub fn new(index: u32) -> Self {
        Day {
            index,
            ..Day::default()
        }
    }

    pub fn timed_items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|i| i.is_timed())
    }

    /// Latest clock position used by this day's timed items
    pub fn clock_cursor(&self) -> Option<ClockTime> {
        self.timed_items()
            .filter_map(|i| i.time_end.or(i.time_start))
            .max()
    }

    /// Every item column and note of the day, joined for substring checks
    pub fn text(&self) -> String {
        let mut parts: Vec<String> = self.items.iter().map(Item::text).collect();
        parts.extend(self.notes.iter().cloned());
        parts.join("\n")
    }
}

/// A complete itinerary: ordered days plus a global appendix
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItineraryDocument {
    pub days: Vec<Day>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub appendix: Vec<String>,
}

impl ItineraryDocument {
    pub fn day(&self, index: u32) -> Option<&Day> {
        self.days.iter().find(|d| d.index == index)
    }

    /// Get the day with this index, inserting an empty one in index order if missing.
    pub fn ensure_day(&mut self, index: u32) -> &mut Day {
        let pos = match self.days.iter().position(|d| d.index == index) {
            Some(pos) => pos,
            None => {
                let insert_at = self
                    .days
                    .iter()
                    .position(|d| d.index > index)
                    .unwrap_or(self.days.len());
                self.days.insert(insert_at, Day::new(index));
                insert_at
            }
        };
        &mut self.days[pos]
    }

    pub fn max_day_index(&self) -> Option<u32> {
        self.days.iter().map(|d| d.index).max()
    }

    pub fn item_count(&self) -> usize {
        self.days.iter().map(|d| d.items.len()).sum()
    }
}
