use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;

use crate::model::clock::ClockTime;
use crate::model::config::ScheduleConfig;
use crate::model::itinerary::{BACKUP_PREFIX, Day, Item, ItineraryDocument};
use crate::parse::day_heading::find_day_marker;
use crate::parse::item_line::{parse_backup_row, parse_item_row};
use crate::parse::itinerary_serializer::PLACEHOLDER_ACTIVITY;
use crate::parse::normalize::{normalize_line, normalize_pipes, sanitize_cell, starts_with_decimal};
use crate::parse::poi_chain::{split_location_list, split_poi_chain};
use crate::util::unicode::grapheme_count;

/// POIs named per day, in first-mention order
pub type PoisByDay = BTreeMap<u32, Vec<String>>;

/// Longest bullet text still taken as a place name
const POI_MAX_CHARS: usize = 30;

/// Words that name a kind of slot rather than a place
const GENERIC_ACTIVITIES: &[&str] = &[
    "返程", "出发", "集合", "休息", "用餐", "午餐", "晚餐", "早餐", "入住", "退房", "游览", "参观",
    "交通", "交通/转场", "自由活动", "自由安排", "自由活动/机动安排", "行程整理", "待定", "无",
];

static BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*+•·▪◆◇■□●○]\s*|\d{1,2}\s*[.、)）]\s*|[①-⑳]\s*)").unwrap()
});

static TIME_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[（(]?\s*\d{1,2}\s*[:：]\s*\d{2}\s*(?:(?:-|—|–|~|～|至|到)\s*\d{1,2}\s*[:：]\s*\d{2})?\s*[）)]?|^(?:早上|早晨|上午|中午|下午|傍晚|晚上|夜间)\s*[:：]?",
    )
    .unwrap()
});

fn is_generic(poi: &str) -> bool {
    GENERIC_ACTIVITIES.contains(&poi)
}

/// POIs are kept in the form a rendered cell would show them.
fn add_pois(target: &mut IndexSet<String>, pois: impl IntoIterator<Item = String>) {
    for poi in pois {
        let poi = sanitize_cell(&poi);
        if !poi.is_empty() && !is_generic(&poi) && grapheme_count(&poi) <= POI_MAX_CHARS {
            target.insert(poi);
        }
    }
}

/// Places named by a canonical row: the location column, else the activity.
fn row_pois(item: &Item) -> Vec<String> {
    if !item.location.trim().is_empty() {
        return split_location_list(&item.location);
    }
    let activity = item.activity.trim_start_matches(BACKUP_PREFIX).trim();
    if activity.is_empty() { vec![] } else { vec![activity.to_string()] }
}

/// Free text after a bullet or a day marker, reduced to place names
fn chain_pois(text: &str) -> Vec<String> {
    let text = text.replace("**", "");
    let text = TIME_NOISE.replace_all(text.trim(), "");
    let text = text.trim();
    if text.ends_with([':', '：']) {
        return vec![];
    }
    split_poi_chain(text)
}

/// Collect the POIs the reference text names for each day.
///
/// Day markers are recognized in every dialect, also inside bullets, bold
/// text or after emoji. A marker's trailing chain, the bullets that follow
/// it and canonical rows under it all contribute. A non-day markdown heading
/// ends the current day.
pub fn extract_pois_by_day(reference: &str) -> PoisByDay {
    let mut by_day: BTreeMap<u32, IndexSet<String>> = BTreeMap::new();
    let mut current: Option<u32> = None;

    for raw in reference.replace('\r', "").split('\n') {
        let line = normalize_pipes(&normalize_line(raw));
        if line.is_empty() {
            continue;
        }

        if let Some(marker) = find_day_marker(&line) {
            current = Some(marker.index);
            let pois = by_day.entry(marker.index).or_default();
            if let Some(inline) = marker.inline {
                add_pois(pois, chain_pois(&inline));
            }
            continue;
        }

        if line.starts_with('#') {
            current = None;
            continue;
        }
        let Some(day) = current else {
            continue;
        };
        let pois = by_day.entry(day).or_default();

        if let Some(quoted) = line.strip_prefix('>') {
            if let Some(item) = parse_backup_row(quoted.trim()) {
                add_pois(pois, row_pois(&item));
            }
            continue;
        }

        // `1.5 小时后返回` is a duration, not item 1 of a list
        let body = if starts_with_decimal(&line) {
            Cow::Borrowed(line.as_str())
        } else {
            BULLET.replace(&line, "")
        };
        if body.contains('|') {
            if let Ok(item) = parse_item_row(&body) {
                add_pois(pois, row_pois(&item));
            }
            continue;
        }
        if body.len() != line.len() {
            add_pois(pois, chain_pois(&body));
        }
    }

    by_day
        .into_iter()
        .map(|(day, pois)| (day, pois.into_iter().collect()))
        .collect()
}

/// Day text as the renderer would print it, so sanitized POIs compare equal
fn rendered_text(day: &Day) -> String {
    day.items
        .iter()
        .flat_map(|i| [&i.activity, &i.location, &i.note])
        .chain(&day.notes)
        .map(|s| sanitize_cell(s))
        .collect::<Vec<_>>()
        .join("\n")
}

fn overflow_note(schedule: &ScheduleConfig) -> String {
    format!(
        "超出当日 {}-{} 时间窗，作为备选",
        schedule.day_start, schedule.day_end
    )
}

/// Append every POI the day's text does not already mention, at the day's
/// clock cursor in `slot_minutes` slots while they fit inside the day
/// window, otherwise as an untimed backup. Missing days are created.
/// Returns the number of items appended; a second call appends nothing.
pub fn ensure_contains_all_pois(
    doc: &mut ItineraryDocument,
    pois: &PoisByDay,
    schedule: &ScheduleConfig,
) -> usize {
    let mut appended = 0;
    for (&index, names) in pois {
        if names.is_empty() {
            continue;
        }
        let day = doc.ensure_day(index);
        let mut text = rendered_text(day);
        let mut cursor = day
            .clock_cursor()
            .unwrap_or(schedule.day_start)
            .max(schedule.day_start);

        for poi in names {
            if text.contains(poi.as_str()) {
                continue;
            }
            let end = cursor.plus_minutes(schedule.slot_minutes);
            let item = if end <= schedule.day_end {
                let item = Item::timed(cursor, Some(end), poi.clone(), "");
                cursor = end;
                item
            } else {
                let mut item = Item::untimed(format!("{}{}", BACKUP_PREFIX, poi));
                item.note = overflow_note(schedule);
                item
            };
            tracing::info!(day = index, poi = %poi, timed = item.is_timed(), "restoring a POI missing from the plan");
            day.items.push(item);
            text.push('\n');
            text.push_str(poi);
            appended += 1;
        }
    }
    appended
}

/// True when `rewritten` no longer mentions a POI that `original` lists by day.
pub fn drops_pois(original: &str, rewritten: &str) -> bool {
    let (original, rewritten) = (original.trim(), rewritten.trim());
    if original.is_empty() || rewritten.is_empty() {
        return false;
    }
    extract_pois_by_day(original)
        .values()
        .flatten()
        .any(|poi| !rewritten.contains(poi.as_str()))
}

/// Highest day index introduced by an explicit marker anywhere in the text
pub fn max_explicit_day_marker(text: &str) -> Option<u32> {
    text.lines()
        .filter_map(|l| find_day_marker(&normalize_line(l)))
        .map(|m| m.index)
        .max()
}

/// A candidate may not add days beyond the last one the original marks.
/// Text without markers constrains nothing.
pub fn introduces_extra_days(original: &str, candidate: &str) -> bool {
    match (max_explicit_day_marker(original), max_explicit_day_marker(candidate)) {
        (Some(source_max), Some(candidate_max)) => candidate_max > source_max,
        _ => false,
    }
}

/// A plan made only of the named POIs: one day per key, one item per POI
/// with the POI as its activity.
pub fn fallback_from_pois(pois: &PoisByDay, schedule: &ScheduleConfig) -> ItineraryDocument {
    let mut doc = ItineraryDocument::default();
    for (&index, names) in pois {
        let mut day = Day::new(index);
        let mut cursor: ClockTime = schedule.day_start;
        for poi in names {
            let end = cursor.plus_minutes(schedule.slot_minutes);
            if end <= schedule.day_end {
                day.items.push(Item::timed(cursor, Some(end), poi.clone(), ""));
                cursor = end;
            } else {
                let mut item = Item::untimed(format!("{}{}", BACKUP_PREFIX, poi));
                item.note = overflow_note(schedule);
                day.items.push(item);
            }
        }
        if !day.items.iter().any(Item::is_timed) {
            day.items
                .insert(0, Item::timed(schedule.day_start, None, PLACEHOLDER_ACTIVITY, ""));
        }
        doc.days.push(day);
    }
    doc
}
