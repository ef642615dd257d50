use crate::model::category::Category;
use crate::model::clock::ClockTime;
use crate::model::config::{DurationConfig, ScheduleConfig};
use crate::model::itinerary::{Day, Item, ItineraryDocument, lodging_note};
use crate::ops::sanitize::{remove_empty_placeholder_items, remove_speculative_intercity_transport};

pub const TRANSFER_ACTIVITY: &str = "交通/转场";
pub const MEAL_ACTIVITY: &str = "用餐";
pub const FREE_SLOT_ACTIVITY: &str = "自由活动/机动安排";

const LUNCH: (ClockTime, ClockTime) = (ClockTime::hm(11, 30), ClockTime::hm(13, 0));
const DINNER: (ClockTime, ClockTime) = (ClockTime::hm(17, 30), ClockTime::hm(19, 0));
/// Latest end a synthesized duration may reach
const LAST_MINUTE: ClockTime = ClockTime::hm(23, 59);

/// Inputs to rationalization
#[derive(Debug, Clone, Copy)]
pub struct RationalizeOptions<'a> {
    pub schedule: &'a ScheduleConfig,
    pub durations: &'a DurationConfig,
    /// Source text that may corroborate inter-city travel. Without it no
    /// transport is treated as speculative.
    pub reference: Option<&'a str>,
}

/// Make a structurally valid document plausible: lodging into day notes,
/// speculative travel and hollow rows removed, every remaining item either
/// placed inside the day window or kept as a `备选：` backup.
///
/// Running it on its own output changes nothing.
pub fn rationalize(doc: &ItineraryDocument, options: &RationalizeOptions<'_>) -> ItineraryDocument {
    let mut out = doc.clone();
    if let Some(reference) = options.reference {
        remove_speculative_intercity_transport(&mut out, reference);
    }
    remove_empty_placeholder_items(&mut out);

    for day in &mut out.days {
        move_lodging_to_notes(day);
        schedule_day(day, options);
    }
    out
}

fn move_lodging_to_notes(day: &mut Day) {
    let (lodging, rest): (Vec<Item>, Vec<Item>) = std::mem::take(&mut day.items)
        .into_iter()
        .partition(|i| i.category() == Category::Lodging);
    day.items = rest;

    for item in lodging {
        let text = [item.activity.as_str(), item.location.as_str(), item.note.as_str()]
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        day.notes.push(lodging_note(&text));
    }
}

fn schedule_day(day: &mut Day, options: &RationalizeOptions<'_>) {
    let (mut backups, mut schedulable): (Vec<Item>, Vec<Item>) =
        std::mem::take(&mut day.items).into_iter().partition(Item::is_backup);
    for backup in &mut backups {
        backup.clear_times();
    }

    schedulable.sort_by_key(|i| {
        i.time_start
            .filter(|t| t.is_valid())
            .map_or(u16::MAX, |t| t.minutes())
    });

    let with_end = schedulable.iter().filter(|i| i.time_end.is_some()).count();
    let mut items = if with_end * 2 > schedulable.len() {
        preserve_times(schedulable, options)
    } else {
        tracing::debug!(day = day.index, "few explicit end times, laying the day out from durations");
        heuristic_times(schedulable, options)
    };

    if !items.iter().any(Item::is_timed) {
        let s = options.schedule;
        items.push(Item::timed(s.day_start, Some(s.day_end), FREE_SLOT_ACTIVITY, ""));
    }
    items.extend(backups);

    let (mut timed, untimed): (Vec<Item>, Vec<Item>) = items.into_iter().partition(Item::is_timed);
    timed.sort_by_key(|i| i.time_start);
    timed.extend(untimed);
    day.items = timed;
}

fn duration_for(item: &Item, category: Category, durations: &DurationConfig) -> u16 {
    match category {
        Category::Meal => durations.meal,
        Category::Transport => durations.transport,
        _ => {
            let text = format!("{} {}", item.activity, item.location);
            let mentions = |keywords: &[String]| keywords.iter().any(|k| text.contains(k.as_str()));
            if mentions(&durations.heavy_keywords) {
                durations.heavy
            } else if mentions(&durations.medium_keywords) {
                durations.medium
            } else {
                durations.default
            }
        }
    }
}

/// Most items already carry explicit windows: keep them, clamp to the day
/// window, and fit untimed items in after the last one.
fn preserve_times(items: Vec<Item>, options: &RationalizeOptions<'_>) -> Vec<Item> {
    let s = options.schedule;
    let mut out = Vec::with_capacity(items.len());
    let mut pending = Vec::new();
    let mut cursor = s.day_start;

    for mut item in items {
        let Some(start) = item.time_start.filter(|t| t.is_valid()) else {
            item.clear_times();
            pending.push(item);
            continue;
        };
        let category = item.category();
        let estimated = start
            .plus_minutes(duration_for(&item, category, options.durations))
            .min(LAST_MINUTE);
        let end = item
            .time_end
            .filter(|e| e.is_valid() && *e > start)
            .unwrap_or(estimated);

        if category.ignores_day_window() {
            item.time_end = Some(end);
            if start >= s.day_start && start < s.day_end {
                cursor = cursor.max(end.min(s.day_end));
            }
        } else if start < s.day_start || start >= s.day_end {
            tracing::debug!(activity = %item.activity, %start, "outside the day window, kept as backup");
            item.demote_to_backup();
        } else {
            let end = end.min(s.day_end);
            item.time_end = Some(end);
            cursor = cursor.max(end);
        }
        out.push(item);
    }

    for mut item in pending {
        let end = cursor.plus_minutes(duration_for(&item, item.category(), options.durations));
        if end <= s.day_end {
            item.time_start = Some(cursor);
            item.time_end = Some(end);
            cursor = end;
        } else {
            item.demote_to_backup();
        }
        out.push(item);
    }
    out
}

fn meal_at(clock: ClockTime, options: &RationalizeOptions<'_>) -> Option<Item> {
    let within = |(from, to): (ClockTime, ClockTime)| clock >= from && clock < to;
    let label = if within(LUNCH) {
        "午餐"
    } else if within(DINNER) {
        "晚餐"
    } else {
        return None;
    };
    let end = clock.plus_minutes(options.durations.meal);
    if end > options.schedule.day_end {
        return None;
    }
    let mut meal = Item::timed(clock, Some(end), MEAL_ACTIVITY, "");
    meal.note = label.to_string();
    Some(meal)
}

/// Lay items out one after another from the start of the day, with
/// category durations, transfer buffers and at most one meal.
fn heuristic_times(items: Vec<Item>, options: &RationalizeOptions<'_>) -> Vec<Item> {
    let s = options.schedule;
    let mut out = Vec::with_capacity(items.len() + 2);
    let mut clock = s.day_start;
    let mut has_meal = items.iter().any(|i| i.category() == Category::Meal);
    let mut previous: Option<Category> = None;

    for mut item in items {
        let category = item.category();

        if !has_meal
            && category != Category::Meal
            && let Some(meal) = meal_at(clock, options)
        {
            clock = meal.time_end.unwrap_or(clock);
            out.push(meal);
            has_meal = true;
            previous = Some(Category::Meal);
        }

        let explicit = item
            .time_start
            .zip(item.time_end)
            .filter(|(start, end)| start.is_valid() && end.is_valid() && end > start)
            .map(|(start, end)| start.minutes_until(end));
        let duration = explicit.unwrap_or_else(|| duration_for(&item, category, options.durations));

        let needs_buffer = previous.is_some_and(|p| p != Category::Transport)
            && category != Category::Transport
            && category != Category::Meal;
        let buffer = if needs_buffer { s.transit_buffer_minutes } else { 0 };

        let start = clock.plus_minutes(buffer);
        let end = start.plus_minutes(duration);
        if end > s.day_end {
            tracing::debug!(activity = %item.activity, "does not fit before the day ends, kept as backup");
            item.demote_to_backup();
            out.push(item);
            continue;
        }

        if buffer > 0 {
            out.push(Item::timed(clock, Some(start), TRANSFER_ACTIVITY, ""));
        }
        item.time_start = Some(start);
        item.time_end = Some(end);
        clock = end;
        previous = Some(category);
        out.push(item);
    }

    if !has_meal
        && previous.is_some()
        && let Some(meal) = meal_at(clock, options)
    {
        out.push(meal);
    }
    out
}
