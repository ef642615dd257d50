use crate::model::category::{Category, INTERCITY_CORROBORATION, INTERCITY_KEYWORDS, contains_any};
use crate::model::config::ScheduleConfig;
use crate::model::itinerary::{Item, ItineraryDocument};

/// Activities that say nothing at all
const EMPTY_ACTIVITIES: &[&str] = &["无", "-", "—", "暂无", "n/a"];

/// Clear clock fields that cannot be right and keep sightseeing inside the
/// day window.
///
/// - hour 24 or later, or an end before the start: both fields cleared
/// - non-transport, non-lodging items starting before the window or at/after
///   its end: both fields cleared, the original time noted
/// - ends past the window end are clamped to it
pub fn sanitize_times(doc: &mut ItineraryDocument, schedule: &ScheduleConfig) {
    for day in &mut doc.days {
        for item in &mut day.items {
            sanitize_item_times(item, schedule);
        }
    }
}

fn sanitize_item_times(item: &mut Item, schedule: &ScheduleConfig) {
    let Some(start) = item.time_start else {
        item.time_end = None;
        return;
    };

    let impossible = !start.is_valid() || item.time_end.is_some_and(|end| !end.is_valid() || end < start);
    if impossible {
        tracing::debug!(activity = %item.activity, %start, "clearing impossible clock fields");
        item.clear_times();
        return;
    }

    if item.category().ignores_day_window() {
        return;
    }

    if start < schedule.day_start {
        item.push_note(&format!("原定 {} 开始，早于当日 {} 起始时间", start, schedule.day_start));
        item.clear_times();
    } else if start >= schedule.day_end {
        item.push_note(&format!("原定 {} 开始，晚于当日 {} 结束时间", start, schedule.day_end));
        item.clear_times();
    } else if item.time_end.is_some_and(|end| end > schedule.day_end) {
        item.time_end = Some(schedule.day_end);
    }
}

/// Train, flight and station legs are dropped unless the reference text
/// mentions that kind of travel. Returns how many items were removed.
pub fn remove_speculative_intercity_transport(doc: &mut ItineraryDocument, reference: &str) -> usize {
    if contains_any(reference, INTERCITY_CORROBORATION) {
        return 0;
    }
    let mut removed = 0;
    for day in &mut doc.days {
        let before = day.items.len();
        day.items.retain(|item| !is_intercity_transport(item));
        removed += before - day.items.len();
    }
    if removed > 0 {
        tracing::info!(removed, "dropped inter-city transport the source never mentions");
    }
    removed
}

fn is_intercity_transport(item: &Item) -> bool {
    contains_any(&item.activity, INTERCITY_KEYWORDS)
        || (item.category() == Category::Transport && contains_any(&item.location, INTERCITY_KEYWORDS))
}

/// Remove rows like `无` or `-` that carry neither an activity nor a place.
pub fn remove_empty_placeholder_items(doc: &mut ItineraryDocument) -> usize {
    let mut removed = 0;
    for day in &mut doc.days {
        let before = day.items.len();
        day.items.retain(|item| !is_empty_placeholder(item));
        removed += before - day.items.len();
    }
    removed
}

fn is_empty_placeholder(item: &Item) -> bool {
    let activity = item.activity.trim().to_lowercase();
    let hollow = activity.is_empty() || EMPTY_ACTIVITIES.contains(&activity.as_str());
    hollow && item.location.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::clock::ClockTime;
    use crate::model::itinerary::Day;

    fn t(s: &str) -> ClockTime {
        ClockTime::parse(s).unwrap()
    }

    fn doc_of(items: Vec<Item>) -> ItineraryDocument {
        let mut day = Day::new(3);
        day.items = items;
        ItineraryDocument {
            days: vec![day],
            appendix: vec![],
        }
    }

    #[test]
    fn impossible_times_are_cleared() {
        let mut doc = doc_of(vec![
            Item::timed(t("24:00"), Some(t("25:00")), "A", ""),
            Item::timed(t("20:00"), Some(t("19:00")), "B", ""),
            Item::timed(t("09:00"), Some(t("10:00")), "C", ""),
        ]);
        sanitize_times(&mut doc, &ScheduleConfig::default());
        let items = &doc.days[0].items;
        assert_eq!((items[0].time_start, items[0].time_end), (None, None));
        assert_eq!((items[1].time_start, items[1].time_end), (None, None));
        assert_eq!(items[2].time_start, Some(t("09:00")));
        assert_eq!(items[2].time_end, Some(t("10:00")));
    }

    #[test]
    fn sightseeing_stays_inside_the_window() {
        let mut doc = doc_of(vec![
            Item::timed(t("19:30"), Some(t("20:30")), "外滩", ""),
            Item::timed(t("20:00"), Some(t("21:00")), "上海新天地", ""),
            Item::timed(t("21:00"), Some(t("22:00")), "返程到酒店", ""),
            Item::timed(t("22:00"), Some(t("23:00")), "入住酒店", ""),
        ]);
        sanitize_times(&mut doc, &ScheduleConfig::default());
        let items = &doc.days[0].items;
        assert_eq!(items[0].time_start, Some(t("19:30")));
        assert_eq!(items[0].time_end, Some(t("20:00")));
        assert!(!items[1].is_timed());
        assert!(items[1].note.contains("20:00"));
        assert_eq!(items[2].time_start, Some(t("21:00")));
        assert_eq!(items[3].time_end, Some(t("23:00")));
    }

    #[test]
    fn early_sightseeing_cleared_but_early_departure_kept() {
        let mut doc = doc_of(vec![
            Item::timed(t("08:30"), Some(t("09:30")), "外滩", ""),
            Item::timed(t("07:30"), Some(t("08:30")), "出发前往外滩", ""),
        ]);
        sanitize_times(&mut doc, &ScheduleConfig::default());
        let items = &doc.days[0].items;
        assert!(!items[0].is_timed());
        assert!(items[0].note.contains("09:00"));
        assert_eq!(items[1].time_start, Some(t("07:30")));
    }

    #[test]
    fn sanitizing_twice_changes_nothing() {
        let mut doc = doc_of(vec![
            Item::timed(t("08:30"), Some(t("09:30")), "外滩", ""),
            Item::timed(t("19:30"), Some(t("20:30")), "豫园", ""),
        ]);
        let schedule = ScheduleConfig::default();
        sanitize_times(&mut doc, &schedule);
        let once = doc.clone();
        sanitize_times(&mut doc, &schedule);
        assert_eq!(doc, once);
    }

    #[test]
    fn unmentioned_intercity_transport_is_removed() {
        let reference = "# 团建行程方案\n\n## 行程\n- 上海 citywalk\n";
        let mut blank = Item::untimed("无");
        blank.note = String::new();
        let mut station = Item::timed(t("20:00"), Some(t("22:00")), "乘高铁返程", "");
        station.location = "虹桥火车站".to_string();
        let mut doc = doc_of(vec![
            Item::timed(t("18:00"), Some(t("19:00")), "上海新天地", ""),
            station,
            Item::timed(t("22:00"), Some(t("23:00")), "前往机场乘机", "浦东机场"),
            blank,
        ]);
        assert_eq!(remove_speculative_intercity_transport(&mut doc, reference), 2);
        assert_eq!(remove_empty_placeholder_items(&mut doc), 1);
        let acts: Vec<&str> = doc.days[0].items.iter().map(|i| i.activity.as_str()).collect();
        assert_eq!(acts, vec!["上海新天地"]);
    }

    #[test]
    fn mentioned_intercity_transport_is_kept() {
        let mut item = Item::untimed("乘高铁出发");
        item.location = "虹桥火车站".to_string();
        let mut doc = doc_of(vec![item]);
        assert_eq!(remove_speculative_intercity_transport(&mut doc, "交通：高铁 G1234\n"), 0);
        assert_eq!(doc.days[0].items.len(), 1);
    }

    #[test]
    fn visits_near_stations_are_not_transport() {
        let mut doc = doc_of(vec![Item::timed(t("10:00"), None, "游览", "虹桥火车站旁公园")]);
        assert_eq!(remove_speculative_intercity_transport(&mut doc, "上海 citywalk"), 0);
    }
}
