use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::model::clock::ClockTime;
use crate::model::itinerary::Item;
use crate::parse::normalize::{normalize_pipes, normalize_time_range, strip_invisible};

/// Marker column that opens a backup row: `> 备选 | activity | location | note`
pub const BACKUP_MARKER: &str = "备选";

static TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2})\s*-\s*(?:(\d{1,2}):(\d{2}))?\s*$").unwrap()
});

/// Why an item row failed the grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum ItemLineError {
    #[error("行项目格式错误：需要至少包含「时间 | 活动」")]
    MissingColumns,
    #[error("活动不能为空")]
    EmptyActivity,
    #[error("时间格式错误：应为「HH:MM - HH:MM」（结束时间可留空）")]
    BadTimeFormat,
    #[error("时间超出范围：小时应为 00-23，分钟应为 00-59")]
    TimeOutOfRange,
}

/// Parse the time column of a row (`HH:MM - HH:MM`, end optional).
pub fn parse_time_column(column: &str) -> Result<(ClockTime, Option<ClockTime>), ItemLineError> {
    let normalized = normalize_time_range(column);
    let caps = TIME_RANGE
        .captures(&normalized)
        .ok_or(ItemLineError::BadTimeFormat)?;

    let clock = |h: &str, m: &str| -> Result<ClockTime, ItemLineError> {
        let hour: u16 = h.parse().map_err(|_| ItemLineError::BadTimeFormat)?;
        let minute: u16 = m.parse().map_err(|_| ItemLineError::BadTimeFormat)?;
        ClockTime::new(hour, minute)
            .filter(|t| t.is_valid())
            .ok_or(ItemLineError::TimeOutOfRange)
    };

    let start = clock(&caps[1], &caps[2])?;
    let end = match (caps.get(3), caps.get(4)) {
        (Some(h), Some(m)) => Some(clock(h.as_str(), m.as_str())?),
        _ => None,
    };
    Ok((start, end))
}

/// Split a row body on `|` into trimmed columns
fn columns(body: &str) -> Vec<String> {
    normalize_pipes(body)
        .split('|')
        .map(|c| strip_invisible(c).trim().to_string())
        .collect()
}

/// Parse an item row: `- HH:MM - HH:MM | activity | location | note`.
/// The leading dash is optional so callers can pass either the raw line or its body.
pub fn parse_item_row(line: &str) -> Result<Item, ItemLineError> {
    let body = line.trim_start();
    let body = body.strip_prefix('-').unwrap_or(body).trim_start();

    let cols = columns(body);
    if cols.len() < 2 {
        return Err(ItemLineError::MissingColumns);
    }
    if cols[1].is_empty() {
        return Err(ItemLineError::EmptyActivity);
    }
    let (start, end) = parse_time_column(&cols[0])?;

    Ok(Item {
        time_start: Some(start),
        time_end: end,
        activity: cols[1].clone(),
        location: cols.get(2).cloned().unwrap_or_default(),
        note: cols.get(3).cloned().unwrap_or_default(),
    })
}

/// Parse the body of a quoted backup row (`备选 | activity | location | note`).
/// Returns None for ordinary quoted notes.
pub fn parse_backup_row(body: &str) -> Option<Item> {
    let cols = columns(body);
    if cols.len() < 2 || cols[0] != BACKUP_MARKER || cols[1].is_empty() {
        return None;
    }
    let mut item = Item::untimed(cols[1].clone());
    item.location = cols.get(2).cloned().unwrap_or_default();
    item.note = cols.get(3).cloned().unwrap_or_default();
    Some(item)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_row() {
        let item = parse_item_row("- 09:00 - 10:30 | 参观 | 南京路步行街 | 人多").unwrap();
        assert_eq!(item.time_start.unwrap().to_string(), "09:00");
        assert_eq!(item.time_end.unwrap().to_string(), "10:30");
        assert_eq!(item.activity, "参观");
        assert_eq!(item.location, "南京路步行街");
        assert_eq!(item.note, "人多");
    }

    #[test]
    fn empty_end_keeps_hyphen() {
        let item = parse_item_row("- 09:00 -  | 游览 | 冰雪大世界 |  |").unwrap();
        assert!(item.time_end.is_none());
        assert_eq!(item.location, "冰雪大世界");
        assert_eq!(parse_item_row("- 09:00 | 游览"), Err(ItemLineError::BadTimeFormat));
    }

    #[test]
    fn fullwidth_glyphs_are_normalized() {
        let item = parse_item_row("- 9：00 — 10：00 ｜ 早茶").unwrap();
        assert_eq!(item.time_start.unwrap().to_string(), "09:00");
        assert_eq!(item.activity, "早茶");
        assert_eq!(item.location, "");
    }

    #[test]
    fn errors_in_grammar_order() {
        assert_eq!(parse_item_row("- 09:00 - 10:00"), Err(ItemLineError::MissingColumns));
        assert_eq!(parse_item_row("- 09:00 - 10:00 |  | 外滩"), Err(ItemLineError::EmptyActivity));
        assert_eq!(parse_item_row("- - | 欧堡酒店 |"), Err(ItemLineError::BadTimeFormat));
        assert_eq!(parse_item_row("- 24:00 - 25:00 | A"), Err(ItemLineError::TimeOutOfRange));
        assert_eq!(parse_item_row("- 09:75 - | A"), Err(ItemLineError::TimeOutOfRange));
    }

    #[test]
    fn backup_rows() {
        let item = parse_backup_row("备选 | 外白渡桥 |  | 超出时间窗").unwrap();
        assert_eq!(item.activity, "外白渡桥");
        assert!(!item.is_timed());
        assert_eq!(item.note, "超出时间窗");
        assert!(parse_backup_row("住宿：外滩酒店").is_none());
        assert!(parse_backup_row("备选 |  |").is_none());
    }
}
