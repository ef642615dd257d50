use std::sync::LazyLock;

use regex::Regex;

use crate::parse::normalize::{parse_day_number, strip_decorations};

/// Which of the recognized dialects introduced a day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingDialect {
    /// `## Day 3（2026-01-19）`
    Strict,
    /// `DAY3：A→B`, `**D3**`, `### day 3 (Mon)`
    Loose,
    /// `第3天：...`, `第三天`
    Chinese,
}

/// A recognized day heading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayHeading {
    pub index: u32,
    pub date_label: Option<String>,
    /// Text after a colon on the heading line; counts as the day's first item
    pub inline: Option<String>,
    pub dialect: HeadingDialect,
}

/// Highest day number read as a day. Larger numbers are not day markers.
pub const MAX_DAY_INDEX: u32 = 999;

fn day_index(digits: &str) -> Option<u32> {
    digits.parse().ok().filter(|&n| n <= MAX_DAY_INDEX)
}

static STRICT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^##\s*Day\s*(\d+)\s*(?:（(.*)）)?\s*$").unwrap());

static LOOSE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:#{1,6}\s*)?(?:\*\*)?\s*(?:day|d)\s*(\d+)\s*(?:\*\*)?\s*(?:（(.*)）|\((.*)\))?\s*(?:[:：]\s*(.*))?$",
    )
    .unwrap()
});

static CHINESE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:#{1,6}\s*)?(?:\*\*)?\s*第\s*(\d+)\s*天\s*(?:\*\*)?\s*(?:[:：]\s*(.*))?$")
        .unwrap()
});

/// Lenient Latin marker used on decoration-stripped free text: `D1`, `Day 2 (Mon): ...`, `day3 静安寺`
static MARKER_LATIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:day|d)\s*(\d{1,3})\s*(?:\*\*)?\s*(?:[（(]([^）)]*)[）)])?\s*(?:\*\*)?\s*(?:[:：]\s*(.*)|\s+(.*))?$",
    )
    .unwrap()
});

/// Lenient Chinese marker with numeral words: `第一天`, `第十二天（周六）：...`
static MARKER_CHINESE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^第\s*([0-9一二两三四五六七八九十]+)\s*天\s*(?:\*\*)?\s*(?:[（(]([^）)]*)[）)])?\s*(?:\*\*)?\s*(?:[:：]\s*(.*)|\s+(.*))?$",
    )
    .unwrap()
});

fn non_empty(m: Option<regex::Match<'_>>) -> Option<String> {
    m.map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Match a normalized line against the canonical grammar's three heading
/// forms, in order: strict, loose, Chinese.
pub fn parse_day_heading(line: &str) -> Option<DayHeading> {
    if let Some(caps) = STRICT.captures(line) {
        return Some(DayHeading {
            index: day_index(&caps[1])?,
            date_label: non_empty(caps.get(2)),
            inline: None,
            dialect: HeadingDialect::Strict,
        });
    }

    if let Some(caps) = LOOSE.captures(line) {
        return Some(DayHeading {
            index: day_index(&caps[1])?,
            date_label: non_empty(caps.get(2)).or_else(|| non_empty(caps.get(3))),
            inline: non_empty(caps.get(4)),
            dialect: HeadingDialect::Loose,
        });
    }

    if let Some(caps) = CHINESE.captures(line) {
        return Some(DayHeading {
            index: day_index(&caps[1])?,
            date_label: None,
            inline: non_empty(caps.get(2)),
            dialect: HeadingDialect::Chinese,
        });
    }

    None
}

/// Find a day marker in free text. Accepts everything `parse_day_heading`
/// does, plus markers inside bullets or after emoji, Chinese numeral words,
/// and trailing text separated by whitespace instead of a colon.
pub fn find_day_marker(line: &str) -> Option<DayHeading> {
    if let Some(heading) = parse_day_heading(line) {
        return Some(heading);
    }

    let body = strip_decorations(line);
    if let Some(caps) = MARKER_LATIN.captures(body) {
        return Some(DayHeading {
            index: day_index(&caps[1])?,
            date_label: non_empty(caps.get(2)),
            inline: non_empty(caps.get(3)).or_else(|| non_empty(caps.get(4))),
            dialect: HeadingDialect::Loose,
        });
    }

    if let Some(caps) = MARKER_CHINESE.captures(body) {
        return Some(DayHeading {
            index: parse_day_number(&caps[1]).filter(|&n| n <= MAX_DAY_INDEX)?,
            date_label: non_empty(caps.get(2)),
            inline: non_empty(caps.get(3)).or_else(|| non_empty(caps.get(4))),
            dialect: HeadingDialect::Chinese,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_heading_with_date() {
        let h = parse_day_heading("## Day 1（2026-01-19）").unwrap();
        assert_eq!(h.index, 1);
        assert_eq!(h.date_label.as_deref(), Some("2026-01-19"));
        assert_eq!(h.inline, None);
        assert_eq!(h.dialect, HeadingDialect::Strict);
    }

    #[test]
    fn loose_heading_with_inline_route() {
        let h = parse_day_heading("DAY1：巴洛克风情街→索菲亚教堂").unwrap();
        assert_eq!(h.index, 1);
        assert_eq!(h.inline.as_deref(), Some("巴洛克风情街→索菲亚教堂"));
        assert_eq!(h.dialect, HeadingDialect::Loose);
    }

    #[test]
    fn loose_heading_variants() {
        assert_eq!(parse_day_heading("D3：返程").unwrap().index, 3);
        assert_eq!(parse_day_heading("### **Day 2**").unwrap().index, 2);
        let h = parse_day_heading("Day 4 (Sat): 自由活动").unwrap();
        assert_eq!(h.date_label.as_deref(), Some("Sat"));
        assert_eq!(h.inline.as_deref(), Some("自由活动"));
    }

    #[test]
    fn chinese_heading() {
        let h = parse_day_heading("第1天：中央大街→索菲亚教堂").unwrap();
        assert_eq!(h.index, 1);
        assert_eq!(h.dialect, HeadingDialect::Chinese);
        assert!(parse_day_heading("第一天：拙政园").is_none());
    }

    #[test]
    fn prose_is_not_a_heading() {
        assert!(parse_day_heading("Dinner at 7").is_none());
        assert!(parse_day_heading("- 09:00 - 10:00 | 游览 | 外滩 |").is_none());
        assert!(parse_day_heading("## 行程路线").is_none());
    }

    #[test]
    fn marker_inside_bullet_and_after_emoji() {
        let h = find_day_marker("  - **Day2**：愚园路-安福路").unwrap();
        assert_eq!(h.index, 2);
        assert_eq!(h.inline.as_deref(), Some("愚园路-安福路"));

        let h = find_day_marker("🏷️day3: 静安寺-马勒别墅").unwrap();
        assert_eq!(h.index, 3);
        assert_eq!(h.inline.as_deref(), Some("静安寺-马勒别墅"));
    }

    #[test]
    fn marker_with_chinese_numerals() {
        let h = find_day_marker("第一天：古典园林与文化体验").unwrap();
        assert_eq!(h.index, 1);
        assert_eq!(h.inline.as_deref(), Some("古典园林与文化体验"));

        let h = find_day_marker("第二天：").unwrap();
        assert_eq!(h.index, 2);
        assert_eq!(h.inline, None);

        assert_eq!(find_day_marker("第十二天（周六）").unwrap().index, 12);
    }

    #[test]
    fn oversized_day_numbers_are_not_markers() {
        assert_eq!(parse_day_heading("## Day 999").unwrap().index, MAX_DAY_INDEX);
        assert!(parse_day_heading("## Day 1000").is_none());
        assert!(parse_day_heading("Day 4294967295：外滩").is_none());
        assert!(find_day_marker("- **Day 4294967295**：外滩").is_none());
        assert!(find_day_marker("第1000天：外滩").is_none());
    }

    #[test]
    fn booking_window_is_not_a_marker() {
        assert!(find_day_marker("提前1-7天在公众号预约").is_none());
        assert!(find_day_marker("哈尔滨3天2夜路线：").is_none());
    }
}
