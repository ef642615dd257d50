use crate::model::clock::ClockTime;
use crate::model::itinerary::{Day, Item, ItineraryDocument};
use crate::parse::item_line::BACKUP_MARKER;
use crate::parse::itinerary_parser::APPENDIX_HEADER;
use crate::parse::normalize::sanitize_cell;

pub const TITLE: &str = "# 行程安排";
pub const VERSION_LINE: &str = "> 版本: v2";

/// Activity used when a row would otherwise have none
pub const PLACEHOLDER_ACTIVITY: &str = "行程整理";
/// Start time of the placeholder row given to days with no timed item
pub const PLACEHOLDER_START: ClockTime = ClockTime::hm(9, 0);

/// Render a document as canonical v2 markdown.
///
/// Timed items become `- HH:MM - HH:MM | activity | location | note` rows.
/// Items without a valid start time, day notes and the global appendix are
/// emitted as quoted lines, which the grammar treats as comments, so they
/// can never make the output invalid. A day left without any timed row gets
/// a `行程整理` placeholder row so it is never empty.
pub fn render(doc: &ItineraryDocument) -> String {
    let mut lines: Vec<String> = vec![TITLE.to_string(), VERSION_LINE.to_string(), String::new()];

    for day in &doc.days {
        render_day(day, &mut lines);
        lines.push(String::new());
    }

    let appendix: Vec<String> = doc
        .appendix
        .iter()
        .map(|l| sanitize_cell(l))
        .filter(|l| !l.is_empty())
        .collect();
    if !appendix.is_empty() {
        lines.push(format!("> {}", APPENDIX_HEADER));
        lines.extend(appendix.into_iter().map(|l| format!("> {}", l)));
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn render_day(day: &Day, lines: &mut Vec<String>) {
    let label = day
        .date_label
        .as_deref()
        .map(|l| sanitize_cell(l).replace(['（', '）', '(', ')'], ""))
        .filter(|l| !l.is_empty());
    match label {
        Some(label) => lines.push(format!("## Day {}（{}）", day.index, label)),
        None => lines.push(format!("## Day {}", day.index)),
    }

    let (timed, backups): (Vec<&Item>, Vec<&Item>) = day
        .items
        .iter()
        .partition(|i| i.time_start.is_some_and(|t| t.is_valid()));

    if timed.is_empty() {
        lines.push(render_row(&Item::timed(PLACEHOLDER_START, None, PLACEHOLDER_ACTIVITY, "")));
    }
    for item in timed {
        lines.push(render_row(item));
    }
    for item in backups {
        lines.push(render_backup(item));
    }
    for note in &day.notes {
        let note = sanitize_cell(note);
        if !note.is_empty() {
            lines.push(format!("> {}", note));
        }
    }
}

fn activity_cell(item: &Item) -> String {
    let activity = sanitize_cell(&item.activity);
    if activity.is_empty() {
        PLACEHOLDER_ACTIVITY.to_string()
    } else {
        activity
    }
}

/// Render one timed row. The caller guarantees a valid start time.
pub fn render_row(item: &Item) -> String {
    let start = item
        .time_start
        .map(|t| t.to_string())
        .unwrap_or_default();
    let end = item
        .time_end
        .filter(|t| t.is_valid())
        .map(|t| t.to_string());
    let time = match end {
        Some(end) => format!("{} - {}", start, end),
        None => format!("{} -", start),
    };
    let line = format!(
        "- {} | {} | {} | {}",
        time,
        activity_cell(item),
        sanitize_cell(&item.location),
        sanitize_cell(&item.note)
    );
    line.trim_end().to_string()
}

fn render_backup(item: &Item) -> String {
    let line = format!(
        "> {} | {} | {} | {}",
        BACKUP_MARKER,
        activity_cell(item),
        sanitize_cell(&item.location),
        sanitize_cell(&item.note)
    );
    line.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::check::validate;
    use crate::parse::itinerary_parser::parse_itinerary;

    fn t(s: &str) -> ClockTime {
        ClockTime::parse(s).unwrap()
    }

    fn sample() -> ItineraryDocument {
        let mut day1 = Day::new(1);
        day1.date_label = Some("2026-01-19".to_string());
        day1.items.push(Item::timed(t("09:00"), Some(t("10:30")), "参观", "南京路步行街"));
        day1.items.push(Item::timed(t("11:00"), None, "用餐", ""));
        let mut backup = Item::untimed("外白渡桥");
        backup.note = "超出当日时间窗".to_string();
        day1.items.push(backup);
        day1.notes.push("住宿：外滩酒店".to_string());

        let mut day2 = Day::new(2);
        day2.items.push(Item::timed(t("09:00"), Some(t("10:00")), "游览", "愚园路"));

        ItineraryDocument {
            days: vec![day1, day2],
            appendix: vec!["门票需提前预约".to_string()],
        }
    }

    #[test]
    fn renders_canonical_text() {
        let expected = "\
# 行程安排
> 版本: v2

## Day 1（2026-01-19）
- 09:00 - 10:30 | 参观 | 南京路步行街 |
- 11:00 - | 用餐 |  |
> 备选 | 外白渡桥 |  | 超出当日时间窗
> 住宿：外滩酒店

## Day 2
- 09:00 - 10:00 | 游览 | 愚园路 |

> 附加信息（非行程，仅供参考）
> 门票需提前预约
";
        assert_eq!(render(&sample()), expected);
    }

    #[test]
    fn render_then_parse_is_lossless() {
        let doc = sample();
        let parsed = parse_itinerary(&render(&doc));
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        assert_eq!(parsed.document, doc);
    }

    #[test]
    fn hostile_cells_are_neutralized() {
        let mut day = Day::new(1);
        day.date_label = Some("（周一）".to_string());
        day.items.push(Item::timed(t("09:00"), None, "A | B\nC", "x|y"));
        day.items.push(Item::timed(t("10:00"), None, "  ", ""));
        let doc = ItineraryDocument {
            days: vec![day],
            appendix: vec![],
        };
        let out = render(&doc);
        assert!(out.contains("## Day 1（周一）"));
        assert!(out.contains("- 09:00 - | A / B C | x/y |"));
        assert!(out.contains("- 10:00 - | 行程整理 |  |"));
        assert!(parse_itinerary(&out).errors.is_empty());
    }

    #[test]
    fn out_of_range_start_renders_as_backup() {
        let mut day = Day::new(1);
        day.items.push(Item::timed(t("09:00"), Some(t("25:00")), "A", ""));
        day.items.push(Item::timed(t("24:30"), None, "B", ""));
        let out = render(&ItineraryDocument {
            days: vec![day],
            appendix: vec![],
        });
        assert!(out.contains("- 09:00 - | A |  |"));
        assert!(out.contains("> 备选 | B |  |"));
    }

    #[test]
    fn days_without_timed_rows_get_a_placeholder() {
        let mut backups_only = Day::new(1);
        backups_only.items.push(Item::untimed("备选：外滩"));
        let empty = Day::new(2);
        let out = render(&ItineraryDocument {
            days: vec![backups_only, empty],
            appendix: vec![],
        });
        assert!(out.contains("## Day 1\n- 09:00 - | 行程整理 |  |\n> 备选 |"));
        assert!(out.contains("## Day 2\n- 09:00 - | 行程整理 |  |"));
        assert!(validate(&out).valid, "{}", out);
    }
}
