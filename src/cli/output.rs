use serde::Serialize;

use crate::model::itinerary::{Item, ItineraryDocument};
use crate::ops::check::ValidationResult;
use crate::ops::guardrail::PoisByDay;
use crate::util::unicode::{display_width, pad_to_width};

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

/// A transformed document, both as markdown and as structure
#[derive(Serialize)]
pub struct DocumentJson<'a> {
    pub markdown: &'a str,
    pub document: &'a ItineraryDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub appended: Option<usize>,
}

#[derive(Serialize)]
pub struct DayPoisJson {
    pub day: u32,
    pub pois: Vec<String>,
}

pub fn pois_json(pois: &PoisByDay) -> Vec<DayPoisJson> {
    pois.iter()
        .map(|(&day, names)| DayPoisJson {
            day,
            pois: names.clone(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Text output
// ---------------------------------------------------------------------------

pub fn format_validation(result: &ValidationResult) -> Vec<String> {
    let mut lines = Vec::new();
    if !result.errors.is_empty() {
        lines.push("Errors:".to_string());
        lines.extend(result.messages().into_iter().map(|m| format!("  {}", m)));
        lines.push(String::new());
    }
    let summary = format!("{} day(s), {} item(s)", result.days, result.items);
    if result.valid {
        lines.push(format!("✓ valid: {}", summary));
    } else {
        lines.push(format!("✗ invalid: {}", summary));
    }
    lines
}

pub fn format_pois(pois: &PoisByDay) -> Vec<String> {
    if pois.is_empty() {
        return vec!["(no POIs found)".to_string()];
    }
    pois.iter()
        .map(|(day, names)| format!("Day {}: {}", day, names.join(" → ")))
        .collect()
}

fn time_cell(item: &Item) -> String {
    match (item.time_start, item.time_end) {
        (Some(start), Some(end)) => format!("{}-{}", start, end),
        (Some(start), None) => format!("{}-", start),
        _ => "--".to_string(),
    }
}

/// A document as an aligned, human-readable agenda. Columns are padded by
/// display width so CJK text lines up.
pub fn format_agenda(doc: &ItineraryDocument) -> Vec<String> {
    let mut lines = Vec::new();

    for day in &doc.days {
        match &day.date_label {
            Some(label) => lines.push(format!("Day {}（{}）", day.index, label)),
            None => lines.push(format!("Day {}", day.index)),
        }

        let rows: Vec<[String; 4]> = day
            .items
            .iter()
            .map(|i| [time_cell(i), i.activity.clone(), i.location.clone(), i.note.clone()])
            .collect();
        let width = |col: usize| rows.iter().map(|r| display_width(&r[col])).max().unwrap_or(0);
        let widths = [width(0), width(1), width(2)];

        for row in &rows {
            let line = format!(
                "  {}  {}  {}  {}",
                pad_to_width(&row[0], widths[0]),
                pad_to_width(&row[1], widths[1]),
                pad_to_width(&row[2], widths[2]),
                row[3]
            );
            lines.push(line.trim_end().to_string());
        }
        for note in &day.notes {
            lines.push(format!("  > {}", note));
        }
        lines.push(String::new());
    }

    if !doc.appendix.is_empty() {
        lines.push("附加信息".to_string());
        lines.extend(doc.appendix.iter().map(|a| format!("  {}", a)));
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::check::validate;

    #[test]
    fn validation_lines() {
        let lines = format_validation(&validate("## Day 1\n- 09:00 - | 游览 | 外滩 |\n"));
        assert_eq!(lines, vec!["✓ valid: 1 day(s), 1 item(s)".to_string()]);

        let lines = format_validation(&validate(""));
        assert_eq!(lines[0], "Errors:");
        assert!(lines.last().unwrap().starts_with("✗ invalid"));
    }

    #[test]
    fn agenda_aligns_wide_text() {
        let md = "\
## Day 1（2026-01-19）
- 09:00 - 10:00 | 游览 | 外滩 |
> 备选 | 自由活动 | 城隍庙 | 看天气
> 住宿：外滩酒店
";
        let doc = crate::parse::parse_itinerary(md).document;
        assert_eq!(
            format_agenda(&doc),
            vec![
                "Day 1（2026-01-19）".to_string(),
                "  09:00-10:00  游览      外滩".to_string(),
                "  --           自由活动  城隍庙  看天气".to_string(),
                "  > 住宿：外滩酒店".to_string(),
            ]
        );
    }

    #[test]
    fn poi_lines() {
        let mut pois = PoisByDay::new();
        pois.insert(2, vec!["愚园路".to_string(), "武康路".to_string()]);
        assert_eq!(format_pois(&pois), vec!["Day 2: 愚园路 → 武康路".to_string()]);
        assert_eq!(format_pois(&PoisByDay::new()), vec!["(no POIs found)".to_string()]);
    }
}
