use std::collections::HashSet;

use serde::Serialize;

use crate::model::itinerary::{Day, Item, ItineraryDocument};
use crate::parse::day_heading::parse_day_heading;
use crate::parse::item_line::{ItemLineError, parse_backup_row, parse_item_row};
use crate::parse::normalize::{normalize_line, normalize_pipes};

/// Heading line of the global appendix block
pub const APPENDIX_HEADER: &str = "附加信息（非行程，仅供参考）";

/// A structural violation of the canonical grammar. Messages are written for
/// the person (or model) who has to fix the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GrammarError {
    #[error("第 {line} 行：行项目必须放在某个 Day 标题下方")]
    ItemOutsideDay { line: usize },
    #[error("第 {line} 行：{reason}")]
    BadItem { line: usize, reason: ItemLineError },
    #[error("第 {line} 行：无法识别的内容（请使用 Day 标题或 \"-\" 行项目）")]
    Unrecognized { line: usize },
    #[error("第 {line} 行：Day {day} 重复出现")]
    DuplicateDay { line: usize, day: u32 },
    #[error("Day {day} 下未找到任何行项目（以 \"-\" 开头）")]
    EmptyDay { day: u32 },
    #[error("未找到任何 Day 标题（例如：## Day 1（日期））")]
    NoDays,
}

/// Result of reading canonical (or near-canonical) itinerary markdown
#[derive(Debug, Clone, Default)]
pub struct ParsedItinerary {
    pub document: ItineraryDocument,
    pub errors: Vec<GrammarError>,
    /// Number of day headings seen (repeats included)
    pub day_count: usize,
    /// Number of rows that satisfy the grammar, inline heading items included
    pub item_count: usize,
}

/// Parse itinerary markdown into a document, collecting every grammar
/// violation in a single pass instead of stopping at the first one.
///
/// Quoted lines are structural comments for validation purposes, but inside
/// a day they still carry backup rows (`> 备选 | ...`) and day notes, and after
/// the appendix header they carry the global appendix.
pub fn parse_itinerary(markdown: &str) -> ParsedItinerary {
    let text = normalize_pipes(&markdown.replace('\r', ""));
    let mut parsed = ParsedItinerary::default();

    let mut current: Option<usize> = None;
    let mut current_has_item = false;
    let mut in_appendix = false;
    let mut seen: HashSet<u32> = HashSet::new();

    for (i, raw) in text.split('\n').enumerate() {
        let line_no = i + 1;
        let line = normalize_line(raw);
        if line.is_empty() || line == "#" || line.starts_with("# ") {
            continue;
        }

        if let Some(quoted) = line.strip_prefix('>') {
            let body = quoted.trim();
            if body == APPENDIX_HEADER {
                in_appendix = true;
            } else if body.is_empty() {
                // blank quote
            } else if in_appendix {
                parsed.document.appendix.push(body.to_string());
            } else if let Some(pos) = current {
                let day = &mut parsed.document.days[pos];
                match parse_backup_row(body) {
                    Some(item) => day.items.push(item),
                    None => day.notes.push(body.to_string()),
                }
            }
            continue;
        }

        if let Some(heading) = parse_day_heading(&line) {
            close_day(&mut parsed, current, current_has_item);
            parsed.day_count += 1;
            in_appendix = false;

            if !seen.insert(heading.index) {
                parsed.errors.push(GrammarError::DuplicateDay {
                    line: line_no,
                    day: heading.index,
                });
            }
            let pos = match parsed
                .document
                .days
                .iter()
                .position(|d| d.index == heading.index)
            {
                Some(pos) => pos,
                None => {
                    let mut day = Day::new(heading.index);
                    day.date_label = heading.date_label.clone();
                    parsed.document.days.push(day);
                    parsed.document.days.len() - 1
                }
            };
            current = Some(pos);
            current_has_item = false;

            if let Some(inline) = heading.inline {
                parsed.document.days[pos].items.push(Item::untimed(inline));
                parsed.item_count += 1;
                current_has_item = true;
            }
            continue;
        }

        if line.starts_with("- ") {
            let Some(pos) = current else {
                parsed.errors.push(GrammarError::ItemOutsideDay { line: line_no });
                continue;
            };
            match parse_item_row(&line) {
                Ok(item) => {
                    parsed.document.days[pos].items.push(item);
                    parsed.item_count += 1;
                    current_has_item = true;
                }
                Err(reason) => parsed.errors.push(GrammarError::BadItem {
                    line: line_no,
                    reason,
                }),
            }
            continue;
        }

        // Preamble before the first day is free text
        if current.is_none() {
            continue;
        }

        parsed.errors.push(GrammarError::Unrecognized { line: line_no });
    }

    if parsed.day_count == 0 {
        parsed.errors.push(GrammarError::NoDays);
    } else {
        close_day(&mut parsed, current, current_has_item);
    }

    parsed
}

fn close_day(parsed: &mut ParsedItinerary, current: Option<usize>, has_item: bool) {
    if let Some(pos) = current
        && !has_item
    {
        let day = parsed.document.days[pos].index;
        parsed.errors.push(GrammarError::EmptyDay { day });
    }
}
