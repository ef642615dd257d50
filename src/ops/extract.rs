use std::borrow::Cow;
use std::sync::LazyLock;

use chrono::NaiveDate;
use indexmap::IndexMap;
use regex::Regex;

use crate::model::category::Category;
use crate::model::clock::ClockTime;
use crate::model::config::ExtractConfig;
use crate::model::itinerary::{Day, Item, ItineraryDocument, lodging_note};
use crate::ops::guardrail::max_explicit_day_marker;
use crate::parse::day_heading::{DayHeading, MAX_DAY_INDEX, find_day_marker};
use crate::parse::item_line::{parse_backup_row, parse_item_row};
use crate::parse::itinerary_parser::APPENDIX_HEADER;
use crate::parse::itinerary_serializer::{PLACEHOLDER_ACTIVITY, PLACEHOLDER_START, TITLE, VERSION_LINE, render};
use crate::parse::normalize::{
    collapse_whitespace, normalize_line, normalize_pipes, starts_with_decimal, strip_decorations,
};
use crate::parse::poi_chain::split_poi_chain;
use crate::util::unicode::{ELLIPSIS, grapheme_count, truncate_graphemes};

/// Longest line that can still be read as a section header
const SECTION_HEADER_MAX_CHARS: usize = 40;
/// Longest echo of the source kept in the placeholder item of an unstructured input
const ECHO_MAX_CHARS: usize = 80;
const CHAIN_FIRST_HOUR: u16 = 9;
const CHAIN_LAST_HOUR: u16 = 23;

/// Fixed clock windows for time-of-day words
const TIME_OF_DAY_WINDOWS: &[(&str, ClockTime, ClockTime)] = &[
    ("早上", ClockTime::hm(8, 0), ClockTime::hm(9, 0)),
    ("早晨", ClockTime::hm(8, 0), ClockTime::hm(9, 0)),
    ("上午", ClockTime::hm(9, 0), ClockTime::hm(11, 30)),
    ("中午", ClockTime::hm(11, 30), ClockTime::hm(13, 0)),
    ("下午", ClockTime::hm(13, 0), ClockTime::hm(15, 30)),
    ("傍晚", ClockTime::hm(17, 0), ClockTime::hm(18, 30)),
    ("晚上", ClockTime::hm(19, 0), ClockTime::hm(20, 30)),
    ("夜间", ClockTime::hm(20, 30), ClockTime::hm(22, 0)),
];

static EXPLICIT_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[（(]?\s*(\d{1,2})\s*[:：]\s*(\d{2})\s*(?:-|—|–|－|~|～|〜|至|到)\s*(\d{1,2})\s*[:：]\s*(\d{2})\s*[）)]?",
    )
    .unwrap()
});

static TIME_OF_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\*\*)?(早上|早晨|上午|中午|下午|傍晚|晚上|夜间)(?:\*\*)?\s*[:：]\s*(.+)$").unwrap()
});

static HINT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\*\*)?(?:早上|早晨|上午|中午|下午|傍晚|晚上|夜间)(?:\*\*)?\s*[:：]?\s*").unwrap()
});

static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*+•·▪◆◇■□●○]\s*|\d{1,2}\s*[.、)）]\s*|[一二三四五六七八九十]+\s*、\s*|[①-⑳]\s*)")
        .unwrap()
});

static NUMBERED_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d{1,2}\s*[.、)）]\s*[^\d\s]|[一二三四五六七八九十]+\s*、|[①-⑳]|[•▪◆◇■□●○])").unwrap()
});

static FULL_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})\s*[-/.年]\s*(\d{1,2})\s*[-/.月]\s*(\d{1,2})\s*[日号]?(.*)$").unwrap()
});

static MONTH_DAY_CN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})\s*月\s*(\d{1,2})\s*[日号](.*)$").unwrap());

static MONTH_DAY_NUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})[/.](\d{1,2})((?:[\s:：，,（(].*)?)$").unwrap());

/// `1.5 小时`, `2.5 公里`: a number with a unit, not a `M.D` date
static QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,2}[./]\d{1,2}\s*(?:个\s*)?(?:小时|分钟|公里|千米|元|块|倍|折|km\b|h\b|min\b)").unwrap()
});

static WEEKDAY_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[（(][^）)]*[）)]|(?:星期|周)[一二三四五六日天])\s*").unwrap()
});

// ---------------------------------------------------------------------------
// Line classification
// ---------------------------------------------------------------------------

/// Drop a leading bullet or list number. A decimal such as `1.5` is kept whole.
fn strip_list_marker(line: &str) -> Cow<'_, str> {
    if starts_with_decimal(line) {
        Cow::Borrowed(line)
    } else {
        LIST_MARKER.replace(line, "")
    }
}

/// An entry that carries a clock window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedEntry {
    pub start: ClockTime,
    pub end: Option<ClockTime>,
    pub text: String,
}

/// What one source line was recognized as
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    /// Canonical title/version lines, rules, blank quotes
    Boilerplate,
    /// Quoted text that is not a backup row
    Quote(String),
    /// A header that opens a non-itinerary block
    SectionBreak(String),
    DayMarker(DayHeading),
    DateHeader { label: String, rest: Option<String> },
    /// A canonical row or quoted backup row, read as-is
    Row(Item),
    Entry(TimedEntry),
    Prose(String),
}

type Matcher = fn(&str) -> Option<LineClass>;

/// Matchers in priority order. The first one to claim a line wins.
const MATCHERS: &[(&str, Matcher)] = &[
    ("boilerplate", match_boilerplate),
    ("quote", match_quote),
    ("section_break", match_section_break),
    ("day_marker", match_day_marker),
    ("date_header", match_date_header),
    ("canonical_row", match_canonical_row),
    ("explicit_range", match_explicit_range),
    ("time_of_day", match_time_of_day),
];

/// Classify a normalized, non-empty line. Returns the tag of the matcher
/// that claimed it (`prose` when none did).
pub fn classify_line(line: &str) -> (&'static str, LineClass) {
    let mut hits = MATCHERS
        .iter()
        .filter_map(|(tag, matcher)| matcher(line).map(|class| (*tag, class)));

    let Some((tag, class)) = hits.next() else {
        return ("prose", LineClass::Prose(line.to_string()));
    };

    if tracing::enabled!(tracing::Level::DEBUG) {
        let others: Vec<&str> = hits.map(|(t, _)| t).collect();
        if !others.is_empty() {
            tracing::debug!(line, chosen = tag, ?others, "ambiguous line resolved by matcher order");
        }
    }
    (tag, class)
}

fn match_boilerplate(line: &str) -> Option<LineClass> {
    let is_rule = line.len() >= 3 && line.chars().all(|c| matches!(c, '-' | '*' | '_' | '='));
    let boilerplate = line == TITLE
        || line == VERSION_LINE
        || line == "#"
        || line.starts_with("> 版本")
        || is_rule;
    boilerplate.then_some(LineClass::Boilerplate)
}

fn match_quote(line: &str) -> Option<LineClass> {
    let body = line.strip_prefix('>')?.trim();
    if body.is_empty() {
        return Some(LineClass::Boilerplate);
    }
    if body == APPENDIX_HEADER {
        return Some(LineClass::SectionBreak(String::new()));
    }
    Some(match parse_backup_row(body) {
        Some(item) => LineClass::Row(item),
        None => LineClass::Quote(body.to_string()),
    })
}

fn is_emoji_like(c: char) -> bool {
    matches!(
        c,
        '\u{2600}'..='\u{27BF}' | '\u{2B00}'..='\u{2BFF}' | '\u{1F000}'..='\u{1FAFF}'
    )
}

/// Day, date or clock content anywhere on the line
fn has_schedule_signal(line: &str) -> bool {
    line.contains('|')
        || EXPLICIT_RANGE.is_match(line)
        || HINT_PREFIX.is_match(&strip_list_marker(line))
        || match_day_marker(line).is_some()
        || match_date_header(line).is_some()
}

fn match_section_break(line: &str) -> Option<LineClass> {
    if grapheme_count(line) > SECTION_HEADER_MAX_CHARS || has_schedule_signal(line) {
        return None;
    }
    let text = line.trim_start_matches('#').trim();
    let header_shaped = line.starts_with('#')
        || line.chars().next().is_some_and(is_emoji_like)
        || NUMBERED_HEADER.is_match(line)
        || text.ends_with([':', '：']);
    header_shaped.then(|| LineClass::SectionBreak(text.trim_end_matches([':', '：']).to_string()))
}

fn match_day_marker(line: &str) -> Option<LineClass> {
    find_day_marker(line).map(LineClass::DayMarker)
}

fn match_date_header(line: &str) -> Option<LineClass> {
    let body = strip_decorations(line);

    let (label, rest) = if let Some(caps) = FULL_DATE.captures(body) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        (date.format("%Y-%m-%d").to_string(), caps.get(4))
    } else if let Some(caps) = MONTH_DAY_CN
        .captures(body)
        .or_else(|| MONTH_DAY_NUM.captures(body).filter(|_| !QUANTITY.is_match(body)))
    {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        // checked against a leap year so 2月29日 passes; no year is ever reported
        NaiveDate::from_ymd_opt(2000, month, day)?;
        (format!("{:02}-{:02}", month, day), caps.get(3))
    } else {
        return None;
    };

    let rest = rest
        .map(|m| clean_date_rest(m.as_str()))
        .filter(|s| !s.is_empty());
    Some(LineClass::DateHeader { label, rest })
}

fn clean_date_rest(rest: &str) -> String {
    let rest = WEEKDAY_PREFIX.replace(rest, "");
    rest.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '：' | '，' | ',' | '、' | '-' | '—'))
        .trim()
        .to_string()
}

fn match_canonical_row(line: &str) -> Option<LineClass> {
    let body = line.trim_start_matches(['-', '*', '+']).trim_start();
    if !body.contains('|') {
        return None;
    }
    parse_item_row(body).ok().map(LineClass::Row)
}

fn clock(hour: &str, minute: &str) -> Option<ClockTime> {
    ClockTime::new(hour.parse().ok()?, minute.parse().ok()?).filter(|t| t.is_valid())
}

fn match_explicit_range(line: &str) -> Option<LineClass> {
    let caps = EXPLICIT_RANGE.captures(line)?;
    let whole = caps.get(0)?;
    let start = clock(&caps[1], &caps[2])?;
    let end = clock(&caps[3], &caps[4]).filter(|end| *end >= start);

    let remainder = format!("{}{}", &line[..whole.start()], &line[whole.end()..]);
    Some(LineClass::Entry(TimedEntry {
        start,
        end,
        text: entry_text(&remainder),
    }))
}

fn match_time_of_day(line: &str) -> Option<LineClass> {
    let body = strip_list_marker(line);
    let caps = TIME_OF_DAY.captures(&body)?;
    let (_, start, end) = TIME_OF_DAY_WINDOWS
        .iter()
        .find(|(word, _, _)| *word == &caps[1])?;
    let text = entry_text(&caps[2]);
    if text.is_empty() {
        return None;
    }
    Some(LineClass::Entry(TimedEntry {
        start: *start,
        end: Some(*end),
        text,
    }))
}

/// Strip list markers, time-of-day prefixes and edge punctuation from entry text.
fn entry_text(raw: &str) -> String {
    let s = raw.replace("**", "");
    let s = strip_list_marker(s.trim());
    let s = HINT_PREFIX.replace(s.trim(), "");
    let s = s.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '：' | ':' | '，' | ',' | '。' | '；' | ';' | '、' | '-' | '—')
    });
    collapse_whitespace(s)
}

/// Append `text` to a note without growing it past `max` graphemes.
/// Returns false when the note is already full and nothing was added.
fn append_bounded(note: &mut String, text: &str, max: usize) -> bool {
    if note.ends_with(ELLIPSIS) || grapheme_count(note) >= max {
        return false;
    }
    let mut combined = note.clone();
    if !combined.is_empty() {
        combined.push('；');
    }
    combined.push_str(text);
    *note = truncate_graphemes(&combined, max);
    true
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

/// Accumulator threaded through the line fold
struct ScanState<'c> {
    config: &'c ExtractConfig,
    doc: ItineraryDocument,
    /// Position (in `doc.days`) of the day lines currently attach to
    current: Option<usize>,
    /// Position of the last item, for prose addenda
    last_item: Option<(usize, usize)>,
    in_appendix: bool,
    /// Normalized date label -> day position
    by_date: IndexMap<String, usize>,
    /// Highest explicit day marker in the source; unmarked days never pass it
    day_ceiling: Option<u32>,
}

impl<'c> ScanState<'c> {
    fn new(config: &'c ExtractConfig, day_ceiling: Option<u32>) -> Self {
        ScanState {
            config,
            doc: ItineraryDocument::default(),
            current: None,
            last_item: None,
            in_appendix: false,
            by_date: IndexMap::new(),
            day_ceiling,
        }
    }

    fn step(mut self, raw: &str) -> Self {
        let line = normalize_pipes(&normalize_line(raw));
        if line.is_empty() {
            return self;
        }
        let (_, class) = classify_line(&line);
        self.apply(class);
        self
    }

    fn apply(&mut self, class: LineClass) {
        match class {
            LineClass::Boilerplate => {}
            LineClass::SectionBreak(text) => {
                self.in_appendix = true;
                self.last_item = None;
                if !text.is_empty() {
                    self.doc.appendix.push(text);
                }
            }
            LineClass::Quote(text) => match self.current {
                Some(pos) if !self.in_appendix => self.doc.days[pos].notes.push(text),
                _ => self.doc.appendix.push(text),
            },
            LineClass::DayMarker(heading) => self.open_marked_day(heading),
            LineClass::DateHeader { label, rest } => {
                self.open_dated_day(label);
                if let Some(rest) = rest {
                    self.absorb_inline(&rest);
                }
            }
            LineClass::Row(item) => self.push_item(item),
            LineClass::Entry(entry) => self.push_entry(entry),
            LineClass::Prose(text) => self.push_prose(text),
        }
    }

    /// Index for a day the source does not mark, or None when it would pass
    /// the highest explicit marker.
    fn next_index(&self) -> Option<u32> {
        let next = self.doc.max_day_index().map_or(Some(1), |max| max.checked_add(1))?;
        (next <= self.day_ceiling.unwrap_or(MAX_DAY_INDEX)).then_some(next)
    }

    /// Open a day for content no marker introduced. Past the ceiling the
    /// last day absorbs it instead.
    fn open_unmarked_day(&mut self) -> usize {
        if let Some(index) = self.next_index() {
            self.doc.days.push(Day::new(index));
            return self.doc.days.len() - 1;
        }
        let last = self
            .doc
            .days
            .iter()
            .enumerate()
            .max_by_key(|(_, d)| d.index)
            .map(|(pos, _)| pos);
        match last {
            Some(pos) => pos,
            // only a `Day 0` ceiling gets here
            None => {
                self.doc.days.push(Day::new(1));
                self.doc.days.len() - 1
            }
        }
    }

    fn enter_day(&mut self, pos: usize) {
        self.current = Some(pos);
        self.in_appendix = false;
        self.last_item = None;
    }

    fn open_marked_day(&mut self, heading: DayHeading) {
        let pos = match self.doc.days.iter().position(|d| d.index == heading.index) {
            Some(pos) => pos,
            None => {
                self.doc.days.push(Day::new(heading.index));
                self.doc.days.len() - 1
            }
        };
        if let Some(label) = heading.date_label
            && self.doc.days[pos].date_label.is_none()
        {
            self.doc.days[pos].date_label = Some(label.clone());
            self.by_date.entry(label).or_insert(pos);
        }
        self.enter_day(pos);

        if let Some(inline) = heading.inline {
            self.absorb_inline(&inline);
        }
    }

    fn open_dated_day(&mut self, label: String) {
        let pos = match self.by_date.get(&label) {
            Some(&pos) => pos,
            None => {
                let pos = match self.current {
                    // a date line right under a bare day marker labels that day
                    Some(pos)
                        if self.doc.days[pos].date_label.is_none()
                            && self.doc.days[pos].items.is_empty() =>
                    {
                        pos
                    }
                    Some(pos) if self.next_index().is_none() => {
                        tracing::debug!(%label, "date past the last marked day, kept on the current day");
                        pos
                    }
                    _ => self.open_unmarked_day(),
                };
                if self.doc.days[pos].date_label.is_none() {
                    self.doc.days[pos].date_label = Some(label.clone());
                }
                self.by_date.insert(label, pos);
                pos
            }
        };
        self.enter_day(pos);
    }

    fn ensure_current_day(&mut self) -> usize {
        if let Some(pos) = self.current {
            return pos;
        }
        let pos = self.open_unmarked_day();
        tracing::debug!(day = self.doc.days[pos].index, "schedule entry before any day marker, synthesizing a day");
        self.current = Some(pos);
        pos
    }

    /// Text trailing a day marker or date: a timed entry if it carries a
    /// time, otherwise a chain of POIs.
    fn absorb_inline(&mut self, text: &str) {
        match classify_line(text) {
            (_, LineClass::Entry(entry)) => self.push_entry(entry),
            (_, LineClass::Row(item)) => self.push_item(item),
            _ => self.push_chain(text),
        }
    }

    fn push_chain(&mut self, text: &str) {
        let pos = self.ensure_current_day();
        let day = &mut self.doc.days[pos];
        let mut hour = day
            .timed_items()
            .filter_map(|i| i.time_start)
            .map(|t| t.hour() + 1)
            .max()
            .unwrap_or(CHAIN_FIRST_HOUR)
            .max(CHAIN_FIRST_HOUR);

        let mut last = None;
        for poi in split_poi_chain(text) {
            let category = Category::classify(&poi);
            if category == Category::Lodging {
                day.notes.push(lodging_note(&poi));
                continue;
            }
            let activity = match category {
                Category::Sightseeing => "游览",
                other => other.label(),
            };
            let item = if hour <= CHAIN_LAST_HOUR {
                let start = ClockTime::hm(hour, 0);
                hour += 1;
                Item::timed(start, None, activity, poi)
            } else {
                let mut item = Item::untimed(activity);
                item.location = poi;
                item
            };
            day.items.push(item);
            last = Some(day.items.len() - 1);
        }
        if let Some(i) = last {
            self.last_item = Some((pos, i));
        }
    }

    fn push_item(&mut self, item: Item) {
        let pos = self.ensure_current_day();
        let day = &mut self.doc.days[pos];
        day.items.push(item);
        self.last_item = Some((pos, day.items.len() - 1));
    }

    fn push_entry(&mut self, entry: TimedEntry) {
        let category = Category::classify(&entry.text);
        if category == Category::Lodging {
            let pos = self.ensure_current_day();
            self.doc.days[pos].notes.push(lodging_note(&entry.text));
            self.last_item = None;
            return;
        }
        self.push_item(Item::timed(entry.start, entry.end, category.label(), entry.text));
    }

    fn push_prose(&mut self, text: String) {
        if self.in_appendix {
            self.doc.appendix.push(text);
            return;
        }
        if let Some((d, i)) = self.last_item {
            let max = self.config.note_max_chars;
            let note = &mut self.doc.days[d].items[i].note;
            let before = grapheme_count(note);
            if !append_bounded(note, &text, max) {
                tracing::debug!(day = self.doc.days[d].index, "item note is full, line kept in appendix");
                self.doc.appendix.push(text);
            } else if before + grapheme_count(&text) + 1 > max {
                // the tail was cut off; keep the whole line where it can be read
                self.doc.appendix.push(text);
            }
            return;
        }
        match self.current {
            Some(pos) => self.doc.days[pos].notes.push(text),
            None => self.doc.appendix.push(text),
        }
    }

    fn finish(mut self, source: &str) -> ItineraryDocument {
        if self.doc.days.is_empty() {
            tracing::debug!("no day structure found, emitting a single placeholder day");
            let mut item = Item::timed(PLACEHOLDER_START, None, PLACEHOLDER_ACTIVITY, "");
            item.note = truncate_graphemes(&collapse_whitespace(source), ECHO_MAX_CHARS);
            let mut day = Day::new(1);
            day.items.push(item);
            self.doc.days.push(day);
        }

        for day in &mut self.doc.days {
            let has_row = day
                .items
                .iter()
                .any(|i| i.time_start.is_some_and(|t| t.is_valid()));
            if !has_row {
                day.items
                    .insert(0, Item::timed(PLACEHOLDER_START, None, PLACEHOLDER_ACTIVITY, ""));
            }
        }

        self.doc.days.sort_by_key(|d| d.index);
        self.doc
    }
}

/// Scan free-form itinerary text into a document. Never fails: input with
/// no recognizable structure becomes a single placeholder day.
pub fn extract(source: &str, config: &ExtractConfig) -> ItineraryDocument {
    let text = source.replace('\r', "");
    text.split('\n')
        .fold(ScanState::new(config, max_explicit_day_marker(&text)), |state, line| state.step(line))
        .finish(&text)
}

/// Deterministic canonical markdown for any input
pub fn fallback_markdown(source: &str, config: &ExtractConfig) -> String {
    render(&extract(source, config))
}
