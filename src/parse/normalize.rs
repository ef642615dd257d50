//! Text normalization shared by the grammar, the extractor and the guardrail.

/// Zero-width and bidi control characters that some editors and models emit.
fn is_invisible(c: char) -> bool {
    matches!(c, '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2060}' | '\u{FEFF}')
}

pub fn strip_invisible(s: &str) -> String {
    s.chars().filter(|c| !is_invisible(*c)).collect()
}

/// Strip invisible characters and surrounding whitespace
pub fn normalize_line(s: &str) -> String {
    strip_invisible(s).trim().to_string()
}

/// Full-width pipes become ASCII column separators
pub fn normalize_pipes(s: &str) -> String {
    s.replace('｜', "|")
}

fn is_dash_glyph(c: char) -> bool {
    matches!(
        c,
        '—' | '–' | '－' | '‐' | '‑' | '‒' | '―' | '−' | '~' | '〜' | '～' | '﹣'
    )
}

/// Normalize a time column: full-width colon, dash variants and runs of whitespace.
pub fn normalize_time_range(s: &str) -> String {
    let mapped: String = strip_invisible(s)
        .chars()
        .map(|c| match c {
            '：' => ':',
            c if is_dash_glyph(c) => '-',
            c => c,
        })
        .collect();
    collapse_whitespace(&mapped)
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop leading markup and decoration (heading hashes, bullets, bold markers,
/// emoji) so that a day marker can be recognized wherever it is written.
pub fn strip_decorations(s: &str) -> &str {
    s.trim_start_matches(|c: char| !c.is_alphanumeric())
}

/// True when the text opens with a decimal number (`1.5 小时`), which is a
/// quantity and never a `1.` list marker.
pub fn starts_with_decimal(s: &str) -> bool {
    let rest = s.trim_start_matches(|c: char| c.is_ascii_digit());
    rest.len() < s.len()
        && rest
            .strip_prefix('.')
            .is_some_and(|r| r.starts_with(|c: char| c.is_ascii_digit()))
}

/// Make free text safe for a single `|`-delimited column.
pub fn sanitize_cell(s: &str) -> String {
    let cleaned: String = strip_invisible(s)
        .chars()
        .map(|c| match c {
            '|' | '｜' => '/',
            '\n' | '\r' | '\t' => ' ',
            c => c,
        })
        .collect();
    collapse_whitespace(&cleaned)
}

/// Parse a day number written with ASCII digits or Chinese numerals (一 .. 九十九).
pub fn parse_day_number(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse().ok();
    }

    let digit = |c: char| -> Option<u32> {
        match c {
            '一' => Some(1),
            '二' | '两' => Some(2),
            '三' => Some(3),
            '四' => Some(4),
            '五' => Some(5),
            '六' => Some(6),
            '七' => Some(7),
            '八' => Some(8),
            '九' => Some(9),
            _ => None,
        }
    };

    let chars: Vec<char> = s.chars().collect();
    match chars.as_slice() {
        [c] if *c == '十' => Some(10),
        [c] => digit(*c),
        ['十', ones] => Some(10 + digit(*ones)?),
        [tens, '十'] => Some(digit(*tens)? * 10),
        [tens, '十', ones] => Some(digit(*tens)? * 10 + digit(*ones)?),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_zero_width_characters() {
        assert_eq!(normalize_line("\u{FEFF} ## Day 1\u{200B} "), "## Day 1");
    }

    #[test]
    fn time_range_glyphs() {
        assert_eq!(normalize_time_range("09：00 — 10：30"), "09:00 - 10:30");
        assert_eq!(normalize_time_range("9:00～11:00"), "9:00-11:00");
    }

    #[test]
    fn decorations_are_removed() {
        assert_eq!(strip_decorations("  - **Day2**：愚园路"), "Day2**：愚园路");
        assert_eq!(strip_decorations("🏷️day3: 静安寺"), "day3: 静安寺");
        assert_eq!(strip_decorations("### 第1天"), "第1天");
    }

    #[test]
    fn decimal_lead() {
        assert!(starts_with_decimal("1.5 小时后返回"));
        assert!(starts_with_decimal("12.25"));
        assert!(!starts_with_decimal("1. 外滩"));
        assert!(!starts_with_decimal("1.外滩"));
        assert!(!starts_with_decimal(".5"));
    }

    #[test]
    fn cells_cannot_break_columns() {
        assert_eq!(sanitize_cell(" A | B\nC ｜ D "), "A / B C / D");
    }

    #[test]
    fn chinese_day_numbers() {
        assert_eq!(parse_day_number("一"), Some(1));
        assert_eq!(parse_day_number("两"), Some(2));
        assert_eq!(parse_day_number("十"), Some(10));
        assert_eq!(parse_day_number("十二"), Some(12));
        assert_eq!(parse_day_number("二十"), Some(20));
        assert_eq!(parse_day_number("二十三"), Some(23));
        assert_eq!(parse_day_number("3"), Some(3));
        assert_eq!(parse_day_number("三百"), None);
        assert_eq!(parse_day_number(""), None);
    }
}
