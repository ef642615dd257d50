use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Marker appended when text is cut short
pub const ELLIPSIS: char = '\u{2026}';

/// Display width in terminal cells. Tabs count as 4 cells.
pub fn display_width(s: &str) -> usize {
    s.split('\t')
        .enumerate()
        .map(|(i, part)| {
            let w = UnicodeWidthStr::width(part);
            if i > 0 { w + 4 } else { w }
        })
        .sum()
}

/// Pad `s` with spaces on the right to `cells` terminal cells (CJK counts double).
pub fn pad_to_width(s: &str, cells: usize) -> String {
    let w = display_width(s);
    if w >= cells {
        s.to_string()
    } else {
        format!("{}{}", s, " ".repeat(cells - w))
    }
}

/// Number of user-perceived characters
pub fn grapheme_count(s: &str) -> usize {
    s.graphemes(true).count()
}

/// Cut `s` to at most `max` graphemes, ending with `…` when anything was removed.
pub fn truncate_graphemes(s: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if grapheme_count(s) <= max {
        return s.to_string();
    }
    let mut out: String = s.graphemes(true).take(max - 1).collect();
    out.push(ELLIPSIS);
    out
}
