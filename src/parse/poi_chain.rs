//! Splitting of route chains such as `中央大街→索菲亚教堂→防洪纪念塔` or
//! `南京路步行街-上海邮政博物馆-外白渡桥` into individual POI names.

const ARROW_SEQUENCES: &[&str] = &["➡️", "-->", "—>", "->", "=>", "→", "➡", "➜", "➔", "⇒", "⟶"];

fn is_dash(c: char) -> bool {
    matches!(c, '-' | '–' | '—' | '－')
}

/// Characters trimmed from both ends of a POI name
fn is_edge_noise(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '。' | '，' | ',' | '；' | ';' | '、' | '：' | ':' | '!' | '！' | '*' | '·' | '.'
        )
}

fn clean(segment: &str) -> Option<String> {
    let s = segment.trim_matches(is_edge_noise);
    if s.is_empty() { None } else { Some(s.to_string()) }
}

/// Split a chain of POIs. Arrows always separate. When the text has no
/// arrow, dashes separate instead, except between two digits (`1-7天`).
pub fn split_poi_chain(text: &str) -> Vec<String> {
    let has_arrow = ARROW_SEQUENCES.iter().any(|a| text.contains(a));
    if has_arrow {
        let mut unified = text.to_string();
        for arrow in ARROW_SEQUENCES {
            unified = unified.replace(arrow, "\u{1}");
        }
        return unified.split('\u{1}').filter_map(clean).collect();
    }

    let chars: Vec<char> = text.chars().collect();
    let mut parts = Vec::new();
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        let between_digits = i > 0
            && chars[i - 1].is_ascii_digit()
            && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
        if is_dash(c) && !between_digits {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    parts.iter().filter_map(|p| clean(p)).collect()
}

/// Split a canonical location cell that may list several places
/// (`外滩、豫园和城隍庙`). `和` only separates when both sides are at least
/// two characters, so names like `和平饭店` stay whole.
pub fn split_location_list(text: &str) -> Vec<String> {
    text.split(['、', '，', ','])
        .flat_map(split_on_and)
        .filter_map(|s| clean(&s))
        .collect()
}

fn split_on_and(piece: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = piece.trim();
    while let Some(pos) = rest.find('和') {
        let (left, right) = (&rest[..pos], &rest[pos + '和'.len_utf8()..]);
        if left.chars().count() >= 2 && right.trim().chars().count() >= 2 {
            out.push(left.to_string());
            rest = right.trim();
        } else {
            break;
        }
    }
    out.push(rest.to_string());
    out
}
