use serde::Serialize;

use crate::model::config::QualityConfig;
use crate::parse::itinerary_parser::{GrammarError, parse_itinerary};

/// Structured result of validating itinerary markdown, suitable for --json output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<GrammarError>,
    pub days: usize,
    pub items: usize,
}

impl ValidationResult {
    /// Error messages in source order, as shown to whoever repairs the text
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }
}

/// Activities that only hold a slot open and carry no plan content
const PLACEHOLDER_ACTIVITIES: &[&str] = &[
    "自由安排",
    "自由活动",
    "自由活动/机动安排",
    "行程整理",
    "待定",
    "无",
];

/// Validate markdown against the canonical v2 grammar.
///
/// This is a read-only operation. Every violation is collected so a repair
/// step can see all problems at once.
pub fn validate(markdown: &str) -> ValidationResult {
    let parsed = parse_itinerary(markdown);
    ValidationResult {
        valid: parsed.errors.is_empty(),
        errors: parsed.errors,
        days: parsed.day_count,
        items: parsed.item_count,
    }
}

/// A structurally valid document can still be too thin to be worth keeping:
/// fewer than `min_usable_rows` rows whose activity is not a placeholder.
pub fn looks_low_quality(markdown: &str, quality: &QualityConfig) -> bool {
    let parsed = parse_itinerary(markdown);
    if !parsed.errors.is_empty() {
        return true;
    }
    let usable = parsed
        .document
        .days
        .iter()
        .flat_map(|d| d.items.iter())
        .filter(|i| !PLACEHOLDER_ACTIVITIES.contains(&i.activity.trim()))
        .count();
    usable < quality.min_usable_rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_inline_route_days() {
        let md = "\
☃️3天2晚路线参考
DAY1：巴洛克风情街→索菲亚教堂→道里菜市场→中央大街→防洪纪念塔→松花江铁路大桥
DAY2：松花江索道→太阳岛·雪博会→极地公园&海洋馆→冰雪大世界→群力音乐公园·网红大雪人
DAY3：七三一陈列馆→哈尔滨工业大学→黑龙江省博物馆→果戈里大街→哈药六厂→龙塔
";
        let out = validate(md);
        assert!(out.valid, "{:?}", out.errors);
        assert_eq!(out.days, 3);
        assert_eq!(out.items, 3);
    }

    #[test]
    fn accepts_chinese_and_d_headings() {
        let out = validate("第1天：中央大街→索菲亚教堂\n");
        assert!(out.valid);
        assert_eq!((out.days, out.items), (1, 1));

        let out = validate("D1：中央大街→索菲亚教堂\nD2：冰雪大世界\nD3：返程\n");
        assert!(out.valid);
        assert_eq!((out.days, out.items), (3, 3));
    }

    #[test]
    fn rejects_broken_rows_with_every_error() {
        let out = validate("# 行程安排\n## Day 1\n- - | 欧堡酒店 |\n");
        assert!(!out.valid);
        assert_eq!(
            out.messages(),
            vec![
                "第 3 行：时间格式错误：应为「HH:MM - HH:MM」（结束时间可留空）".to_string(),
                "Day 1 下未找到任何行项目（以 \"-\" 开头）".to_string(),
            ]
        );
    }

    #[test]
    fn empty_input_has_no_days() {
        let out = validate("");
        assert!(!out.valid);
        assert_eq!(out.days, 0);
        assert_eq!(out.errors, vec![GrammarError::NoDays]);
    }

    #[test]
    fn placeholder_only_plan_is_low_quality() {
        let md = "\
# 行程安排
> 版本: v2

## Day 1（今天）
- 09:00 - 20:00 | 自由安排 | |
";
        assert!(validate(md).valid);
        assert!(looks_low_quality(md, &QualityConfig::default()));

        let rich = "## Day 1\n- 09:00 - 10:00 | 游览 | 外滩 |\n- 10:30 - 11:30 | 参观 | 豫园 |\n";
        assert!(!looks_low_quality(rich, &QualityConfig::default()));
        assert!(looks_low_quality(rich, &QualityConfig { min_usable_rows: 3 }));
    }
}
