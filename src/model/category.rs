use serde::{Deserialize, Serialize};

/// Coarse classification of an itinerary entry, decided by keyword match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Meal,
    Transport,
    Lodging,
    Shopping,
    Sightseeing,
}

pub const MEAL_KEYWORDS: &[&str] = &[
    "用餐", "午餐", "晚餐", "早餐", "早茶", "餐厅", "美食", "小吃", "吃饭", "夜宵", "火锅", "饭店",
];

pub const TRANSPORT_KEYWORDS: &[&str] = &[
    "交通", "转场", "出发", "前往", "到达", "抵达", "返程", "集合", "地铁", "公交", "打车", "网约车",
    "骑行", "自驾", "高铁", "动车", "航班", "飞机", "乘机", "换乘", "接驳", "大巴", "乘车", "火车",
];

pub const LODGING_KEYWORDS: &[&str] = &["酒店", "民宿", "住宿", "入住"];

pub const SHOPPING_KEYWORDS: &[&str] = &["购物", "商场", "特产", "免税", "奥特莱斯", "伴手礼"];

/// Terms that mark an entry as inter-city travel (train, flight, station, airport).
pub const INTERCITY_KEYWORDS: &[&str] = &[
    "高铁", "动车", "火车", "飞机", "航班", "乘机", "机场", "火车站", "高铁站", "车站",
];

/// Terms whose presence in reference text corroborates inter-city travel.
pub const INTERCITY_CORROBORATION: &[&str] = &[
    "高铁", "动车", "火车", "飞机", "航班", "机场", "车站", "train", "flight", "airport", "station",
];

impl Category {
    /// Label used in the activity column when an entry has no better name.
    pub fn label(self) -> &'static str {
        match self {
            Category::Meal => "用餐",
            Category::Transport => "交通",
            Category::Lodging => "住宿",
            Category::Shopping => "购物",
            Category::Sightseeing => "活动",
        }
    }

    /// Classify a single piece of free text. Transport wins over lodging so
    /// that `返程到酒店` stays a transfer.
    pub fn classify(text: &str) -> Category {
        if contains_any(text, TRANSPORT_KEYWORDS) {
            Category::Transport
        } else if contains_any(text, LODGING_KEYWORDS) {
            Category::Lodging
        } else if contains_any(text, MEAL_KEYWORDS) {
            Category::Meal
        } else if contains_any(text, SHOPPING_KEYWORDS) {
            Category::Shopping
        } else {
            Category::Sightseeing
        }
    }

    /// Classify a scheduled item. Transport is decided by the activity alone
    /// (a station in the location column does not make a visit a transfer);
    /// lodging looks at every column.
    pub fn of_item(activity: &str, location: &str, note: &str) -> Category {
        if contains_any(activity, TRANSPORT_KEYWORDS) {
            return Category::Transport;
        }
        if [activity, location, note]
            .iter()
            .any(|s| contains_any(s, LODGING_KEYWORDS))
        {
            return Category::Lodging;
        }
        if contains_any(activity, MEAL_KEYWORDS) {
            return Category::Meal;
        }
        if contains_any(activity, SHOPPING_KEYWORDS) {
            return Category::Shopping;
        }
        Category::Sightseeing
    }

    /// Transport and lodging may legitimately sit outside the sightseeing window.
    pub fn ignores_day_window(self) -> bool {
        matches!(self, Category::Transport | Category::Lodging)
    }
}

pub fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}
