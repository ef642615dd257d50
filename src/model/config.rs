use serde::{Deserialize, Serialize};

use super::clock::ClockTime;

/// Configuration from itinera.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItineraConfig {
    #[serde(default)]
    pub enforcer: EnforcerConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub durations: DurationConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub quality: QualityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforcerConfig {
    /// Repair attempts before falling back to the deterministic document
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Shell command that receives a repair prompt on stdin and prints markdown.
    /// Absent means no fixer is configured and invalid candidates fall back immediately.
    #[serde(default)]
    pub fix_command: Option<String>,
    #[serde(default = "default_fix_timeout_secs")]
    pub fix_timeout_secs: u64,
}

impl Default for EnforcerConfig {
    fn default() -> Self {
        EnforcerConfig {
            max_attempts: default_max_attempts(),
            fix_command: None,
            fix_timeout_secs: default_fix_timeout_secs(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_fix_timeout_secs() -> u64 {
    60
}

/// The sightseeing window and slot sizes used when placing items on the clock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_day_start")]
    pub day_start: ClockTime,
    #[serde(default = "default_day_end")]
    pub day_end: ClockTime,
    #[serde(default = "default_transit_buffer")]
    pub transit_buffer_minutes: u16,
    /// Slot length for POIs appended by the guardrail
    #[serde(default = "default_slot_minutes")]
    pub slot_minutes: u16,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            day_start: default_day_start(),
            day_end: default_day_end(),
            transit_buffer_minutes: default_transit_buffer(),
            slot_minutes: default_slot_minutes(),
        }
    }
}

fn default_day_start() -> ClockTime {
    ClockTime::hm(9, 0)
}

fn default_day_end() -> ClockTime {
    ClockTime::hm(20, 0)
}

fn default_transit_buffer() -> u16 {
    15
}

fn default_slot_minutes() -> u16 {
    60
}

/// Duration heuristics (minutes) used by the rationalizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DurationConfig {
    #[serde(default = "default_meal")]
    pub meal: u16,
    #[serde(default = "default_transport")]
    pub transport: u16,
    #[serde(default = "default_heavy")]
    pub heavy: u16,
    #[serde(default = "default_medium")]
    pub medium: u16,
    #[serde(default = "default_default")]
    pub default: u16,
    /// Location/activity terms for half-day attractions
    #[serde(default = "default_heavy_keywords")]
    pub heavy_keywords: Vec<String>,
    /// Location/activity terms for mid-length visits
    #[serde(default = "default_medium_keywords")]
    pub medium_keywords: Vec<String>,
}

impl Default for DurationConfig {
    fn default() -> Self {
        DurationConfig {
            meal: default_meal(),
            transport: default_transport(),
            heavy: default_heavy(),
            medium: default_medium(),
            default: default_default(),
            heavy_keywords: default_heavy_keywords(),
            medium_keywords: default_medium_keywords(),
        }
    }
}

fn default_meal() -> u16 {
    60
}

fn default_transport() -> u16 {
    30
}

fn default_heavy() -> u16 {
    180
}

fn default_medium() -> u16 {
    90
}

fn default_default() -> u16 {
    75
}

fn default_heavy_keywords() -> Vec<String> {
    ["大世界", "雪博会", "虎林园", "乐园", "迪士尼", "欢乐谷", "动物园", "海洋馆", "海洋公园"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_medium_keywords() -> Vec<String> {
    ["公园", "博物馆", "教堂", "纪念馆", "美术馆", "陈列馆", "寺", "古镇"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Longest note (in graphemes) that prose addenda may grow an item's note to
    #[serde(default = "default_note_max_chars")]
    pub note_max_chars: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        ExtractConfig {
            note_max_chars: default_note_max_chars(),
        }
    }
}

fn default_note_max_chars() -> usize {
    200
}

/// Thresholds for judging whether a valid document is still too thin to use.
/// The default has no documented derivation and is pending product review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityConfig {
    #[serde(default = "default_min_usable_rows")]
    pub min_usable_rows: usize,
}

impl Default for QualityConfig {
    fn default() -> Self {
        QualityConfig {
            min_usable_rows: default_min_usable_rows(),
        }
    }
}

fn default_min_usable_rows() -> usize {
    2
}
