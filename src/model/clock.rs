use serde::{Deserialize, Serialize};

/// Latest hour a `ClockTime` can carry. Values past 23 only exist so that
/// untrusted input such as `24:00` or `25:30` can be read and then rejected.
const MAX_HOUR: u16 = 99;

/// A wall-clock time of day, stored as minutes since midnight and printed as `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime {
    minutes: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid clock time {0:?} (expected HH:MM)")]
pub struct InvalidClockTime(pub String);

impl ClockTime {
    /// Build a time from hour and minute. Returns None when the minute is
    /// out of range or the hour cannot be represented at all.
    pub fn new(hour: u16, minute: u16) -> Option<ClockTime> {
        if minute >= 60 || hour > MAX_HOUR {
            return None;
        }
        Some(ClockTime {
            minutes: hour * 60 + minute,
        })
    }

    /// Internal constructor for compile-time constants; callers guarantee range.
    pub(crate) const fn hm(hour: u16, minute: u16) -> ClockTime {
        ClockTime {
            minutes: hour * 60 + minute,
        }
    }

    /// Parse `H:MM` / `HH:MM`, also accepting the full-width colon.
    /// Hours up to 99 are accepted; use `is_valid` to check for a real time of day.
    pub fn parse(s: &str) -> Option<ClockTime> {
        let s = s.trim().replace('：', ":");
        let (h, m) = s.split_once(':')?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return None;
        }
        if !h.bytes().all(|b| b.is_ascii_digit()) || !m.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        ClockTime::new(h.parse().ok()?, m.parse().ok()?)
    }

    pub fn hour(self) -> u16 {
        self.minutes / 60
    }

    pub fn minute(self) -> u16 {
        self.minutes % 60
    }

    /// Minutes since midnight
    pub fn minutes(self) -> u16 {
        self.minutes
    }

    /// True when this is a real time of day (hour 0-23).
    pub fn is_valid(self) -> bool {
        self.hour() < 24
    }

    /// Advance by `minutes`, saturating at the largest representable time.
    pub fn plus_minutes(self, minutes: u16) -> ClockTime {
        let max = MAX_HOUR * 60 + 59;
        ClockTime {
            minutes: self.minutes.saturating_add(minutes).min(max),
        }
    }

    /// Minutes from `self` to `later`, zero if `later` is not after `self`.
    pub fn minutes_until(self, later: ClockTime) -> u16 {
        later.minutes.saturating_sub(self.minutes)
    }
}

impl std::fmt::Display for ClockTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl std::str::FromStr for ClockTime {
    type Err = InvalidClockTime;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClockTime::parse(s).ok_or_else(|| InvalidClockTime(s.to_string()))
    }
}

impl TryFrom<String> for ClockTime {
    type Error = InvalidClockTime;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(t: ClockTime) -> String {
        t.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_pads_single_digit_hour() {
        let t = ClockTime::parse("7:30").unwrap();
        assert_eq!(t.to_string(), "07:30");
        assert!(t.is_valid());
    }

    #[test]
    fn parse_accepts_fullwidth_colon() {
        assert_eq!(ClockTime::parse("13：05"), ClockTime::new(13, 5));
    }

    #[test]
    fn out_of_day_hours_parse_but_are_invalid() {
        let t = ClockTime::parse("25:00").unwrap();
        assert_eq!(t.hour(), 25);
        assert!(!t.is_valid());
    }

    #[test]
    fn rejects_bad_minutes_and_shapes() {
        assert!(ClockTime::parse("09:60").is_none());
        assert!(ClockTime::parse("0930").is_none());
        assert!(ClockTime::parse("9:3").is_none());
        assert!(ClockTime::parse("123:00").is_none());
        assert!(ClockTime::parse("").is_none());
    }

    #[test]
    fn ordering_follows_the_clock() {
        let a = ClockTime::parse("09:00").unwrap();
        let b = ClockTime::parse("10:15").unwrap();
        assert!(a < b);
        assert_eq!(a.minutes_until(b), 75);
        assert_eq!(b.minutes_until(a), 0);
        assert_eq!(a.plus_minutes(75), b);
    }

    #[test]
    fn serde_uses_hhmm_strings() {
        let t = ClockTime::parse("08:05").unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"08:05\"");
        let back: ClockTime = serde_json::from_str("\"8:05\"").unwrap();
        assert_eq!(back, t);
        assert!(serde_json::from_str::<ClockTime>("\"noon\"").is_err());
    }
}
