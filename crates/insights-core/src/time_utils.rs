use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{InsightsError, Result};

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

/// Resolve a timezone setting (`"auto"` or an IANA name) to a [`Tz`].
pub fn resolve_timezone(name: &str) -> Result<Tz> {
    let resolved = if name.eq_ignore_ascii_case("auto") {
        get_system_timezone()
    } else {
        name.to_string()
    };
    resolved
        .parse::<Tz>()
        .map_err(|_| InsightsError::Config(format!("unknown timezone \"{}\"", resolved)))
}

// ── AnalysisWindow ────────────────────────────────────────────────────────────

/// The fixed calendar window every analysis is restricted to.
///
/// Both bounds are inclusive calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl AnalysisWindow {
    /// 2025-04-01 through 2025-08-31.
    pub const fn fixed() -> Self {
        // Literal dates are valid; `from_ymd_opt` is not const-unwrappable.
        Self {
            start: match NaiveDate::from_ymd_opt(2025, 4, 1) {
                Some(d) => d,
                None => NaiveDate::MIN,
            },
            end: match NaiveDate::from_ymd_opt(2025, 8, 31) {
                Some(d) => d,
                None => NaiveDate::MAX,
            },
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// `"2025-04-01 ~ 2025-08-31"`.
    pub fn label(&self) -> String {
        format!(
            "{} ~ {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

// ── Local clock fields ────────────────────────────────────────────────────────

/// Calendar fields of an instant as seen in a given timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalParts {
    pub date: NaiveDate,
    pub hour: u32,
    pub weekday: Weekday,
}

impl LocalParts {
    pub fn of(ts: DateTime<Utc>, tz: &Tz) -> Self {
        let local = ts.with_timezone(tz);
        Self {
            date: local.date_naive(),
            hour: local.hour(),
            weekday: local.weekday(),
        }
    }
}

// ── Weekday helpers ───────────────────────────────────────────────────────────

/// Monday-first display order.
pub const WEEKDAY_ORDER: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Parse a weekday from a name (`"Monday"`, `"mon"`) or a number where
/// `0` is Monday.
pub fn parse_weekday(s: &str) -> Option<Weekday> {
    let trimmed = s.trim();
    if let Ok(n) = trimmed.parse::<f64>() {
        if n.fract() != 0.0 || !(0.0..=6.0).contains(&n) {
            warn!("Ignoring out-of-range weekday number \"{}\"", trimmed);
            return None;
        }
        return Weekday::try_from(n as u8).ok();
    }
    trimmed.parse::<Weekday>().ok()
}

// ── Bucket keys ───────────────────────────────────────────────────────────────

/// ISO-8601 week (Monday–Sunday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IsoWeekKey {
    pub year: i32,
    pub week: u32,
}

impl IsoWeekKey {
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }
}

impl std::fmt::Display for IsoWeekKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

/// Calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl std::fmt::Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_window_bounds_inclusive() {
        let w = AnalysisWindow::fixed();
        assert!(w.contains(date(2025, 4, 1)));
        assert!(w.contains(date(2025, 8, 31)));
        assert!(!w.contains(date(2025, 3, 31)));
        assert!(!w.contains(date(2025, 9, 1)));
        assert_eq!(w.label(), "2025-04-01 ~ 2025-08-31");
    }

    #[test]
    fn test_resolve_timezone() {
        assert_eq!(resolve_timezone("UTC").unwrap(), Tz::UTC);
        assert_eq!(resolve_timezone("Asia/Seoul").unwrap(), Tz::Asia__Seoul);
        assert!(resolve_timezone("Mars/Olympus").is_err());
    }

    #[test]
    fn test_local_parts_shift_day() {
        // 2025-04-30 20:00 UTC is 2025-05-01 05:00 in Seoul.
        let ts = Utc.with_ymd_and_hms(2025, 4, 30, 20, 0, 0).unwrap();
        let utc = LocalParts::of(ts, &Tz::UTC);
        let seoul = LocalParts::of(ts, &Tz::Asia__Seoul);
        assert_eq!(utc.date, date(2025, 4, 30));
        assert_eq!(utc.hour, 20);
        assert_eq!(utc.weekday, Weekday::Wed);
        assert_eq!(seoul.date, date(2025, 5, 1));
        assert_eq!(seoul.hour, 5);
        assert_eq!(seoul.weekday, Weekday::Thu);
    }

    #[test]
    fn test_parse_weekday_names_and_numbers() {
        assert_eq!(parse_weekday("Monday"), Some(Weekday::Mon));
        assert_eq!(parse_weekday("sun"), Some(Weekday::Sun));
        assert_eq!(parse_weekday("0"), Some(Weekday::Mon));
        assert_eq!(parse_weekday("6"), Some(Weekday::Sun));
        assert_eq!(parse_weekday("7"), None);
        assert_eq!(parse_weekday("someday"), None);
    }

    #[test]
    fn test_iso_week_key() {
        // 2025-04-06 is a Sunday; 2025-04-07 starts the next ISO week.
        let a = IsoWeekKey::of(date(2025, 4, 6));
        let b = IsoWeekKey::of(date(2025, 4, 7));
        assert_eq!(a.to_string(), "2025-W14");
        assert_eq!(b.to_string(), "2025-W15");
        assert!(a < b);
    }

    #[test]
    fn test_month_key() {
        assert_eq!(MonthKey::of(date(2025, 4, 30)).to_string(), "2025-04");
        assert!(MonthKey::of(date(2025, 4, 30)) < MonthKey::of(date(2025, 5, 1)));
    }
}
