use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;
use tracing::warn;

use crate::time_utils::parse_weekday;

// ── TimestampProcessor ────────────────────────────────────────────────────────

/// Parses timestamps from the variety of shapes found in exported chat logs.
pub struct TimestampProcessor;

impl TimestampProcessor {
    /// Parse an epoch-seconds value (`create_time`).
    ///
    /// Accepts JSON numbers (integer or float) and numeric strings, as found
    /// in CSV exports.
    pub fn parse_epoch(value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::Number(n) => {
                if let Some(secs) = n.as_i64() {
                    DateTime::from_timestamp(secs, 0)
                } else {
                    n.as_f64().and_then(Self::from_epoch_f64)
                }
            }
            Value::String(s) => s.trim().parse::<f64>().ok().and_then(Self::from_epoch_f64),
            _ => None,
        }
    }

    /// Attempt to parse a [`serde_json::Value`] into a UTC [`DateTime`].
    ///
    /// Handles:
    /// * `null`       → `None`
    /// * JSON string  → ISO 8601 / RFC 3339 (including `Z`-suffix), common
    ///   date-time patterns, or a numeric epoch string.
    /// * JSON number  → Unix timestamp (integer or float seconds).
    pub fn parse(value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::Null => None,
            Value::String(s) => Self::parse_str(s.trim()),
            Value::Number(_) => Self::parse_epoch(value),
            _ => None,
        }
    }

    fn from_epoch_f64(f: f64) -> Option<DateTime<Utc>> {
        if !f.is_finite() {
            return None;
        }
        let secs = f.trunc() as i64;
        let nanos = (f.fract().abs() * 1_000_000_000.0).round().min(999_999_999.0) as u32;
        DateTime::from_timestamp(secs, nanos)
    }

    fn parse_str(s: &str) -> Option<DateTime<Utc>> {
        if s.is_empty() {
            return None;
        }

        // Replace trailing 'Z' with '+00:00' for RFC 3339 compatibility.
        let normalised = if let Some(stripped) = s.strip_suffix('Z') {
            format!("{}+00:00", stripped)
        } else {
            s.to_string()
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Some(dt.with_timezone(&Utc));
        }

        const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%:z"];
        for fmt in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(&normalised, fmt) {
                return Some(dt.with_timezone(&Utc));
            }
        }

        const FORMATS: &[&str] = &[
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%d %H:%M",
            "%m/%d/%Y %H:%M:%S",
            "%m/%d/%Y %H:%M",
        ];
        for fmt in FORMATS {
            if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, fmt) {
                return Some(Utc.from_utc_datetime(&naive));
            }
        }

        const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];
        for fmt in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                let naive = date.and_hms_opt(0, 0, 0)?;
                return Some(Utc.from_utc_datetime(&naive));
            }
        }

        if let Ok(secs) = s.parse::<f64>() {
            return Self::from_epoch_f64(secs);
        }

        warn!(
            "TimestampProcessor: could not parse timestamp string \"{}\"",
            s
        );
        None
    }
}

// ── FieldReader ───────────────────────────────────────────────────────────────

/// Typed accessors over a raw record value.
///
/// Tabular inputs deliver every cell as a string, JSON inputs deliver native
/// types; these helpers accept both and treat `null` and empty strings as
/// missing.
pub struct FieldReader;

impl FieldReader {
    /// Whether `value` counts as a missing cell.
    pub fn is_missing(value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn text(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => Some(other.to_string()),
        }
    }

    pub fn float(value: &Value) -> Option<f64> {
        let f = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }?;
        f.is_finite().then_some(f)
    }

    /// Non-negative integer; floats with no fractional part are accepted
    /// (`"12.0"` in a CSV export).
    pub fn unsigned(value: &Value) -> Option<u64> {
        if let Value::Number(n) = value {
            if let Some(u) = n.as_u64() {
                return Some(u);
            }
        }
        let f = Self::float(value)?;
        (f >= 0.0 && f.fract() == 0.0).then_some(f as u64)
    }

    pub fn boolean(value: &Value) -> Option<bool> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|f| f != 0.0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Calendar date from `"2025-04-01"` or a full timestamp.
    pub fn date(value: &Value) -> Option<NaiveDate> {
        let s = value.as_str()?.trim();
        if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Some(d);
        }
        TimestampProcessor::parse(value).map(|dt| dt.date_naive())
    }

    pub fn weekday(value: &Value) -> Option<chrono::Weekday> {
        match value {
            Value::Number(n) => parse_weekday(&n.to_string()),
            Value::String(s) => parse_weekday(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_epoch_integer_and_float() {
        let a = TimestampProcessor::parse_epoch(&json!(1743465600)).unwrap();
        assert_eq!(a.to_rfc3339(), "2025-04-01T00:00:00+00:00");

        let b = TimestampProcessor::parse_epoch(&json!(1743465600.5)).unwrap();
        assert_eq!(b.timestamp(), 1743465600);
        assert_eq!(b.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_parse_epoch_from_string() {
        let ts = TimestampProcessor::parse_epoch(&json!("1743465600.0")).unwrap();
        assert_eq!(ts.timestamp(), 1743465600);
        assert!(TimestampProcessor::parse_epoch(&json!("yesterday")).is_none());
        assert!(TimestampProcessor::parse_epoch(&json!(null)).is_none());
    }

    #[test]
    fn test_parse_rfc3339_and_patterns() {
        let z = TimestampProcessor::parse(&json!("2025-05-01T10:00:00Z")).unwrap();
        let offset = TimestampProcessor::parse(&json!("2025-05-01T19:00:00+09:00")).unwrap();
        assert_eq!(z, offset);

        let naive = TimestampProcessor::parse(&json!("2025-05-01 10:00:00")).unwrap();
        assert_eq!(naive, z);

        let pandas_style = TimestampProcessor::parse(&json!("2025-05-01 10:00:00.123456")).unwrap();
        assert_eq!(pandas_style.timestamp(), z.timestamp());

        let day = TimestampProcessor::parse(&json!("2025-05-01")).unwrap();
        assert_eq!(day.to_rfc3339(), "2025-05-01T00:00:00+00:00");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(TimestampProcessor::parse(&json!("not a date")).is_none());
        assert!(TimestampProcessor::parse(&json!("")).is_none());
        assert!(TimestampProcessor::parse(&json!(null)).is_none());
        assert!(TimestampProcessor::parse(&json!({"a": 1})).is_none());
    }

    #[test]
    fn test_field_reader_missing() {
        assert!(FieldReader::is_missing(&json!(null)));
        assert!(FieldReader::is_missing(&json!("  ")));
        assert!(!FieldReader::is_missing(&json!(0)));
    }

    #[test]
    fn test_field_reader_numbers() {
        assert_eq!(FieldReader::unsigned(&json!(12)), Some(12));
        assert_eq!(FieldReader::unsigned(&json!("12")), Some(12));
        assert_eq!(FieldReader::unsigned(&json!("12.0")), Some(12));
        assert_eq!(FieldReader::unsigned(&json!("12.5")), None);
        assert_eq!(FieldReader::unsigned(&json!(-3)), None);
        assert_eq!(FieldReader::float(&json!("0.25")), Some(0.25));
        assert_eq!(FieldReader::float(&json!("NaN")), None);
    }

    #[test]
    fn test_field_reader_boolean() {
        assert_eq!(FieldReader::boolean(&json!(true)), Some(true));
        assert_eq!(FieldReader::boolean(&json!("True")), Some(true));
        assert_eq!(FieldReader::boolean(&json!("0")), Some(false));
        assert_eq!(FieldReader::boolean(&json!("maybe")), None);
    }

    #[test]
    fn test_field_reader_date_and_weekday() {
        assert_eq!(
            FieldReader::date(&json!("2025-06-02")),
            NaiveDate::from_ymd_opt(2025, 6, 2)
        );
        assert_eq!(FieldReader::weekday(&json!("Tuesday")), Some(chrono::Weekday::Tue));
        assert_eq!(FieldReader::weekday(&json!(4)), Some(chrono::Weekday::Fri));
    }
}
