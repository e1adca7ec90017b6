use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Format an integer count with thousands separators.
///
/// # Examples
///
/// ```
/// use insights_core::formatting::format_count;
///
/// assert_eq!(format_count(9543), "9,543");
/// assert_eq!(format_count(12), "12");
/// assert_eq!(format_count(1_234_567), "1,234,567");
/// ```
pub fn format_count(n: usize) -> String {
    group_thousands(&n.to_string())
}

/// Format an optional coefficient with an explicit sign, or `"n/a"`.
///
/// # Examples
///
/// ```
/// use insights_core::formatting::format_coefficient;
///
/// assert_eq!(format_coefficient(Some(0.5349)), "+0.53");
/// assert_eq!(format_coefficient(Some(-0.1)), "-0.10");
/// assert_eq!(format_coefficient(None), "n/a");
/// ```
pub fn format_coefficient(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:+.2}", v),
        None => "n/a".to_string(),
    }
}

/// Calculate `(part / whole) * 100`, rounded to `decimal_places`.
///
/// Returns `0.0` if `whole` is zero.
pub fn percentage(part: f64, whole: f64, decimal_places: u32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    let raw = (part / whole) * 100.0;
    let factor = 10_f64.powi(decimal_places as i32);
    (raw * factor).round() / factor
}

/// Shorten `label` to at most `max_width` terminal columns, appending `"..."`
/// when anything was cut.
///
/// Width is measured in display columns so that wide (CJK) characters count
/// double.
///
/// # Examples
///
/// ```
/// use insights_core::formatting::truncate_label;
///
/// assert_eq!(truncate_label("AI/ML", 10), "AI/ML");
/// assert_eq!(truncate_label("Web Development", 10), "Web Develo...");
/// ```
pub fn truncate_label(label: &str, max_width: usize) -> String {
    if label.width() <= max_width {
        return label.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in label.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > max_width {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push_str("...");
    out
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Insert commas every three digits from the right of an integer string.
fn group_thousands(s: &str) -> String {
    let digits: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i != 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result
}
