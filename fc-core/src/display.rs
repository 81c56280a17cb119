//! Formatting helpers for temperatures and timestamps

use chrono::{Local, SecondsFormat};

/// Round a temperature to one decimal place.
///
/// Rounds the exact binary value, so 48.15 (stored as 48.1499...) becomes 48.1
/// rather than the 48.2 that scaling by ten would produce.
pub fn round1(value: f64) -> f64 {
    format!("{:.1}", value).parse().unwrap_or(value)
}

/// Current local time as ISO-8601 with seconds precision and UTC offset
pub fn now_iso() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Reading and thresholds as one log fragment
pub fn format_context(temp_c: Option<f64>, temp_on_c: f64, temp_off_c: f64) -> String {
    let temp = match temp_c {
        Some(t) => format!("temp={:.1}C", t),
        None => "temp=unknown".to_string(),
    };
    format!("{} on={:.1}C off={:.1}C", temp, temp_on_c, temp_off_c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round1() {
        assert_eq!(round1(44.27), 44.3);
        assert_eq!(round1(56.0), 56.0);
        assert_eq!(round1(-3.04), -3.0);
    }

    #[test]
    fn test_round1_uses_exact_binary_value() {
        // 48150 millidegrees from a thermal zone
        assert_eq!(round1(48150.0 / 1000.0), 48.1);
        assert_eq!(round1(52.56), 52.6);
        assert_eq!(round1(0.05 + 44.0), 44.0);
    }

    #[test]
    fn test_format_context() {
        assert_eq!(format_context(Some(51.234), 55.0, 45.0), "temp=51.2C on=55.0C off=45.0C");
        assert_eq!(format_context(None, 60.0, 50.5), "temp=unknown on=60.0C off=50.5C");
    }

    #[test]
    fn test_now_iso_has_seconds_precision() {
        let ts = now_iso();
        // 2024-01-02T03:04:05+01:00 or ...Z
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
        assert!(!ts.contains('.'));
    }
}
