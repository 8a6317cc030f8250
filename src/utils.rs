//! Utility functions for the hygrotemp-ble crate.

use chrono::{DateTime, Local, Timelike};

/// Convert Celsius to Fahrenheit.
///
/// # Example
///
/// ```
/// use hygrotemp_ble::celsius_to_fahrenheit;
///
/// let fahrenheit = celsius_to_fahrenheit(100.0);
/// assert!((fahrenheit - 212.0).abs() < 0.001);
/// ```
#[inline]
pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Convert Fahrenheit to Celsius.
///
/// # Example
///
/// ```
/// use hygrotemp_ble::fahrenheit_to_celsius;
///
/// let celsius = fahrenheit_to_celsius(212.0);
/// assert!((celsius - 100.0).abs() < 0.001);
/// ```
#[inline]
pub fn fahrenheit_to_celsius(fahrenheit: f32) -> f32 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Truncate a timestamp to the start of its hour.
///
/// Used to build the hour bucket that keys persisted readings.
pub fn truncate_to_hour(timestamp: DateTime<Local>) -> DateTime<Local> {
    timestamp
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_celsius_to_fahrenheit() {
        assert!((celsius_to_fahrenheit(0.0) - 32.0).abs() < 0.001);
        assert!((celsius_to_fahrenheit(100.0) - 212.0).abs() < 0.001);
        assert!((celsius_to_fahrenheit(-40.0) - (-40.0)).abs() < 0.001);
    }

    #[test]
    fn test_fahrenheit_to_celsius() {
        assert!((fahrenheit_to_celsius(32.0) - 0.0).abs() < 0.001);
        assert!((fahrenheit_to_celsius(212.0) - 100.0).abs() < 0.001);
        assert!((fahrenheit_to_celsius(-40.0) - (-40.0)).abs() < 0.001);
    }

    #[test]
    fn test_truncate_to_hour() {
        let ts = Local.with_ymd_and_hms(2024, 5, 17, 14, 35, 42).unwrap();
        let truncated = truncate_to_hour(ts);

        assert_eq!(truncated.hour(), 14);
        assert_eq!(truncated.minute(), 0);
        assert_eq!(truncated.second(), 0);
    }

    #[test]
    fn test_truncate_already_on_the_hour() {
        let ts = Local.with_ymd_and_hms(2024, 5, 17, 14, 0, 0).unwrap();
        assert_eq!(truncate_to_hour(ts), ts);
    }
}
