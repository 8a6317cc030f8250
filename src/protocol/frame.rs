//! Temperature & humidity notification frame decoding.
//!
//! The sensor pushes its readings as a text/binary hybrid frame of at least
//! 13 bytes, e.g. `T=21.5 H=55.0`:
//! - byte 1 or byte 8 carries the ASCII `=` marker (0x3D),
//! - bytes 2..6 are the temperature as ASCII decimal text,
//! - bytes 9..13 are the humidity as ASCII decimal text.
//!
//! Frames without the marker are not readings and are discarded without a
//! trace. Frames that carry the marker but cannot be decoded produce typed
//! errors instead of silently propagating zeroes.

use chrono::{DateTime, Local};

use crate::error::{Error, Result};
use crate::utils::celsius_to_fahrenheit;

/// ASCII `=` separator marking a valid reading frame.
pub const FRAME_MARKER: u8 = 0x3D;

/// Minimum usable frame length.
pub const MIN_FRAME_LEN: usize = 13;

/// Byte offset of the ASCII temperature field.
const TEMPERATURE_OFFSET: usize = 2;
/// Byte offset of the ASCII humidity field.
const HUMIDITY_OFFSET: usize = 9;
/// Length of both ASCII numeric fields.
const FIELD_LEN: usize = 4;

/// One decoded temperature & humidity reading.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    /// Wall-clock time the frame was decoded.
    pub timestamp: DateTime<Local>,
    /// Temperature in degrees Celsius.
    pub temperature: f32,
    /// Relative humidity in percent, truncated toward zero.
    pub humidity: i32,
}

impl Reading {
    /// Decode a notification frame.
    ///
    /// Returns `Ok(None)` when neither byte 1 nor byte 8 is the frame marker:
    /// such buffers (of any length, including empty) are not readings and
    /// must cause no state change upstream. Returns an error when the marker
    /// is present but the frame is too short or a numeric field does not hold
    /// ASCII decimal text.
    pub fn parse(data: &[u8]) -> Result<Option<Self>> {
        let marker_present =
            data.get(1) == Some(&FRAME_MARKER) || data.get(8) == Some(&FRAME_MARKER);
        if !marker_present {
            return Ok(None);
        }

        if data.len() < MIN_FRAME_LEN {
            return Err(Error::MalformedFrame {
                context: format!(
                    "frame too short: {} bytes (need at least {})",
                    data.len(),
                    MIN_FRAME_LEN
                ),
            });
        }

        let temperature = parse_ascii_decimal(
            &data[TEMPERATURE_OFFSET..TEMPERATURE_OFFSET + FIELD_LEN],
            "temperature",
        )?;
        let humidity =
            parse_ascii_decimal(&data[HUMIDITY_OFFSET..HUMIDITY_OFFSET + FIELD_LEN], "humidity")?
                as i32;

        Ok(Some(Self {
            timestamp: Local::now(),
            temperature,
            humidity,
        }))
    }

    /// Temperature in degrees Fahrenheit.
    pub fn temperature_fahrenheit(&self) -> f32 {
        celsius_to_fahrenheit(self.temperature)
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "<{}> {:.1} °C, {} %",
            self.timestamp.format("%T"),
            self.temperature,
            self.humidity
        )
    }
}

/// Parse an ASCII decimal field of the frame.
fn parse_ascii_decimal(bytes: &[u8], field: &'static str) -> Result<f32> {
    let text = std::str::from_utf8(bytes).map_err(|_| Error::InvalidField {
        field,
        text: format!("{bytes:02X?}"),
    })?;

    let trimmed = text.trim();
    trimmed.parse::<f32>().map_err(|_| Error::InvalidField {
        field,
        text: trimmed.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_parse_well_formed_frame() {
        let reading = Reading::parse(b"T=21.5 H=55.0").unwrap().unwrap();
        assert_eq!(reading.temperature, 21.5);
        assert_eq!(reading.humidity, 55);
    }

    #[test]
    fn test_parse_reads_four_byte_fields_only() {
        // "21.50" at offset 2: only bytes 2..6 ("21.5") belong to the field.
        let reading = Reading::parse(b"T=21.50H=55.0").unwrap().unwrap();
        assert_eq!(reading.temperature, 21.5);
        assert_eq!(reading.humidity, 55);
    }

    #[test]
    fn test_parse_marker_at_offset_eight_only() {
        // Byte 1 is not the marker, byte 8 is; the frame is still a reading.
        let reading = Reading::parse(b"Tx21.5 H=55.0").unwrap().unwrap();
        assert_eq!(reading.temperature, 21.5);
        assert_eq!(reading.humidity, 55);
    }

    #[test]
    fn test_parse_no_marker_is_not_a_reading() {
        assert!(Reading::parse(&[]).unwrap().is_none());
        assert!(Reading::parse(&[0x00]).unwrap().is_none());
        assert!(Reading::parse(&[0x00; 2]).unwrap().is_none());
        assert!(Reading::parse(&[0x00; 13]).unwrap().is_none());
        assert!(Reading::parse(&[0x00; 64]).unwrap().is_none());
    }

    #[test]
    fn test_parse_short_frame_with_marker() {
        let err = Reading::parse(b"T=21.5 H=55.").unwrap_err();
        assert!(matches!(err, Error::MalformedFrame { .. }));
    }

    #[test]
    fn test_parse_non_numeric_temperature() {
        let err = Reading::parse(b"T=ab.c H=55.0").unwrap_err();
        match err {
            Error::InvalidField { field, .. } => assert_eq!(field, "temperature"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_non_numeric_humidity() {
        let err = Reading::parse(b"T=21.5 H=xx.x").unwrap_err();
        match err {
            Error::InvalidField { field, .. } => assert_eq!(field, "humidity"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_humidity_truncates_toward_zero() {
        let reading = Reading::parse(b"T=21.5 H=55.9").unwrap().unwrap();
        assert_eq!(reading.humidity, 55);
    }

    #[test]
    fn test_negative_temperature() {
        let reading = Reading::parse(b"T=-1.5 H=40.0").unwrap().unwrap();
        assert_eq!(reading.temperature, -1.5);
        assert_eq!(reading.humidity, 40);
    }

    #[test]
    fn test_temperature_fahrenheit() {
        let reading = Reading::parse(b"T=20.0 H=50.0").unwrap().unwrap();
        assert!((reading.temperature_fahrenheit() - 68.0).abs() < 0.001);
    }

    proptest! {
        /// Buffers without the marker byte never yield a reading, whatever
        /// their length or content.
        #[test]
        fn no_marker_never_yields_reading(data in proptest::collection::vec(any::<u8>(), 0..48)) {
            prop_assume!(data.get(1) != Some(&FRAME_MARKER));
            prop_assume!(data.get(8) != Some(&FRAME_MARKER));

            prop_assert!(matches!(Reading::parse(&data), Ok(None)));
        }
    }
}
