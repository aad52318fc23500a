//! Sensor reading domain entity
//!
//! A reading is one framed line that survived validation. The original text
//! is kept verbatim (after trimming) because that is what gets published;
//! the parsed value is there for logging and callers that want a number.

use thiserror::Error;

/// Why a framed line was not accepted as a reading
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ReadingError {
    /// Nothing left after trimming whitespace
    #[error("line is empty")]
    Empty,
    /// Line bytes are not valid UTF-8
    #[error("line is not valid UTF-8: {0}")]
    NotUtf8(String),
    /// Text is not a complete decimal number
    #[error("not a number: {0}")]
    NotNumeric(String),
    /// Text is `inf` or `NaN`
    #[error("not a finite number: {0}")]
    NonFinite(String),
    /// Number overflows to infinity or underflows past the normal range
    #[error("number out of range: {0}")]
    OutOfRange(String),
}

/// A validated sensor reading
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    /// Trimmed text exactly as received
    text: String,
    /// Parsed numeric value
    value: f64,
}

impl Reading {
    /// Trimmed text as received from the sensor
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parsed numeric value
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Consume the reading, keeping its text
    pub fn into_text(self) -> String {
        self.text
    }
}

/// Whitespace stripped around a line: ASCII whitespace plus vertical tab
fn is_line_space(b: u8) -> bool {
    b.is_ascii_whitespace() || b == 0x0b
}

fn trim_line(line: &[u8]) -> &[u8] {
    let start = line.iter().position(|&b| !is_line_space(b)).unwrap_or(line.len());
    let end = line.iter().rposition(|&b| !is_line_space(b)).map_or(start, |i| i + 1);
    &line[start..end]
}

/// Validate a raw framed line (terminator included or not)
///
/// Leading and trailing whitespace is trimmed first, so `\r\n` line
/// endings are fine.
pub fn parse_line(line: &[u8]) -> Result<Reading, ReadingError> {
    let trimmed = trim_line(line);
    let text = std::str::from_utf8(trimmed)
        .map_err(|_| ReadingError::NotUtf8(String::from_utf8_lossy(trimmed).into_owned()))?;
    parse_reading(text)
}

/// Validate text as a reading
///
/// The whole trimmed text must be one decimal integer or floating point
/// number. Anything before or after the number is rejected, as are `inf`,
/// `NaN`, hex literals and values outside the normal `f64` range.
pub fn parse_reading(text: &str) -> Result<Reading, ReadingError> {
    let trimmed = text.trim_matches(|c: char| c.is_ascii() && is_line_space(c as u8));
    if trimmed.is_empty() {
        return Err(ReadingError::Empty);
    }

    let value: f64 = trimmed
        .parse()
        .map_err(|_| ReadingError::NotNumeric(trimmed.to_string()))?;
    let has_digits = trimmed.bytes().any(|b| b.is_ascii_digit());
    if !value.is_finite() {
        return Err(if has_digits {
            ReadingError::OutOfRange(trimmed.to_string())
        } else {
            ReadingError::NonFinite(trimmed.to_string())
        });
    }
    let underflow = if value == 0.0 {
        has_nonzero_mantissa(trimmed)
    } else {
        !value.is_normal()
    };
    if underflow {
        return Err(ReadingError::OutOfRange(trimmed.to_string()));
    }

    Ok(Reading {
        text: trimmed.to_string(),
        value,
    })
}

/// Whether the digits before the exponent are anything but zeros
fn has_nonzero_mantissa(text: &str) -> bool {
    text.bytes()
        .take_while(|b| !matches!(b, b'e' | b'E'))
        .any(|b| matches!(b, b'1'..=b'9'))
}
