//! The display code value type.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digits::{DigitSource, SUFFIX_LEN};
use crate::shape::PrefixShape;

/// Validation failures for raw display code strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisplayCodeFormatError {
    /// The input was empty.
    #[error("display code must not be empty")]
    Empty,
    /// The input length does not match the expected shape.
    #[error("display code must be {expected} digits, got {actual}")]
    WrongLength {
        /// Length required by the shape.
        expected: usize,
        /// Length of the rejected input.
        actual: usize,
    },
    /// The input contained something other than ASCII digits.
    #[error("display code may only contain ASCII digits")]
    NonDigit,
}

/// Short, human-legible identifier made of a time prefix and random digits.
///
/// Codes are immutable once built; the only constructors are
/// [`DisplayCode::compose`] for fresh candidates and [`DisplayCode::parse`]
/// for stored values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayCode(String);

impl DisplayCode {
    /// Build a candidate from the clock reading and a digit source.
    #[must_use]
    pub fn compose(shape: PrefixShape, now: DateTime<Utc>, source: &dyn DigitSource) -> Self {
        let mut value = shape.render(now);
        value.push_str(&source.digits(SUFFIX_LEN));
        Self(value)
    }

    /// Validate a stored code against the expected shape.
    ///
    /// # Errors
    ///
    /// Returns [`DisplayCodeFormatError`] when the input is empty, has the
    /// wrong length for `shape`, or contains non-digit characters.
    pub fn parse(shape: PrefixShape, raw: impl Into<String>) -> Result<Self, DisplayCodeFormatError> {
        let code = Self::try_from(raw.into())?;
        let actual = code.0.len();
        if actual != shape.code_len() {
            return Err(DisplayCodeFormatError::WrongLength {
                expected: shape.code_len(),
                actual,
            });
        }
        Ok(code)
    }

    /// Borrow the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Time-derived prefix, if the code is long enough for `shape`.
    #[must_use]
    pub fn prefix(&self, shape: PrefixShape) -> Option<&str> {
        self.0.get(..shape.prefix_len())
    }
}

impl AsRef<str> for DisplayCode {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for DisplayCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DisplayCode> for String {
    fn from(value: DisplayCode) -> Self {
        value.0
    }
}

impl TryFrom<String> for DisplayCode {
    type Error = DisplayCodeFormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(DisplayCodeFormatError::Empty);
        }
        if !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DisplayCodeFormatError::NonDigit);
        }
        Ok(Self(value))
    }
}
