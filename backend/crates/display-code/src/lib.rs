//! Human-legible display code primitives.
//!
//! A display code is a short string of ASCII digits made of a time-derived
//! prefix followed by a random suffix. The prefix is always rendered in a
//! fixed civil offset (UTC+8) so codes read the same regardless of where the
//! service is deployed. Uniqueness is not decided here: callers check the
//! backing store and retry with a fresh candidate on collision.
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use display_code::{DigitSource, DisplayCode, PrefixShape};
//!
//! struct Sevens;
//! impl DigitSource for Sevens {
//!     fn next_digit(&self) -> u8 {
//!         7
//!     }
//! }
//!
//! let now = Utc.with_ymd_and_hms(2025, 3, 9, 4, 5, 6).single().expect("valid time");
//! let code = DisplayCode::compose(PrefixShape::Coarse, now, &Sevens);
//! assert_eq!(code.as_str(), "250309777777");
//! ```

mod code;
mod digits;
mod shape;

pub use code::{DisplayCode, DisplayCodeFormatError};
pub use digits::{DigitSource, SUFFIX_LEN, SeededDigits, ThreadRngDigits};
pub use shape::{CIVIL_OFFSET_SECONDS, PrefixShape, civil_offset};
