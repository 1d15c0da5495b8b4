//! Time-derived prefix shapes.

use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::digits::SUFFIX_LEN;

/// Seconds east of UTC used when rendering every prefix (UTC+8).
pub const CIVIL_OFFSET_SECONDS: i32 = 8 * 60 * 60;

/// Layout of the time-derived part of a display code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixShape {
    /// `YYMMDDHHMMSS`: twelve digits, used for orders and refunds.
    Fine,
    /// `YYMMDD`: six digits, used for users.
    Coarse,
}

impl PrefixShape {
    /// Number of digits in the rendered prefix.
    #[must_use]
    pub const fn prefix_len(self) -> usize {
        match self {
            Self::Fine => 12,
            Self::Coarse => 6,
        }
    }

    /// Total length of a code with this prefix shape.
    #[must_use]
    pub const fn code_len(self) -> usize {
        self.prefix_len() + SUFFIX_LEN
    }

    const fn pattern(self) -> &'static str {
        match self {
            Self::Fine => "%y%m%d%H%M%S",
            Self::Coarse => "%y%m%d",
        }
    }

    /// Render the prefix for `now` in the civil offset.
    #[must_use]
    pub fn render(self, now: DateTime<Utc>) -> String {
        now.with_timezone(&civil_offset())
            .format(self.pattern())
            .to_string()
    }
}

/// Fixed civil offset used for prefixes.
#[must_use]
pub fn civil_offset() -> FixedOffset {
    FixedOffset::east_opt(CIVIL_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix())
}
