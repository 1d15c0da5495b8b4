//! Display code generation for orders, refunds and users.
//!
//! Three layers, each usable on its own:
//! - [`DisplayCodeGenerator`] proposes a code that was free at lookup time;
//! - [`DisplayCodeAssigner`] repeats generate-then-insert when the insert
//!   still loses a race on the unique constraint;
//! - [`DisplayCodeBackfillService`] assigns codes to legacy rows.

mod assigner;
mod backfill;
mod generator;

#[cfg(test)]
mod tests;

use std::fmt;

use display_code::{DisplayCode, DisplayCodeFormatError, PrefixShape};
use serde::{Deserialize, Serialize};

pub use assigner::{AssignError, DEFAULT_INSERT_ATTEMPTS, DisplayCodeAssigner, InsertFailure};
pub use backfill::{
    BackfillReport, DEFAULT_BACKFILL_MAX_ATTEMPTS, DEFAULT_BACKFILL_PAGE_SIZE,
    DisplayCodeBackfillService, KindBackfill,
};
pub use generator::{DEFAULT_MAX_ATTEMPTS, DisplayCodeError, DisplayCodeGenerator};

/// Entity family a display code belongs to.
///
/// Each kind has its own unique namespace; the same digits may appear once
/// per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayCodeKind {
    /// Customer orders.
    Order,
    /// Refunds raised against an order.
    Refund,
    /// Registered users.
    User,
}

impl DisplayCodeKind {
    /// Every kind, in backfill order.
    pub const ALL: [Self; 3] = [Self::Order, Self::Refund, Self::User];

    /// Prefix shape used when composing codes of this kind.
    pub const fn shape(self) -> PrefixShape {
        match self {
            Self::Order | Self::Refund => PrefixShape::Fine,
            Self::User => PrefixShape::Coarse,
        }
    }

    /// Table that owns the unique `display_no` column for this kind.
    pub const fn table(self) -> &'static str {
        match self {
            Self::Order => "orders",
            Self::Refund => "order_refunds",
            Self::User => "users",
        }
    }

    /// Lowercase label used in logs and error details.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::Refund => "refund",
            Self::User => "user",
        }
    }

    /// Validate a stored code against this kind's length.
    pub fn parse_code(self, raw: impl Into<String>) -> Result<DisplayCode, DisplayCodeFormatError> {
        DisplayCode::parse(self.shape(), raw)
    }
}

impl fmt::Display for DisplayCodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
