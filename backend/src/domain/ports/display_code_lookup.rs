//! Port for the collision check made before accepting a display code.
//!
//! The lookup is a point read against the unique `display_no` column of the
//! table selected by [`DisplayCodeKind`]. It performs no writes; the owning
//! insert remains the final authority through the store's unique constraint.

use async_trait::async_trait;

use crate::domain::{DisplayCode, DisplayCodeKind};

use super::define_port_error;

define_port_error! {
    /// Errors raised by display code lookup adapters.
    pub enum DisplayCodeLookupError {
        /// Repository connection could not be established.
        Connection { message: String } => "display code lookup connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } => "display code lookup query failed: {message}",
    }
}

/// Point lookup by unique display code.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DisplayCodeLookup: Send + Sync {
    /// Return `true` when a record of `kind` already carries `code`.
    async fn code_exists(
        &self,
        kind: DisplayCodeKind,
        code: &DisplayCode,
    ) -> Result<bool, DisplayCodeLookupError>;
}

/// Fixture lookup that never reports a collision.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureDisplayCodeLookup;

#[async_trait]
impl DisplayCodeLookup for FixtureDisplayCodeLookup {
    async fn code_exists(
        &self,
        _kind: DisplayCodeKind,
        _code: &DisplayCode,
    ) -> Result<bool, DisplayCodeLookupError> {
        Ok(false)
    }
}
