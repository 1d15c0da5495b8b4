//! Port for assigning display codes to legacy rows that have none.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{DisplayCode, DisplayCodeKind};

use super::define_port_error;

define_port_error! {
    /// Errors raised by display code backfill adapters.
    pub enum DisplayCodeBackfillRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "backfill repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "backfill repository query failed: {message}",
        /// The code was claimed by another row first.
        DuplicateCode { code: String } => "display code {code} already assigned",
    }
}

/// Paged access to rows missing a display code.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DisplayCodeBackfillRepository: Send + Sync {
    /// Up to `limit` record ids of `kind` with no code, oldest first.
    async fn list_missing(
        &self,
        kind: DisplayCodeKind,
        limit: usize,
    ) -> Result<Vec<Uuid>, DisplayCodeBackfillRepositoryError>;

    /// Set the code of `record_id` if it still has none.
    ///
    /// Returns `false` when the row vanished or was already coded.
    async fn assign(
        &self,
        kind: DisplayCodeKind,
        record_id: &Uuid,
        code: &DisplayCode,
    ) -> Result<bool, DisplayCodeBackfillRepositoryError>;
}

/// Fixture repository with nothing left to backfill.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureDisplayCodeBackfillRepository;

#[async_trait]
impl DisplayCodeBackfillRepository for FixtureDisplayCodeBackfillRepository {
    async fn list_missing(
        &self,
        _kind: DisplayCodeKind,
        _limit: usize,
    ) -> Result<Vec<Uuid>, DisplayCodeBackfillRepositoryError> {
        Ok(Vec::new())
    }

    async fn assign(
        &self,
        _kind: DisplayCodeKind,
        _record_id: &Uuid,
        _code: &DisplayCode,
    ) -> Result<bool, DisplayCodeBackfillRepositoryError> {
        Ok(false)
    }
}
