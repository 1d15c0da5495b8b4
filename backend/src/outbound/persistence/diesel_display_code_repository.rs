//! PostgreSQL-backed display code lookup and backfill.
//!
//! Each [`DisplayCodeKind`] maps to one table with a unique `display_no`
//! column. The three tables share the same column names, so the per-kind
//! queries are stamped out by `for_kind_table!`.

use async_trait::async_trait;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{
    DisplayCodeBackfillRepository, DisplayCodeBackfillRepositoryError, DisplayCodeLookup,
    DisplayCodeLookupError,
};
use crate::domain::{DisplayCode, DisplayCodeKind};

use super::diesel_error_mapping::{DieselFailure, classify_diesel_error, map_basic_diesel_error};
use super::pool::DbPool;
use super::schema::{order_refunds, orders, users};

/// Run `$body` with `$table` bound to the schema module for `$kind`.
macro_rules! for_kind_table {
    ($kind:expr, |$table:ident| $body:expr) => {
        match $kind {
            DisplayCodeKind::Order => {
                use orders as $table;
                $body
            }
            DisplayCodeKind::Refund => {
                use order_refunds as $table;
                $body
            }
            DisplayCodeKind::User => {
                use users as $table;
                $body
            }
        }
    };
}

/// Diesel-backed display code lookup and backfill adapter.
#[derive(Clone)]
pub struct DieselDisplayCodeRepository {
    pool: DbPool,
}

impl DieselDisplayCodeRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DisplayCodeLookup for DieselDisplayCodeRepository {
    async fn code_exists(
        &self,
        kind: DisplayCodeKind,
        code: &DisplayCode,
    ) -> Result<bool, DisplayCodeLookupError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| DisplayCodeLookupError::connection(err.into_message()))?;
        let code = code.as_str();

        for_kind_table!(kind, |table| {
            diesel::select(exists(table::table.filter(table::display_no.eq(code))))
                .get_result::<bool>(&mut conn)
                .await
        })
        .map_err(|err| {
            map_basic_diesel_error(
                err,
                DisplayCodeLookupError::query,
                DisplayCodeLookupError::connection,
            )
        })
    }
}

fn map_backfill_error(error: diesel::result::Error, code: &DisplayCode) -> DisplayCodeBackfillRepositoryError {
    match classify_diesel_error(error) {
        DieselFailure::UniqueViolation { .. } => {
            DisplayCodeBackfillRepositoryError::duplicate_code(code.as_str())
        }
        DieselFailure::Connection(message) => DisplayCodeBackfillRepositoryError::connection(message),
        DieselFailure::Query(message) => DisplayCodeBackfillRepositoryError::query(message),
    }
}

#[async_trait]
impl DisplayCodeBackfillRepository for DieselDisplayCodeRepository {
    async fn list_missing(
        &self,
        kind: DisplayCodeKind,
        limit: usize,
    ) -> Result<Vec<Uuid>, DisplayCodeBackfillRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| DisplayCodeBackfillRepositoryError::connection(err.into_message()))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        for_kind_table!(kind, |table| {
            table::table
                .filter(table::display_no.is_null())
                .order((table::created_at.asc(), table::id.asc()))
                .select(table::id)
                .limit(limit)
                .load::<Uuid>(&mut conn)
                .await
        })
        .map_err(|err| {
            map_basic_diesel_error(
                err,
                DisplayCodeBackfillRepositoryError::query,
                DisplayCodeBackfillRepositoryError::connection,
            )
        })
    }

    async fn assign(
        &self,
        kind: DisplayCodeKind,
        record_id: &Uuid,
        code: &DisplayCode,
    ) -> Result<bool, DisplayCodeBackfillRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| DisplayCodeBackfillRepositoryError::connection(err.into_message()))?;

        let updated = for_kind_table!(kind, |table| {
            diesel::update(
                table::table
                    .filter(table::id.eq(record_id))
                    .filter(table::display_no.is_null()),
            )
            .set(table::display_no.eq(code.as_str()))
            .execute(&mut conn)
            .await
        })
        .map_err(|err| map_backfill_error(err, code))?;

        Ok(updated == 1)
    }
}
