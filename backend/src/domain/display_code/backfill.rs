//! Assign display codes to rows created before codes existed.

use std::sync::Arc;

use tracing::{info, instrument};

use super::{AssignError, DisplayCodeAssigner, DisplayCodeKind, InsertFailure};
use crate::domain::Error;
use crate::domain::ports::{
    DisplayCodeBackfillRepository, DisplayCodeBackfillRepositoryError, DisplayCodeLookup,
};

/// Rows fetched per page unless configured otherwise.
pub const DEFAULT_BACKFILL_PAGE_SIZE: usize = 300;

/// Lookups per generated code during the backfill.
pub const DEFAULT_BACKFILL_MAX_ATTEMPTS: u32 = 10;

/// Per-kind backfill counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindBackfill {
    /// Kind that was processed.
    pub kind: DisplayCodeKind,
    /// Rows that received a code.
    pub assigned: u64,
    /// Rows that were coded or deleted concurrently and left alone.
    pub skipped: u64,
}

impl KindBackfill {
    fn empty(kind: DisplayCodeKind) -> Self {
        Self {
            kind,
            assigned: 0,
            skipped: 0,
        }
    }
}

/// Result of a backfill run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillReport {
    /// Counters in processing order.
    pub kinds: Vec<KindBackfill>,
}

impl BackfillReport {
    /// Total rows that received a code across every kind.
    pub fn total_assigned(&self) -> u64 {
        self.kinds.iter().map(|entry| entry.assigned).sum()
    }

    /// Counters for `kind`, if it was processed.
    pub fn for_kind(&self, kind: DisplayCodeKind) -> Option<&KindBackfill> {
        self.kinds.iter().find(|entry| entry.kind == kind)
    }
}

/// Pages through uncoded rows and assigns each a unique code.
pub struct DisplayCodeBackfillService<R, L> {
    repo: Arc<R>,
    assigner: DisplayCodeAssigner<L>,
    page_size: usize,
}

impl<R, L> DisplayCodeBackfillService<R, L> {
    /// Create a backfill service with the default page size.
    pub fn new(repo: Arc<R>, assigner: DisplayCodeAssigner<L>) -> Self {
        Self {
            repo,
            assigner,
            page_size: DEFAULT_BACKFILL_PAGE_SIZE,
        }
    }

    /// Replace the page size; zero is raised to one.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

impl<R, L> DisplayCodeBackfillService<R, L>
where
    R: DisplayCodeBackfillRepository,
    L: DisplayCodeLookup,
{
    /// Backfill each of `kinds` in turn, stopping at the first failure.
    pub async fn run(&self, kinds: &[DisplayCodeKind]) -> Result<BackfillReport, Error> {
        let mut report = BackfillReport::default();
        for &kind in kinds {
            report.kinds.push(self.backfill_kind(kind).await?);
        }
        info!(total = report.total_assigned(), "display code backfill finished");
        Ok(report)
    }

    /// Backfill every uncoded row of `kind`.
    #[instrument(skip(self), fields(page_size = self.page_size))]
    pub async fn backfill_kind(&self, kind: DisplayCodeKind) -> Result<KindBackfill, Error> {
        let mut counters = KindBackfill::empty(kind);
        loop {
            let page = self
                .repo
                .list_missing(kind, self.page_size)
                .await
                .map_err(map_backfill_error)?;
            if page.is_empty() {
                break;
            }

            for record_id in page {
                let repo = Arc::clone(&self.repo);
                let stored = self
                    .assigner
                    .assign(kind, move |code| {
                        let repo = Arc::clone(&repo);
                        async move {
                            repo.assign(kind, &record_id, &code)
                                .await
                                .map_err(classify_assign_error)
                        }
                    })
                    .await
                    .map_err(|error: AssignError<DisplayCodeBackfillRepositoryError>| {
                        error.into_error(map_backfill_error)
                    })?;
                if stored {
                    counters.assigned += 1;
                } else {
                    counters.skipped += 1;
                }
            }
            info!(
                %kind,
                assigned = counters.assigned,
                skipped = counters.skipped,
                "display code backfill page done"
            );
        }
        Ok(counters)
    }
}

fn classify_assign_error(
    error: DisplayCodeBackfillRepositoryError,
) -> InsertFailure<DisplayCodeBackfillRepositoryError> {
    match error {
        DisplayCodeBackfillRepositoryError::DuplicateCode { .. } => InsertFailure::DuplicateCode,
        other => InsertFailure::Other(other),
    }
}

fn map_backfill_error(error: DisplayCodeBackfillRepositoryError) -> Error {
    match error {
        DisplayCodeBackfillRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("backfill repository unavailable: {message}"))
        }
        DisplayCodeBackfillRepositoryError::Query { message } => {
            Error::internal(format!("backfill repository error: {message}"))
        }
        DisplayCodeBackfillRepositoryError::DuplicateCode { code } => {
            Error::conflict(format!("display code {code} already assigned"))
        }
    }
}
