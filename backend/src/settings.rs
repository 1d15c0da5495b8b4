//! Display code configuration loaded via OrthoConfig.

use std::sync::Arc;

use mockable::Clock;
use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::display_code::{
    DEFAULT_BACKFILL_MAX_ATTEMPTS, DEFAULT_BACKFILL_PAGE_SIZE, DEFAULT_INSERT_ATTEMPTS,
    DEFAULT_MAX_ATTEMPTS,
};
use crate::domain::{DisplayCodeAssigner, DisplayCodeGenerator};

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisplayCodeSettingsError {
    /// A count that must be positive was zero.
    #[error("{field} must be at least 1")]
    Zero { field: &'static str },
}

/// Attempt budgets and paging for display code generation.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "DISPLAY_CODE")]
pub struct DisplayCodeSettings {
    /// Lookups per generated code on the live paths.
    pub max_attempts: Option<u32>,
    /// Lookups per generated code during the backfill.
    pub backfill_max_attempts: Option<u32>,
    /// Generate-and-insert cycles per stored code.
    pub insert_attempts: Option<u32>,
    /// Rows fetched per backfill page.
    pub backfill_page_size: Option<usize>,
}

impl DisplayCodeSettings {
    /// Configured lookup budget, falling back to the default.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS)
    }

    /// Configured backfill lookup budget, falling back to the default.
    pub fn backfill_max_attempts(&self) -> u32 {
        self.backfill_max_attempts.unwrap_or(DEFAULT_BACKFILL_MAX_ATTEMPTS)
    }

    /// Configured insert budget, falling back to the default.
    pub fn insert_attempts(&self) -> u32 {
        self.insert_attempts.unwrap_or(DEFAULT_INSERT_ATTEMPTS)
    }

    /// Configured backfill page size, falling back to the default.
    pub fn backfill_page_size(&self) -> usize {
        self.backfill_page_size.unwrap_or(DEFAULT_BACKFILL_PAGE_SIZE)
    }

    /// Reject zero budgets and page sizes.
    pub fn validate(&self) -> Result<(), DisplayCodeSettingsError> {
        if self.max_attempts() == 0 {
            return Err(DisplayCodeSettingsError::Zero {
                field: "max_attempts",
            });
        }
        if self.backfill_max_attempts() == 0 {
            return Err(DisplayCodeSettingsError::Zero {
                field: "backfill_max_attempts",
            });
        }
        if self.insert_attempts() == 0 {
            return Err(DisplayCodeSettingsError::Zero {
                field: "insert_attempts",
            });
        }
        if self.backfill_page_size() == 0 {
            return Err(DisplayCodeSettingsError::Zero {
                field: "backfill_page_size",
            });
        }
        Ok(())
    }

    /// Build an assigner for registration and other live writes.
    pub fn assigner<L>(&self, lookup: Arc<L>, clock: Arc<dyn Clock>) -> DisplayCodeAssigner<L> {
        self.build_assigner(lookup, clock, self.max_attempts())
    }

    /// Build an assigner for the backfill, with its larger lookup budget.
    pub fn backfill_assigner<L>(
        &self,
        lookup: Arc<L>,
        clock: Arc<dyn Clock>,
    ) -> DisplayCodeAssigner<L> {
        self.build_assigner(lookup, clock, self.backfill_max_attempts())
    }

    fn build_assigner<L>(
        &self,
        lookup: Arc<L>,
        clock: Arc<dyn Clock>,
        max_attempts: u32,
    ) -> DisplayCodeAssigner<L> {
        let generator = DisplayCodeGenerator::new(lookup, clock).with_max_attempts(max_attempts);
        DisplayCodeAssigner::new(generator).with_insert_attempts(self.insert_attempts())
    }
}
