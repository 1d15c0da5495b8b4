//! Generate-and-insert with retry on a lost unique-constraint race.

use std::future::Future;

use display_code::DisplayCode;
use serde_json::json;
use tracing::{debug, warn};

use super::{DisplayCodeError, DisplayCodeGenerator, DisplayCodeKind};
use crate::domain::Error;
use crate::domain::ports::DisplayCodeLookup;

/// Full generate-and-insert cycles attempted unless configured otherwise.
pub const DEFAULT_INSERT_ATTEMPTS: u32 = 5;

/// Outcome of a failed insert, as reported by the caller's closure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertFailure<E> {
    /// The store's unique constraint rejected the code.
    DuplicateCode,
    /// Any other failure; aborts without retry.
    Other(E),
}

/// Failures raised by [`DisplayCodeAssigner::assign`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssignError<E> {
    /// Code generation failed.
    #[error(transparent)]
    Generate(#[from] DisplayCodeError),
    /// Every generated code was taken by the time it was inserted.
    #[error("{kind} display code still duplicated after {attempts} inserts")]
    DuplicateExhausted {
        /// Kind being assigned.
        kind: DisplayCodeKind,
        /// Insert cycles made before giving up.
        attempts: u32,
    },
    /// The insert failed for a reason other than a duplicate code.
    #[error("{0}")]
    Insert(E),
}

impl<E> AssignError<E> {
    /// Convert into a domain error, mapping insert failures with `map_insert`.
    pub fn into_error(self, map_insert: impl FnOnce(E) -> Error) -> Error {
        match self {
            Self::Generate(error) => error.into(),
            Self::DuplicateExhausted { kind, attempts } => {
                Error::conflict(format!("could not store a unique {kind} display code"))
                    .with_details(json!({
                        "code": "display_code_duplicate",
                        "kind": kind,
                        "attempts": attempts,
                    }))
            }
            Self::Insert(error) => map_insert(error),
        }
    }
}

/// Wraps a [`DisplayCodeGenerator`] with an outer duplicate-key retry.
pub struct DisplayCodeAssigner<L> {
    generator: DisplayCodeGenerator<L>,
    insert_attempts: u32,
}

impl<L> DisplayCodeAssigner<L> {
    /// Create an assigner with the default insert budget.
    pub fn new(generator: DisplayCodeGenerator<L>) -> Self {
        Self {
            generator,
            insert_attempts: DEFAULT_INSERT_ATTEMPTS,
        }
    }

    /// Replace the insert budget.
    #[must_use]
    pub fn with_insert_attempts(mut self, insert_attempts: u32) -> Self {
        self.insert_attempts = insert_attempts;
        self
    }

    /// Underlying generator.
    pub fn generator(&self) -> &DisplayCodeGenerator<L> {
        &self.generator
    }
}

impl<L> DisplayCodeAssigner<L>
where
    L: DisplayCodeLookup,
{
    /// Generate a code and hand it to `insert`, repeating on duplicates.
    ///
    /// `insert` must persist the owning record atomically with the code and
    /// report a unique violation on the code column as
    /// [`InsertFailure::DuplicateCode`].
    pub async fn assign<T, E, F, Fut>(
        &self,
        kind: DisplayCodeKind,
        mut insert: F,
    ) -> Result<T, AssignError<E>>
    where
        F: FnMut(DisplayCode) -> Fut + Send,
        Fut: Future<Output = Result<T, InsertFailure<E>>> + Send,
    {
        if self.insert_attempts == 0 {
            return Err(DisplayCodeError::InvalidAttempts.into());
        }

        for attempt in 1..=self.insert_attempts {
            let code = self.generator.generate(kind).await?;
            match insert(code.clone()).await {
                Ok(value) => return Ok(value),
                Err(InsertFailure::DuplicateCode) => {
                    debug!(%kind, attempt, %code, "display code lost insert race");
                }
                Err(InsertFailure::Other(error)) => return Err(AssignError::Insert(error)),
            }
        }

        warn!(%kind, attempts = self.insert_attempts, "display code inserts exhausted");
        Err(AssignError::DuplicateExhausted {
            kind,
            attempts: self.insert_attempts,
        })
    }
}
