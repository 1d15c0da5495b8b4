//! Collision-checked code generation.

use std::sync::Arc;

use display_code::{DigitSource, DisplayCode, ThreadRngDigits};
use mockable::Clock;
use serde_json::json;
use tracing::{debug, warn};

use super::DisplayCodeKind;
use crate::domain::Error;
use crate::domain::ports::{DisplayCodeLookup, DisplayCodeLookupError};

/// Lookups made per `generate` call unless configured otherwise.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Failures raised while generating a display code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DisplayCodeError {
    /// Every candidate collided with an existing record.
    #[error("no free {kind} display code after {attempts} attempts")]
    Exhausted {
        /// Kind being generated.
        kind: DisplayCodeKind,
        /// Lookups made before giving up.
        attempts: u32,
    },
    /// The attempt budget was zero.
    #[error("display code attempt budget must be at least 1")]
    InvalidAttempts,
    /// The collision lookup itself failed.
    #[error(transparent)]
    Lookup(#[from] DisplayCodeLookupError),
}

impl From<DisplayCodeError> for Error {
    fn from(error: DisplayCodeError) -> Self {
        match error {
            DisplayCodeError::Exhausted { kind, attempts } => {
                Error::service_unavailable(format!("could not allocate a {kind} display code"))
                    .with_details(json!({
                        "code": "display_code_exhausted",
                        "kind": kind,
                        "attempts": attempts,
                    }))
            }
            DisplayCodeError::InvalidAttempts => {
                Error::internal("display code attempt budget misconfigured")
            }
            DisplayCodeError::Lookup(DisplayCodeLookupError::Connection { message }) => {
                Error::service_unavailable(format!("display code lookup unavailable: {message}"))
            }
            DisplayCodeError::Lookup(DisplayCodeLookupError::Query { message }) => {
                Error::internal(format!("display code lookup error: {message}"))
            }
        }
    }
}

/// Proposes display codes that were unused at the moment of lookup.
///
/// A returned code is only a candidate: another writer may take it before
/// the caller inserts. Pair with
/// [`DisplayCodeAssigner`](super::DisplayCodeAssigner) to retry in that case.
pub struct DisplayCodeGenerator<L> {
    lookup: Arc<L>,
    clock: Arc<dyn Clock>,
    digits: Arc<dyn DigitSource>,
    max_attempts: u32,
}

impl<L> DisplayCodeGenerator<L> {
    /// Create a generator drawing suffix digits from the thread RNG.
    pub fn new(lookup: Arc<L>, clock: Arc<dyn Clock>) -> Self {
        Self {
            lookup,
            clock,
            digits: Arc::new(ThreadRngDigits),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Replace the suffix digit source.
    #[must_use]
    pub fn with_digits(mut self, digits: Arc<dyn DigitSource>) -> Self {
        self.digits = digits;
        self
    }

    /// Replace the default attempt budget used by [`Self::generate`].
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Attempt budget used by [`Self::generate`].
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl<L> DisplayCodeGenerator<L>
where
    L: DisplayCodeLookup,
{
    /// Generate a code for `kind` with the configured attempt budget.
    pub async fn generate(&self, kind: DisplayCodeKind) -> Result<DisplayCode, DisplayCodeError> {
        self.generate_with_attempts(kind, self.max_attempts).await
    }

    /// Generate a code for `kind`, making at most `max_attempts` lookups.
    ///
    /// Each attempt re-reads the clock and draws a fresh suffix, so a retry
    /// that crosses a second (or day) boundary picks up the new prefix.
    pub async fn generate_with_attempts(
        &self,
        kind: DisplayCodeKind,
        max_attempts: u32,
    ) -> Result<DisplayCode, DisplayCodeError> {
        if max_attempts == 0 {
            return Err(DisplayCodeError::InvalidAttempts);
        }

        for attempt in 1..=max_attempts {
            let candidate = DisplayCode::compose(kind.shape(), self.clock.utc(), &*self.digits);
            if !self.lookup.code_exists(kind, &candidate).await? {
                return Ok(candidate);
            }
            debug!(%kind, attempt, code = %candidate, "display code collision");
        }

        warn!(%kind, attempts = max_attempts, "display code attempts exhausted");
        Err(DisplayCodeError::Exhausted {
            kind,
            attempts: max_attempts,
        })
    }
}
