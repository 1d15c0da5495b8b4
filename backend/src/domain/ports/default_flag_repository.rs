//! Port for the "exactly one default per owner" write.
//!
//! [`DefaultFlagRepository::apply_default`] is the transactional
//! update-many: every sibling of the owner gets `is_default = (id == target)`
//! and `updated_at = touched_at`, all or nothing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::UserId;

use super::define_port_error;

define_port_error! {
    /// Errors raised by default-flag repository adapters.
    pub enum DefaultFlagRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "default flag repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "default flag repository query failed: {message}",
        /// The target vanished or changed owner before the write; nothing was changed.
        TargetMissing => "default target no longer belongs to the owner",
    }
}

/// Atomic default-flag maintenance for one entity kind.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DefaultFlagRepository: Send + Sync {
    /// Owner of `entity_id`, or `None` when the entity does not exist.
    async fn find_owner(&self, entity_id: &Uuid) -> Result<Option<UserId>, DefaultFlagRepositoryError>;

    /// Flag `target` as the owner's only default and touch every sibling.
    ///
    /// Implementations must re-check inside the same unit of work that
    /// `target` still belongs to `owner`, returning
    /// [`DefaultFlagRepositoryError::TargetMissing`] without writing
    /// otherwise. Returns the number of rows touched.
    async fn apply_default(
        &self,
        owner: &UserId,
        target: &Uuid,
        touched_at: DateTime<Utc>,
    ) -> Result<u64, DefaultFlagRepositoryError>;
}
