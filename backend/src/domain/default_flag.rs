//! Default-flag coordination.
//!
//! Keeps "exactly one default per owner" true across concurrent requests by
//! reducing every change to one atomic
//! [`DefaultFlagRepository::apply_default`] call. Whichever call commits
//! last wins; no interleaving leaves an owner with zero or two defaults.

use std::sync::Arc;

use mockable::Clock;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{DefaultFlagRepository, DefaultFlagRepositoryError};
use crate::domain::{Error, UserId};

/// Failures raised by [`DefaultFlagCoordinator::set_default`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefaultFlagError {
    /// The target does not exist, or vanished before the write.
    #[error("entity {entity_id} not found")]
    NotFound {
        /// Requested target.
        entity_id: Uuid,
    },
    /// The target belongs to another owner.
    #[error("entity {entity_id} is not owned by the requester")]
    Forbidden {
        /// Requested target.
        entity_id: Uuid,
    },
    /// The repository failed; no flag changed.
    #[error(transparent)]
    Repository(DefaultFlagRepositoryError),
}

impl From<DefaultFlagError> for Error {
    fn from(error: DefaultFlagError) -> Self {
        match error {
            DefaultFlagError::NotFound { entity_id } => Error::not_found("entity not found")
                .with_details(json!({ "code": "entity_not_found", "id": entity_id })),
            DefaultFlagError::Forbidden { entity_id } => Error::forbidden("not owner")
                .with_details(json!({ "code": "not_owner", "id": entity_id })),
            DefaultFlagError::Repository(DefaultFlagRepositoryError::Connection { message }) => {
                Error::service_unavailable(format!("default flag repository unavailable: {message}"))
            }
            DefaultFlagError::Repository(other) => {
                Error::internal(format!("default flag repository error: {other}"))
            }
        }
    }
}

/// Marks one entity as its owner's default.
#[derive(Clone)]
pub struct DefaultFlagCoordinator<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> DefaultFlagCoordinator<R> {
    /// Create a coordinator over `repo`.
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }
}

impl<R> DefaultFlagCoordinator<R>
where
    R: DefaultFlagRepository,
{
    /// Make `entity_id` the only default among `owner`'s entities.
    ///
    /// Every sibling, the target included, has its `updated_at` touched.
    pub async fn set_default(&self, owner: &UserId, entity_id: &Uuid) -> Result<(), DefaultFlagError> {
        let entity_id = *entity_id;
        match self
            .repo
            .find_owner(&entity_id)
            .await
            .map_err(DefaultFlagError::Repository)?
        {
            None => return Err(DefaultFlagError::NotFound { entity_id }),
            Some(actual) if actual != *owner => {
                return Err(DefaultFlagError::Forbidden { entity_id });
            }
            Some(_) => {}
        }

        let touched_at = self.clock.utc();
        match self.repo.apply_default(owner, &entity_id, touched_at).await {
            Ok(rows) => {
                debug!(%owner, %entity_id, rows, "default flag applied");
                Ok(())
            }
            Err(DefaultFlagRepositoryError::TargetMissing) => {
                Err(DefaultFlagError::NotFound { entity_id })
            }
            Err(error) => Err(DefaultFlagError::Repository(error)),
        }
    }
}
