//! Find-or-create registration keyed by external login identity.

use std::sync::Arc;

use mockable::Clock;
use tracing::info;

use crate::domain::ports::{DisplayCodeLookup, UserRepository, UserRepositoryError};
use crate::domain::{
    AssignError, DisplayCodeAssigner, DisplayCodeKind, Error, InsertFailure, OpenId, StoredUser,
    UncodedUser, User, UserId, UserValidationError, normalize_nickname,
};

/// Outcome of [`UserRegistrationService::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Stored user.
    pub user: User,
    /// Whether this call created the user.
    pub created: bool,
}

/// Registers users on first login and assigns their display code.
pub struct UserRegistrationService<U, L> {
    users: Arc<U>,
    assigner: DisplayCodeAssigner<L>,
    clock: Arc<dyn Clock>,
}

impl<U, L> UserRegistrationService<U, L> {
    /// Create a registration service.
    pub fn new(users: Arc<U>, assigner: DisplayCodeAssigner<L>, clock: Arc<dyn Clock>) -> Self {
        Self {
            users,
            assigner,
            clock,
        }
    }
}

impl<U, L> UserRegistrationService<U, L>
where
    U: UserRepository,
    L: DisplayCodeLookup,
{
    /// Return the user for `open_id`, creating it when missing.
    ///
    /// An existing user without a nickname adopts the supplied one; an
    /// existing nickname is never overwritten. A legacy user without a
    /// display code is given one before it is returned.
    pub async fn register(&self, open_id: &str, nickname: Option<&str>) -> Result<Registration, Error> {
        let open_id = OpenId::new(open_id).map_err(map_validation_error)?;
        let nickname = normalize_nickname(nickname).map_err(map_validation_error)?;

        if let Some(stored) = self.find(&open_id).await? {
            let user = self.ensure_code(stored).await?;
            let user = self.adopt_nickname(user, nickname.as_deref()).await?;
            return Ok(Registration {
                user,
                created: false,
            });
        }

        let created_at = self.clock.utc();
        let users = Arc::clone(&self.users);
        let outcome = self
            .assigner
            .assign(DisplayCodeKind::User, |code| {
                let users = Arc::clone(&users);
                let user = User::new(
                    UserId::random(),
                    open_id.clone(),
                    code,
                    nickname.clone(),
                    created_at,
                );
                async move {
                    match users.insert(&user).await {
                        Ok(()) => Ok(user),
                        Err(UserRepositoryError::DuplicateDisplayCode { .. }) => {
                            Err(InsertFailure::DuplicateCode)
                        }
                        Err(other) => Err(InsertFailure::Other(other)),
                    }
                }
            })
            .await;

        match outcome {
            Ok(user) => {
                info!(user_id = %user.id(), display_no = %user.display_no(), "user registered");
                Ok(Registration {
                    user,
                    created: true,
                })
            }
            Err(AssignError::Insert(UserRepositoryError::DuplicateOpenId { .. })) => {
                let stored = self.find(&open_id).await?.ok_or_else(|| {
                    Error::service_unavailable("concurrent registration conflict but user not found")
                })?;
                let user = self.ensure_code(stored).await?;
                Ok(Registration {
                    user,
                    created: false,
                })
            }
            Err(error) => Err(error.into_error(map_user_error)),
        }
    }

    async fn ensure_code(&self, stored: StoredUser) -> Result<User, Error> {
        match stored {
            StoredUser::Coded(user) => Ok(user),
            StoredUser::Uncoded(legacy) => self.assign_legacy_code(legacy).await,
        }
    }

    async fn assign_legacy_code(&self, legacy: UncodedUser) -> Result<User, Error> {
        let users = Arc::clone(&self.users);
        let id = legacy.id().clone();
        let assigned = self
            .assigner
            .assign(DisplayCodeKind::User, |code| {
                let users = Arc::clone(&users);
                let id = id.clone();
                async move {
                    match users.assign_display_code(&id, &code).await {
                        Ok(true) => Ok(Some(code)),
                        Ok(false) => Ok(None),
                        Err(UserRepositoryError::DuplicateDisplayCode { .. }) => {
                            Err(InsertFailure::DuplicateCode)
                        }
                        Err(other) => Err(InsertFailure::Other(other)),
                    }
                }
            })
            .await
            .map_err(|error| error.into_error(map_user_error))?;

        if let Some(code) = assigned {
            info!(user_id = %id, display_no = %code, "legacy user given a display code");
            return Ok(legacy.with_display_no(code));
        }

        // Coded concurrently by the backfill or a parallel login.
        match self.find(legacy.open_id()).await? {
            Some(StoredUser::Coded(user)) => Ok(user),
            _ => Err(Error::service_unavailable(format!(
                "display code for user {id} changed concurrently"
            ))),
        }
    }

    async fn find(&self, open_id: &OpenId) -> Result<Option<StoredUser>, Error> {
        self.users
            .find_by_open_id(open_id)
            .await
            .map_err(map_user_error)
    }

    async fn adopt_nickname(&self, user: User, nickname: Option<&str>) -> Result<User, Error> {
        match nickname {
            Some(nickname) if user.nickname().is_none() => {
                self.users
                    .set_nickname(user.id(), nickname)
                    .await
                    .map_err(map_user_error)?;
                Ok(user.with_nickname(nickname))
            }
            _ => Ok(user),
        }
    }
}

fn map_validation_error(error: UserValidationError) -> Error {
    Error::invalid_request(error.to_string())
}

fn map_user_error(error: UserRepositoryError) -> Error {
    match error {
        UserRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("user repository unavailable: {message}"))
        }
        UserRepositoryError::Query { message } => {
            Error::internal(format!("user repository error: {message}"))
        }
        UserRepositoryError::DuplicateDisplayCode { code } => {
            Error::conflict(format!("user display code {code} already assigned"))
        }
        UserRepositoryError::DuplicateOpenId { open_id } => {
            Error::conflict(format!("open id {open_id} already registered"))
        }
    }
}
