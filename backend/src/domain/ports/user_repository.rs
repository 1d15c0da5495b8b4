//! Port abstraction for user persistence adapters and their errors.
use async_trait::async_trait;

use crate::domain::{DisplayCode, OpenId, StoredUser, User, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user repository adapters.
    pub enum UserRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
        /// Another user already holds the display code.
        DuplicateDisplayCode { code: String } => "user display code {code} already assigned",
        /// Another user registered the same open id concurrently.
        DuplicateOpenId { open_id: String } => "open id {open_id} already registered",
    }
}

/// Storage for registered users.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fetch a user by external login identity.
    ///
    /// Legacy rows without a display code come back as
    /// [`StoredUser::Uncoded`].
    async fn find_by_open_id(&self, open_id: &OpenId) -> Result<Option<StoredUser>, UserRepositoryError>;

    /// Insert a new user; unique violations map to the `Duplicate*` variants.
    async fn insert(&self, user: &User) -> Result<(), UserRepositoryError>;

    /// Give a legacy user its display code.
    ///
    /// Returns `false` without writing when the user is gone or already has
    /// a code. A code held by another user maps to
    /// [`UserRepositoryError::DuplicateDisplayCode`].
    async fn assign_display_code(
        &self,
        id: &UserId,
        code: &DisplayCode,
    ) -> Result<bool, UserRepositoryError>;

    /// Store a nickname for an existing user.
    async fn set_nickname(&self, id: &UserId, nickname: &str) -> Result<(), UserRepositoryError>;
}
