//! Registered storefront users.
//!
//! A user is created once per external login identity (`open_id`) and is
//! given a coarse-shaped display code at that moment. The display code is
//! what support staff read back to customers, so it never changes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::DisplayCode;

/// Validation errors returned by the user value constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    /// The identifier string was empty.
    #[error("user id must not be empty")]
    EmptyId,
    /// The identifier string was not a UUID.
    #[error("user id must be a valid UUID")]
    InvalidId,
    /// The external login identity was blank.
    #[error("open id must not be empty")]
    EmptyOpenId,
    /// The external login identity exceeded the column width.
    #[error("open id must be at most {max} characters")]
    OpenIdTooLong { max: usize },
    /// The nickname exceeded the allowed length.
    #[error("nickname must be at most {max} characters")]
    NicknameTooLong { max: usize },
}

/// Stable user identifier stored as a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(Uuid, String);

impl UserId {
    /// Validate and construct a [`UserId`] from borrowed input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserValidationError> {
        Self::from_owned(id.as_ref().to_owned())
    }

    /// Generate a new random [`UserId`].
    pub fn random() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    /// Wrap an already parsed UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid, uuid.to_string())
    }

    fn from_owned(id: String) -> Result<Self, UserValidationError> {
        if id.is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        if id.trim() != id {
            return Err(UserValidationError::InvalidId);
        }

        let parsed = Uuid::parse_str(&id).map_err(|_| UserValidationError::InvalidId)?;
        Ok(Self(parsed, id))
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.1.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        let UserId(_, raw) = value;
        raw
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Maximum length of an external login identity.
pub const OPEN_ID_MAX: usize = 128;
/// Maximum length of a nickname.
pub const NICKNAME_MAX: usize = 32;

/// External login identity (for example a mini-program open id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OpenId(String);

impl OpenId {
    /// Validate and construct an [`OpenId`].
    pub fn new(value: impl Into<String>) -> Result<Self, UserValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyOpenId);
        }
        if trimmed.chars().count() > OPEN_ID_MAX {
            return Err(UserValidationError::OpenIdTooLong { max: OPEN_ID_MAX });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the identity as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for OpenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<OpenId> for String {
    fn from(value: OpenId) -> Self {
        value.0
    }
}

impl TryFrom<String> for OpenId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Normalise an optional nickname: blank input becomes `None`.
pub fn normalize_nickname(raw: Option<&str>) -> Result<Option<String>, UserValidationError> {
    let Some(trimmed) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    if trimmed.chars().count() > NICKNAME_MAX {
        return Err(UserValidationError::NicknameTooLong { max: NICKNAME_MAX });
    }
    Ok(Some(trimmed.to_owned()))
}

/// Storefront user.
///
/// ## Invariants
/// - `display_no` is assigned at creation and never reassigned.
/// - `open_id` is unique across users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: UserId,
    open_id: OpenId,
    display_no: DisplayCode,
    nickname: Option<String>,
    created_at: DateTime<Utc>,
}

impl User {
    /// Build a user from validated components.
    pub fn new(
        id: UserId,
        open_id: OpenId,
        display_no: DisplayCode,
        nickname: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            open_id,
            display_no,
            nickname,
            created_at,
        }
    }

    /// Stable user identifier.
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// External login identity.
    pub fn open_id(&self) -> &OpenId {
        &self.open_id
    }

    /// Human-legible user number.
    pub fn display_no(&self) -> &DisplayCode {
        &self.display_no
    }

    /// Optional nickname.
    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    /// Creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Return a copy carrying `nickname`.
    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }
}

/// User row created before display codes existed.
///
/// Becomes a [`User`] once a code is assigned, either on the user's next
/// login or by the backfill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UncodedUser {
    id: UserId,
    open_id: OpenId,
    nickname: Option<String>,
    created_at: DateTime<Utc>,
}

impl UncodedUser {
    /// Build a legacy user from validated components.
    pub fn new(
        id: UserId,
        open_id: OpenId,
        nickname: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            open_id,
            nickname,
            created_at,
        }
    }

    /// Stable user identifier.
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// External login identity.
    pub fn open_id(&self) -> &OpenId {
        &self.open_id
    }

    /// Optional nickname.
    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    /// Replace the nickname.
    #[must_use]
    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    /// Complete the user with its newly assigned display code.
    pub fn with_display_no(self, display_no: DisplayCode) -> User {
        User::new(
            self.id,
            self.open_id,
            display_no,
            self.nickname,
            self.created_at,
        )
    }
}

/// A user as persisted, with or without a display code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredUser {
    /// The user already holds a display code.
    Coded(User),
    /// Legacy row still waiting for a display code.
    Uncoded(UncodedUser),
}

impl StoredUser {
    /// Stable user identifier.
    pub fn id(&self) -> &UserId {
        match self {
            Self::Coded(user) => user.id(),
            Self::Uncoded(user) => user.id(),
        }
    }
}

impl From<User> for StoredUser {
    fn from(user: User) -> Self {
        Self::Coded(user)
    }
}
