//! PostgreSQL-backed `UserRepository` implementation using Diesel ORM.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{UserRepository, UserRepositoryError};
use crate::domain::{DisplayCode, DisplayCodeKind, OpenId, StoredUser, UncodedUser, User, UserId};

use super::diesel_error_mapping::{DieselFailure, classify_diesel_error};
use super::models::{NewUserRow, UserRow};
use super::pool::{DbPool, PoolError};
use super::schema::users;

/// Unique constraint on `users.display_no`.
pub(crate) const USERS_DISPLAY_NO_KEY: &str = "users_display_no_key";
/// Unique constraint on `users.open_id`.
pub(crate) const USERS_OPEN_ID_KEY: &str = "users_open_id_key";

/// Diesel-backed implementation of the `UserRepository` port.
#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> UserRepositoryError {
    UserRepositoryError::connection(error.into_message())
}

fn map_diesel_error(error: diesel::result::Error) -> UserRepositoryError {
    match classify_diesel_error(error) {
        DieselFailure::Connection(message) => UserRepositoryError::connection(message),
        DieselFailure::UniqueViolation { constraint } => UserRepositoryError::query(format!(
            "unique constraint violated: {}",
            constraint.as_deref().unwrap_or("unknown")
        )),
        DieselFailure::Query(message) => UserRepositoryError::query(message),
    }
}

/// Map a write failure, naming which unique key lost the race.
fn map_write_error(
    error: diesel::result::Error,
    open_id: &str,
    display_no: &str,
) -> UserRepositoryError {
    match classify_diesel_error(error) {
        DieselFailure::UniqueViolation { constraint } => match constraint.as_deref() {
            Some(USERS_OPEN_ID_KEY) => UserRepositoryError::duplicate_open_id(open_id),
            Some(USERS_DISPLAY_NO_KEY) => UserRepositoryError::duplicate_display_code(display_no),
            other => UserRepositoryError::query(format!(
                "unique constraint violated: {}",
                other.unwrap_or("unknown")
            )),
        },
        DieselFailure::Connection(message) => UserRepositoryError::connection(message),
        DieselFailure::Query(message) => UserRepositoryError::query(message),
    }
}

fn row_to_user(row: UserRow) -> Result<StoredUser, UserRepositoryError> {
    let invalid = |err: &dyn std::fmt::Display| {
        UserRepositoryError::query(format!("stored user {} is invalid: {err}", row.id))
    };
    let open_id = OpenId::new(row.open_id.as_str()).map_err(|err| invalid(&err))?;
    let id = UserId::from_uuid(row.id);

    let Some(raw_code) = row.display_no.as_deref() else {
        return Ok(StoredUser::Uncoded(UncodedUser::new(
            id,
            open_id,
            row.nickname,
            row.created_at,
        )));
    };
    let display_no = DisplayCodeKind::User
        .parse_code(raw_code)
        .map_err(|err| invalid(&err))?;

    Ok(StoredUser::Coded(User::new(
        id,
        open_id,
        display_no,
        row.nickname,
        row.created_at,
    )))
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn find_by_open_id(
        &self,
        open_id: &OpenId,
    ) -> Result<Option<StoredUser>, UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<UserRow> = users::table
            .filter(users::open_id.eq(open_id.as_str()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_user).transpose()
    }

    async fn insert(&self, user: &User) -> Result<(), UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewUserRow {
            id: *user.id().as_uuid(),
            open_id: user.open_id().as_str(),
            display_no: user.display_no().as_str(),
            nickname: user.nickname(),
            created_at: user.created_at(),
        };

        diesel::insert_into(users::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|err| map_write_error(err, user.open_id().as_str(), user.display_no().as_str()))
    }

    async fn assign_display_code(
        &self,
        id: &UserId,
        code: &DisplayCode,
    ) -> Result<bool, UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated = diesel::update(
            users::table
                .filter(users::id.eq(id.as_uuid()))
                .filter(users::display_no.is_null()),
        )
        .set(users::display_no.eq(code.as_str()))
        .execute(&mut conn)
        .await
        .map_err(|err| map_write_error(err, "", code.as_str()))?;

        Ok(updated == 1)
    }

    async fn set_nickname(&self, id: &UserId, nickname: &str) -> Result<(), UserRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated = diesel::update(users::table.filter(users::id.eq(id.as_uuid())))
            .set(users::nickname.eq(nickname))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        if updated == 0 {
            return Err(UserRepositoryError::query(format!("user {id} not found")));
        }
        Ok(())
    }
}
