//! PostgreSQL-backed address storage and default-flag maintenance.
//!
//! [`DefaultFlagRepository::apply_default`] runs in one transaction: it locks
//! the owner's rows, confirms the target is among them, then rewrites every
//! flag with a single `UPDATE`. Concurrent callers for the same owner
//! serialise on the row locks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{
    AddressRepository, AddressRepositoryError, DefaultFlagRepository, DefaultFlagRepositoryError,
};
use crate::domain::{Address, AddressFields, AddressFieldsDraft, UserId};

use super::diesel_error_mapping::map_basic_diesel_error;
use super::models::{AddressChanges, AddressRow, NewAddressRow};
use super::pool::{DbPool, PoolError};
use super::schema::addresses;

/// Diesel-backed implementation of the address ports.
#[derive(Clone)]
pub struct DieselAddressRepository {
    pool: DbPool,
}

impl DieselAddressRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> AddressRepositoryError {
    AddressRepositoryError::connection(error.into_message())
}

fn map_diesel_error(error: diesel::result::Error) -> AddressRepositoryError {
    map_basic_diesel_error(
        error,
        AddressRepositoryError::query,
        AddressRepositoryError::connection,
    )
}

fn row_to_address(row: AddressRow) -> Result<Address, AddressRepositoryError> {
    let fields = AddressFields::new(AddressFieldsDraft {
        name: row.name,
        phone: row.phone,
        province: row.province,
        city: row.city,
        district: row.district,
        detail: row.detail,
        postal_code: row.postal_code,
        tag: row.tag,
    })
    .map_err(|err| AddressRepositoryError::query(format!("stored address {} is invalid: {err}", row.id)))?;

    Ok(Address {
        id: row.id,
        owner: UserId::from_uuid(row.user_id),
        fields,
        is_default: row.is_default,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

#[async_trait]
impl AddressRepository for DieselAddressRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Address>, AddressRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<AddressRow> = addresses::table
            .filter(addresses::id.eq(id))
            .select(AddressRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_address).transpose()
    }

    async fn list_for_owner(&self, owner: &UserId) -> Result<Vec<Address>, AddressRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<AddressRow> = addresses::table
            .filter(addresses::user_id.eq(owner.as_uuid()))
            .order((addresses::is_default.desc(), addresses::updated_at.desc()))
            .select(AddressRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter().map(row_to_address).collect()
    }

    async fn insert(&self, address: &Address) -> Result<(), AddressRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let fields = &address.fields;
        let row = NewAddressRow {
            id: address.id,
            user_id: *address.owner.as_uuid(),
            name: fields.name(),
            phone: fields.phone(),
            province: fields.province(),
            city: fields.city(),
            district: fields.district(),
            detail: fields.detail(),
            postal_code: fields.postal_code(),
            tag: fields.tag().map(|tag| tag.as_str()),
            is_default: address.is_default,
            created_at: address.created_at,
            updated_at: address.updated_at,
        };

        diesel::insert_into(addresses::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn update(&self, address: &Address) -> Result<(), AddressRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let fields = &address.fields;
        let changes = AddressChanges {
            name: fields.name(),
            phone: fields.phone(),
            province: fields.province(),
            city: fields.city(),
            district: fields.district(),
            detail: fields.detail(),
            postal_code: fields.postal_code(),
            tag: fields.tag().map(|tag| tag.as_str()),
            updated_at: address.updated_at,
        };

        let updated = diesel::update(addresses::table.filter(addresses::id.eq(address.id)))
            .set(&changes)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        if updated == 0 {
            return Err(AddressRepositoryError::missing(address.id));
        }
        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, AddressRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let deleted = diesel::delete(addresses::table.filter(addresses::id.eq(id)))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(deleted > 0)
    }
}

/// Failure inside the default-flag transaction.
enum ApplyDefaultFailure {
    Diesel(diesel::result::Error),
    TargetMissing,
}

impl From<diesel::result::Error> for ApplyDefaultFailure {
    fn from(error: diesel::result::Error) -> Self {
        Self::Diesel(error)
    }
}

fn map_flag_diesel_error(error: diesel::result::Error) -> DefaultFlagRepositoryError {
    map_basic_diesel_error(
        error,
        DefaultFlagRepositoryError::query,
        DefaultFlagRepositoryError::connection,
    )
}

#[async_trait]
impl DefaultFlagRepository for DieselAddressRepository {
    async fn find_owner(&self, entity_id: &Uuid) -> Result<Option<UserId>, DefaultFlagRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| DefaultFlagRepositoryError::connection(err.into_message()))?;

        let owner: Option<Uuid> = addresses::table
            .filter(addresses::id.eq(entity_id))
            .select(addresses::user_id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_flag_diesel_error)?;

        Ok(owner.map(UserId::from_uuid))
    }

    async fn apply_default(
        &self,
        owner: &UserId,
        target: &Uuid,
        touched_at: DateTime<Utc>,
    ) -> Result<u64, DefaultFlagRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| DefaultFlagRepositoryError::connection(err.into_message()))?;
        let owner_id = *owner.as_uuid();
        let target = *target;

        let touched = conn
            .transaction(|conn| {
                async move {
                    let sibling_ids: Vec<Uuid> = addresses::table
                        .filter(addresses::user_id.eq(owner_id))
                        .select(addresses::id)
                        .for_update()
                        .load(conn)
                        .await?;
                    if !sibling_ids.contains(&target) {
                        return Err(ApplyDefaultFailure::TargetMissing);
                    }

                    let touched =
                        diesel::update(addresses::table.filter(addresses::user_id.eq(owner_id)))
                            .set((
                                addresses::is_default.eq(addresses::id.eq(target)),
                                addresses::updated_at.eq(touched_at),
                            ))
                            .execute(conn)
                            .await?;
                    Ok::<usize, ApplyDefaultFailure>(touched)
                }
                .scope_boxed()
            })
            .await
            .map_err(|failure| match failure {
                ApplyDefaultFailure::TargetMissing => DefaultFlagRepositoryError::target_missing(),
                ApplyDefaultFailure::Diesel(error) => map_flag_diesel_error(error),
            })?;

        debug!(owner = %owner_id, %target, touched, "default flag transaction committed");
        u64::try_from(touched).map_err(|_| DefaultFlagRepositoryError::query("row count overflow"))
    }
}
