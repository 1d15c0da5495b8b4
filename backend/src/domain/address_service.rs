//! Address book service.
//!
//! Writes follow a two-step protocol: step one stores the row, step two
//! (only after step one returned) runs the [`DefaultFlagCoordinator`] when
//! a default was requested. Step one never raises the default flag; only
//! the coordinator does. A failure in step two therefore leaves step one's
//! row stored as a non-default and the previous default intact.

use std::sync::Arc;

use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::domain::ports::{AddressRepository, AddressRepositoryError, DefaultFlagRepository};
use crate::domain::{
    Address, AddressFields, AddressFieldsDraft, AddressValidationError, DefaultFlagCoordinator,
    DefaultFlagError, Error, UserId, sort_for_listing,
};

/// Create-or-update request for one address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertAddressRequest {
    /// Existing address to update; `None` creates a new one.
    #[serde(default)]
    pub id: Option<Uuid>,
    /// Contact fields, validated before anything is stored.
    #[serde(flatten)]
    pub fields: AddressFieldsDraft,
    /// Make this address the owner's default.
    #[serde(default)]
    pub is_default: bool,
}

/// Address book operations for a single owner at a time.
pub struct AddressBookService<A, D> {
    addresses: Arc<A>,
    coordinator: DefaultFlagCoordinator<D>,
    clock: Arc<dyn Clock>,
}

impl<A, D> AddressBookService<A, D> {
    /// Create a service over the address store and default-flag store.
    pub fn new(addresses: Arc<A>, default_flags: Arc<D>, clock: Arc<dyn Clock>) -> Self {
        Self {
            addresses,
            coordinator: DefaultFlagCoordinator::new(default_flags, Arc::clone(&clock)),
            clock,
        }
    }
}

impl<A, D> AddressBookService<A, D>
where
    A: AddressRepository,
    D: DefaultFlagRepository,
{
    /// Owner's addresses, default first, then most recently updated.
    pub async fn list(&self, owner: &UserId) -> Result<Vec<Address>, Error> {
        let mut addresses = self
            .addresses
            .list_for_owner(owner)
            .await
            .map_err(map_address_error)?;
        sort_for_listing(&mut addresses);
        Ok(addresses)
    }

    /// Create or update an address, then apply the default flag if asked.
    ///
    /// New rows are stored as non-default. Updates leave the stored flag
    /// alone, so an address that already was the default stays the default
    /// even when `is_default` is false.
    pub async fn upsert(&self, owner: &UserId, request: UpsertAddressRequest) -> Result<Address, Error> {
        let fields = AddressFields::new(request.fields).map_err(map_validation_error)?;
        let now = self.clock.utc();

        let stored = match request.id {
            Some(id) => {
                let existing = self.owned(owner, &id).await?;
                let updated = Address {
                    fields,
                    is_default: existing.is_default,
                    updated_at: now,
                    ..existing
                };
                self.addresses
                    .update(&updated)
                    .await
                    .map_err(map_address_error)?;
                updated
            }
            None => {
                let created = Address::create(owner.clone(), fields, false, now);
                self.addresses
                    .insert(&created)
                    .await
                    .map_err(map_address_error)?;
                created
            }
        };

        if !request.is_default {
            return Ok(stored);
        }

        self.coordinator.set_default(owner, &stored.id).await?;
        self.addresses
            .find_by_id(&stored.id)
            .await
            .map_err(map_address_error)?
            .ok_or_else(|| Error::from(DefaultFlagError::NotFound { entity_id: stored.id }))
    }

    /// Make `id` the owner's only default address.
    pub async fn set_default(&self, owner: &UserId, id: &Uuid) -> Result<(), Error> {
        self.coordinator.set_default(owner, id).await?;
        Ok(())
    }

    /// Delete an address. Removing the default leaves the owner with none.
    pub async fn remove(&self, owner: &UserId, id: &Uuid) -> Result<(), Error> {
        self.owned(owner, id).await?;
        if !self.addresses.delete(id).await.map_err(map_address_error)? {
            return Err(address_not_found(*id));
        }
        Ok(())
    }

    async fn owned(&self, owner: &UserId, id: &Uuid) -> Result<Address, Error> {
        let address = self
            .addresses
            .find_by_id(id)
            .await
            .map_err(map_address_error)?
            .ok_or_else(|| address_not_found(*id))?;
        if !address.is_owned_by(owner) {
            return Err(Error::forbidden("not owner")
                .with_details(json!({ "code": "not_owner", "id": id })));
        }
        Ok(address)
    }
}

fn address_not_found(id: Uuid) -> Error {
    Error::not_found("address not found")
        .with_details(json!({ "code": "address_not_found", "id": id }))
}

fn map_validation_error(error: AddressValidationError) -> Error {
    let field = match &error {
        AddressValidationError::Required { field } | AddressValidationError::TooLong { field, .. } => {
            *field
        }
        AddressValidationError::UnknownTag(_) => "tag",
    };
    Error::invalid_request(error.to_string()).with_details(json!({
        "code": "invalid_address",
        "field": field,
    }))
}

fn map_address_error(error: AddressRepositoryError) -> Error {
    match error {
        AddressRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("address repository unavailable: {message}"))
        }
        AddressRepositoryError::Query { message } => {
            Error::internal(format!("address repository error: {message}"))
        }
        AddressRepositoryError::Missing { id } => address_not_found(id),
    }
}

#[cfg(test)]
#[path = "address_service_tests.rs"]
mod tests;
