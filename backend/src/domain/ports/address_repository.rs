//! Port for address persistence.
//!
//! Adapters store whole [`Address`] rows. The default flag is owned by
//! [`DefaultFlagRepository`](super::DefaultFlagRepository): `insert` stores
//! it as given and `update` never changes it.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Address, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by address repository adapters.
    pub enum AddressRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "address repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "address repository query failed: {message}",
        /// The row to update no longer exists.
        Missing { id: Uuid } => "address {id} not found",
    }
}

/// Storage for user addresses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AddressRepository: Send + Sync {
    /// Fetch an address by identifier.
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Address>, AddressRepositoryError>;

    /// Fetch every address of `owner`, in no particular order.
    async fn list_for_owner(&self, owner: &UserId) -> Result<Vec<Address>, AddressRepositoryError>;

    /// Insert a new address.
    async fn insert(&self, address: &Address) -> Result<(), AddressRepositoryError>;

    /// Overwrite the contact fields and `updated_at` of an existing address.
    ///
    /// The stored `is_default` flag is left untouched. Returns [`AddressRepositoryError::Missing`] when the row is gone.
    async fn update(&self, address: &Address) -> Result<(), AddressRepositoryError>;

    /// Delete an address, returning whether a row was removed.
    async fn delete(&self, id: &Uuid) -> Result<bool, AddressRepositoryError>;
}
