//! In-memory address storage with atomic default-flag updates.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::ports::{
    AddressRepository, AddressRepositoryError, DefaultFlagRepository, DefaultFlagRepositoryError,
};
use crate::domain::{Address, UserId};

use super::lock;

/// Address store implementing both address ports.
#[derive(Debug, Default)]
pub struct InMemoryAddressRepository {
    rows: Mutex<HashMap<Uuid, Address>>,
    unavailable: AtomicBool,
}

impl InMemoryAddressRepository {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a connection error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Copy of every stored address.
    pub fn snapshot(&self) -> Vec<Address> {
        lock(&self.rows).values().cloned().collect()
    }

    fn ensure_available<E>(&self, connection: impl FnOnce(&'static str) -> E) -> Result<(), E> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(connection("in-memory address store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl AddressRepository for InMemoryAddressRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Address>, AddressRepositoryError> {
        self.ensure_available(AddressRepositoryError::connection)?;
        Ok(lock(&self.rows).get(id).cloned())
    }

    async fn list_for_owner(&self, owner: &UserId) -> Result<Vec<Address>, AddressRepositoryError> {
        self.ensure_available(AddressRepositoryError::connection)?;
        Ok(lock(&self.rows)
            .values()
            .filter(|address| address.is_owned_by(owner))
            .cloned()
            .collect())
    }

    async fn insert(&self, address: &Address) -> Result<(), AddressRepositoryError> {
        self.ensure_available(AddressRepositoryError::connection)?;
        let mut rows = lock(&self.rows);
        if rows.contains_key(&address.id) {
            return Err(AddressRepositoryError::query(format!(
                "address {} already exists",
                address.id
            )));
        }
        rows.insert(address.id, address.clone());
        Ok(())
    }

    async fn update(&self, address: &Address) -> Result<(), AddressRepositoryError> {
        self.ensure_available(AddressRepositoryError::connection)?;
        let mut rows = lock(&self.rows);
        let Some(slot) = rows.get_mut(&address.id) else {
            return Err(AddressRepositoryError::missing(address.id));
        };
        let is_default = slot.is_default;
        *slot = Address {
            is_default,
            ..address.clone()
        };
        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, AddressRepositoryError> {
        self.ensure_available(AddressRepositoryError::connection)?;
        Ok(lock(&self.rows).remove(id).is_some())
    }
}

#[async_trait]
impl DefaultFlagRepository for InMemoryAddressRepository {
    async fn find_owner(&self, entity_id: &Uuid) -> Result<Option<UserId>, DefaultFlagRepositoryError> {
        self.ensure_available(DefaultFlagRepositoryError::connection)?;
        Ok(lock(&self.rows)
            .get(entity_id)
            .map(|address| address.owner.clone()))
    }

    async fn apply_default(
        &self,
        owner: &UserId,
        target: &Uuid,
        touched_at: DateTime<Utc>,
    ) -> Result<u64, DefaultFlagRepositoryError> {
        self.ensure_available(DefaultFlagRepositoryError::connection)?;
        let mut rows = lock(&self.rows);
        let target_owned = rows
            .get(target)
            .is_some_and(|address| address.is_owned_by(owner));
        if !target_owned {
            return Err(DefaultFlagRepositoryError::target_missing());
        }

        let mut touched = 0;
        for address in rows.values_mut().filter(|address| address.is_owned_by(owner)) {
            address.is_default = address.id == *target;
            address.updated_at = touched_at;
            touched += 1;
        }
        Ok(touched)
    }
}
