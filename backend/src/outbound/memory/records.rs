//! In-memory users, orders and refunds with unique display codes.
//!
//! Every kind keeps a code index so the store rejects a second row with the
//! same code exactly like the unique constraints in PostgreSQL.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::ports::{
    DisplayCodeBackfillRepository, DisplayCodeBackfillRepositoryError, DisplayCodeLookup,
    DisplayCodeLookupError, UserRepository, UserRepositoryError,
};
use crate::domain::{DisplayCode, DisplayCodeKind, OpenId, StoredUser, UncodedUser, User, UserId};

use super::lock;

#[derive(Debug, Clone)]
struct Record {
    created_at: DateTime<Utc>,
    code: Option<DisplayCode>,
}

#[derive(Debug, Default)]
struct Table {
    records: HashMap<Uuid, Record>,
    codes: HashMap<String, Uuid>,
}

impl Table {
    fn claim(&mut self, id: Uuid, code: &DisplayCode) -> bool {
        if self.codes.contains_key(code.as_str()) {
            return false;
        }
        self.codes.insert(code.as_str().to_owned(), id);
        true
    }
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<DisplayCodeKind, Table>,
    users: HashMap<Uuid, StoredUser>,
    open_ids: HashMap<String, Uuid>,
}

impl State {
    fn table(&mut self, kind: DisplayCodeKind) -> &mut Table {
        self.tables.entry(kind).or_default()
    }

    /// Claim `code` for an uncoded user row and upgrade the stored user.
    fn code_user(&mut self, id: &Uuid, code: &DisplayCode) -> Result<bool, String> {
        let table = self.table(DisplayCodeKind::User);
        let uncoded = table
            .records
            .get(id)
            .is_some_and(|record| record.code.is_none());
        if !uncoded {
            return Ok(false);
        }
        if !table.claim(*id, code) {
            return Err(code.as_str().to_owned());
        }
        if let Some(record) = table.records.get_mut(id) {
            record.code = Some(code.clone());
        }
        if let Some(stored) = self.users.remove(id) {
            let upgraded = match stored {
                StoredUser::Uncoded(legacy) => StoredUser::Coded(legacy.with_display_no(code.clone())),
                coded @ StoredUser::Coded(_) => coded,
            };
            self.users.insert(*id, upgraded);
        }
        Ok(true)
    }
}

/// Store for every record that carries a display code.
///
/// Implements [`DisplayCodeLookup`], [`DisplayCodeBackfillRepository`] and
/// [`UserRepository`] over shared state, so codes claimed through any of
/// them are visible to the others.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    state: Mutex<State>,
}

impl InMemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a bare row of `kind`, optionally already coded.
    ///
    /// Returns `false` without writing when `code` is taken. Uncoded rows
    /// model legacy data awaiting the backfill.
    pub fn insert_record(
        &self,
        kind: DisplayCodeKind,
        id: Uuid,
        created_at: DateTime<Utc>,
        code: Option<DisplayCode>,
    ) -> bool {
        let mut state = lock(&self.state);
        let table = state.table(kind);
        if let Some(code) = &code {
            if !table.claim(id, code) {
                return false;
            }
        }
        table.records.insert(id, Record { created_at, code });
        true
    }

    /// Seed a user created before display codes existed.
    ///
    /// Returns `false` without writing when the open id is taken.
    pub fn insert_legacy_user(&self, user: UncodedUser, created_at: DateTime<Utc>) -> bool {
        let mut state = lock(&self.state);
        let id = *user.id().as_uuid();
        if state.open_ids.contains_key(user.open_id().as_str()) {
            return false;
        }
        state.table(DisplayCodeKind::User).records.insert(
            id,
            Record {
                created_at,
                code: None,
            },
        );
        state.open_ids.insert(user.open_id().as_str().to_owned(), id);
        state.users.insert(id, StoredUser::Uncoded(user));
        true
    }

    /// Code currently held by record `id` of `kind`.
    pub fn code_of(&self, kind: DisplayCodeKind, id: &Uuid) -> Option<DisplayCode> {
        let mut state = lock(&self.state);
        state
            .table(kind)
            .records
            .get(id)
            .and_then(|record| record.code.clone())
    }

    /// Number of coded rows of `kind`.
    pub fn coded_count(&self, kind: DisplayCodeKind) -> usize {
        lock(&self.state).table(kind).codes.len()
    }
}

#[async_trait]
impl DisplayCodeLookup for InMemoryRecordStore {
    async fn code_exists(
        &self,
        kind: DisplayCodeKind,
        code: &DisplayCode,
    ) -> Result<bool, DisplayCodeLookupError> {
        Ok(lock(&self.state).table(kind).codes.contains_key(code.as_str()))
    }
}

#[async_trait]
impl DisplayCodeBackfillRepository for InMemoryRecordStore {
    async fn list_missing(
        &self,
        kind: DisplayCodeKind,
        limit: usize,
    ) -> Result<Vec<Uuid>, DisplayCodeBackfillRepositoryError> {
        let mut state = lock(&self.state);
        let mut missing: Vec<(DateTime<Utc>, Uuid)> = state
            .table(kind)
            .records
            .iter()
            .filter(|(_, record)| record.code.is_none())
            .map(|(id, record)| (record.created_at, *id))
            .collect();
        missing.sort_unstable();
        Ok(missing.into_iter().take(limit).map(|(_, id)| id).collect())
    }

    async fn assign(
        &self,
        kind: DisplayCodeKind,
        record_id: &Uuid,
        code: &DisplayCode,
    ) -> Result<bool, DisplayCodeBackfillRepositoryError> {
        let mut state = lock(&self.state);
        if kind == DisplayCodeKind::User {
            return state
                .code_user(record_id, code)
                .map_err(DisplayCodeBackfillRepositoryError::duplicate_code);
        }
        let table = state.table(kind);
        let uncoded = table
            .records
            .get(record_id)
            .is_some_and(|record| record.code.is_none());
        if !uncoded {
            return Ok(false);
        }
        if !table.claim(*record_id, code) {
            return Err(DisplayCodeBackfillRepositoryError::duplicate_code(code.as_str()));
        }
        if let Some(record) = table.records.get_mut(record_id) {
            record.code = Some(code.clone());
        }
        Ok(true)
    }
}

#[async_trait]
impl UserRepository for InMemoryRecordStore {
    async fn find_by_open_id(
        &self,
        open_id: &OpenId,
    ) -> Result<Option<StoredUser>, UserRepositoryError> {
        let state = lock(&self.state);
        Ok(state
            .open_ids
            .get(open_id.as_str())
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn insert(&self, user: &User) -> Result<(), UserRepositoryError> {
        let mut state = lock(&self.state);
        let id = *user.id().as_uuid();
        if state.open_ids.contains_key(user.open_id().as_str()) {
            return Err(UserRepositoryError::duplicate_open_id(user.open_id().as_str()));
        }
        let table = state.table(DisplayCodeKind::User);
        if !table.claim(id, user.display_no()) {
            return Err(UserRepositoryError::duplicate_display_code(
                user.display_no().as_str(),
            ));
        }
        table.records.insert(
            id,
            Record {
                created_at: user.created_at(),
                code: Some(user.display_no().clone()),
            },
        );
        state.open_ids.insert(user.open_id().as_str().to_owned(), id);
        state.users.insert(id, StoredUser::Coded(user.clone()));
        Ok(())
    }

    async fn assign_display_code(
        &self,
        id: &UserId,
        code: &DisplayCode,
    ) -> Result<bool, UserRepositoryError> {
        lock(&self.state)
            .code_user(id.as_uuid(), code)
            .map_err(UserRepositoryError::duplicate_display_code)
    }

    async fn set_nickname(&self, id: &UserId, nickname: &str) -> Result<(), UserRepositoryError> {
        let mut state = lock(&self.state);
        let Some(stored) = state.users.get_mut(id.as_uuid()) else {
            return Err(UserRepositoryError::query(format!("user {id} not found")));
        };
        *stored = match stored.clone() {
            StoredUser::Coded(user) => StoredUser::Coded(user.with_nickname(nickname)),
            StoredUser::Uncoded(user) => StoredUser::Uncoded(user.with_nickname(nickname)),
        };
        Ok(())
    }
}
