//! Internal Diesel row structs for database operations.
//!
//! These types never leave the persistence layer.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{addresses, users};

/// Row read from `users`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub open_id: String,
    pub display_no: Option<String>,
    pub nickname: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insertable `users` row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub open_id: &'a str,
    pub display_no: &'a str,
    pub nickname: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

/// Row read from `addresses`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = addresses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AddressRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub phone: String,
    pub province: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub detail: String,
    pub postal_code: Option<String>,
    pub tag: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable `addresses` row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = addresses)]
pub(crate) struct NewAddressRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: &'a str,
    pub phone: &'a str,
    pub province: Option<&'a str>,
    pub city: Option<&'a str>,
    pub district: Option<&'a str>,
    pub detail: &'a str,
    pub postal_code: Option<&'a str>,
    pub tag: Option<&'a str>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Contact-field changeset for `addresses`; `None` clears optional columns.
///
/// `is_default` is absent: only the default-flag transaction writes it.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = addresses)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct AddressChanges<'a> {
    pub name: &'a str,
    pub phone: &'a str,
    pub province: Option<&'a str>,
    pub city: Option<&'a str>,
    pub district: Option<&'a str>,
    pub detail: &'a str,
    pub postal_code: Option<&'a str>,
    pub tag: Option<&'a str>,
    pub updated_at: DateTime<Utc>,
}
