//! Shipping addresses owned by a user.
//!
//! Addresses are the entity kind whose "default" flag is maintained by the
//! [`DefaultFlagCoordinator`](crate::domain::DefaultFlagCoordinator). Field
//! validation happens once, when a draft becomes [`AddressFields`].

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::UserId;

/// Maximum length of the recipient name.
pub const NAME_MAX: usize = 64;
/// Maximum length of the recipient phone number.
pub const PHONE_MAX: usize = 32;
/// Maximum length of the province, city and district fields.
pub const REGION_MAX: usize = 64;
/// Maximum length of the street-level detail.
pub const DETAIL_MAX: usize = 255;
/// Maximum length of the postal code.
pub const POSTAL_CODE_MAX: usize = 16;

/// Validation failures for address drafts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressValidationError {
    /// A required field was blank.
    #[error("{field} must not be empty")]
    Required { field: &'static str },
    /// A field exceeded its maximum length.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    /// The tag was not one of the known labels.
    #[error("unknown address tag: {0}")]
    UnknownTag(String),
}

/// Label a user may attach to an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressTag {
    /// Home address.
    Home,
    /// Workplace address.
    Company,
    /// School or campus address.
    School,
}

impl AddressTag {
    /// Stable lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Company => "company",
            Self::School => "school",
        }
    }
}

impl fmt::Display for AddressTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AddressTag {
    type Err = AddressValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "home" => Ok(Self::Home),
            "company" => Ok(Self::Company),
            "school" => Ok(Self::School),
            other => Err(AddressValidationError::UnknownTag(other.to_owned())),
        }
    }
}

/// Unvalidated address fields as supplied by a caller.
///
/// # Examples
/// ```
/// use storefront::domain::{Address, AddressFields, AddressFieldsDraft, AddressTag, UserId};
///
/// let draft: AddressFieldsDraft = serde_json::from_str(
///     r#"{"name":" Li Lei ","phone":"13800000000","city":"Hangzhou",
///         "detail":"1 Wensan Road","postalCode":"310000","tag":"home"}"#,
/// )
/// .expect("camelCase draft");
/// assert_eq!(draft.postal_code.as_deref(), Some("310000"));
///
/// let fields = AddressFields::new(draft).expect("valid draft");
/// assert_eq!(fields.name(), "Li Lei");
/// assert_eq!(fields.tag(), Some(AddressTag::Home));
///
/// let address = Address::create(UserId::random(), fields, false, chrono::Utc::now());
/// assert!(!address.is_default);
/// assert_eq!(address.created_at, address.updated_at);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressFieldsDraft {
    /// Recipient name.
    pub name: String,
    /// Contact phone number.
    pub phone: String,
    /// Province or state.
    pub province: Option<String>,
    /// City.
    pub city: Option<String>,
    /// District within the city.
    pub district: Option<String>,
    /// Street address and unit.
    pub detail: String,
    /// Postal code.
    pub postal_code: Option<String>,
    /// One of `home`, `company` or `school`.
    pub tag: Option<String>,
}

/// Validated address fields.
///
/// ## Invariants
/// - `name`, `phone` and `detail` are non-empty after trimming.
/// - Every field respects its maximum length.
/// - Blank optional fields are stored as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressFields {
    name: String,
    phone: String,
    province: Option<String>,
    city: Option<String>,
    district: Option<String>,
    detail: String,
    postal_code: Option<String>,
    tag: Option<AddressTag>,
}

fn required(field: &'static str, value: &str, max: usize) -> Result<String, AddressValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AddressValidationError::Required { field });
    }
    bounded(field, trimmed, max)
}

fn optional(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<Option<String>, AddressValidationError> {
    value
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(|trimmed| bounded(field, trimmed, max))
        .transpose()
}

fn bounded(field: &'static str, value: &str, max: usize) -> Result<String, AddressValidationError> {
    if value.chars().count() > max {
        return Err(AddressValidationError::TooLong { field, max });
    }
    Ok(value.to_owned())
}

impl AddressFields {
    /// Validate a draft.
    pub fn new(draft: AddressFieldsDraft) -> Result<Self, AddressValidationError> {
        let tag = draft
            .tag
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(AddressTag::from_str)
            .transpose()?;

        Ok(Self {
            name: required("name", &draft.name, NAME_MAX)?,
            phone: required("phone", &draft.phone, PHONE_MAX)?,
            province: optional("province", draft.province.as_deref(), REGION_MAX)?,
            city: optional("city", draft.city.as_deref(), REGION_MAX)?,
            district: optional("district", draft.district.as_deref(), REGION_MAX)?,
            detail: required("detail", &draft.detail, DETAIL_MAX)?,
            postal_code: optional("postalCode", draft.postal_code.as_deref(), POSTAL_CODE_MAX)?,
            tag,
        })
    }

    /// Recipient name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Recipient phone number.
    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// Province, if given.
    pub fn province(&self) -> Option<&str> {
        self.province.as_deref()
    }

    /// City, if given.
    pub fn city(&self) -> Option<&str> {
        self.city.as_deref()
    }

    /// District, if given.
    pub fn district(&self) -> Option<&str> {
        self.district.as_deref()
    }

    /// Street-level detail.
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Postal code, if given.
    pub fn postal_code(&self) -> Option<&str> {
        self.postal_code.as_deref()
    }

    /// Tag, if given.
    pub fn tag(&self) -> Option<AddressTag> {
        self.tag
    }
}

/// A user's shipping address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Address identifier.
    pub id: Uuid,
    /// User the address belongs to.
    pub owner: UserId,
    /// Validated contact fields.
    #[serde(flatten)]
    pub fields: AddressFields,
    /// Whether this is the owner's default address.
    pub is_default: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last write, including default-flag changes.
    pub updated_at: DateTime<Utc>,
}

impl Address {
    /// Build a new address stamped with `now`.
    pub fn create(owner: UserId, fields: AddressFields, is_default: bool, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            fields,
            is_default,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `user` owns this address.
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.owner == user
    }
}

/// Listing order: default first, then most recently updated.
pub fn listing_order(left: &Address, right: &Address) -> Ordering {
    right
        .is_default
        .cmp(&left.is_default)
        .then_with(|| right.updated_at.cmp(&left.updated_at))
}

/// Sort addresses into listing order in place.
pub fn sort_for_listing(addresses: &mut [Address]) {
    addresses.sort_by(listing_order);
}
