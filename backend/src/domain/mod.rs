//! Domain primitives, services and ports.
//!
//! Purpose: hold the storefront's business rules independent of storage.
//! Services depend only on the traits in [`ports`]; adapters live under
//! `crate::outbound`.
//!
//! Public surface:
//! - Error (alias to `error::Error`) - transport-agnostic error payload.
//! - DisplayCodeGenerator / DisplayCodeAssigner - unique display codes.
//! - DefaultFlagCoordinator - one default per owner.
//! - AddressBookService / UserRegistrationService - the callers of both.

pub mod address;
pub mod address_service;
pub mod default_flag;
pub mod display_code;
pub mod error;
pub mod ports;
pub mod registration;
pub mod user;

pub use ::display_code::{
    DigitSource, DisplayCode, DisplayCodeFormatError, PrefixShape, SeededDigits, ThreadRngDigits,
};

pub use self::address::{
    Address, AddressFields, AddressFieldsDraft, AddressTag, AddressValidationError,
    listing_order, sort_for_listing,
};
pub use self::address_service::{AddressBookService, UpsertAddressRequest};
pub use self::default_flag::{DefaultFlagCoordinator, DefaultFlagError};
pub use self::display_code::{
    AssignError, BackfillReport, DisplayCodeAssigner, DisplayCodeBackfillService,
    DisplayCodeError, DisplayCodeGenerator, DisplayCodeKind, InsertFailure, KindBackfill,
};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::registration::{Registration, UserRegistrationService};
pub use self::user::{
    OpenId, StoredUser, UncodedUser, User, UserId, UserValidationError, normalize_nickname,
};

/// Convenient result alias for domain services.
///
/// # Examples
/// ```
/// use storefront::domain::{DomainResult, Error};
///
/// fn lookup() -> DomainResult<u32> {
///     Err(Error::not_found("missing"))
/// }
///
/// assert!(lookup().is_err());
/// ```
pub type DomainResult<T> = Result<T, Error>;
