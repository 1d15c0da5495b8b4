//! Domain ports and supporting types for the hexagonal boundary.

mod macros;
pub(crate) use macros::define_port_error;

mod address_repository;
mod default_flag_repository;
mod display_code_backfill_repository;
mod display_code_lookup;
mod user_repository;

#[cfg(test)]
pub use address_repository::MockAddressRepository;
pub use address_repository::{AddressRepository, AddressRepositoryError};
#[cfg(test)]
pub use default_flag_repository::MockDefaultFlagRepository;
pub use default_flag_repository::{DefaultFlagRepository, DefaultFlagRepositoryError};
#[cfg(test)]
pub use display_code_backfill_repository::MockDisplayCodeBackfillRepository;
pub use display_code_backfill_repository::{
    DisplayCodeBackfillRepository, DisplayCodeBackfillRepositoryError,
    FixtureDisplayCodeBackfillRepository,
};
#[cfg(test)]
pub use display_code_lookup::MockDisplayCodeLookup;
pub use display_code_lookup::{
    DisplayCodeLookup, DisplayCodeLookupError, FixtureDisplayCodeLookup,
};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{UserRepository, UserRepositoryError};
