//! Storefront backend core.
//!
//! Unique human-legible display codes for orders, refunds and users, and
//! the per-owner default flag on shipping addresses. Business rules live in
//! [`domain`]; storage adapters live in [`outbound`].

pub mod domain;
pub mod outbound;
pub mod settings;

#[cfg(test)]
pub(crate) mod test_support;
