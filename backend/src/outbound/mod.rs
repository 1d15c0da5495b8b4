//! Outbound adapters implementing domain ports.
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM
//! - **memory**: mutex-guarded in-process stores for tests and local runs
//!
//! Adapters only translate between domain types and storage
//! representations.

pub mod memory;
pub mod persistence;
