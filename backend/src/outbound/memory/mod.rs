//! In-process adapters backed by mutex-guarded maps.
//!
//! Each store keeps all of its state behind one `std::sync::Mutex`, so a
//! port call that touches several rows happens inside a single critical
//! section. That critical section stands in for a database transaction.
//! Locks are never held across an `.await`.

mod address;
mod records;

pub use address::InMemoryAddressRepository;
pub use records::InMemoryRecordStore;

use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
