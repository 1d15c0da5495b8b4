//! Random digit sources for code suffixes.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Number of random digits appended after the prefix.
pub const SUFFIX_LEN: usize = 6;

/// Source of independent base-10 digits.
///
/// Implementations need not be cryptographically secure; collision
/// resistance comes from the time prefix plus the store lookup.
pub trait DigitSource: Send + Sync {
    /// Draw one digit in `0..=9`.
    fn next_digit(&self) -> u8;

    /// Draw `count` digits as an ASCII string.
    fn digits(&self, count: usize) -> String {
        (0..count).map(|_| digit_char(self.next_digit())).collect()
    }
}

fn digit_char(digit: u8) -> char {
    char::from_digit(u32::from(digit.min(9)), 10).unwrap_or('0')
}

/// Digit source backed by the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRngDigits;

impl DigitSource for ThreadRngDigits {
    fn next_digit(&self) -> u8 {
        rand::thread_rng().gen_range(0..10)
    }
}

/// Reproducible digit source seeded from a fixed value.
#[derive(Debug)]
pub struct SeededDigits {
    rng: Mutex<StdRng>,
}

impl SeededDigits {
    /// Build a source that yields the same sequence for the same seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl DigitSource for SeededDigits {
    fn next_digit(&self) -> u8 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen_range(0..10)
    }
}
