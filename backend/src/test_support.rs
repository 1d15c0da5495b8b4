//! Test doubles shared by unit tests in `src/`.
//!
//! Only compiled under `cfg(test)`. Integration tests keep their own copies
//! under `tests/support/`.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use display_code::DigitSource;
use mockable::Clock;

/// `2026-01-02T03:04:05Z`, which renders as `260102110405` at UTC+8.
pub fn fixture_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5)
        .single()
        .expect("valid fixture timestamp")
}

/// Clock that returns a settable instant, optionally stepping after each read.
pub struct MutableClock {
    now: Mutex<DateTime<Utc>>,
    step: TimeDelta,
}

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::ticking(now, TimeDelta::zero())
    }

    /// Each `utc()` read returns the current instant and then adds `step`.
    pub fn ticking(start: DateTime<Utc>, step: TimeDelta) -> Self {
        Self {
            now: Mutex::new(start),
            step,
        }
    }

    pub fn advance_seconds(&self, seconds: i64) {
        *self.lock_clock() += TimeDelta::seconds(seconds);
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        let mut guard = self.lock_clock();
        let current = *guard;
        *guard += self.step;
        current
    }
}

/// Digit source replaying scripted suffixes, then zeroes.
pub struct ScriptedDigits(Mutex<VecDeque<u8>>);

impl ScriptedDigits {
    /// Queue the digits of each suffix in order.
    pub fn new<'a>(suffixes: impl IntoIterator<Item = &'a str>) -> Self {
        let digits = suffixes
            .into_iter()
            .flat_map(str::bytes)
            .map(|byte| byte - b'0')
            .collect();
        Self(Mutex::new(digits))
    }
}

impl DigitSource for ScriptedDigits {
    fn next_digit(&self) -> u8 {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(0)
    }
}
