//! Shared helper utilities for backend integration tests.
//!
//! Integration tests compile as separate crates under `backend/tests/`, so the
//! clock and digit doubles used by the unit tests are duplicated here.

#![allow(dead_code, reason = "each test crate uses a different subset")]

pub mod embedded_postgres;

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use storefront::domain::{AddressFieldsDraft, DigitSource};

/// `2026-01-02T03:04:05Z`, which renders as `260102110405` at UTC+8.
pub fn fixture_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5)
        .single()
        .expect("valid fixture timestamp")
}

/// Clock that advances by a fixed step after every read.
pub struct SteppingClock {
    now: Mutex<DateTime<Utc>>,
    step: TimeDelta,
}

impl SteppingClock {
    pub fn new(start: DateTime<Utc>, step: TimeDelta) -> Self {
        Self {
            now: Mutex::new(start),
            step,
        }
    }

    /// Clock that never moves.
    pub fn frozen(at: DateTime<Utc>) -> Self {
        Self::new(at, TimeDelta::zero())
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for SteppingClock {
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

/// Valid address fields whose recipient name is `label`.
pub fn address_draft(label: &str) -> AddressFieldsDraft {
    AddressFieldsDraft {
        name: label.to_owned(),
        phone: "13800000000".to_owned(),
        city: Some("Hangzhou".to_owned()),
        detail: format!("{label} Wensan Road"),
        ..AddressFieldsDraft::default()
    }
}

/// Current-thread runtime for driving async services from sync BDD steps.
pub fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime")
}
