//! Clock capability
//!
//! Scheduling logic never reads the wall clock directly; it goes through
//! this trait so conflict windows and no-show tolerances are deterministic
//! under test.

use chrono::{NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::atomic::{AtomicI64, Ordering};

/// Time source injected into every component that needs "now"
pub trait Clock: Send + Sync {
    /// Current instant as Unix millis (UTC)
    fn now_millis(&self) -> i64;
}

/// Wall-clock implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Settable clock for tests and simulations
#[derive(Debug)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(millis: i64) -> Self {
        Self {
            now: AtomicI64::new(millis),
        }
    }

    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.now
            .fetch_add(minutes * shared::models::reservation::MINUTE_MILLIS, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Business-timezone calendar date for an instant
///
/// Used by invoice numbering: the date part of the number follows the
/// restaurant's timezone, not UTC.
pub fn business_date(now_millis: i64, tz: Tz) -> NaiveDate {
    match Utc.timestamp_millis_opt(now_millis) {
        chrono::LocalResult::Single(dt) => dt.with_timezone(&tz).date_naive(),
        _ => Utc::now().with_timezone(&tz).date_naive(),
    }
}
