//! Clock abstraction for testable timing.
//!
//! Expiry checks and artifact timestamps read wall-clock time through
//! [`Clock`] so tests can control it deterministically. Production code
//! uses [`RealClock`].

use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};

use chrono::{DateTime, TimeZone, Utc};

/// Source of wall-clock time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current UTC time.
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealClock;

impl RealClock {
    /// Creates a new real clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for RealClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock with settable, advanceable time.
///
/// Clones share the same underlying time, so a handle kept by the test
/// can move time forward underneath the code under test.
#[derive(Debug, Clone)]
pub struct TestClock {
    unix_secs: Arc<AtomicI64>,
}

impl TestClock {
    /// Creates a test clock at the given unix timestamp (seconds).
    pub fn at(unix_secs: i64) -> Self {
        Self { unix_secs: Arc::new(AtomicI64::new(unix_secs)) }
    }

    /// Creates a test clock at the current system time.
    pub fn now() -> Self {
        Self::at(Utc::now().timestamp())
    }

    /// Advances the clock by the given number of seconds.
    pub fn advance_secs(&self, secs: i64) {
        self.unix_secs.fetch_add(secs, Ordering::AcqRel);
    }

    /// Jumps the clock to a specific unix timestamp.
    pub fn set(&self, unix_secs: i64) {
        self.unix_secs.store(unix_secs, Ordering::Release);
    }
}

impl Default for TestClock {
    fn default() -> Self {
        Self::now()
    }
}

impl Clock for TestClock {
    fn now_utc(&self) -> DateTime<Utc> {
        let secs = self.unix_secs.load(Ordering::Acquire);
        Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
    }
}
