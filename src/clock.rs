//! Time source for lease expiry decisions.
//!
//! Lease expiry compares absolute Unix timestamps, and the REQUEST path
//! compares a client-claimed timestamp against stored state for exact
//! equality. Routing every reading of "now" through [`Clock`] lets tests
//! drive expiry deterministically instead of sleeping through real lease
//! durations.

use chrono::Utc;

/// A source of the current time as Unix seconds.
pub trait Clock: Send + Sync {
    /// Current time in seconds since the Unix epoch.
    fn now(&self) -> i64;
}

/// The wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}
