//! Time source for validity windows and verification instants.
//!
//! Issuance and verification never read the wall clock directly; they ask a
//! [`Clock`]. Production code passes [`SystemClock`], tests pass [`FixedClock`].

use time::OffsetDateTime;

/// Supplies the current instant.
pub trait Clock: Send + Sync {
    /// The current instant, in UTC.
    fn now(&self) -> OffsetDateTime;
}

/// The operating system's wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// A clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl FixedClock {
    /// Freeze the clock at `unix_seconds` after the epoch.
    pub fn from_unix(unix_seconds: i64) -> Option<Self> {
        OffsetDateTime::from_unix_timestamp(unix_seconds)
            .ok()
            .map(FixedClock)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}
