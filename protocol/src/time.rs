//! # Clocks
//!
//! The ledger never reads the system time directly. It asks a [`Clock`],
//! which in production is the UTC wall clock and in tests is a
//! [`ManualClock`] that only moves when told to.
//!
//! Timestamps are whole seconds since the Unix epoch. The ledger assumes the
//! clock never goes backwards; if one does, elapsed time saturates at zero
//! rather than underflowing.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

/// A source of the current time.
pub trait Clock: Send + Sync {
    /// Current time in seconds since the Unix epoch.
    fn now(&self) -> Timestamp;
}

// ---------------------------------------------------------------------------
// SystemClock
// ---------------------------------------------------------------------------

/// Wall-clock time via `chrono::Utc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // Pre-epoch system clocks clamp to zero.
        Utc::now().timestamp().max(0) as Timestamp
    }
}

// ---------------------------------------------------------------------------
// ManualClock
// ---------------------------------------------------------------------------

/// A clock that only moves when told to.
///
/// Mirrors the `time.increase` / `time.increaseTo` helpers of a local test
/// chain: start it anywhere, then advance it by a delta or jump it to an
/// absolute time. Shared across threads behind an `Arc`.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Creates a clock frozen at the current wall-clock time.
    pub fn starting_now() -> Self {
        Self::new(SystemClock.now())
    }

    /// Moves the clock forward by `secs` and returns the new time.
    pub fn advance(&self, secs: u64) -> Timestamp {
        self.now.fetch_add(secs, Ordering::SeqCst) + secs
    }

    /// Jumps the clock to `ts`. Ignored if `ts` is in the past, so the
    /// clock stays non-decreasing.
    pub fn set(&self, ts: Timestamp) {
        self.now.fetch_max(ts, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

/// Renders a timestamp as RFC 3339 for log lines and CLI output.
pub fn to_rfc3339(ts: Timestamp) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| format!("@{ts}"))
}
