//! Agent-local time model.
//!
//! Time is a monotonically increasing millisecond counter measured from the
//! moment the agent started.  Using integers keeps reward-decay arithmetic
//! exact (`floor(t / τ)` is plain integer division).

use std::fmt;
use std::time::Duration;

/// Milliseconds since agent start.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    /// Milliseconds elapsed from `earlier` to `self`; zero if `earlier` is
    /// in the future.
    #[inline]
    pub fn since(self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Build a timestamp from the elapsed wall-clock duration.
    #[inline]
    pub fn from_elapsed(elapsed: Duration) -> Self {
        Timestamp(elapsed.as_millis() as u64)
    }
}

impl std::ops::Add<u64> for Timestamp {
    type Output = Timestamp;
    #[inline]
    fn add(self, rhs: u64) -> Timestamp {
        Timestamp(self.0 + rhs)
    }
}

impl std::ops::Sub for Timestamp {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Timestamp) -> u64 {
        self.since(rhs)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
