//! Timestamp and time-bucket types for Strata.
//!
//! Record timestamps are nanoseconds since the Unix epoch. Filter postings
//! and trigger evaluation are partitioned into 1-second aligned buckets.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::constants::TIME_BUCKET_NS;

/// A nanosecond-resolution timestamp.
///
/// The zero timestamp is reserved: a record appended with a zero timestamp
/// is stamped with the server's current time.
///
/// # Example
///
/// ```rust
/// use strata_common::types::Timestamp;
///
/// let ts = Timestamp::now();
/// assert!(ts.as_nanos() > 0);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The reserved zero timestamp.
    pub const ZERO: Self = Self(0);

    /// Maximum timestamp value.
    pub const MAX: Self = Self(u64::MAX);

    /// Creates a timestamp from nanoseconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Creates a timestamp from milliseconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis * 1_000_000)
    }

    /// Creates a timestamp from the current system time.
    #[must_use]
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        Self(duration.as_nanos() as u64)
    }

    /// Returns the timestamp as nanoseconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Returns the timestamp as milliseconds since the Unix epoch.
    #[inline]
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0 / 1_000_000
    }

    /// Returns true for the reserved zero timestamp.
    #[inline]
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns the 1-second bucket containing this timestamp.
    #[inline]
    #[must_use]
    pub const fn bucket(self) -> TimeBucket {
        TimeBucket(self.0 / TIME_BUCKET_NS)
    }

    /// Adds a duration, saturating at the maximum.
    #[inline]
    #[must_use]
    pub fn add(self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.as_nanos() as u64))
    }

    /// Subtracts a duration, saturating at zero.
    #[inline]
    #[must_use]
    pub fn sub(self, duration: Duration) -> Self {
        Self(self.0.saturating_sub(duration.as_nanos() as u64))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}ns)", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format as ISO 8601 if reasonable
        if self.0 > 0 && self.0 < i64::MAX as u64 {
            let secs = (self.0 / 1_000_000_000) as i64;
            let subsec_nanos = (self.0 % 1_000_000_000) as u32;
            if let Some(dt) = chrono::DateTime::from_timestamp(secs, subsec_nanos) {
                return write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.9fZ"));
            }
        }
        write!(f, "{}ns", self.0)
    }
}

impl From<u64> for Timestamp {
    #[inline]
    fn from(nanos: u64) -> Self {
        Self::from_nanos(nanos)
    }
}

impl From<Timestamp> for u64 {
    #[inline]
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

/// A 1-second aligned time window.
///
/// Identified by its ordinal: `bucket = timestamp_ns / 1e9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TimeBucket(u64);

impl TimeBucket {
    /// Creates a bucket from its ordinal.
    #[inline]
    #[must_use]
    pub const fn new(ordinal: u64) -> Self {
        Self(ordinal)
    }

    /// Returns the bucket's ordinal.
    #[inline]
    #[must_use]
    pub const fn ordinal(self) -> u64 {
        self.0
    }

    /// Returns the timestamp at the start of the bucket.
    #[inline]
    #[must_use]
    pub const fn start(self) -> Timestamp {
        Timestamp::from_nanos(self.0 * TIME_BUCKET_NS)
    }

    /// Returns the first bucket after this one.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Returns the bucket before this one, saturating at zero.
    #[inline]
    #[must_use]
    pub const fn prev(self) -> Self {
        Self(self.0.saturating_sub(1))
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_conversions() {
        let ts = Timestamp::from_millis(1500);
        assert_eq!(ts.as_nanos(), 1_500_000_000);
        assert_eq!(ts.as_millis(), 1500);
    }

    #[test]
    fn test_zero_is_reserved() {
        assert!(Timestamp::ZERO.is_zero());
        assert!(!Timestamp::now().is_zero());
    }

    #[test]
    fn test_bucket_of() {
        let ts = Timestamp::from_nanos(2_999_999_999);
        assert_eq!(ts.bucket(), TimeBucket::new(2));
        assert_eq!(ts.bucket().start().as_nanos(), 2_000_000_000);
    }

    #[test]
    fn test_bucket_neighbors() {
        let b = TimeBucket::new(10);
        assert_eq!(b.next().ordinal(), 11);
        assert_eq!(b.prev().ordinal(), 9);
        assert_eq!(TimeBucket::new(0).prev().ordinal(), 0);
    }

    #[test]
    fn test_timestamp_arithmetic() {
        let ts = Timestamp::from_nanos(1_000_000_000);
        assert_eq!(ts.add(Duration::from_secs(1)).as_nanos(), 2_000_000_000);
        assert_eq!(ts.sub(Duration::from_secs(2)).as_nanos(), 0);
    }
}
