//! Write timestamps
//!
//! [`MonotonicClock`] hands out strictly increasing millisecond timestamps
//! across the whole process, so "newest first" orderings are total even when
//! two writes land in the same wall-clock millisecond.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Serialize, Serializer};
use std::sync::atomic::{AtomicI64, Ordering};

const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// UTC instant with millisecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Build from milliseconds since the Unix epoch
    #[must_use]
    pub fn from_millis(millis: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(millis).single().map(Self)
    }

    /// Milliseconds since the Unix epoch
    #[inline]
    #[must_use]
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Wire representation, e.g. `2016-02-18T03:22:56.637Z`
    #[must_use]
    pub fn to_wire(&self) -> String {
        self.0.format(WIRE_FORMAT).to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(WIRE_FORMAT))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Source of write timestamps
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current instant; successive calls never go backwards
    fn now(&self) -> Timestamp;
}

/// Wall clock forced to be strictly increasing process-wide
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last_millis: AtomicI64,
}

impl MonotonicClock {
    /// Create new clock
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        let wall = Utc::now().timestamp_millis();
        let mut prev = self.last_millis.load(Ordering::SeqCst);
        loop {
            let next = wall.max(prev + 1);
            match self
                .last_millis
                .compare_exchange(prev, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return Timestamp::from_millis(next).unwrap_or(Timestamp(Utc::now())),
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Deterministic clock: starts at a fixed instant, advances 1ms per call
#[derive(Debug)]
pub struct ManualClock {
    next_millis: AtomicI64,
}

impl ManualClock {
    /// Start at `millis` since the Unix epoch
    #[inline]
    #[must_use]
    pub fn starting_at(millis: i64) -> Self {
        Self {
            next_millis: AtomicI64::new(millis),
        }
    }

    /// Jump forward by `millis`
    pub fn advance(&self, millis: i64) {
        self.next_millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    /// 2024-01-01T00:00:00.000Z
    fn default() -> Self {
        Self::starting_at(1_704_067_200_000)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        let millis = self.next_millis.fetch_add(1, Ordering::SeqCst);
        Timestamp::from_millis(millis).unwrap_or(Timestamp(Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_format_has_millis_and_zulu() {
        let ts = Timestamp::from_millis(1_455_765_776_637).unwrap();
        assert_eq!(ts.to_wire(), "2016-02-18T03:22:56.637Z");
        assert_eq!(
            serde_json::to_string(&ts).unwrap(),
            "\"2016-02-18T03:22:56.637Z\""
        );
    }

    #[test]
    fn monotonic_clock_strictly_increases() {
        let clock = MonotonicClock::new();
        let mut prev = clock.now();
        for _ in 0..1000 {
            let next = clock.now();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn manual_clock_steps_by_one_milli() {
        let clock = ManualClock::starting_at(1_000);
        assert_eq!(clock.now().as_millis(), 1_000);
        assert_eq!(clock.now().as_millis(), 1_001);
        clock.advance(100);
        assert_eq!(clock.now().as_millis(), 1_102);
    }
}
