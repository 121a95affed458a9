//! Abstractions over the system clock so that components can be tested with
//! a deterministic, manually advanced time source.

#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    clippy::explicit_iter_loop,
    clippy::use_self,
    clippy::clone_on_ref_ptr
)]

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::RwLock;
use std::fmt;
use std::ops::Add;
use std::time::Duration;

/// An absolute instant in wall-clock time with nanosecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(DateTime<Utc>);

impl Time {
    /// Create a `Time` from the number of non-leap nanoseconds since the
    /// UNIX epoch.
    pub fn from_timestamp_nanos(nanos: i64) -> Self {
        Self(Utc.timestamp_nanos(nanos))
    }

    /// Create a `Time` from the number of non-leap milliseconds since the
    /// UNIX epoch.
    pub fn from_timestamp_millis(millis: i64) -> Self {
        Self::from_timestamp_nanos(millis * 1_000_000)
    }

    /// Returns the number of non-leap nanoseconds since the UNIX epoch.
    pub fn timestamp_nanos(&self) -> i64 {
        self.0.timestamp_nanos()
    }

    /// Adds `duration` to this instant, returning `None` on overflow.
    pub fn checked_add(self, duration: Duration) -> Option<Self> {
        let duration = chrono::Duration::from_std(duration).ok()?;
        self.0.checked_add_signed(duration).map(Self)
    }

    /// Returns the duration elapsed from `earlier` to `self`, or `None` if
    /// `earlier` is later than `self`.
    pub fn checked_duration_since(self, earlier: Self) -> Option<Duration> {
        (self.0 - earlier.0).to_std().ok()
    }
}

impl Add<Duration> for Time {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        self.checked_add(rhs).expect("timestamp overflow")
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// A source of the current time.
///
/// Implementations are not required to be monotonic.
pub trait TimeProvider: std::fmt::Debug + Send + Sync + 'static {
    /// Returns the current `Time`.
    fn now(&self) -> Time;
}

/// A [`TimeProvider`] that reads the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProvider;

impl SystemProvider {
    /// Create a new provider reading the system clock.
    pub fn new() -> Self {
        Self
    }
}

impl TimeProvider for SystemProvider {
    fn now(&self) -> Time {
        Time(Utc::now())
    }
}

/// A [`TimeProvider`] that returns a fixed instant until told otherwise.
#[derive(Debug)]
pub struct MockProvider {
    now: RwLock<Time>,
}

impl MockProvider {
    /// Create a provider frozen at `start`.
    pub fn new(start: Time) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Replace the reported instant.
    pub fn set(&self, time: Time) {
        *self.now.write() = time;
    }

    /// Advance the reported instant by `duration`, returning the new value.
    pub fn inc(&self, duration: Duration) -> Time {
        let mut now = self.now.write();
        *now = *now + duration;
        *now
    }
}

impl TimeProvider for MockProvider {
    fn now(&self) -> Time {
        *self.now.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_arithmetic() {
        let a = Time::from_timestamp_nanos(5_000_000_000);
        let b = a + Duration::from_secs(1);
        assert_eq!(b.timestamp_nanos(), 6_000_000_000);
        assert_eq!(b.checked_duration_since(a), Some(Duration::from_secs(1)));
        assert_eq!(a.checked_duration_since(b), None);
    }

    #[test]
    fn millis_round_trip() {
        let t = Time::from_timestamp_millis(1_234);
        assert_eq!(t.timestamp_nanos(), 1_234_000_000);
    }

    #[test]
    fn mock_provider() {
        let provider = MockProvider::new(Time::from_timestamp_nanos(0));
        assert_eq!(provider.now().timestamp_nanos(), 0);

        provider.inc(Duration::from_nanos(40));
        assert_eq!(provider.now().timestamp_nanos(), 40);

        provider.set(Time::from_timestamp_nanos(7));
        assert_eq!(provider.now().timestamp_nanos(), 7);
    }
}
