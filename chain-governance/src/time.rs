use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Wall clock instant in milliseconds since the Unix epoch.
///
/// Countdown anchors are persisted in this form so they stay comparable
/// across reloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Whole seconds elapsed from `self` until `later`, rounded down.
    /// A `later` before `self` counts as no time elapsed.
    pub fn elapsed_secs_until(self, later: Timestamp) -> u64 {
        later.0.saturating_sub(self.0) / 1000
    }

    pub fn saturating_add(self, duration: Duration) -> Self {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(millis))
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        let millis = time
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Self(millis)
    }
}

impl FromStr for Timestamp {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now().into()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}

#[cfg(any(test, feature = "property-test-api"))]
pub use self::manual::ManualClock;

#[cfg(any(test, feature = "property-test-api"))]
mod manual {
    use super::{Clock, Timestamp};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Clock that only moves when told to. Clones share the same time.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        millis: Arc<AtomicU64>,
    }

    impl ManualClock {
        pub fn new(start: Timestamp) -> Self {
            Self {
                millis: Arc::new(AtomicU64::new(start.as_millis())),
            }
        }

        pub fn advance(&self, duration: Duration) {
            let step = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
            self.millis.fetch_add(step, Ordering::SeqCst);
        }

        pub fn set(&self, time: Timestamp) {
            self.millis.store(time.as_millis(), Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Timestamp {
            Timestamp::from_millis(self.millis.load(Ordering::SeqCst))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_rounds_down() {
        let start = Timestamp::from_millis(10_000);
        assert_eq!(start.elapsed_secs_until(Timestamp::from_millis(10_999)), 0);
        assert_eq!(start.elapsed_secs_until(Timestamp::from_millis(11_000)), 1);
        assert_eq!(start.elapsed_secs_until(Timestamp::from_millis(100_500)), 90);
    }

    #[test]
    fn clock_skew_counts_as_zero() {
        let start = Timestamp::from_millis(10_000);
        assert_eq!(start.elapsed_secs_until(Timestamp::from_millis(5_000)), 0);
    }

    #[test]
    fn manual_clock_is_shared() {
        let clock = ManualClock::new(Timestamp::from_millis(0));
        let other = clock.clone();
        other.advance(Duration::from_secs(3));
        assert_eq!(clock.now(), Timestamp::from_millis(3_000));
    }

    #[test]
    fn parses_persisted_form() {
        let ts: Timestamp = "1700000000000".parse().unwrap();
        assert_eq!(ts.as_millis(), 1_700_000_000_000);
        assert_eq!(ts.to_string(), "1700000000000");
        assert!("NaN".parse::<Timestamp>().is_err());
    }
}
