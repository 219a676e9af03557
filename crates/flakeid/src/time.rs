#[cfg(not(all(target_arch = "wasm32", target_os = "unknown")))]
use std::time::{SystemTime, UNIX_EPOCH};
#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
use web_time::{SystemTime, UNIX_EPOCH};

/// Twitter epoch: Thursday, November 4, 2010 1:42:54.657 UTC, in milliseconds
/// since the Unix epoch.
///
/// This is the default origin subtracted from wall-clock time before the
/// timestamp is packed into an ID. 41 bits of milliseconds from this origin
/// last until mid 2080.
pub const TWITTER_EPOCH: u64 = 1_288_834_974_657;

/// Alias for the origin used when no epoch is configured.
pub const DEFAULT_EPOCH: u64 = TWITTER_EPOCH;

/// A source of wall-clock time in milliseconds since the Unix epoch.
///
/// The generator reads the clock exactly once per issuance (plus once per
/// spin iteration while a millisecond is exhausted), always while holding
/// its lock. Implementations must therefore be cheap and must not block.
///
/// Plugging in a simulated clock is how the regression and exhaustion paths
/// are tested.
///
/// # Example
///
/// ```
/// use flakeid::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1_700_000_000_000
///     }
/// }
///
/// assert_eq!(FixedTime.current_millis(), 1_700_000_000_000);
/// ```
pub trait TimeSource {
    /// Returns the current time in milliseconds since 1970-01-01 UTC.
    fn current_millis(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for std::sync::Arc<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

/// The system wall clock.
///
/// Unlike a monotonic timer this clock follows external adjustments (NTP
/// steps, manual changes, VM migration). A backwards step is reported by the
/// generator as [`Error::ClockRegression`] rather than hidden.
///
/// A system time before 1970 reads as `0`.
///
/// [`Error::ClockRegression`]: crate::Error::ClockRegression
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }
}
