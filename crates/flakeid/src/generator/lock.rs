use core::fmt;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    ConfigError, GeneratorConfig, GeneratorIdentity, IdParts, Result, SnowflakeId, SystemClock,
    TimeSource,
    generator::{
        GeneratorState, IdGenStatus, Mutex, MutexGuard,
        state::{clock_behind, timestamp_overflow},
    },
};

/// A lock-based Snowflake ID generator bound to one worker/datacenter pair.
///
/// All state lives behind a single mutex and every issuance reads the clock
/// while holding it, so no two callers can observe the same
/// `(timestamp, sequence)` pair. Share one instance by reference or through an
/// [`Arc`] across threads; separate instances share nothing.
///
/// A single instance issues at most 4096 IDs per millisecond.
///
/// # Example
///
/// ```
/// use flakeid::IdGenerator;
///
/// let generator = IdGenerator::new(1, 2, 0).unwrap();
///
/// let a = generator.next_id().unwrap();
/// let b = generator.next_id().unwrap();
/// assert!(a < b);
/// assert_eq!(generator.decompose(a).worker_id, 1);
/// assert_eq!(generator.decompose(a).datacenter_id, 2);
/// ```
///
/// [`Arc`]: std::sync::Arc
pub struct IdGenerator<T = SystemClock>
where
    T: TimeSource,
{
    #[cfg(feature = "cache-padded")]
    pub(crate) state: crossbeam_utils::CachePadded<Mutex<GeneratorState>>,
    #[cfg(not(feature = "cache-padded"))]
    pub(crate) state: Mutex<GeneratorState>,
    pub(crate) config: GeneratorConfig,
    pub(crate) time: T,
}

impl IdGenerator<SystemClock> {
    /// Creates a generator on the system clock with the default epoch.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `worker_id` or `datacenter_id` is outside
    /// `0..=31`, or `initial_sequence` is outside `0..=4095`.
    pub fn new(
        worker_id: i64,
        datacenter_id: i64,
        initial_sequence: i64,
    ) -> Result<Self, ConfigError> {
        let identity = GeneratorIdentity::new(worker_id, datacenter_id)?;
        let config = GeneratorConfig::new(identity).with_initial_sequence(initial_sequence)?;
        Ok(Self::with_config(config, SystemClock))
    }

    /// Creates a generator on the system clock from a validated identity.
    pub fn from_identity(identity: GeneratorIdentity) -> Self {
        Self::with_config(GeneratorConfig::new(identity), SystemClock)
    }
}

impl<T> IdGenerator<T>
where
    T: TimeSource,
{
    /// Creates a generator from a validated config and an arbitrary time
    /// source.
    ///
    /// The state starts as "never issued" with the configured initial
    /// sequence.
    pub fn with_config(config: GeneratorConfig, time: T) -> Self {
        let state = Mutex::new(GeneratorState::new(config.initial_sequence()));
        Self {
            #[cfg(feature = "cache-padded")]
            state: crossbeam_utils::CachePadded::new(state),
            #[cfg(not(feature = "cache-padded"))]
            state,
            config,
            time,
        }
    }

    /// Issues the next ID, spinning if the current millisecond is exhausted.
    ///
    /// The clock read, the state update and the packing happen in one
    /// critical section. When all 4096 sequence values of the current
    /// millisecond are spent, the call keeps the lock and re-reads the clock
    /// until it moves past the last issued millisecond, then issues with
    /// sequence zero. Under a healthy clock that wait is under a millisecond.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockRegression`] if the clock reads earlier than the last
    ///   issued millisecond (or earlier than the epoch). Nothing is issued,
    ///   the state is unchanged and no retry is attempted.
    /// - [`Error::TimestampOverflow`] if the clock is past the last
    ///   millisecond the 41-bit timestamp can hold. The state is unchanged.
    /// - [`Error::LockPoisoned`] if another thread panicked while holding the
    ///   lock (std mutex only).
    ///
    /// [`Error::ClockRegression`]: crate::Error::ClockRegression
    /// [`Error::TimestampOverflow`]: crate::Error::TimestampOverflow
    /// [`Error::LockPoisoned`]: crate::Error
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> Result<SnowflakeId> {
        let mut state = self.lock_state()?;
        let mut now = self.current_millis()?;

        let sequence = match state.next_sequence(now)? {
            Some(sequence) => sequence,
            None => {
                now = self.wait_next_millis(now)?;
                0
            }
        };

        state.commit(now, sequence);
        Ok(self.compose(now, sequence))
    }

    /// Attempts to issue the next ID without waiting.
    ///
    /// Behaves like [`IdGenerator::next_id`] except that an exhausted
    /// millisecond yields [`IdGenStatus::Pending`] (with the state untouched)
    /// instead of spinning.
    ///
    /// # Errors
    ///
    /// Same as [`IdGenerator::next_id`].
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<IdGenStatus> {
        let mut state = self.lock_state()?;
        let now = self.current_millis()?;

        let Some(sequence) = state.next_sequence(now)? else {
            return Ok(IdGenStatus::Pending {
                yield_until: now.saturating_add(1),
            });
        };

        state.commit(now, sequence);
        Ok(IdGenStatus::Ready {
            id: self.compose(now, sequence),
        })
    }

    /// Splits an ID back into its fields using this generator's epoch.
    pub const fn decompose(&self, id: SnowflakeId) -> IdParts {
        id.decompose(self.config.epoch_ms())
    }

    /// Returns the configuration this generator was built with.
    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Returns the worker/datacenter pair packed into every ID.
    pub const fn identity(&self) -> GeneratorIdentity {
        self.config.identity()
    }

    /// Returns the epoch in milliseconds since the Unix epoch.
    pub const fn epoch_ms(&self) -> u64 {
        self.config.epoch_ms()
    }

    /// Returns a snapshot of the mutable state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if the lock is poisoned (std mutex
    /// only).
    ///
    /// [`Error::LockPoisoned`]: crate::Error
    pub fn state(&self) -> Result<GeneratorState> {
        Ok(*self.lock_state()?)
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, GeneratorState>> {
        #[cfg(feature = "parking-lot")]
        {
            Ok(self.state.lock())
        }
        #[cfg(not(feature = "parking-lot"))]
        {
            Ok(self.state.lock()?)
        }
    }

    /// Reads the clock, rejecting readings the timestamp field cannot
    /// represent.
    fn current_millis(&self) -> Result<u64> {
        let now = self.time.current_millis();
        let epoch = self.config.epoch_ms();
        if now < epoch {
            return Err(clock_behind(epoch, now));
        }
        self.check_elapsed(now)
    }

    /// Rejects a reading at or after the epoch that lies past the 41-bit
    /// timestamp range.
    fn check_elapsed(&self, now: u64) -> Result<u64> {
        let elapsed_ms = now - self.config.epoch_ms();
        if elapsed_ms > SnowflakeId::TIMESTAMP_MASK {
            return Err(timestamp_overflow(elapsed_ms));
        }
        Ok(now)
    }

    /// Spins until the clock moves past `last`. Must be called with the lock
    /// held.
    #[cold]
    fn wait_next_millis(&self, last: u64) -> Result<u64> {
        #[cfg(feature = "tracing")]
        tracing::debug!(last, "sequence exhausted, waiting for the next millisecond");

        loop {
            core::hint::spin_loop();
            let now = self.time.current_millis();
            if now > last {
                return self.check_elapsed(now);
            }
            if now < last {
                return Err(clock_behind(last, now));
            }
        }
    }

    fn compose(&self, now: u64, sequence: u16) -> SnowflakeId {
        let timestamp = now - self.config.epoch_ms();
        debug_assert!(
            timestamp <= SnowflakeId::TIMESTAMP_MASK,
            "timestamp overflow"
        );
        let identity = self.config.identity();
        SnowflakeId::from_components(
            timestamp,
            u64::from(identity.datacenter_id()),
            u64::from(identity.worker_id()),
            u64::from(sequence),
        )
    }
}

impl<T> fmt::Debug for IdGenerator<T>
where
    T: TimeSource,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdGenerator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
