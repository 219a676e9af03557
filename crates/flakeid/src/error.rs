/// A result type defaulting to the crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Rejected generator configuration.
///
/// Returned when a worker ID, datacenter ID or initial sequence falls outside
/// the width of its bit field, or the epoch is too late to offset it. Construction never clamps or masks these
/// values.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The worker ID does not fit in its 5-bit field.
    #[error("worker id {value} is out of range (expected 0..={max})")]
    WorkerIdOutOfRange { value: i64, max: u64 },

    /// The datacenter ID does not fit in its 5-bit field.
    #[error("datacenter id {value} is out of range (expected 0..={max})")]
    DatacenterIdOutOfRange { value: i64, max: u64 },

    /// The initial sequence does not fit in its 12-bit field.
    #[error("initial sequence {value} is out of range (expected 0..={max})")]
    SequenceOutOfRange { value: i64, max: u64 },

    /// The epoch leaves no room for the full 41-bit timestamp range.
    #[error("epoch {value}ms is out of range (expected 0..={max})")]
    EpochOutOfRange { value: u64, max: u64 },
}

/// A value that cannot be read back as a [`SnowflakeId`].
///
/// [`SnowflakeId`]: crate::SnowflakeId
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ParseIdError {
    #[error("invalid id: {0}")]
    Int(#[from] core::num::ParseIntError),

    /// Bit 63 is reserved and always zero in issued IDs.
    #[error("invalid id {0:#018x}: reserved bit 63 is set")]
    ReservedBitSet(u64),

    #[error("invalid id {0}: ids are never negative")]
    Negative(i64),
}

/// All errors the generator can produce.
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The generator could not be constructed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The clock reported a time earlier than the last issued timestamp (or
    /// earlier than the configured epoch).
    ///
    /// No ID was produced and the generator state is unchanged. The caller
    /// decides whether to wait `delta_ms`, alert or abort.
    #[error("clock moved backwards by {delta_ms}ms, refusing to generate an id")]
    ClockRegression { delta_ms: u64 },

    /// The clock is further past the epoch than the 41-bit timestamp field
    /// can hold.
    ///
    /// No ID was produced and the generator state is unchanged. Every later
    /// reading will fail the same way until the generator is reconfigured
    /// with a later epoch.
    #[error("{elapsed_ms}ms since the epoch does not fit in the timestamp field")]
    TimestampOverflow { elapsed_ms: u64 },

    /// The generator lock was poisoned by a panicking thread.
    ///
    /// `parking_lot` mutexes do not poison, so this variant only exists
    /// without the `parking-lot` feature. The mutex itself is not exported:
    ///
    /// ```compile_fail
    /// use flakeid::Mutex;
    /// ```
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("generator lock poisoned")]
    LockPoisoned,
}

impl Error {
    /// Returns the regression delta in milliseconds if this is a
    /// [`Error::ClockRegression`].
    pub const fn clock_regression(&self) -> Option<u64> {
        match self {
            Self::ClockRegression { delta_ms } => Some(*delta_ms),
            _ => None,
        }
    }
}

#[cfg(not(feature = "parking-lot"))]
use crate::generator::{MutexGuard, PoisonError};
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
