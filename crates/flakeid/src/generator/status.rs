use crate::SnowflakeId;

/// Outcome of a non-blocking issuance attempt.
///
/// Returned by [`IdGenerator::try_poll_id`]:
///
/// - [`IdGenStatus::Ready`] carries the newly issued ID.
/// - [`IdGenStatus::Pending`] means all 4096 sequence values of the current
///   millisecond are spent and nothing was issued. The caller may yield,
///   sleep or await until the clock reaches `yield_until` and poll again.
///
/// # Example
///
/// ```
/// use flakeid::{GeneratorConfig, GeneratorIdentity, IdGenStatus, IdGenerator, SystemClock};
///
/// let config = GeneratorConfig::new(GeneratorIdentity::new(1, 1).unwrap());
/// let generator = IdGenerator::with_config(config, SystemClock);
///
/// let id = loop {
///     match generator.try_poll_id().unwrap() {
///         IdGenStatus::Ready { id } => break id,
///         IdGenStatus::Pending { .. } => std::thread::yield_now(),
///     }
/// };
/// assert_eq!(id.worker_id(), 1);
/// ```
///
/// [`IdGenerator::try_poll_id`]: crate::IdGenerator::try_poll_id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdGenStatus {
    /// A unique ID was issued.
    Ready {
        /// The issued ID.
        id: SnowflakeId,
    },
    /// The current millisecond is exhausted.
    Pending {
        /// The first millisecond (since the Unix epoch) in which issuance can
        /// resume.
        yield_until: u64,
    },
}

impl IdGenStatus {
    /// Returns the ID if one was issued.
    pub const fn ready(self) -> Option<SnowflakeId> {
        match self {
            Self::Ready { id } => Some(id),
            Self::Pending { .. } => None,
        }
    }
}
