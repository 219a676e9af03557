use crate::{Error, Result, SnowflakeId};

/// The mutable half of a generator: when it last issued an ID and which
/// sequence value it used.
///
/// `last_timestamp` never decreases across successful issuances and
/// `sequence` always fits in 12 bits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GeneratorState {
    last_timestamp: Option<u64>,
    sequence: u16,
}

impl GeneratorState {
    pub(crate) const fn new(initial_sequence: u16) -> Self {
        debug_assert!(initial_sequence as u64 <= SnowflakeId::SEQUENCE_MASK);
        Self {
            last_timestamp: None,
            sequence: initial_sequence,
        }
    }

    /// Millisecond (since the Unix epoch) of the last issued ID, or `None`
    /// if nothing has been issued yet.
    pub const fn last_timestamp(&self) -> Option<u64> {
        self.last_timestamp
    }

    /// Sequence value of the last issued ID.
    pub const fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Picks the sequence value to issue at `now`.
    ///
    /// Returns `Ok(None)` when `now` is the last issued millisecond and its
    /// sequence space is spent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClockRegression`] if `now` is earlier than the last
    /// issued millisecond.
    pub(crate) fn next_sequence(&self, now: u64) -> Result<Option<u16>> {
        match self.last_timestamp {
            Some(last) if now < last => Err(clock_behind(last, now)),
            Some(last) if now == last => {
                if u64::from(self.sequence) < SnowflakeId::SEQUENCE_MASK {
                    Ok(Some(self.sequence + 1))
                } else {
                    Ok(None)
                }
            }
            _ => Ok(Some(0)),
        }
    }

    pub(crate) fn commit(&mut self, now: u64, sequence: u16) {
        debug_assert!(self.last_timestamp.is_none_or(|last| last <= now));
        self.last_timestamp = Some(now);
        self.sequence = sequence;
    }
}

#[cold]
#[inline(never)]
pub(crate) fn clock_behind(reference: u64, now: u64) -> Error {
    let delta_ms = reference - now;
    #[cfg(feature = "tracing")]
    tracing::warn!(delta_ms, "clock moved backwards, refusing to issue");
    Error::ClockRegression { delta_ms }
}

#[cold]
#[inline(never)]
pub(crate) fn timestamp_overflow(elapsed_ms: u64) -> Error {
    #[cfg(feature = "tracing")]
    tracing::error!(elapsed_ms, "timestamp no longer fits in 41 bits, refusing to issue");
    Error::TimestampOverflow { elapsed_ms }
}
