use core::{fmt, str::FromStr};

use crate::error::ParseIdError;

/// A 64-bit Snowflake ID.
///
/// - 1 bit reserved (always zero, so the value is also a non-negative `i64`)
/// - 41 bits timestamp (ms since the generator's epoch)
/// - 5 bits datacenter ID
/// - 5 bits worker ID
/// - 12 bits sequence
///
/// ```text
///  Bit Index:  63           63 62            22 21                17 16            12 11             0
///              +--------------+----------------+--------------------+----------------+---------------+
///  Field:      | reserved (1) | timestamp (41) | datacenter ID (5)  |  worker ID (5) | sequence (12) |
///              +--------------+----------------+--------------------+----------------+---------------+
///              |<----------------- MSB ----------------- 64 bits ------------------- LSB ------------>|
/// ```
///
/// Ordering and hashing follow the raw integer, so IDs sort by time first,
/// then by producer, then by sequence.
///
/// # Example
///
/// ```
/// use flakeid::SnowflakeId;
///
/// let id = SnowflakeId::from_components(1000, 2, 3, 1);
/// assert_eq!(id.timestamp(), 1000);
/// assert_eq!(id.datacenter_id(), 2);
/// assert_eq!(id.worker_id(), 3);
/// assert_eq!(id.sequence(), 1);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u64", into = "u64"))]
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SnowflakeId {
    id: u64,
}

impl SnowflakeId {
    /// Width of the timestamp field.
    pub const TIMESTAMP_BITS: u64 = 41;

    /// Width of the datacenter ID field.
    pub const DATACENTER_ID_BITS: u64 = 5;

    /// Width of the worker ID field.
    pub const WORKER_ID_BITS: u64 = 5;

    /// Width of the sequence field.
    pub const SEQUENCE_BITS: u64 = 12;

    /// Bitmask for the 41-bit timestamp field. Occupies bits 22 through 62.
    pub const TIMESTAMP_MASK: u64 = (1 << Self::TIMESTAMP_BITS) - 1;

    /// Bitmask for the 5-bit datacenter ID field. Occupies bits 17 through 21.
    pub const DATACENTER_ID_MASK: u64 = (1 << Self::DATACENTER_ID_BITS) - 1;

    /// Bitmask for the 5-bit worker ID field. Occupies bits 12 through 16.
    pub const WORKER_ID_MASK: u64 = (1 << Self::WORKER_ID_BITS) - 1;

    /// Bitmask for the 12-bit sequence field. Occupies bits 0 through 11.
    pub const SEQUENCE_MASK: u64 = (1 << Self::SEQUENCE_BITS) - 1;

    /// Shift of the worker ID field (bit 12).
    pub const WORKER_ID_SHIFT: u64 = Self::SEQUENCE_BITS;

    /// Shift of the datacenter ID field (bit 17).
    pub const DATACENTER_ID_SHIFT: u64 = Self::SEQUENCE_BITS + Self::WORKER_ID_BITS;

    /// Shift of the timestamp field (bit 22).
    pub const TIMESTAMP_SHIFT: u64 =
        Self::SEQUENCE_BITS + Self::WORKER_ID_BITS + Self::DATACENTER_ID_BITS;

    /// The reserved most significant bit.
    pub const RESERVED_BIT: u64 = 1 << 63;

    /// Packs an ID from its raw fields. Each field is masked to its width.
    pub const fn from_components(
        timestamp: u64,
        datacenter_id: u64,
        worker_id: u64,
        sequence: u64,
    ) -> Self {
        let timestamp = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let datacenter_id = (datacenter_id & Self::DATACENTER_ID_MASK) << Self::DATACENTER_ID_SHIFT;
        let worker_id = (worker_id & Self::WORKER_ID_MASK) << Self::WORKER_ID_SHIFT;
        let sequence = sequence & Self::SEQUENCE_MASK;
        Self {
            id: timestamp | datacenter_id | worker_id | sequence,
        }
    }

    /// Wraps a raw value without checking the reserved bit.
    ///
    /// Use [`SnowflakeId::try_from`] to reject values with bit 63 set.
    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }

    /// Returns the raw packed value.
    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// Returns the value as a signed integer, or `None` if the reserved bit
    /// is set.
    pub const fn to_i64(&self) -> Option<i64> {
        if self.is_valid() {
            Some(self.id as i64)
        } else {
            None
        }
    }

    /// Returns `true` if the reserved bit is clear.
    pub const fn is_valid(&self) -> bool {
        self.id & Self::RESERVED_BIT == 0
    }

    /// Milliseconds since the generator's epoch.
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    pub const fn datacenter_id(&self) -> u64 {
        (self.id >> Self::DATACENTER_ID_SHIFT) & Self::DATACENTER_ID_MASK
    }

    pub const fn worker_id(&self) -> u64 {
        (self.id >> Self::WORKER_ID_SHIFT) & Self::WORKER_ID_MASK
    }

    pub const fn sequence(&self) -> u64 {
        self.id & Self::SEQUENCE_MASK
    }

    /// Splits the ID back into its fields, resolving the timestamp against
    /// `epoch_ms` (milliseconds since the Unix epoch).
    ///
    /// The resolved timestamp saturates at `u64::MAX` for an epoch later than
    /// [`GeneratorConfig::MAX_EPOCH`], which no generator accepts.
    ///
    /// [`GeneratorConfig::MAX_EPOCH`]: crate::GeneratorConfig::MAX_EPOCH
    ///
    /// ```
    /// use flakeid::{SnowflakeId, TWITTER_EPOCH};
    ///
    /// let id = SnowflakeId::from_components(5, 1, 2, 3);
    /// let parts = id.decompose(TWITTER_EPOCH);
    /// assert_eq!(parts.timestamp_ms, TWITTER_EPOCH + 5);
    /// assert_eq!((parts.datacenter_id, parts.worker_id, parts.sequence), (1, 2, 3));
    /// ```
    pub const fn decompose(&self, epoch_ms: u64) -> IdParts {
        IdParts {
            timestamp_ms: epoch_ms.saturating_add(self.timestamp()),
            datacenter_id: self.datacenter_id() as u8,
            worker_id: self.worker_id() as u8,
            sequence: self.sequence() as u16,
        }
    }

    /// Returns the ID as a zero-padded 20-digit string, which sorts
    /// lexicographically in the same order as the integer.
    pub fn to_padded_string(&self) -> String {
        format!("{:020}", self.id)
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeId")
            .field("raw", &format_args!("0x{:016x}", self.id))
            .field("timestamp", &self.timestamp())
            .field("datacenter_id", &self.datacenter_id())
            .field("worker_id", &self.worker_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}

impl From<SnowflakeId> for u64 {
    fn from(id: SnowflakeId) -> Self {
        id.id
    }
}

impl TryFrom<u64> for SnowflakeId {
    type Error = ParseIdError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        let id = Self::from_raw(raw);
        if !id.is_valid() {
            return Err(ParseIdError::ReservedBitSet(raw));
        }
        Ok(id)
    }
}

impl TryFrom<i64> for SnowflakeId {
    type Error = ParseIdError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        u64::try_from(raw)
            .map(Self::from_raw)
            .map_err(|_| ParseIdError::Negative(raw))
    }
}

impl FromStr for SnowflakeId {
    type Err = ParseIdError;

    /// Parses the decimal representation produced by [`fmt::Display`] (or
    /// [`SnowflakeId::to_padded_string`]).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u64 = s.trim().parse()?;
        Self::try_from(raw)
    }
}

/// The fields of a [`SnowflakeId`] with the timestamp resolved to
/// milliseconds since the Unix epoch.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdParts {
    pub timestamp_ms: u64,
    pub datacenter_id: u8,
    pub worker_id: u8,
    pub sequence: u16,
}
