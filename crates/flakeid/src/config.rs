use crate::{ConfigError, DEFAULT_EPOCH, SnowflakeId};

/// The static identity of a producer: a validated worker and datacenter pair.
///
/// Both values are provisioned out of band. The library only checks that each
/// fits its 5-bit field; keeping pairs unique across live generators is the
/// deployment's job.
///
/// # Example
///
/// ```
/// use flakeid::{ConfigError, GeneratorIdentity};
///
/// let identity = GeneratorIdentity::new(31, 31).unwrap();
/// assert_eq!(identity.worker_id(), 31);
///
/// assert!(matches!(
///     GeneratorIdentity::new(32, 0),
///     Err(ConfigError::WorkerIdOutOfRange { value: 32, .. })
/// ));
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GeneratorIdentity {
    worker_id: u8,
    datacenter_id: u8,
}

impl GeneratorIdentity {
    /// Largest accepted worker ID.
    pub const MAX_WORKER_ID: u64 = SnowflakeId::WORKER_ID_MASK;

    /// Largest accepted datacenter ID.
    pub const MAX_DATACENTER_ID: u64 = SnowflakeId::DATACENTER_ID_MASK;

    /// Validates a raw worker/datacenter pair.
    ///
    /// Inputs are signed so that negative values coming from external
    /// configuration are reported instead of wrapping.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::WorkerIdOutOfRange`] or
    /// [`ConfigError::DatacenterIdOutOfRange`] if a value falls outside
    /// `0..=31`.
    pub fn new(worker_id: i64, datacenter_id: i64) -> Result<Self, ConfigError> {
        let worker_id = narrow(worker_id, Self::MAX_WORKER_ID).ok_or(
            ConfigError::WorkerIdOutOfRange {
                value: worker_id,
                max: Self::MAX_WORKER_ID,
            },
        )?;
        let datacenter_id = narrow(datacenter_id, Self::MAX_DATACENTER_ID).ok_or(
            ConfigError::DatacenterIdOutOfRange {
                value: datacenter_id,
                max: Self::MAX_DATACENTER_ID,
            },
        )?;
        Ok(Self {
            worker_id: worker_id as u8,
            datacenter_id: datacenter_id as u8,
        })
    }

    pub const fn worker_id(&self) -> u8 {
        self.worker_id
    }

    pub const fn datacenter_id(&self) -> u8 {
        self.datacenter_id
    }
}

/// Everything a generator needs at construction.
///
/// Built from a [`GeneratorIdentity`] with the default epoch
/// ([`DEFAULT_EPOCH`]) and an initial sequence of zero.
///
/// With the `serde` feature this deserializes from
/// `{ "worker_id": .., "datacenter_id": .., "initial_sequence": .., "epoch_ms": .. }`
/// (the last two optional) and runs the same validation as the constructors.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "RawGeneratorConfig", into = "RawGeneratorConfig")
)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GeneratorConfig {
    identity: GeneratorIdentity,
    initial_sequence: u16,
    epoch_ms: u64,
}

impl GeneratorConfig {
    /// Largest accepted initial sequence.
    pub const MAX_SEQUENCE: u64 = SnowflakeId::SEQUENCE_MASK;

    /// Latest accepted epoch: the full 41-bit timestamp range past it still
    /// fits in a `u64` of Unix milliseconds.
    pub const MAX_EPOCH: u64 = u64::MAX - SnowflakeId::TIMESTAMP_MASK;

    pub const fn new(identity: GeneratorIdentity) -> Self {
        Self {
            identity,
            initial_sequence: 0,
            epoch_ms: DEFAULT_EPOCH,
        }
    }

    /// Sets the sequence the generator state starts with.
    ///
    /// The first issuance always lands in a fresh millisecond and resets the
    /// sequence to zero, so this only shapes the state observed before any ID
    /// has been issued.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SequenceOutOfRange`] outside `0..=4095`.
    pub fn with_initial_sequence(self, sequence: i64) -> Result<Self, ConfigError> {
        let initial_sequence =
            narrow(sequence, Self::MAX_SEQUENCE).ok_or(ConfigError::SequenceOutOfRange {
                value: sequence,
                max: Self::MAX_SEQUENCE,
            })?;
        Ok(Self {
            initial_sequence: initial_sequence as u16,
            ..self
        })
    }

    /// Sets the origin, in milliseconds since the Unix epoch, subtracted from
    /// the clock before packing the timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EpochOutOfRange`] above [`Self::MAX_EPOCH`].
    pub const fn with_epoch(self, epoch_ms: u64) -> Result<Self, ConfigError> {
        if epoch_ms > Self::MAX_EPOCH {
            return Err(ConfigError::EpochOutOfRange {
                value: epoch_ms,
                max: Self::MAX_EPOCH,
            });
        }
        Ok(Self { epoch_ms, ..self })
    }

    pub const fn identity(&self) -> GeneratorIdentity {
        self.identity
    }

    pub const fn initial_sequence(&self) -> u16 {
        self.initial_sequence
    }

    pub const fn epoch_ms(&self) -> u64 {
        self.epoch_ms
    }
}

impl From<GeneratorIdentity> for GeneratorConfig {
    fn from(identity: GeneratorIdentity) -> Self {
        Self::new(identity)
    }
}

fn narrow(value: i64, max: u64) -> Option<u64> {
    u64::try_from(value).ok().filter(|v| *v <= max)
}

#[cfg(feature = "serde")]
#[derive(serde::Serialize, serde::Deserialize)]
struct RawGeneratorConfig {
    worker_id: i64,
    datacenter_id: i64,
    #[serde(default)]
    initial_sequence: i64,
    #[serde(default = "default_epoch")]
    epoch_ms: u64,
}

#[cfg(feature = "serde")]
const fn default_epoch() -> u64 {
    DEFAULT_EPOCH
}

#[cfg(feature = "serde")]
impl TryFrom<RawGeneratorConfig> for GeneratorConfig {
    type Error = ConfigError;

    fn try_from(raw: RawGeneratorConfig) -> Result<Self, Self::Error> {
        let identity = GeneratorIdentity::new(raw.worker_id, raw.datacenter_id)?;
        Self::new(identity)
            .with_initial_sequence(raw.initial_sequence)?
            .with_epoch(raw.epoch_ms)
    }
}

#[cfg(feature = "serde")]
impl From<GeneratorConfig> for RawGeneratorConfig {
    fn from(config: GeneratorConfig) -> Self {
        Self {
            worker_id: i64::from(config.identity.worker_id),
            datacenter_id: i64::from(config.identity.datacenter_id),
            initial_sequence: i64::from(config.initial_sequence),
            epoch_ms: config.epoch_ms,
        }
    }
}
