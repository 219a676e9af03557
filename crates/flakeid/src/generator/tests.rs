#[cfg(not(feature = "parking-lot"))]
use std::{panic, sync::atomic::AtomicBool};
use std::{
    collections::HashSet,
    iter,
    sync::{
        Mutex,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    thread::scope,
};

use crate::{
    ConfigError, Error, GeneratorConfig, GeneratorIdentity, IdGenStatus, IdGenerator,
    SnowflakeId, SystemClock, TimeSource,
};

/// A clock that only moves when told to.
struct MockTime {
    millis: AtomicU64,
}

impl MockTime {
    fn new(millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
        }
    }

    fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl TimeSource for MockTime {
    fn current_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// A clock that returns the next scripted value on every read and sticks on
/// the last one.
struct MockStepTime {
    values: Vec<u64>,
    index: AtomicUsize,
}

impl MockStepTime {
    fn new(values: impl IntoIterator<Item = u64>) -> Self {
        Self {
            values: values.into_iter().collect(),
            index: AtomicUsize::new(0),
        }
    }
}

impl TimeSource for MockStepTime {
    fn current_millis(&self) -> u64 {
        let i = self.index.fetch_add(1, Ordering::SeqCst);
        self.values[i.min(self.values.len() - 1)]
    }
}

/// A clock that panics on its first read, while the generator holds its lock.
#[cfg(not(feature = "parking-lot"))]
struct PanicOnceTime {
    armed: AtomicBool,
}

#[cfg(not(feature = "parking-lot"))]
impl TimeSource for PanicOnceTime {
    fn current_millis(&self) -> u64 {
        if self.armed.swap(false, Ordering::SeqCst) {
            panic!("clock read failed");
        }
        42
    }
}

fn config(worker_id: i64, datacenter_id: i64) -> GeneratorConfig {
    GeneratorConfig::new(GeneratorIdentity::new(worker_id, datacenter_id).unwrap()).with_epoch(0).unwrap()
}

fn mock_generator(millis: u64) -> IdGenerator<MockTime> {
    IdGenerator::with_config(config(1, 2), MockTime::new(millis))
}

const MAX_SEQUENCE: u64 = SnowflakeId::SEQUENCE_MASK;
const TIMESTAMP_MASK: u64 = SnowflakeId::TIMESTAMP_MASK;

#[test]
fn sequence_increments_within_same_tick() {
    let generator = mock_generator(42);

    let id1 = generator.next_id().unwrap();
    let id2 = generator.next_id().unwrap();
    let id3 = generator.next_id().unwrap();

    assert_eq!(id1.timestamp(), 42);
    assert_eq!(id2.timestamp(), 42);
    assert_eq!(id3.timestamp(), 42);
    assert_eq!(id1.sequence(), 0);
    assert_eq!(id2.sequence(), 1);
    assert_eq!(id3.sequence(), 2);
    assert!(id1 < id2 && id2 < id3);
}

#[test]
fn sequence_resets_when_clock_advances() {
    let generator = mock_generator(42);
    generator.next_id().unwrap();
    generator.next_id().unwrap();

    generator.time.set(50);
    let id = generator.next_id().unwrap();
    assert_eq!(id.timestamp(), 50);
    assert_eq!(id.sequence(), 0);
}

#[test]
fn packs_identity_and_offsets_epoch() {
    let config = GeneratorConfig::new(GeneratorIdentity::new(3, 7).unwrap())
        .with_epoch(1_000)
        .unwrap();
    let generator = IdGenerator::with_config(config, MockTime::new(1_042));

    let id = generator.next_id().unwrap();
    assert_eq!(id.to_raw(), (42 << 22) | (7 << 17) | (3 << 12));

    let parts = generator.decompose(id);
    assert_eq!(parts.timestamp_ms, 1_042);
    assert_eq!(parts.datacenter_id, 7);
    assert_eq!(parts.worker_id, 3);
    assert_eq!(parts.sequence, 0);
}

#[test]
fn spins_into_next_millisecond_when_sequence_exhausted() {
    // One read per call at 42 for 4097 calls, then the spin sees 43.
    let time = MockStepTime::new(iter::repeat_n(42, 4097).chain([43]));
    let generator = IdGenerator::with_config(config(1, 1), time);

    for i in 0..=MAX_SEQUENCE {
        let id = generator.next_id().unwrap();
        assert_eq!(id.timestamp(), 42);
        assert_eq!(id.sequence(), i);
    }

    let id = generator.next_id().unwrap();
    assert_eq!(id.timestamp(), 43);
    assert_eq!(id.sequence(), 0);

    let state = generator.state().unwrap();
    assert_eq!(state.last_timestamp(), Some(43));
    assert_eq!(state.sequence(), 0);
}

#[test]
fn spin_keeps_waiting_while_clock_is_stalled() {
    let time = MockStepTime::new(iter::repeat_n(42, 4097 + 500).chain([44]));
    let generator = IdGenerator::with_config(config(1, 1), time);

    for _ in 0..=MAX_SEQUENCE {
        generator.next_id().unwrap();
    }

    let id = generator.next_id().unwrap();
    assert_eq!(id.timestamp(), 44);
    assert_eq!(id.sequence(), 0);
}

#[test]
fn regression_during_spin_fails_without_reusing_sequence() {
    let time = MockStepTime::new(iter::repeat_n(42, 4097).chain([40, 42, 43]));
    let generator = IdGenerator::with_config(config(1, 1), time);

    for _ in 0..=MAX_SEQUENCE {
        generator.next_id().unwrap();
    }

    assert_eq!(
        generator.next_id(),
        Err(Error::ClockRegression { delta_ms: 2 })
    );

    // Still exhausted at 42: the next call must wait for 43, never reissue
    // sequence 1.
    let state = generator.state().unwrap();
    assert_eq!(state.last_timestamp(), Some(42));
    assert_eq!(u64::from(state.sequence()), MAX_SEQUENCE);

    let id = generator.next_id().unwrap();
    assert_eq!(id.timestamp(), 43);
    assert_eq!(id.sequence(), 0);
}

#[test]
fn clock_regression_is_reported_with_delta() {
    let generator = mock_generator(100);
    let issued = generator.next_id().unwrap();

    generator.time.set(90);
    let err = generator.next_id().unwrap_err();
    assert_eq!(err, Error::ClockRegression { delta_ms: 10 });
    assert_eq!(err.clock_regression(), Some(10));

    let state = generator.state().unwrap();
    assert_eq!(state.last_timestamp(), Some(100));
    assert_eq!(state.sequence(), 0);

    // Once the clock catches up issuance resumes in order.
    generator.time.set(100);
    let next = generator.next_id().unwrap();
    assert!(next > issued);
    assert_eq!(next.sequence(), 1);
}

#[test]
fn clock_before_epoch_is_a_regression() {
    let config = config(0, 0).with_epoch(1_000).unwrap();
    let generator = IdGenerator::with_config(config, MockTime::new(990));

    assert_eq!(
        generator.next_id(),
        Err(Error::ClockRegression { delta_ms: 10 })
    );
    assert_eq!(generator.state().unwrap().last_timestamp(), None);
}

#[test]
fn timestamp_past_41_bits_is_rejected() {
    let generator = mock_generator(TIMESTAMP_MASK);
    let last = generator.next_id().unwrap();
    assert_eq!(last.timestamp(), TIMESTAMP_MASK);

    generator.time.set(TIMESTAMP_MASK + 1);
    assert_eq!(
        generator.next_id(),
        Err(Error::TimestampOverflow {
            elapsed_ms: TIMESTAMP_MASK + 1
        })
    );
    assert_eq!(
        generator.try_poll_id(),
        Err(Error::TimestampOverflow {
            elapsed_ms: TIMESTAMP_MASK + 1
        })
    );

    let state = generator.state().unwrap();
    assert_eq!(state.last_timestamp(), Some(TIMESTAMP_MASK));
    assert_eq!(state.sequence(), 0);

    // Still the newest millisecond: keeps issuing in order, never wraps.
    generator.time.set(TIMESTAMP_MASK);
    let next = generator.next_id().unwrap();
    assert!(next > last);
    assert_eq!(next.sequence(), 1);
}

#[test]
fn timestamp_range_is_measured_from_the_epoch() {
    let config = config(0, 0).with_epoch(1_000).unwrap();
    let generator = IdGenerator::with_config(config, MockTime::new(1_000 + TIMESTAMP_MASK));
    assert_eq!(generator.next_id().unwrap().timestamp(), TIMESTAMP_MASK);

    generator.time.set(1_001 + TIMESTAMP_MASK);
    assert_eq!(
        generator.next_id(),
        Err(Error::TimestampOverflow {
            elapsed_ms: TIMESTAMP_MASK + 1
        })
    );
}

#[test]
fn spin_into_overflowed_millisecond_fails_without_committing() {
    let time =
        MockStepTime::new(iter::repeat_n(TIMESTAMP_MASK, 4097).chain([TIMESTAMP_MASK + 1]));
    let generator = IdGenerator::with_config(config(1, 1), time);

    for _ in 0..=MAX_SEQUENCE {
        generator.next_id().unwrap();
    }

    assert_eq!(
        generator.next_id(),
        Err(Error::TimestampOverflow {
            elapsed_ms: TIMESTAMP_MASK + 1
        })
    );
    let state = generator.state().unwrap();
    assert_eq!(state.last_timestamp(), Some(TIMESTAMP_MASK));
    assert_eq!(u64::from(state.sequence()), MAX_SEQUENCE);
}

#[cfg(not(feature = "parking-lot"))]
#[test]
fn panic_inside_the_lock_poisons_the_generator() {
    let generator = IdGenerator::with_config(
        config(1, 1),
        PanicOnceTime {
            armed: AtomicBool::new(true),
        },
    );

    let result = panic::catch_unwind(panic::AssertUnwindSafe(|| generator.next_id()));
    assert!(result.is_err());

    assert_eq!(generator.next_id(), Err(Error::LockPoisoned));
    assert_eq!(generator.try_poll_id(), Err(Error::LockPoisoned));
    assert_eq!(generator.state(), Err(Error::LockPoisoned));
}

#[test]
fn poll_returns_pending_when_sequence_exhausted() {
    let generator = mock_generator(42);

    for i in 0..=MAX_SEQUENCE {
        let id = generator.try_poll_id().unwrap().ready().unwrap();
        assert_eq!(id.sequence(), i);
    }

    assert_eq!(
        generator.try_poll_id().unwrap(),
        IdGenStatus::Pending { yield_until: 43 }
    );
    assert_eq!(
        generator.try_poll_id().unwrap(),
        IdGenStatus::Pending { yield_until: 43 }
    );

    generator.time.set(43);
    match generator.try_poll_id().unwrap() {
        IdGenStatus::Ready { id } => {
            assert_eq!(id.timestamp(), 43);
            assert_eq!(id.sequence(), 0);
        }
        IdGenStatus::Pending { yield_until } => {
            panic!("unexpected pending (yield until: {yield_until})")
        }
    }
}

#[test]
fn poll_reports_clock_regression() {
    let generator = mock_generator(42);
    generator.try_poll_id().unwrap();

    generator.time.set(30);
    assert_eq!(
        generator.try_poll_id(),
        Err(Error::ClockRegression { delta_ms: 12 })
    );
}

#[test]
fn initial_sequence_is_replaced_on_first_issuance() {
    let config = config(1, 1).with_initial_sequence(4000).unwrap();
    let generator = IdGenerator::with_config(config, MockTime::new(7));

    let state = generator.state().unwrap();
    assert_eq!(state.last_timestamp(), None);
    assert_eq!(state.sequence(), 4000);

    let id = generator.next_id().unwrap();
    assert_eq!(id.sequence(), 0);
}

#[test]
fn constructor_validates_identity() {
    assert!(matches!(
        IdGenerator::new(32, 0, 0),
        Err(ConfigError::WorkerIdOutOfRange { value: 32, .. })
    ));
    assert!(matches!(
        IdGenerator::new(0, -1, 0),
        Err(ConfigError::DatacenterIdOutOfRange { value: -1, .. })
    ));
    assert!(matches!(
        IdGenerator::new(0, 0, 4096),
        Err(ConfigError::SequenceOutOfRange { value: 4096, .. })
    ));

    let generator = IdGenerator::new(31, 31, 0).unwrap();
    assert_eq!(generator.identity().worker_id(), 31);
    assert_eq!(generator.identity().datacenter_id(), 31);
}

#[test]
fn system_clock_ids_round_trip_identity() {
    let before = SystemClock.current_millis();
    let generator = IdGenerator::from_identity(GeneratorIdentity::new(5, 9).unwrap());

    for _ in 0..10_000 {
        let id = generator.next_id().unwrap();
        let parts = generator.decompose(id);
        assert_eq!(parts.worker_id, 5);
        assert_eq!(parts.datacenter_id, 9);
        assert!(parts.timestamp_ms >= before);
        assert!(id.is_valid());
        assert!(id.to_i64().is_some());
    }
}

#[test]
fn system_clock_ids_are_monotonic() {
    const TOTAL_IDS: usize = 4096 * 64;

    let generator = IdGenerator::new(1, 1, 0).unwrap();
    let mut last = generator.next_id().unwrap();

    for _ in 0..TOTAL_IDS {
        let id = generator.next_id().unwrap();
        assert!(id > last, "{id:?} is not after {last:?}");
        if id.timestamp() == last.timestamp() {
            assert_eq!(id.sequence(), last.sequence() + 1);
        } else {
            assert_eq!(id.sequence(), 0);
        }
        last = id;
    }
}

#[test]
fn system_clock_ids_are_unique_across_threads() {
    const THREADS: usize = 8;
    const IDS_PER_THREAD: usize = 4096 * 16;

    let generator = IdGenerator::new(2, 3, 0).unwrap();
    let seen_ids = Mutex::new(HashSet::with_capacity(THREADS * IDS_PER_THREAD));

    scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                let mut local = Vec::with_capacity(IDS_PER_THREAD);
                let mut last = None;
                for _ in 0..IDS_PER_THREAD {
                    let id = generator.next_id().unwrap();
                    // Calls from one thread are sequenced, so they still
                    // increase even when interleaved with other threads.
                    assert!(last < Some(id));
                    last = Some(id);
                    local.push(id);
                }
                seen_ids.lock().unwrap().extend(local);
            });
        }
    });

    assert_eq!(seen_ids.lock().unwrap().len(), THREADS * IDS_PER_THREAD);
}

#[test]
fn generators_with_different_identities_never_collide() {
    let time = MockTime::new(42);
    let a = IdGenerator::with_config(config(0, 0), &time);
    let b = IdGenerator::with_config(config(1, 0), &time);
    let c = IdGenerator::with_config(config(0, 1), &time);

    let mut seen = HashSet::new();
    for _ in 0..=MAX_SEQUENCE {
        assert!(seen.insert(a.next_id().unwrap()));
        assert!(seen.insert(b.next_id().unwrap()));
        assert!(seen.insert(c.next_id().unwrap()));
    }
}
