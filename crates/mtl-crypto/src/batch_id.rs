use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use mtl_types::BatchId;

/// Prefix of every generated batch identifier.
pub const BATCH_ID_PREFIX: &str = "BATCH";

/// Length of the random suffix. 36^9 values per millisecond.
pub const RANDOM_SUFFIX_LEN: usize = 9;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Millisecond time source for identifier generation.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Manually driven clock for deterministic tests.
#[derive(Debug, Default)]
pub struct FixedClock {
    millis: AtomicU64,
}

impl FixedClock {
    pub fn new(millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
        }
    }

    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now_millis(&self) -> u64 {
        (**self).now_millis()
    }
}

/// Client-side batch identifier generator.
///
/// Identifiers have the form `BATCH_<millis>_<suffix>`, where `suffix` is
/// [`RANDOM_SUFFIX_LEN`] lowercase base-36 characters. The timestamp
/// component never decreases across calls, even if the clock steps back.
///
/// Uniqueness is probabilistic and not coordinated with the ledger: a
/// collision surfaces as a duplicate-batch rejection at creation time.
pub struct BatchIdGenerator<C: Clock = SystemClock, R: Rng = StdRng> {
    clock: C,
    rng: R,
    last_millis: u64,
}

impl BatchIdGenerator<SystemClock, StdRng> {
    /// Generator backed by the wall clock and an entropy-seeded RNG.
    pub fn system() -> Self {
        Self::new(SystemClock, StdRng::from_entropy())
    }
}

impl Default for BatchIdGenerator<SystemClock, StdRng> {
    fn default() -> Self {
        Self::system()
    }
}

impl<C: Clock, R: Rng> BatchIdGenerator<C, R> {
    pub fn new(clock: C, rng: R) -> Self {
        Self {
            clock,
            rng,
            last_millis: 0,
        }
    }

    /// Generate a fresh batch identifier.
    pub fn new_batch_id(&mut self) -> BatchId {
        let millis = self.clock.now_millis().max(self.last_millis);
        self.last_millis = millis;

        let suffix: String = (0..RANDOM_SUFFIX_LEN)
            .map(|_| BASE36[self.rng.gen_range(0..BASE36.len())] as char)
            .collect();

        // Prefix and suffix are never empty, so construction cannot fail.
        match BatchId::new(format!("{BATCH_ID_PREFIX}_{millis}_{suffix}")) {
            Ok(id) => id,
            Err(_) => unreachable!("generated batch ids are non-empty"),
        }
    }
}
