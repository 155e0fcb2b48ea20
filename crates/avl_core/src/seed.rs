//! Deterministic random number generation utilities.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// A seed for deterministic random number generation.
///
/// Every random choice in the workspace (class order shuffling, online
/// splitting, replay sampling, loader shuffling) draws from an RNG built from
/// an explicit `Seed`, so two constructions with the same seed produce the
/// same result regardless of call order.
///
/// # Example
///
/// ```rust
/// use avl_core::Seed;
///
/// let a = Seed::new(42).permutation(10);
/// let b = Seed::new(42).permutation(10);
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seed(u64);

impl Seed {
    /// Create a new seed with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Create a seed from the current system time.
    ///
    /// Used when shuffling is requested without a seed; the resulting choice
    /// is still recoverable through reproducibility data.
    #[must_use]
    pub fn from_entropy() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Self(nanos)
    }

    /// Get the underlying seed value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Create a new random number generator from this seed.
    #[must_use]
    pub fn to_rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.0)
    }

    /// Derive an independent seed from this seed and a key.
    ///
    /// ```rust
    /// use avl_core::Seed;
    ///
    /// let master = Seed::new(42);
    /// assert_ne!(master.derive("exp0"), master.derive("exp1"));
    /// assert_eq!(master.derive("exp0"), master.derive("exp0"));
    /// ```
    #[must_use]
    pub fn derive(&self, key: &str) -> Self {
        // FNV-1a over the seed bytes and the key; stable across releases,
        // unlike `DefaultHasher`.
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in self.0.to_le_bytes().iter().chain(key.as_bytes()) {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Self(hash)
    }

    /// A uniformly random permutation of `0..n`.
    #[must_use]
    pub fn permutation(&self, n: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(&mut self.to_rng());
        indices
    }

    /// Shuffle a slice in place with an RNG built from this seed.
    pub fn shuffle<T>(&self, values: &mut [T]) {
        values.shuffle(&mut self.to_rng());
    }
}

impl Default for Seed {
    fn default() -> Self {
        Self::new(0)
    }
}

impl From<u64> for Seed {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl From<Seed> for u64 {
    fn from(seed: Seed) -> Self {
        seed.0
    }
}
