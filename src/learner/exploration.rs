//! Injectable randomness for the explore/exploit decision
//!
//! The exploration branch is the only nondeterministic part of the
//! pipeline, so its random draws flow through a trait object. Tests
//! inject a seeded generator and exercise both branches deterministically.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Source of uniform draws in [0, 1)
pub trait RandomSource: Send {
    fn next_f64(&mut self) -> f64;
}

impl<R: RngCore + Send> RandomSource for R {
    fn next_f64(&mut self) -> f64 {
        self.gen()
    }
}

/// Entropy-seeded default source
pub fn default_source() -> Box<dyn RandomSource> {
    Box::new(StdRng::from_entropy())
}

/// Deterministic source for tests and replay
pub fn seeded_source(seed: u64) -> Box<dyn RandomSource> {
    Box::new(StdRng::seed_from_u64(seed))
}
