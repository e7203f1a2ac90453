//! Seeded, context-scoped deterministic randomness.
//!
//! Every draw names a context label. Each label owns an independent
//! ChaCha8 stream whose seed is derived from `SHA-256(seed || 0x00 || label)`,
//! so unrelated features never perturb each other's sequences and results
//! are identical across platforms and runs.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Deterministic random source owned by one session.
#[derive(Clone, Debug)]
pub struct RngService {
    seed: String,
    streams: BTreeMap<String, ChaCha8Rng>,
}

impl RngService {
    /// Create a service for the given session seed.
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            streams: BTreeMap::new(),
        }
    }

    /// Session seed.
    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Drop every advanced stream; the next draw on any context restarts it.
    pub fn reset(&mut self) {
        self.streams.clear();
    }

    /// A fresh stream for `context` that is not stored. Forking the same
    /// context twice yields identical sequences.
    pub fn fork(&self, context: &str) -> ChaCha8Rng {
        ChaCha8Rng::from_seed(derive_stream_seed(&self.seed, context))
    }

    fn stream(&mut self, context: &str) -> &mut ChaCha8Rng {
        let seed = &self.seed;
        self.streams
            .entry(context.to_string())
            .or_insert_with(|| ChaCha8Rng::from_seed(derive_stream_seed(seed, context)))
    }

    /// Uniform float in `[0, 1)`.
    pub fn random(&mut self, context: &str) -> f64 {
        self.stream(context).gen::<f64>()
    }

    /// Uniform float in `[lo, hi)`. Returns `lo` when the range is empty.
    pub fn uniform(&mut self, context: &str, lo: f64, hi: f64) -> f64 {
        let u = self.random(context);
        if hi <= lo {
            return lo;
        }
        lo + (hi - lo) * u
    }

    /// Uniform integer in `[lo, hi]` inclusive. Returns `lo` when `hi < lo`.
    pub fn randint(&mut self, context: &str, lo: i64, hi: i64) -> i64 {
        let rng = self.stream(context);
        if hi < lo {
            return lo;
        }
        rng.gen_range(lo..=hi)
    }

    /// Pick one element of `items`, or `None` for an empty slice.
    pub fn choice<'a, T>(&mut self, context: &str, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.stream(context).gen_range(0..items.len());
        items.get(idx)
    }
}

fn derive_stream_seed(seed: &str, context: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update([0u8]);
    hasher.update(context.as_bytes());
    hasher.finalize().into()
}
