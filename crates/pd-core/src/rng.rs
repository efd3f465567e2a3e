//! Seeded randomness for agents and the in-memory world.
//!
//! An agent's stream depends only on the run seed and its id, folded with
//! FNV-1a (stable across platforms, unlike `DefaultHasher`) and spread by
//! the golden-ratio constant.  Two agents in the same run therefore jitter
//! their announcements differently, and a rerun with the same seed repeats
//! them exactly.

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::AgentId;

const GOLDEN: u64 = 0x9e37_79b9_7f4a_7c15;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0xcbf2_9ce4_8422_2325, |h, &b| (h ^ b as u64).wrapping_mul(0x0100_0000_01b3))
}

/// Randomness owned by one agent's negotiator.
pub struct AgentRng(SmallRng);

impl AgentRng {
    pub fn new(run_seed: u64, agent: &AgentId) -> Self {
        let salt = fnv1a(agent.as_str().as_bytes()).wrapping_mul(GOLDEN);
        AgentRng(SmallRng::seed_from_u64(run_seed ^ salt))
    }

    /// Uniform delay in `[min_ms, max_ms]`, or `min_ms` for an empty range.
    pub fn jitter_ms(&mut self, min_ms: u64, max_ms: u64) -> u64 {
        if max_ms <= min_ms {
            return min_ms;
        }
        self.0.gen_range(min_ms..=max_ms)
    }
}

/// Randomness of the in-memory world: where parcels appear and what they
/// are worth.
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    pub fn gen_range<T: SampleUniform, R: SampleRange<T>>(&mut self, range: R) -> T {
        self.0.gen_range(range)
    }

    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.0)
    }
}
