//! Deterministic RNG helpers.
//!
//! This is intentionally small and dependency-free. It is **not** cryptographic.

use crate::FP;

pub trait DeterministicRng {
    fn next_u64(&mut self) -> u64;

    fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    fn next_bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }

    /// Uniform integer in `[min, max)`. Returns `min` for an empty range.
    fn next_range_i32(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = (max as i64 - min as i64) as u64;
        (min as i64 + (self.next_u64() % span) as i64) as i32
    }

    /// Uniform fixed-point value in `[0, 1)`.
    fn next_fp_unit(&mut self) -> FP {
        FP::from_raw((self.next_u64() >> (64 - FP::FRACTIONAL_BITS)) as i64)
    }

    /// Uniform fixed-point value in `[min, max)`. Returns `min` for an empty range.
    fn next_fp(&mut self, min: FP, max: FP) -> FP {
        if max <= min {
            return min;
        }
        let span = (max.raw() as i128 - min.raw() as i128) as u128;
        let offset = (self.next_u64() as u128 % span) as i128;
        FP::from_raw((min.raw() as i128 + offset) as i64)
    }
}

/// SplitMix64: good seeding RNG and small deterministic generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn step(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E3779B97F4A7C15);
        mix64(self.state)
    }
}

impl DeterministicRng for SplitMix64 {
    fn next_u64(&mut self) -> u64 {
        self.step()
    }
}

pub fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xBF58476D1CE4E5B9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94D049BB133111EB);
    x ^ (x >> 31)
}

pub fn derive_seed(global_seed: u64, agent_id: u64, stream: u64) -> u64 {
    let x = global_seed ^ mix64(agent_id.wrapping_add(0x9E3779B97F4A7C15)) ^ mix64(stream);
    mix64(x)
}
