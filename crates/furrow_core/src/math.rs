//! Deterministic math utilities
//!
//! Re-exports glam with a portable seeded random number generator. The
//! generator is pure integer arithmetic so a seed reproduces the same
//! sequence on every platform.

pub use glam::*;

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// Seeded xorshift64* generator.
///
/// Only the seed is meant to be persisted; the internal state is rebuilt
/// from it with [`DeterministicRng::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterministicRng {
    seed: i64,
    state: u64,
}

impl DeterministicRng {
    pub fn new(seed: i64) -> Self {
        let mut state = splitmix64(seed as u64);
        if state == 0 {
            // xorshift never leaves the all-zero state
            state = GOLDEN_GAMMA;
        }
        Self { seed, state }
    }

    /// Seed this generator was created from.
    pub fn seed(&self) -> i64 {
        self.seed
    }

    /// Rewind to the first value of the sequence.
    pub fn reset(&mut self) {
        *self = Self::new(self.seed);
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    pub fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Uniform float in `[0, 1)` built from the top 24 bits.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Uniform integer in the inclusive range `[min, max]`.
    ///
    /// Always consumes exactly one value from the sequence, even when the
    /// range holds a single integer.
    pub fn generate_in_range(&mut self, min: i32, max: i32) -> i32 {
        let sample = self.next_u32() as u64;
        if max <= min {
            return min;
        }
        let span = (max as i64 - min as i64 + 1) as u64;
        (min as i64 + ((sample * span) >> 32) as i64) as i32
    }

    /// Uniform index into a slice of `len` elements.
    pub fn pick_index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.generate_in_range(0, len as i32 - 1) as usize)
    }
}

fn splitmix64(value: u64) -> u64 {
    let mut z = value.wrapping_add(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Rotate `point` around `pivot` by `degrees`.
pub fn rotate_around(point: Vec2, pivot: Vec2, degrees: f32) -> Vec2 {
    let (sin, cos) = degrees.to_radians().sin_cos();
    let d = point - pivot;
    Vec2::new(d.x * cos - d.y * sin, d.x * sin + d.y * cos) + pivot
}
