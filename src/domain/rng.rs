//! Replay-safe randomness.
//!
//! Nothing in the simulation keeps a random stream in the document. Every draw
//! is a pure function of the lobby seed and a tick-derived key, so any peer that
//! becomes host reproduces the same hazards from the same state.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

/// Uniform floats keyed by `(seed, tick_id)`. Implementations must be pure.
pub trait ReplayRng {
    fn next_float(&self, seed: u32, tick_id: i64) -> f64;
}

/// `|sin((seed + tick_id) * 1337.77)|`.
///
/// Skewed towards 1 compared to a uniform draw; the hazard thresholds are tuned
/// against this shape, so event picks keep using it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SineHash;

impl ReplayRng for SineHash {
    fn next_float(&self, seed: u32, tick_id: i64) -> f64 {
        let bucket = f64::from(seed) + tick_id as f64;
        (bucket * 1337.77).sin().abs()
    }
}

/// PCG stream seeded from the key; one draw per key, uniform in [0,1).
#[derive(Debug, Clone, Copy, Default)]
pub struct PcgStream;

impl ReplayRng for PcgStream {
    fn next_float(&self, seed: u32, tick_id: i64) -> f64 {
        let key = (u64::from(seed) << 32) ^ (tick_id as u64);
        let mut rng = Pcg32::seed_from_u64(key);
        rng.random::<f64>()
    }
}
