//! Noise Source
//!
//! Every random draw the simulation makes goes through [`Noise`]. Normal
//! deviates come from a Box-Muller transform over the uniform source so the
//! only primitive the engine depends on is `[0, 1)` uniform sampling.
//! `rand_distr::Normal` is not used: a zero uniform draw has to be
//! resampled here, which that sampler does not expose.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;

/// Shared random source for one engine.
pub struct Noise {
    rng: StdRng,
}

impl Noise {
    /// Seed from the operating system.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic source for tests and reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Normal deviate with the given mean and standard deviation.
    pub fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        // ln(0) is undefined, so a zero draw is thrown away and resampled.
        let mut u1 = self.rng.random::<f64>();
        while u1 == 0.0 {
            u1 = self.rng.random::<f64>();
        }
        let u2 = self.rng.random::<f64>();
        let z = (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos();
        mean + z * std_dev
    }

    /// Uniform real in `[low, high)`.
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + self.rng.random::<f64>() * (high - low)
    }

    /// Bernoulli trial. Probabilities outside `[0, 1]` are clamped.
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.random_bool(p.clamp(0.0, 1.0))
    }

    /// Uniform integer in `[low, high]`.
    pub fn int(&mut self, low: i64, high: i64) -> i64 {
        self.rng.random_range(low..=high)
    }

    /// Draw one symbol from a categorical distribution given as
    /// `(symbol, weight)` pairs. Weights need not be normalized.
    pub fn pick<T: Copy>(&mut self, weights: &[(T, f64)]) -> T {
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        let mut roll = self.uniform(0.0, total);
        for &(symbol, weight) in weights {
            if roll < weight {
                return symbol;
            }
            roll -= weight;
        }
        // Float rounding can leave a sliver past the last bucket.
        weights[weights.len() - 1].0
    }
}

impl Default for Noise {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Round to `places` decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
