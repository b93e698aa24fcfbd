use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::error::{Error, Result};
use crate::models::JitterConfig;

/// Source of the bounded noise mixed into every simulated metric.
pub trait JitterSource {
    /// Next sample in `[0, 1)`.
    fn unit(&mut self) -> f64;

    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + self.unit() * (high - low)
    }
}

/// Adapts any `rand` generator.
pub struct RngJitter<R>(pub R);

impl<R: RngCore> JitterSource for RngJitter<R> {
    fn unit(&mut self) -> f64 {
        self.0.gen::<f64>()
    }
}

/// Always returns the same position inside every jitter band.
#[derive(Clone, Copy, Debug)]
pub struct ConstantJitter(f64);

impl ConstantJitter {
    pub fn zero() -> Self {
        Self(0.0)
    }

    pub fn max() -> Self {
        Self(1.0 - f64::EPSILON)
    }
}

impl JitterSource for ConstantJitter {
    fn unit(&mut self) -> f64 {
        self.0
    }
}

pub fn build_jitter(config: JitterConfig, seed: Option<u64>) -> Result<Box<dyn JitterSource>> {
    match config {
        JitterConfig::Entropy => Ok(Box::new(RngJitter(StdRng::from_entropy()))),
        JitterConfig::Seeded => {
            let seed = seed.ok_or(Error::InvalidJitterSeed)?;
            Ok(Box::new(RngJitter(StdRng::seed_from_u64(seed))))
        }
        JitterConfig::Zero => Ok(Box::new(ConstantJitter::zero())),
    }
}
