//! Inter-arrival and service time distributions.

use rand::Rng;

use crate::{error::ConfigError, time::Delta};

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    /// Memoryless times with the given mean.
    Exponential { mean: f64 },
    /// Times drawn uniformly from `[low, high)`.
    Uniform { low: f64, high: f64 },
    /// A constant time.
    Deterministic { value: f64 },
}

impl Distribution {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Delta {
        let value = match *self {
            Distribution::Exponential { mean } => {
                // Inverse transform on (0, 1]; avoids ln(0)
                let u: f64 = rng.gen();
                let u = (1.0 - u).max(1e-12);
                -mean * u.ln()
            }
            Distribution::Uniform { low, high } => low + (high - low) * rng.gen::<f64>(),
            Distribution::Deterministic { value } => value,
        };
        Delta::new(value)
    }

    pub(crate) fn validate(&self, what: &'static str) -> Result<(), ConfigError> {
        let ok = match *self {
            Distribution::Exponential { mean } => mean.is_finite() && mean > 0.0,
            Distribution::Uniform { low, high } => {
                low.is_finite() && high.is_finite() && 0.0 <= low && low < high
            }
            Distribution::Deterministic { value } => value.is_finite() && value > 0.0,
        };
        if ok {
            Ok(())
        } else {
            Err(ConfigError::InvalidDistribution {
                what,
                distribution: *self,
            })
        }
    }
}
