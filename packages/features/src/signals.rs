//! Synthetic incident signals for training data.
//!
//! Live inference never draws these; callers pass the real values (or
//! zero) through [`IncidentSignals`] instead.

use rand::Rng;
use rand_distr::{Distribution as _, Poisson};
use serde::{Deserialize, Serialize};

use crate::FeatureError;

/// Prior-incident count and SOS flag attached to a feature vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentSignals {
    /// Number of prior incidents on record.
    pub prior_incidents_count: u32,
    /// Whether an SOS is active.
    pub sos_flag: bool,
}

/// Rates for [`SyntheticSignals`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticSignalConfig {
    /// Poisson rate of prior incidents per sample. Default `0.1`.
    pub prior_incident_rate: f64,
    /// Per-sample SOS probability. Default `0.001`.
    pub sos_probability: f64,
}

impl Default for SyntheticSignalConfig {
    fn default() -> Self {
        Self {
            prior_incident_rate: 0.1,
            sos_probability: 0.001,
        }
    }
}

/// Draws [`IncidentSignals`] from a low-rate Poisson/Bernoulli process.
#[derive(Debug, Clone)]
pub struct SyntheticSignals {
    prior_incidents: Option<Poisson<f64>>,
    sos_probability: f64,
}

impl SyntheticSignals {
    /// Validates `config` and prepares the distributions.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureError::Config`] if the rate is negative (however
    /// small) or not finite, or the SOS probability lies outside `[0, 1]`.
    pub fn new(config: SyntheticSignalConfig) -> Result<Self, FeatureError> {
        if !(0.0..=1.0).contains(&config.sos_probability) {
            return Err(FeatureError::Config {
                message: format!(
                    "sos_probability must be in [0, 1], got {}",
                    config.sos_probability
                ),
            });
        }

        let rate = config.prior_incident_rate;
        if !(rate.is_finite() && rate >= 0.0) {
            return Err(FeatureError::Config {
                message: format!("prior_incident_rate must be finite and >= 0, got {rate}"),
            });
        }
        let prior_incidents = if rate > 0.0 {
            Some(Poisson::new(rate).map_err(|e| FeatureError::Config {
                message: format!("invalid prior_incident_rate {rate}: {e}"),
            })?)
        } else {
            None
        };

        Ok(Self {
            prior_incidents,
            sos_probability: config.sos_probability,
        })
    }

    /// Draws the prior-incident count, then the SOS flag.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> IncidentSignals {
        let prior_incidents_count = self
            .prior_incidents
            .as_ref()
            .map_or(0, |poisson| {
                let count: f64 = poisson.sample(rng);
                count as u32
            });
        let sos_flag = rng.gen_bool(self.sos_probability);

        IncidentSignals {
            prior_incidents_count,
            sos_flag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng as _;
    use rand::rngs::StdRng;

    #[test]
    fn default_rates_are_low() {
        let signals = SyntheticSignals::new(SyntheticSignalConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);

        let draws: Vec<_> = (0..10_000).map(|_| signals.draw(&mut rng)).collect();
        let total: u32 = draws.iter().map(|s| s.prior_incidents_count).sum();
        let sos = draws.iter().filter(|s| s.sos_flag).count();

        let mean = f64::from(total) / 10_000.0;
        assert!((mean - 0.1).abs() < 0.02, "mean prior incidents {mean}");
        assert!(sos < 40, "{sos} SOS draws");
    }

    #[test]
    fn zero_rates_never_fire() {
        let signals = SyntheticSignals::new(SyntheticSignalConfig {
            prior_incident_rate: 0.0,
            sos_probability: 0.0,
        })
        .unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..1000 {
            assert_eq!(signals.draw(&mut rng), IncidentSignals::default());
        }
    }

    #[test]
    fn rejects_invalid_rates() {
        assert!(
            SyntheticSignals::new(SyntheticSignalConfig {
                prior_incident_rate: -1.0,
                ..SyntheticSignalConfig::default()
            })
            .is_err()
        );
        assert!(
            SyntheticSignals::new(SyntheticSignalConfig {
                sos_probability: 2.0,
                ..SyntheticSignalConfig::default()
            })
            .is_err()
        );
    }

    #[test]
    fn rejects_tiny_negative_rate() {
        for rate in [-1e-20, -f64::EPSILON / 2.0, f64::NAN] {
            let result = SyntheticSignals::new(SyntheticSignalConfig {
                prior_incident_rate: rate,
                ..SyntheticSignalConfig::default()
            });
            assert!(
                matches!(result, Err(FeatureError::Config { .. })),
                "rate {rate} accepted"
            );
        }
    }
}
