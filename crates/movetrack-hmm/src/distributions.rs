//! State-dependent observation distributions
//!
//! Step lengths follow a gamma distribution parametrised by mean and standard
//! deviation, optionally inflated with a point mass at zero. Turning angles
//! follow a von Mises distribution on `[-π, π)`. A missing observation
//! contributes a density of one.

use movetrack_core::math::circular::wrap_angle;
use movetrack_core::math::distributions::{gamma_ln_pdf, gamma_shape_rate, von_mises_ln_pdf};
use movetrack_core::{Error, Result};
use rand::Rng;
use rand_distr::{Distribution, Gamma};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Gamma step-length distribution with optional zero mass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepDistribution {
    /// Mean step length in metres
    pub mean: f64,
    /// Standard deviation of the step length in metres
    pub sd: f64,
    /// Probability of a zero-length step, when zero-inflated
    pub zero_mass: Option<f64>,
}

impl StepDistribution {
    pub fn gamma(mean: f64, sd: f64) -> Self {
        Self {
            mean,
            sd,
            zero_mass: None,
        }
    }

    pub fn zero_inflated(mean: f64, sd: f64, zero_mass: f64) -> Self {
        Self {
            mean,
            sd,
            zero_mass: Some(zero_mass),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.mean > 0.0) || !self.mean.is_finite() {
            return Err(Error::not_positive("step mean", self.mean));
        }
        if !(self.sd > 0.0) || !self.sd.is_finite() {
            return Err(Error::not_positive("step sd", self.sd));
        }
        if let Some(z) = self.zero_mass {
            if !(z > 0.0 && z < 1.0) {
                return Err(Error::InvalidParameter(format!(
                    "zero mass must lie strictly between 0 and 1, got {z}"
                )));
            }
        }
        Ok(())
    }

    /// Log-density of a step length; `None` (missing) has density one
    pub fn ln_density(&self, step: Option<f64>) -> f64 {
        let Some(x) = step else {
            return 0.0;
        };
        let (shape, rate) = gamma_shape_rate(self.mean, self.sd);
        match self.zero_mass {
            Some(z) if x == 0.0 => z.ln(),
            Some(z) => (1.0 - z).ln() + gamma_ln_pdf(x, shape, rate),
            None if x == 0.0 => f64::NEG_INFINITY,
            None => gamma_ln_pdf(x, shape, rate),
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64> {
        if let Some(z) = self.zero_mass {
            if rng.gen::<f64>() < z {
                return Ok(0.0);
            }
        }
        let (shape, rate) = gamma_shape_rate(self.mean, self.sd);
        let gamma = Gamma::new(shape, 1.0 / rate)
            .map_err(|e| Error::InvalidParameter(format!("gamma step distribution: {e}")))?;
        Ok(gamma.sample(rng))
    }
}

impl fmt::Display for StepDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gamma(mean = {:.3}, sd = {:.3}", self.mean, self.sd)?;
        if let Some(z) = self.zero_mass {
            write!(f, ", zero mass = {z:.4}")?;
        }
        write!(f, ")")
    }
}

/// Von Mises turning-angle distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleDistribution {
    /// Mean direction in radians
    pub mean: f64,
    /// Concentration, zero for a uniform angle
    pub concentration: f64,
}

impl AngleDistribution {
    pub fn von_mises(mean: f64, concentration: f64) -> Self {
        Self {
            mean,
            concentration,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.mean.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "angle mean must be finite, got {}",
                self.mean
            )));
        }
        if !(self.concentration >= 0.0) || !self.concentration.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "angle concentration must be non-negative, got {}",
                self.concentration
            )));
        }
        Ok(())
    }

    pub fn ln_density(&self, angle: Option<f64>) -> f64 {
        match angle {
            Some(a) => von_mises_ln_pdf(a, self.mean, self.concentration),
            None => 0.0,
        }
    }

    /// Draw an angle with the Best & Fisher (1979) rejection sampler
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let kappa = self.concentration;
        if kappa < 1e-8 {
            return rng.gen_range(-PI..PI);
        }
        let tau = 1.0 + (1.0 + 4.0 * kappa * kappa).sqrt();
        let rho = (tau - (2.0 * tau).sqrt()) / (2.0 * kappa);
        let r = (1.0 + rho * rho) / (2.0 * rho);

        loop {
            let u1: f64 = rng.gen();
            let z = (PI * u1).cos();
            let f = (1.0 + r * z) / (r + z);
            let c = kappa * (r - f);
            let u2: f64 = rng.gen();
            if c * (2.0 - c) > u2 || (c / u2).ln() + 1.0 >= c {
                let u3: f64 = rng.gen();
                let theta = if u3 > 0.5 { f.acos() } else { -f.acos() };
                return wrap_angle(self.mean + theta);
            }
        }
    }
}

impl fmt::Display for AngleDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "von Mises(mean = {:.3}, concentration = {:.3})",
            self.mean, self.concentration
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use movetrack_core::math::circular::{circular_mean, mean_resultant_length};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_missing_observations_have_unit_density() {
        let step = StepDistribution::gamma(100.0, 50.0);
        let angle = AngleDistribution::von_mises(0.0, 2.0);
        assert_eq!(step.ln_density(None), 0.0);
        assert_eq!(angle.ln_density(None), 0.0);
    }

    #[test]
    fn test_zero_steps() {
        let plain = StepDistribution::gamma(100.0, 50.0);
        assert_eq!(plain.ln_density(Some(0.0)), f64::NEG_INFINITY);

        let inflated = StepDistribution::zero_inflated(100.0, 50.0, 0.1);
        assert_abs_diff_eq!(inflated.ln_density(Some(0.0)), 0.1f64.ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(
            inflated.ln_density(Some(80.0)),
            0.9f64.ln() + plain.ln_density(Some(80.0)),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_exponential_special_case() {
        // mean == sd gives shape 1, an exponential with rate 1 / mean
        let step = StepDistribution::gamma(2.0, 2.0);
        assert_abs_diff_eq!(step.ln_density(Some(3.0)), (0.5f64).ln() - 1.5, epsilon = 1e-10);
    }

    #[test]
    fn test_validation() {
        assert!(StepDistribution::gamma(-1.0, 1.0).validate().is_err());
        assert!(StepDistribution::gamma(1.0, 0.0).validate().is_err());
        assert!(StepDistribution::zero_inflated(1.0, 1.0, 1.0).validate().is_err());
        assert!(AngleDistribution::von_mises(0.0, -0.5).validate().is_err());
        assert!(AngleDistribution::von_mises(0.0, 0.0).validate().is_ok());
    }

    #[test]
    fn test_samples_match_moments() {
        let mut rng = StdRng::seed_from_u64(42);
        let step = StepDistribution::gamma(200.0, 80.0);
        let draws: Vec<f64> = (0..20_000).map(|_| step.sample(&mut rng).unwrap()).collect();
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        assert!((mean - 200.0).abs() < 5.0, "sample mean {mean}");

        let angle = AngleDistribution::von_mises(1.0, 4.0);
        let draws: Vec<f64> = (0..20_000).map(|_| angle.sample(&mut rng)).collect();
        assert!(draws.iter().all(|a| (-PI..PI).contains(a)));
        assert_abs_diff_eq!(circular_mean(&draws).unwrap(), 1.0, epsilon = 0.05);
        // A(4) = I1(4) / I0(4) ≈ 0.8635
        assert_abs_diff_eq!(mean_resultant_length(&draws), 0.8635, epsilon = 0.02);
    }
}
