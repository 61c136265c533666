//! Continuous-time autocorrelated Gaussian segments
//!
//! Within a homogeneous segment the response is a stationary Gaussian
//! process with mean μ, standard deviation σ and autocorrelation ρ per unit
//! time, so that given `x[i-1]` the next value is normal with mean
//! `μ + ρ^dt (x[i-1] - μ)` and standard deviation `σ sqrt(1 - ρ^(2 dt))`.
//! μ and σ are the sample moments of the segment; ρ maximises the
//! conditional likelihood on `(0, 1)`.

use movetrack_core::math::distributions::normal_ln_pdf;
use movetrack_core::math::statistics::{mean, sample_std_dev};
use movetrack_core::optimize::golden_section;
use movetrack_core::{Error, Result};
use serde::Serialize;
use std::fmt;

/// Fewest observations a segment may hold
pub const MIN_SEGMENT: usize = 3;

const RHO_MARGIN: f64 = 1e-6;
const RHO_TOLERANCE: f64 = 1e-6;
const SD_FLOOR: f64 = 1e-10;

/// Mean, standard deviation and autocorrelation of a segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SegmentEstimate {
    pub mean: f64,
    pub sd: f64,
    pub rho: f64,
    /// Observations in the segment
    pub n: usize,
}

impl SegmentEstimate {
    /// Characteristic time `-1 / ln ρ`, in the time unit of the series
    pub fn tau(&self) -> f64 {
        characteristic_time(self.rho)
    }
}

impl fmt::Display for SegmentEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mean {:.3}, sd {:.3}, rho {:.3} (tau {:.3}), n = {}",
            self.mean,
            self.sd,
            self.rho,
            self.tau(),
            self.n
        )
    }
}

pub fn characteristic_time(rho: f64) -> f64 {
    -1.0 / rho.ln()
}

/// Conditional log-likelihood of a segment; the first value only conditions
pub fn ar_log_likelihood(x: &[f64], t: &[f64], mean: f64, sd: f64, rho: f64) -> f64 {
    x.windows(2)
        .zip(t.windows(2))
        .map(|(x, t)| {
            let decay = rho.powf(t[1] - t[0]);
            normal_ln_pdf(
                x[1],
                mean + decay * (x[0] - mean),
                sd * (1.0 - decay * decay).sqrt(),
            )
        })
        .sum()
}

/// Maximum likelihood autocorrelation for a given mean and standard deviation
pub fn estimate_rho(x: &[f64], t: &[f64], mean: f64, sd: f64) -> Result<f64> {
    let (rho, _) = golden_section(
        |rho| -ar_log_likelihood(x, t, mean, sd, rho),
        RHO_MARGIN,
        1.0 - RHO_MARGIN,
        RHO_TOLERANCE,
    )?;
    Ok(rho)
}

/// Estimate all three parameters of a segment
pub fn fit_segment(x: &[f64], t: &[f64]) -> Result<SegmentEstimate> {
    if x.len() != t.len() {
        return Err(Error::size_mismatch(x.len(), t.len(), "segment times"));
    }
    if x.len() < MIN_SEGMENT {
        return Err(Error::InsufficientData {
            expected: MIN_SEGMENT,
            actual: x.len(),
        });
    }
    let mu = mean(x).ok_or_else(|| Error::empty_input("segment"))?;
    let sd = segment_sd(x);
    let rho = estimate_rho(x, t, mu, sd)?;
    Ok(SegmentEstimate {
        mean: mu,
        sd,
        rho,
        n: x.len(),
    })
}

/// Sample standard deviation, floored so constant segments keep a finite likelihood
pub(crate) fn segment_sd(x: &[f64]) -> f64 {
    sample_std_dev(x).unwrap_or(0.0).max(SD_FLOOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    /// Regularly sampled AR(1) series with unit spacing
    fn ar_series(n: usize, mean: f64, sd: f64, rho: f64, seed: u64) -> (Vec<f64>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let innovation = Normal::new(0.0, sd * (1.0 - rho * rho).sqrt()).unwrap();
        let mut x = Vec::with_capacity(n);
        let mut current = mean;
        for _ in 0..n {
            current = mean + rho * (current - mean) + innovation.sample(&mut rng);
            x.push(current);
        }
        (x, (0..n).map(|i| i as f64).collect())
    }

    #[test]
    fn test_rho_recovered() {
        let (x, t) = ar_series(2000, 5.0, 2.0, 0.7, 3);
        let fit = fit_segment(&x, &t).unwrap();
        assert_abs_diff_eq!(fit.mean, 5.0, epsilon = 0.3);
        assert_abs_diff_eq!(fit.sd, 2.0, epsilon = 0.2);
        assert_abs_diff_eq!(fit.rho, 0.7, epsilon = 0.05);
        assert_abs_diff_eq!(fit.tau(), -1.0 / 0.7f64.ln(), epsilon = 0.8);
    }

    #[test]
    fn test_white_noise_has_low_rho() {
        let (x, t) = ar_series(2000, 0.0, 1.0, 0.0, 9);
        let fit = fit_segment(&x, &t).unwrap();
        assert!(fit.rho < 0.1, "rho = {}", fit.rho);
    }

    #[test]
    fn test_irregular_spacing_matches_regular_at_unit_steps() {
        let (x, t) = ar_series(50, 1.0, 1.0, 0.5, 1);
        let doubled: Vec<f64> = t.iter().map(|v| v * 2.0).collect();
        let a = ar_log_likelihood(&x, &t, 1.0, 1.0, 0.25);
        let b = ar_log_likelihood(&x, &doubled, 1.0, 1.0, 0.5);
        assert_abs_diff_eq!(a, b, epsilon = 1e-9);
    }

    #[test]
    fn test_short_segment() {
        assert!(matches!(
            fit_segment(&[1.0, 2.0], &[0.0, 1.0]),
            Err(Error::InsufficientData { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_constant_segment_is_finite() {
        let fit = fit_segment(&[2.0; 5], &[0.0, 1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(fit.mean, 2.0);
        assert!(ar_log_likelihood(&[2.0; 5], &[0.0, 1.0, 2.0, 3.0, 4.0], fit.mean, fit.sd, fit.rho).is_finite());
    }
}
