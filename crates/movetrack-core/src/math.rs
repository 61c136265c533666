//! Mathematical utilities for movement analysis
//!
//! This module provides the basic functions needed across the movetrack
//! crates: circular arithmetic for headings and turning angles, the
//! log-densities used by the HMM and change point likelihoods, and the
//! sample statistics used to summarise segments.

/// Circular arithmetic on angles in radians
pub mod circular {
    use std::f64::consts::PI;

    /// Wrap an angle into `[-π, π)`
    pub fn wrap_angle(angle: f64) -> f64 {
        (angle + PI).rem_euclid(2.0 * PI) - PI
    }

    /// Signed smallest difference `a - b`, wrapped into `[-π, π)`
    pub fn angular_difference(a: f64, b: f64) -> f64 {
        wrap_angle(a - b)
    }

    /// Mean direction of a set of angles, `None` when the resultant is zero
    pub fn circular_mean(angles: &[f64]) -> Option<f64> {
        let (s, c) = angles
            .iter()
            .fold((0.0, 0.0), |(s, c), a| (s + a.sin(), c + a.cos()));
        if s.hypot(c) < 1e-12 {
            None
        } else {
            Some(s.atan2(c))
        }
    }

    /// Mean resultant length in `[0, 1]`
    pub fn mean_resultant_length(angles: &[f64]) -> f64 {
        if angles.is_empty() {
            return 0.0;
        }
        let (s, c) = angles
            .iter()
            .fold((0.0, 0.0), |(s, c), a| (s + a.sin(), c + a.cos()));
        s.hypot(c) / angles.len() as f64
    }
}

/// Modified Bessel functions
pub mod bessel {
    /// Natural logarithm of the modified Bessel function of the first kind, order 0
    ///
    /// Polynomial approximations from Abramowitz & Stegun 9.8.1 and 9.8.2,
    /// evaluated in log space above 3.75 so large concentrations do not overflow.
    pub fn ln_i0(x: f64) -> f64 {
        let ax = x.abs();
        if ax < 3.75 {
            let t = (ax / 3.75).powi(2);
            let poly = 1.0
                + t * (3.5156229
                    + t * (3.0899424
                        + t * (1.2067492 + t * (0.2659732 + t * (0.0360768 + t * 0.0045813)))));
            poly.ln()
        } else {
            let t = 3.75 / ax;
            let poly = 0.39894228
                + t * (0.01328592
                    + t * (0.00225319
                        + t * (-0.00157565
                            + t * (0.00916281
                                + t * (-0.02057706
                                    + t * (0.02635537 + t * (-0.01647633 + t * 0.00392377)))))));
            ax - 0.5 * ax.ln() + poly.ln()
        }
    }
}

/// Log-densities of the distributions used by the analyzers
pub mod distributions {
    use super::bessel::ln_i0;
    use statrs::distribution::{Continuous, Gamma, Normal};
    use std::f64::consts::PI;

    /// Log-density of a normal distribution
    pub fn normal_ln_pdf(x: f64, mean: f64, sd: f64) -> f64 {
        match Normal::new(mean, sd) {
            Ok(normal) if sd > 0.0 => normal.ln_pdf(x),
            _ => f64::NEG_INFINITY,
        }
    }

    /// Gamma shape and rate from a mean/standard deviation parametrisation
    pub fn gamma_shape_rate(mean: f64, sd: f64) -> (f64, f64) {
        let variance = sd * sd;
        (mean * mean / variance, mean / variance)
    }

    /// Log-density of a gamma distribution with shape/rate parametrisation
    pub fn gamma_ln_pdf(x: f64, shape: f64, rate: f64) -> f64 {
        if x < 0.0 || !(shape > 0.0) || !(rate > 0.0) {
            return f64::NEG_INFINITY;
        }
        // density at zero is the limit as x -> 0
        if x == 0.0 {
            return if shape < 1.0 {
                f64::INFINITY
            } else if shape == 1.0 {
                rate.ln()
            } else {
                f64::NEG_INFINITY
            };
        }
        match Gamma::new(shape, rate) {
            Ok(gamma) => gamma.ln_pdf(x),
            Err(_) => f64::NEG_INFINITY,
        }
    }

    /// Log-density of a von Mises distribution on the circle
    pub fn von_mises_ln_pdf(x: f64, mean: f64, concentration: f64) -> f64 {
        if concentration < 0.0 {
            return f64::NEG_INFINITY;
        }
        concentration * (x - mean).cos() - (2.0 * PI).ln() - ln_i0(concentration)
    }
}

/// Sample statistics
pub mod statistics {
    use statrs::statistics::Statistics;

    /// Arithmetic mean, `None` for an empty slice
    pub fn mean(data: &[f64]) -> Option<f64> {
        if data.is_empty() {
            None
        } else {
            Some(data.mean())
        }
    }

    /// Sample variance with `n - 1` denominator, `None` below two samples
    pub fn sample_variance(data: &[f64]) -> Option<f64> {
        if data.len() < 2 {
            None
        } else {
            Some(data.variance().max(0.0))
        }
    }

    /// Sample standard deviation with `n - 1` denominator
    pub fn sample_std_dev(data: &[f64]) -> Option<f64> {
        sample_variance(data).map(f64::sqrt)
    }

    /// Stable log-sum-exp
    pub fn log_sum_exp(values: &[f64]) -> f64 {
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return max;
        }
        max + values.iter().map(|v| (v - max).exp()).sum::<f64>().ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_wrap_angle() {
        assert_relative_eq!(circular::wrap_angle(0.5), 0.5, epsilon = 1e-12);
        assert_relative_eq!(circular::wrap_angle(3.0 * PI / 2.0), -PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(circular::wrap_angle(-3.0 * PI / 2.0), PI / 2.0, epsilon = 1e-12);
        assert_relative_eq!(circular::wrap_angle(4.0 * PI + 0.1), 0.1, epsilon = 1e-12);
        let wrapped = circular::wrap_angle(PI);
        assert!((-PI..PI).contains(&wrapped));
    }

    #[test]
    fn test_circular_mean() {
        let angles = [PI - 0.1, -PI + 0.1];
        let mean = circular::circular_mean(&angles).unwrap();
        assert_relative_eq!(mean.abs(), PI, epsilon = 1e-9);
        assert!(circular::circular_mean(&[0.0, PI]).is_none());
        assert_relative_eq!(circular::mean_resultant_length(&[0.3, 0.3, 0.3]), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ln_i0_reference_values() {
        // I0(0) = 1, I0(1) = 1.266066, I0(5) = 27.239872, I0(50) = 2.93255378e20
        assert_relative_eq!(bessel::ln_i0(0.0), 0.0, epsilon = 1e-7);
        assert_relative_eq!(bessel::ln_i0(1.0), 1.266_065_9_f64.ln(), epsilon = 1e-6);
        assert_relative_eq!(bessel::ln_i0(5.0), 27.239_871_8_f64.ln(), epsilon = 1e-6);
        assert_relative_eq!(bessel::ln_i0(50.0), 2.932_553_78e20_f64.ln(), epsilon = 1e-6);
        assert!(bessel::ln_i0(1e5).is_finite());
    }

    #[test]
    fn test_von_mises_integrates_to_one() {
        let n = 20_000;
        let h = 2.0 * PI / n as f64;
        for &kappa in &[0.0, 0.5, 3.0, 20.0] {
            let total: f64 = (0..n)
                .map(|i| {
                    let x = -PI + (i as f64 + 0.5) * h;
                    distributions::von_mises_ln_pdf(x, 0.4, kappa).exp() * h
                })
                .sum();
            assert_relative_eq!(total, 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_gamma_ln_pdf_matches_exponential() {
        // shape 1 is an exponential distribution
        let rate: f64 = 0.25;
        for &x in &[0.5, 2.0, 10.0] {
            let expected = rate.ln() - rate * x;
            assert_relative_eq!(distributions::gamma_ln_pdf(x, 1.0, rate), expected, epsilon = 1e-10);
        }
        let (shape, rate) = distributions::gamma_shape_rate(4.0, 2.0);
        assert_relative_eq!(shape, 4.0, epsilon = 1e-12);
        assert_relative_eq!(rate, 1.0, epsilon = 1e-12);
        assert_eq!(distributions::gamma_ln_pdf(-1.0, 2.0, 1.0), f64::NEG_INFINITY);
        // shape 4, rate 1 at x = 2: x^3 e^-x / 3!
        assert_relative_eq!(
            distributions::gamma_ln_pdf(2.0, 4.0, 1.0),
            3.0 * 2.0_f64.ln() - 2.0 - 6.0_f64.ln(),
            epsilon = 1e-10
        );
        assert_relative_eq!(distributions::gamma_ln_pdf(0.0, 1.0, 0.5), 0.5_f64.ln(), epsilon = 1e-12);
        assert_eq!(distributions::gamma_ln_pdf(0.0, 2.0, 1.0), f64::NEG_INFINITY);
    }

    #[test]
    fn test_normal_ln_pdf() {
        assert_relative_eq!(
            distributions::normal_ln_pdf(0.0, 0.0, 1.0),
            -(2.0 * PI).sqrt().ln(),
            epsilon = 1e-12
        );
        assert_eq!(distributions::normal_ln_pdf(0.0, 0.0, 0.0), f64::NEG_INFINITY);
        assert_relative_eq!(
            distributions::normal_ln_pdf(3.0, 1.0, 2.0),
            -(2.0 * PI).sqrt().ln() - 2.0_f64.ln() - 0.5,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_sample_statistics() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(statistics::mean(&data).unwrap(), 5.0, epsilon = 1e-12);
        assert_relative_eq!(statistics::sample_variance(&data).unwrap(), 32.0 / 7.0, epsilon = 1e-12);
        assert!(statistics::sample_variance(&[1.0]).is_none());
        assert!(statistics::mean(&[]).is_none());
        assert_relative_eq!(
            statistics::log_sum_exp(&[0.0, 0.0]),
            2.0_f64.ln(),
            epsilon = 1e-12
        );
    }

    proptest::proptest! {
        #[test]
        fn wrapped_angle_keeps_direction(angle in -100.0f64..100.0) {
            let wrapped = circular::wrap_angle(angle);
            proptest::prop_assert!((-PI..=PI).contains(&wrapped));
            proptest::prop_assert!((wrapped.sin() - angle.sin()).abs() < 1e-9);
            proptest::prop_assert!((wrapped.cos() - angle.cos()).abs() < 1e-9);
        }

        #[test]
        fn log_sum_exp_bounds(values in proptest::collection::vec(-50.0f64..50.0, 1..20)) {
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let lse = statistics::log_sum_exp(&values);
            proptest::prop_assert!(lse >= max - 1e-12);
            proptest::prop_assert!(lse <= max + (values.len() as f64).ln() + 1e-12);
        }
    }
}
