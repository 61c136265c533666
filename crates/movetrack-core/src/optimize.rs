//! Numerical minimisation routines
//!
//! Likelihood fits in movetrack are local, iterative optimisations whose
//! outcome depends on the starting point. Every routine here therefore
//! returns an [`OptimizationOutcome`] carrying the final objective value and
//! iteration counts, and never hides a run that stopped at its iteration
//! limit.
//!
//! Non-finite objective values are treated as `+inf`, so an objective may
//! simply return `f64::INFINITY` (or NaN) outside its valid region.

use crate::error::{Error, Result};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Settings shared by the multivariate optimisers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerSettings {
    /// Maximum number of iterations before giving up
    pub max_iterations: usize,
    /// Convergence tolerance on the gradient (BFGS) or simplex spread (Nelder-Mead)
    pub tolerance: f64,
    /// Relative step used for finite-difference gradients
    pub gradient_step: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            tolerance: 1e-6,
            gradient_step: 1e-5,
        }
    }
}

impl OptimizerSettings {
    /// Set the iteration limit
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the convergence tolerance
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::InvalidParameter(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if !(self.tolerance > 0.0) {
            return Err(Error::not_positive("tolerance", self.tolerance));
        }
        if !(self.gradient_step > 0.0) {
            return Err(Error::not_positive("gradient_step", self.gradient_step));
        }
        Ok(())
    }
}

/// Outcome of a minimisation run
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationOutcome {
    /// Best point found
    pub x: Vec<f64>,
    /// Objective value at `x`
    pub value: f64,
    /// Number of iterations performed
    pub iterations: usize,
    /// Number of objective evaluations
    pub evaluations: usize,
    /// Whether the convergence criterion was met
    pub converged: bool,
    /// Whether the run stopped because it reached `max_iterations`
    pub hit_iteration_limit: bool,
}

struct CountingObjective<F> {
    f: F,
    evaluations: usize,
}

impl<F: FnMut(&[f64]) -> f64> CountingObjective<F> {
    fn eval(&mut self, x: &[f64]) -> f64 {
        self.evaluations += 1;
        let v = (self.f)(x);
        if v.is_finite() {
            v
        } else {
            f64::INFINITY
        }
    }

    fn gradient(&mut self, x: &DVector<f64>, step: f64) -> DVector<f64> {
        let mut probe = x.as_slice().to_vec();
        let mut grad = DVector::zeros(x.len());
        for i in 0..x.len() {
            let h = step * x[i].abs().max(1.0);
            probe[i] = x[i] + h;
            let up = self.eval(&probe);
            probe[i] = x[i] - h;
            let down = self.eval(&probe);
            probe[i] = x[i];
            grad[i] = if up.is_finite() && down.is_finite() {
                (up - down) / (2.0 * h)
            } else {
                0.0
            };
        }
        grad
    }
}

/// Minimise `f` with BFGS using central-difference gradients and a
/// backtracking (Armijo) line search
pub fn bfgs<F>(f: F, x0: &[f64], settings: &OptimizerSettings) -> Result<OptimizationOutcome>
where
    F: FnMut(&[f64]) -> f64,
{
    settings.validate()?;
    if x0.is_empty() {
        return Err(Error::empty_input("bfgs"));
    }

    let n = x0.len();
    let mut objective = CountingObjective { f, evaluations: 0 };
    let mut x = DVector::from_column_slice(x0);
    let mut fx = objective.eval(x.as_slice());
    if !fx.is_finite() {
        return Err(Error::Computation(
            "objective is not finite at the starting point".to_string(),
        ));
    }

    let mut grad = objective.gradient(&x, settings.gradient_step);
    let mut inv_hessian = DMatrix::<f64>::identity(n, n);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < settings.max_iterations {
        if grad.amax() < settings.tolerance {
            converged = true;
            break;
        }
        iterations += 1;

        let mut direction = -(&inv_hessian * &grad);
        let mut slope = grad.dot(&direction);
        if slope >= 0.0 {
            inv_hessian = DMatrix::identity(n, n);
            direction = -grad.clone();
            slope = grad.dot(&direction);
        }

        let mut alpha = 1.0;
        let mut accepted = None;
        while alpha > 1e-14 {
            let candidate = &x + &direction * alpha;
            let f_candidate = objective.eval(candidate.as_slice());
            if f_candidate <= fx + 1e-4 * alpha * slope {
                accepted = Some((candidate, f_candidate));
                break;
            }
            alpha *= 0.5;
        }

        let Some((x_new, f_new)) = accepted else {
            debug!(iterations, value = fx, "BFGS line search could not reduce the objective");
            // No descent along the quasi-Newton direction: at a stationary point
            // up to finite-difference accuracy, accept it as converged.
            converged = grad.amax() < settings.tolerance.sqrt();
            break;
        };

        let grad_new = objective.gradient(&x_new, settings.gradient_step);
        let s = &x_new - &x;
        let y = &grad_new - &grad;
        let sy = s.dot(&y);
        if sy > 1e-12 {
            let rho = 1.0 / sy;
            let identity = DMatrix::<f64>::identity(n, n);
            let left = &identity - (&s * y.transpose()) * rho;
            let right = &identity - (&y * s.transpose()) * rho;
            inv_hessian = &left * &inv_hessian * &right + (&s * s.transpose()) * rho;
        }

        let f_change = (fx - f_new).abs();
        x = x_new;
        grad = grad_new;
        fx = f_new;

        if f_change <= settings.tolerance * 1e-3 * (fx.abs() + 1e-8)
            && s.amax() <= settings.tolerance * (x.amax() + 1.0)
        {
            converged = true;
            break;
        }
    }

    let hit_iteration_limit = !converged && iterations >= settings.max_iterations;
    debug!(iterations, value = fx, converged, "BFGS finished");

    Ok(OptimizationOutcome {
        x: x.as_slice().to_vec(),
        value: fx,
        iterations,
        evaluations: objective.evaluations,
        converged,
        hit_iteration_limit,
    })
}

/// Minimise `f` with the Nelder-Mead simplex method
///
/// Converges when the standard deviation of the objective over the simplex
/// falls below the tolerance.
pub fn nelder_mead<F>(f: F, x0: &[f64], settings: &OptimizerSettings) -> Result<OptimizationOutcome>
where
    F: FnMut(&[f64]) -> f64,
{
    settings.validate()?;
    if x0.is_empty() {
        return Err(Error::empty_input("nelder_mead"));
    }

    let n = x0.len();
    let mut objective = CountingObjective { f, evaluations: 0 };

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(x0.to_vec());
    for i in 0..n {
        let mut vertex = x0.to_vec();
        vertex[i] += if vertex[i].abs() > 1e-8 { 0.1 * vertex[i].abs() } else { 0.1 };
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| objective.eval(v)).collect();
    if !values[0].is_finite() {
        return Err(Error::Computation(
            "objective is not finite at the starting point".to_string(),
        ));
    }

    let mut iterations = 0;
    let mut converged = false;

    while iterations < settings.max_iterations {
        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        values = order.iter().map(|&i| values[i]).collect();

        let mean_value = values.iter().sum::<f64>() / (n + 1) as f64;
        let spread = (values
            .iter()
            .map(|v| (v - mean_value).powi(2))
            .sum::<f64>()
            / (n + 1) as f64)
            .sqrt();
        if spread.is_finite() && spread < settings.tolerance {
            converged = true;
            break;
        }
        iterations += 1;

        let centroid: Vec<f64> = (0..n)
            .map(|j| simplex[..n].iter().map(|v| v[j]).sum::<f64>() / n as f64)
            .collect();
        let towards = |coef: f64, worst: &[f64]| -> Vec<f64> {
            centroid
                .iter()
                .zip(worst)
                .map(|(c, w)| c + coef * (c - w))
                .collect()
        };

        let reflected = towards(1.0, &simplex[n]);
        let f_reflected = objective.eval(&reflected);

        if f_reflected < values[0] {
            let expanded = towards(2.0, &simplex[n]);
            let f_expanded = objective.eval(&expanded);
            if f_expanded < f_reflected {
                simplex[n] = expanded;
                values[n] = f_expanded;
            } else {
                simplex[n] = reflected;
                values[n] = f_reflected;
            }
        } else if f_reflected < values[n - 1] {
            simplex[n] = reflected;
            values[n] = f_reflected;
        } else {
            let (contracted, f_contracted) = if f_reflected < values[n] {
                let c = towards(0.5, &simplex[n]);
                let fc = objective.eval(&c);
                (c, fc)
            } else {
                let c = towards(-0.5, &simplex[n]);
                let fc = objective.eval(&c);
                (c, fc)
            };

            if f_contracted < values[n].min(f_reflected) {
                simplex[n] = contracted;
                values[n] = f_contracted;
            } else {
                let best = simplex[0].clone();
                for i in 1..=n {
                    for j in 0..n {
                        simplex[i][j] = best[j] + 0.5 * (simplex[i][j] - best[j]);
                    }
                    values[i] = objective.eval(&simplex[i]);
                }
            }
        }
    }

    let best = (0..=n)
        .min_by(|&a, &b| values[a].total_cmp(&values[b]))
        .unwrap_or(0);
    let hit_iteration_limit = !converged && iterations >= settings.max_iterations;
    debug!(iterations, value = values[best], converged, "Nelder-Mead finished");

    Ok(OptimizationOutcome {
        x: simplex[best].clone(),
        value: values[best],
        iterations,
        evaluations: objective.evaluations,
        converged,
        hit_iteration_limit,
    })
}

/// Minimise a univariate function on `[lower, upper]` by golden-section search
///
/// Returns `(argmin, minimum)`.
pub fn golden_section<F>(mut f: F, lower: f64, upper: f64, tolerance: f64) -> Result<(f64, f64)>
where
    F: FnMut(f64) -> f64,
{
    if !(lower < upper) || !lower.is_finite() || !upper.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "golden-section interval [{lower}, {upper}] is empty or not finite"
        )));
    }
    if !(tolerance > 0.0) {
        return Err(Error::not_positive("tolerance", tolerance));
    }

    let mut eval = |x: f64| {
        let v = f(x);
        if v.is_finite() {
            v
        } else {
            f64::INFINITY
        }
    };

    let inv_phi = (5.0_f64.sqrt() - 1.0) / 2.0;
    let (mut a, mut b) = (lower, upper);
    let mut c = b - inv_phi * (b - a);
    let mut d = a + inv_phi * (b - a);
    let mut fc = eval(c);
    let mut fd = eval(d);

    while (b - a).abs() > tolerance {
        if fc <= fd {
            b = d;
            d = c;
            fd = fc;
            c = b - inv_phi * (b - a);
            fc = eval(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + inv_phi * (b - a);
            fd = eval(d);
        }
    }

    Ok(if fc <= fd { (c, fc) } else { (d, fd) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rosenbrock(x: &[f64]) -> f64 {
        (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
    }

    #[test]
    fn test_bfgs_rosenbrock() {
        let outcome = bfgs(rosenbrock, &[-1.2, 1.0], &OptimizerSettings::default()).unwrap();
        assert!(outcome.converged, "BFGS should converge: {:?}", outcome);
        assert!(!outcome.hit_iteration_limit);
        assert_relative_eq!(outcome.x[0], 1.0, epsilon = 1e-3);
        assert_relative_eq!(outcome.x[1], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_nelder_mead_quadratic() {
        let quadratic = |x: &[f64]| (x[0] - 3.0).powi(2) + 2.0 * (x[1] + 1.0).powi(2);
        let settings = OptimizerSettings::default().with_tolerance(1e-10);
        let outcome = nelder_mead(quadratic, &[0.0, 0.0], &settings).unwrap();
        assert!(outcome.converged);
        assert_relative_eq!(outcome.x[0], 3.0, epsilon = 1e-3);
        assert_relative_eq!(outcome.x[1], -1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_iteration_limit_is_reported() {
        let settings = OptimizerSettings::default().with_max_iterations(2);
        let outcome = bfgs(rosenbrock, &[-1.2, 1.0], &settings).unwrap();
        assert!(!outcome.converged);
        assert!(outcome.hit_iteration_limit);
        assert_eq!(outcome.iterations, 2);
    }

    #[test]
    fn test_non_finite_start_is_an_error() {
        let f = |x: &[f64]| if x[0] < 0.0 { f64::NAN } else { x[0] };
        assert!(bfgs(f, &[-1.0], &OptimizerSettings::default()).is_err());
        assert!(nelder_mead(f, &[-1.0], &OptimizerSettings::default()).is_err());
    }

    #[test]
    fn test_golden_section() {
        let (x, fx) = golden_section(|x| (x - 0.3).powi(2) + 1.0, 0.0, 1.0, 1e-8).unwrap();
        assert_relative_eq!(x, 0.3, epsilon = 1e-6);
        assert_relative_eq!(fx, 1.0, epsilon = 1e-10);
        assert!(golden_section(|x| x, 1.0, 0.0, 1e-8).is_err());
    }
}
