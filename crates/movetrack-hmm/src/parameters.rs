//! Natural and working parameters of an HMM
//!
//! The optimiser works on an unconstrained vector. Step means and standard
//! deviations enter on the log scale, zero masses on the logit scale, angle
//! parameters as `(κ cos μ, κ sin μ)` (or `ln κ` when the mean is fixed at
//! zero), transition probabilities as multinomial logits of the
//! off-diagonal entries against the diagonal, and the initial distribution
//! as multinomial logits against the first state.

use crate::config::{AngleMean, HmmConfig, InitialDistribution};
use crate::distributions::{AngleDistribution, StepDistribution};
use movetrack_core::{Error, Result};
use nalgebra::{DMatrix, DVector};
use std::fmt;

/// Default off-diagonal transition logit, a stay probability of about 0.88 with two states
const DEFAULT_SWITCH_LOGIT: f64 = -2.0;

/// Floor applied before taking logarithms of probabilities and concentrations
const LOG_FLOOR: f64 = 1e-10;

/// Parameters of an N-state gamma/von Mises HMM
#[derive(Debug, Clone, PartialEq)]
pub struct HmmParameters {
    /// Step-length distribution of each state
    pub steps: Vec<StepDistribution>,
    /// Turning-angle distribution of each state
    pub angles: Vec<AngleDistribution>,
    /// Coefficients of the off-diagonal transition logits
    ///
    /// Row 0 holds the intercepts and row `k + 1` the coefficient of
    /// covariate `k`. Column `i * (N - 1) + j'` is the transition from state
    /// `i` to the `j'`-th state other than `i`.
    pub transition: DMatrix<f64>,
    /// Distribution of the first state; ignored when the model uses the
    /// stationary distribution
    pub initial: Vec<f64>,
}

impl HmmParameters {
    /// Parameters with a sticky default transition matrix, no covariate
    /// effects and a uniform initial distribution
    pub fn new(steps: Vec<StepDistribution>, angles: Vec<AngleDistribution>) -> Result<Self> {
        if steps.len() != angles.len() {
            return Err(Error::size_mismatch(steps.len(), angles.len(), "state angle distributions"));
        }
        if steps.is_empty() {
            return Err(Error::InvalidParameter(
                "an HMM needs at least one state".to_string(),
            ));
        }
        let n = steps.len();
        Ok(Self {
            steps,
            angles,
            transition: DMatrix::from_element(1, n * (n - 1), DEFAULT_SWITCH_LOGIT),
            initial: vec![1.0 / n as f64; n],
        })
    }

    /// Set the transition intercepts from a row-stochastic matrix
    pub fn with_transition_probabilities(mut self, gamma: &DMatrix<f64>) -> Result<Self> {
        let n = self.n_states();
        if gamma.nrows() != n || gamma.ncols() != n {
            return Err(Error::size_mismatch(n, gamma.nrows(), "transition matrix"));
        }
        for i in 0..n {
            let row_sum: f64 = gamma.row(i).sum();
            if gamma.row(i).iter().any(|p| !(*p >= 0.0)) || (row_sum - 1.0).abs() > 1e-8 {
                return Err(Error::InvalidParameter(format!(
                    "transition matrix row {i} is not a probability vector"
                )));
            }
            let stay = gamma[(i, i)].max(LOG_FLOOR);
            for (offset, j) in (0..n).filter(|&j| j != i).enumerate() {
                self.transition[(0, i * (n - 1) + offset)] = (gamma[(i, j)].max(LOG_FLOOR) / stay).ln();
            }
        }
        Ok(self)
    }

    /// Extend the transition coefficients with zero effects for `n_covariates` covariates
    pub fn with_covariate_count(mut self, n_covariates: usize) -> Self {
        let columns = self.transition.ncols();
        let mut transition = DMatrix::zeros(n_covariates + 1, columns);
        transition.row_mut(0).copy_from(&self.transition.row(0));
        self.transition = transition;
        self
    }

    pub fn with_initial(mut self, initial: Vec<f64>) -> Result<Self> {
        if initial.len() != self.n_states() {
            return Err(Error::size_mismatch(self.n_states(), initial.len(), "initial distribution"));
        }
        self.initial = initial;
        Ok(self)
    }

    pub fn n_states(&self) -> usize {
        self.steps.len()
    }

    pub fn n_covariates(&self) -> usize {
        self.transition.nrows().saturating_sub(1)
    }

    /// Check the parameters against a model structure
    pub fn validate(&self, config: &HmmConfig) -> Result<()> {
        config.validate()?;
        let n = config.n_states;
        if self.steps.len() != n || self.angles.len() != n {
            return Err(Error::InvalidParameter(format!(
                "model has {n} states but parameters describe {}",
                self.steps.len()
            )));
        }
        if self.transition.ncols() != n * (n - 1) || self.n_covariates() != config.n_covariates() {
            return Err(Error::InvalidParameter(format!(
                "transition coefficients are {}x{}, expected {}x{}",
                self.transition.nrows(),
                self.transition.ncols(),
                config.n_covariates() + 1,
                n * (n - 1)
            )));
        }
        for (i, (step, angle)) in self.steps.iter().zip(&self.angles).enumerate() {
            step.validate()?;
            angle.validate()?;
            if step.zero_mass.is_some() != config.zero_inflation {
                return Err(Error::InvalidParameter(format!(
                    "state {i}: zero mass must be given exactly when zero inflation is enabled"
                )));
            }
        }
        if self.transition.iter().any(|b| !b.is_finite()) {
            return Err(Error::non_finite("transition coefficients"));
        }
        if self.initial.len() != n
            || self.initial.iter().any(|p| !(*p >= 0.0))
            || (self.initial.iter().sum::<f64>() - 1.0).abs() > 1e-8
        {
            return Err(Error::InvalidParameter(
                "initial distribution must be a probability vector over the states".to_string(),
            ));
        }
        Ok(())
    }

    /// Transition probability matrix for the given covariate values
    pub fn transition_matrix(&self, covariates: &[f64]) -> DMatrix<f64> {
        let n = self.n_states();
        let mut gamma = DMatrix::zeros(n, n);
        if n == 1 {
            gamma[(0, 0)] = 1.0;
            return gamma;
        }

        for i in 0..n {
            let logits: Vec<f64> = (0..n - 1)
                .map(|offset| {
                    let column = i * (n - 1) + offset;
                    let mut eta = self.transition[(0, column)];
                    for (k, z) in covariates.iter().enumerate().take(self.n_covariates()) {
                        eta += self.transition[(k + 1, column)] * z;
                    }
                    eta
                })
                .collect();
            let shift = logits.iter().copied().fold(0.0, f64::max);
            let stay = (-shift).exp();
            let total = stay + logits.iter().map(|eta| (eta - shift).exp()).sum::<f64>();
            gamma[(i, i)] = stay / total;
            for (offset, j) in (0..n).filter(|&j| j != i).enumerate() {
                gamma[(i, j)] = (logits[offset] - shift).exp() / total;
            }
        }
        gamma
    }

    /// Stationary distribution of the transition matrix at the given covariate values
    pub fn stationary_distribution(&self, covariates: &[f64]) -> Result<Vec<f64>> {
        stationary(&self.transition_matrix(covariates))
    }

    /// Initial distribution under the model's convention
    pub fn initial_distribution(
        &self,
        config: &HmmConfig,
        first_covariates: &[f64],
    ) -> Result<Vec<f64>> {
        match config.initial_distribution {
            InitialDistribution::Estimated => Ok(self.initial.clone()),
            InitialDistribution::Stationary => self.stationary_distribution(first_covariates),
        }
    }

    /// Number of free parameters under `config`
    pub fn n_working(config: &HmmConfig) -> usize {
        let n = config.n_states;
        let per_state = 2
            + usize::from(config.zero_inflation)
            + match config.angle_mean {
                AngleMean::Estimated => 2,
                AngleMean::FixedZero => 1,
            };
        let initial = match config.initial_distribution {
            InitialDistribution::Estimated => n.saturating_sub(1),
            InitialDistribution::Stationary => 0,
        };
        n * per_state + n * n.saturating_sub(1) * (config.n_covariates() + 1) + initial
    }

    /// Map to the unconstrained working vector
    pub fn to_working(&self, config: &HmmConfig) -> Vec<f64> {
        let mut w = Vec::with_capacity(Self::n_working(config));
        w.extend(self.steps.iter().map(|s| s.mean.ln()));
        w.extend(self.steps.iter().map(|s| s.sd.ln()));
        if config.zero_inflation {
            w.extend(self.steps.iter().map(|s| {
                let z = s.zero_mass.unwrap_or(LOG_FLOOR).clamp(LOG_FLOOR, 1.0 - LOG_FLOOR);
                (z / (1.0 - z)).ln()
            }));
        }
        match config.angle_mean {
            AngleMean::Estimated => {
                w.extend(self.angles.iter().map(|a| a.concentration * a.mean.cos()));
                w.extend(self.angles.iter().map(|a| a.concentration * a.mean.sin()));
            }
            AngleMean::FixedZero => {
                w.extend(self.angles.iter().map(|a| a.concentration.max(LOG_FLOOR).ln()));
            }
        }
        for column in 0..self.transition.ncols() {
            w.extend(self.transition.column(column).iter().copied());
        }
        if config.initial_distribution == InitialDistribution::Estimated {
            let first = self.initial[0].max(LOG_FLOOR);
            w.extend(self.initial[1..].iter().map(|p| (p.max(LOG_FLOOR) / first).ln()));
        }
        w
    }

    /// Map an unconstrained working vector back to natural parameters
    pub fn from_working(config: &HmmConfig, working: &[f64]) -> Result<Self> {
        config.validate()?;
        if working.len() != Self::n_working(config) {
            return Err(Error::size_mismatch(
                Self::n_working(config),
                working.len(),
                "working parameter vector",
            ));
        }
        let n = config.n_states;
        let mut cursor = working.iter().copied();
        let mut take = |count: usize| -> Vec<f64> { cursor.by_ref().take(count).collect() };

        let means = take(n);
        let sds = take(n);
        let zero_masses = if config.zero_inflation {
            take(n).into_iter().map(|l| Some(1.0 / (1.0 + (-l).exp()))).collect()
        } else {
            vec![None; n]
        };
        let steps = means
            .iter()
            .zip(&sds)
            .zip(zero_masses)
            .map(|((m, s), zero_mass)| StepDistribution {
                mean: m.exp(),
                sd: s.exp(),
                zero_mass,
            })
            .collect();

        let angles = match config.angle_mean {
            AngleMean::Estimated => {
                let x = take(n);
                let y = take(n);
                x.iter()
                    .zip(&y)
                    .map(|(x, y)| AngleDistribution::von_mises(y.atan2(*x), x.hypot(*y)))
                    .collect()
            }
            AngleMean::FixedZero => take(n)
                .into_iter()
                .map(|l| AngleDistribution::von_mises(0.0, l.exp()))
                .collect(),
        };

        let rows = config.n_covariates() + 1;
        let columns = n * (n - 1);
        let transition = DMatrix::from_column_slice(rows, columns, &take(rows * columns));

        let initial = match config.initial_distribution {
            InitialDistribution::Estimated => {
                let logits = take(n - 1);
                let shift = logits.iter().copied().fold(0.0, f64::max);
                let weights: Vec<f64> = std::iter::once(-shift)
                    .chain(logits.iter().map(|l| l - shift))
                    .map(f64::exp)
                    .collect();
                let total: f64 = weights.iter().sum();
                weights.into_iter().map(|w| w / total).collect()
            }
            InitialDistribution::Stationary => vec![1.0 / n as f64; n],
        };

        Ok(Self {
            steps,
            angles,
            transition,
            initial,
        })
    }
}

/// Stationary distribution `δ` of a row-stochastic matrix, solving `δ (I - Γ + U) = 1`
pub fn stationary(gamma: &DMatrix<f64>) -> Result<Vec<f64>> {
    let n = gamma.nrows();
    let system = (DMatrix::<f64>::identity(n, n) - gamma + DMatrix::from_element(n, n, 1.0)).transpose();
    let solution = system
        .lu()
        .solve(&DVector::from_element(n, 1.0))
        .ok_or_else(|| {
            Error::Computation("transition matrix has no unique stationary distribution".to_string())
        })?;
    let clipped: Vec<f64> = solution.iter().map(|p| p.max(0.0)).collect();
    let total: f64 = clipped.iter().sum();
    if !(total > 0.0) {
        return Err(Error::Computation(
            "stationary distribution is degenerate".to_string(),
        ));
    }
    Ok(clipped.into_iter().map(|p| p / total).collect())
}

impl fmt::Display for HmmParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (step, angle)) in self.steps.iter().zip(&self.angles).enumerate() {
            writeln!(f, "  State {}: step {step}, angle {angle}", i + 1)?;
        }
        let gamma = self.transition_matrix(&vec![0.0; self.n_covariates()]);
        writeln!(f, "  Transition probabilities (covariates at zero):")?;
        for i in 0..gamma.nrows() {
            let row: Vec<String> = gamma.row(i).iter().map(|p| format!("{p:.4}")).collect();
            writeln!(f, "    [{}]", row.join(", "))?;
        }
        let initial: Vec<String> = self.initial.iter().map(|p| format!("{p:.4}")).collect();
        write!(f, "  Initial distribution: [{}]", initial.join(", "))
    }
}
