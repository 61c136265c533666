//! Maximum likelihood fitting
//!
//! The likelihood is maximised directly over the working parameters. The
//! fit is local: different starting values can end in different optima, so
//! every fit carries its convergence diagnostics and never fails silently.

use crate::config::{HmmConfig, OptimizerKind};
use crate::data::HmmData;
use crate::decoding::StateDecoding;
use crate::likelihood::{self, prepare_all, PreparedSequence};
use crate::parameters::HmmParameters;
use movetrack_core::optimize::{bfgs, nelder_mead};
use movetrack_core::{AnalyzerProperties, Error, OptimizationOutcome, Result};
use nalgebra::DMatrix;
use std::fmt;
use tracing::{info, instrument, warn};

/// How the optimiser finished
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitDiagnostics {
    /// Maximised log-likelihood
    pub log_likelihood: f64,
    pub iterations: usize,
    /// Likelihood evaluations, including those for numerical gradients
    pub evaluations: usize,
    /// Whether the convergence tolerance was reached
    pub converged: bool,
    /// Whether the optimiser stopped at its iteration limit
    pub hit_iteration_limit: bool,
    /// Whether some state collapsed onto a degenerate limit (step sd or
    /// angular spread near zero), where the likelihood is unbounded
    pub boundary: bool,
    pub optimizer: OptimizerKind,
}

impl FitDiagnostics {
    fn from_outcome(outcome: &OptimizationOutcome, optimizer: OptimizerKind) -> Self {
        Self {
            log_likelihood: -outcome.value,
            iterations: outcome.iterations,
            evaluations: outcome.evaluations,
            converged: outcome.converged,
            hit_iteration_limit: outcome.hit_iteration_limit,
            boundary: false,
            optimizer,
        }
    }

    /// Converged to an interior optimum
    pub fn is_regular(&self) -> bool {
        self.converged && !self.boundary
    }
}

/// Step coefficient of variation below which a state is degenerate
const BOUNDARY_STEP_CV: f64 = 1e-2;
/// Angle concentration above which a state is degenerate
const BOUNDARY_CONCENTRATION: f64 = 1e4;

/// States whose parameters sit at a degenerate limit of the likelihood
pub fn boundary_states(params: &HmmParameters) -> Vec<usize> {
    params
        .steps
        .iter()
        .zip(&params.angles)
        .enumerate()
        .filter(|(_, (step, angle))| {
            step.sd / step.mean < BOUNDARY_STEP_CV || angle.concentration > BOUNDARY_CONCENTRATION
        })
        .map(|(state, _)| state)
        .collect()
}

impl fmt::Display for FitDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "log-likelihood {:.4} after {} iterations ({:?}, {})",
            self.log_likelihood,
            self.iterations,
            self.optimizer,
            if self.converged && self.boundary {
                "converged to a degenerate boundary"
            } else if self.converged {
                "converged"
            } else if self.hit_iteration_limit {
                "iteration limit reached"
            } else {
                "stopped without converging"
            }
        )
    }
}

/// Fits an HMM of a given structure by numerical likelihood maximisation
#[derive(Debug, Clone)]
pub struct HmmFitter {
    config: HmmConfig,
}

impl HmmFitter {
    pub fn new(config: HmmConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &HmmConfig {
        &self.config
    }

    /// Fit starting from `initial`
    #[instrument(skip_all, fields(states = self.config.n_states, sequences = data.sequences().len()))]
    pub fn fit(&self, data: &HmmData, initial: &HmmParameters) -> Result<FittedHmm> {
        let config = &self.config;
        initial.validate(config)?;
        self.check_data(data)?;
        let columns = data.covariate_columns(&config.transition_covariates)?;

        let objective = |working: &[f64]| -> f64 {
            let Ok(params) = HmmParameters::from_working(config, working) else {
                return f64::INFINITY;
            };
            let mut total = 0.0;
            for sequence in data.sequences() {
                match PreparedSequence::new(&params, config, sequence, &columns) {
                    Ok(prepared) => total += prepared.log_likelihood(),
                    Err(_) => return f64::INFINITY,
                }
            }
            -total
        };

        let start = initial.to_working(config);
        let outcome = match config.optimizer {
            OptimizerKind::Bfgs => bfgs(objective, &start, &config.settings)?,
            OptimizerKind::NelderMead => nelder_mead(objective, &start, &config.settings)?,
        };

        let parameters = HmmParameters::from_working(config, &outcome.x)?;
        let mut diagnostics = FitDiagnostics::from_outcome(&outcome, config.optimizer);
        let degenerate = boundary_states(&parameters);
        diagnostics.boundary = !degenerate.is_empty();
        if diagnostics.boundary {
            warn!(
                states = ?degenerate,
                log_likelihood = diagnostics.log_likelihood,
                "HMM fit ran onto a degenerate boundary; the likelihood is unbounded there"
            );
        } else if diagnostics.converged {
            info!(
                log_likelihood = diagnostics.log_likelihood,
                iterations = diagnostics.iterations,
                "HMM fit converged"
            );
        } else {
            warn!(
                log_likelihood = diagnostics.log_likelihood,
                iterations = diagnostics.iterations,
                hit_iteration_limit = diagnostics.hit_iteration_limit,
                "HMM fit did not converge; consider other starting values"
            );
        }

        Ok(FittedHmm {
            config: config.clone(),
            parameters,
            diagnostics,
            n_observations: data.n_observations(),
        })
    }

    fn check_data(&self, data: &HmmData) -> Result<()> {
        let n = data.n_observations();
        if n < self.minimum_sample_size() {
            return Err(Error::InsufficientData {
                expected: self.minimum_sample_size(),
                actual: n,
            });
        }
        let zeros = data.zero_steps();
        if zeros > 0 && !self.config.zero_inflation {
            return Err(Error::InvalidInput(format!(
                "{zeros} zero-length steps cannot be modelled by a gamma distribution; \
                 enable zero inflation"
            )));
        }
        Ok(())
    }
}

impl AnalyzerProperties for HmmFitter {
    fn algorithm_name(&self) -> &'static str {
        "Gamma/von Mises HMM"
    }

    fn minimum_sample_size(&self) -> usize {
        2
    }
}

/// A fitted HMM with its diagnostics
#[derive(Debug, Clone)]
pub struct FittedHmm {
    config: HmmConfig,
    parameters: HmmParameters,
    diagnostics: FitDiagnostics,
    n_observations: usize,
}

impl FittedHmm {
    pub fn config(&self) -> &HmmConfig {
        &self.config
    }

    pub fn parameters(&self) -> &HmmParameters {
        &self.parameters
    }

    pub fn diagnostics(&self) -> &FitDiagnostics {
        &self.diagnostics
    }

    pub fn log_likelihood(&self) -> f64 {
        self.diagnostics.log_likelihood
    }

    /// Number of estimated parameters
    pub fn n_parameters(&self) -> usize {
        HmmParameters::n_working(&self.config)
    }

    /// Number of observations the model was fitted to
    pub fn n_observations(&self) -> usize {
        self.n_observations
    }

    /// Akaike information criterion, `-2 lnL + 2k`
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.n_parameters() as f64
    }

    /// Bayesian information criterion, `-2 lnL + k ln n`
    pub fn bic(&self) -> f64 {
        -2.0 * self.log_likelihood() + self.n_parameters() as f64 * (self.n_observations as f64).ln()
    }

    /// Fail with [`Error::NonConvergence`] unless the optimiser converged
    /// to an interior optimum
    pub fn ensure_converged(&self) -> Result<&Self> {
        if self.diagnostics.is_regular() {
            Ok(self)
        } else {
            Err(Error::NonConvergence {
                log_likelihood: self.diagnostics.log_likelihood,
                iterations: self.diagnostics.iterations,
            })
        }
    }

    pub fn viterbi(&self, data: &HmmData) -> Result<Vec<Vec<usize>>> {
        likelihood::viterbi(&self.parameters, &self.config, data)
    }

    pub fn state_probabilities(&self, data: &HmmData) -> Result<Vec<DMatrix<f64>>> {
        likelihood::state_probabilities(&self.parameters, &self.config, data)
    }

    /// Viterbi path and smoothed probabilities of every sequence
    pub fn decode(&self, data: &HmmData) -> Result<StateDecoding> {
        let prepared = prepare_all(&self.parameters, &self.config, data)?;
        StateDecoding::from_prepared(data, &prepared)
    }

    /// Stationary state distribution at the given covariate values
    pub fn stationary_distribution(&self, covariates: &[f64]) -> Result<Vec<f64>> {
        if covariates.len() != self.config.n_covariates() {
            return Err(Error::size_mismatch(
                self.config.n_covariates(),
                covariates.len(),
                "covariate values",
            ));
        }
        self.parameters.stationary_distribution(covariates)
    }
}

impl fmt::Display for FittedHmm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}-state HMM fit:", self.config.n_states)?;
        writeln!(f, "  {}", self.diagnostics)?;
        writeln!(
            f,
            "  AIC {:.3}, BIC {:.3} ({} parameters, {} observations)",
            self.aic(),
            self.bic(),
            self.n_parameters(),
            self.n_observations
        )?;
        write!(f, "{}", self.parameters)
    }
}
