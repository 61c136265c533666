//! Forward algorithm, forward-backward smoothing and Viterbi decoding
//!
//! State densities are kept in log space and rescaled by their row maximum
//! before exponentiation; the forward recursion is normalised at every step
//! so long sequences never underflow. The transition into observation `t`
//! uses the covariates of observation `t`.

use crate::config::HmmConfig;
use crate::data::{HmmData, HmmSequence};
use crate::parameters::HmmParameters;
use movetrack_core::{Error, Result};
use nalgebra::DMatrix;

/// Transition matrices for one sequence
#[derive(Debug, Clone)]
pub(crate) enum Transitions {
    Constant(DMatrix<f64>),
    Varying(Vec<DMatrix<f64>>),
}

impl Transitions {
    fn at(&self, t: usize) -> &DMatrix<f64> {
        match self {
            Self::Constant(gamma) => gamma,
            Self::Varying(gammas) => &gammas[t],
        }
    }
}

/// A sequence with its state log-densities and transition schedule evaluated
#[derive(Debug, Clone)]
pub(crate) struct PreparedSequence {
    /// `T x N` log-densities of each observation under each state
    log_densities: DMatrix<f64>,
    transitions: Transitions,
    initial: Vec<f64>,
}

impl PreparedSequence {
    pub(crate) fn new(
        params: &HmmParameters,
        config: &HmmConfig,
        sequence: &HmmSequence,
        covariate_columns: &[usize],
    ) -> Result<Self> {
        let n = params.n_states();
        let length = sequence.len();
        let log_densities = DMatrix::from_fn(length, n, |t, j| {
            let obs = &sequence.observations[t];
            params.steps[j].ln_density(obs.step) + params.angles[j].ln_density(obs.angle)
        });

        let covariates_at = |t: usize| -> Vec<f64> {
            covariate_columns
                .iter()
                .map(|&k| sequence.observations[t].covariates[k])
                .collect()
        };
        let transitions = if covariate_columns.is_empty() {
            Transitions::Constant(params.transition_matrix(&[]))
        } else {
            Transitions::Varying((0..length).map(|t| params.transition_matrix(&covariates_at(t))).collect())
        };
        let first = if length > 0 { covariates_at(0) } else { Vec::new() };
        let initial = params.initial_distribution(config, &first)?;

        Ok(Self {
            log_densities,
            transitions,
            initial,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.log_densities.nrows()
    }

    fn n_states(&self) -> usize {
        self.log_densities.ncols()
    }

    /// Densities of observation `t` divided by their maximum, and that maximum's log
    fn scaled_densities(&self, t: usize) -> (Vec<f64>, f64) {
        let row = self.log_densities.row(t);
        let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return (vec![0.0; row.len()], max);
        }
        (row.iter().map(|l| (l - max).exp()).collect(), max)
    }

    /// Log-likelihood by the scaled forward recursion
    pub(crate) fn log_likelihood(&self) -> f64 {
        if self.len() == 0 {
            return 0.0;
        }
        let n = self.n_states();
        let mut phi = self.initial.clone();
        let mut total = 0.0;
        for t in 0..self.len() {
            let (p, shift) = self.scaled_densities(t);
            if t > 0 {
                phi = propagate(&phi, self.transitions.at(t));
            }
            for j in 0..n {
                phi[j] *= p[j];
            }
            let scale: f64 = phi.iter().sum();
            if !(scale > 0.0) || !shift.is_finite() {
                return f64::NEG_INFINITY;
            }
            total += scale.ln() + shift;
            phi.iter_mut().for_each(|v| *v /= scale);
        }
        total
    }

    /// Smoothed state probabilities (`T x N`) and the log-likelihood
    pub(crate) fn forward_backward(&self) -> Result<(DMatrix<f64>, f64)> {
        let length = self.len();
        let n = self.n_states();
        let mut alpha = DMatrix::zeros(length, n);
        let mut scales = vec![0.0; length];
        let mut densities = Vec::with_capacity(length);
        let mut log_likelihood = 0.0;

        let mut phi = self.initial.clone();
        for t in 0..length {
            let (p, shift) = self.scaled_densities(t);
            if t > 0 {
                phi = propagate(&phi, self.transitions.at(t));
            }
            for j in 0..n {
                phi[j] *= p[j];
            }
            let scale: f64 = phi.iter().sum();
            if !(scale > 0.0) || !shift.is_finite() {
                return Err(Error::Computation(format!(
                    "observation {t} is impossible under every state"
                )));
            }
            phi.iter_mut().for_each(|v| *v /= scale);
            for j in 0..n {
                alpha[(t, j)] = phi[j];
            }
            scales[t] = scale;
            log_likelihood += scale.ln() + shift;
            densities.push(p);
        }

        let mut probabilities = DMatrix::zeros(length, n);
        let mut beta = vec![1.0; n];
        for t in (0..length).rev() {
            if t + 1 < length {
                let gamma = self.transitions.at(t + 1);
                let p = &densities[t + 1];
                beta = (0..n)
                    .map(|i| {
                        (0..n)
                            .map(|j| gamma[(i, j)] * p[j] * beta[j])
                            .sum::<f64>()
                            / scales[t + 1]
                    })
                    .collect();
            }
            let row: Vec<f64> = (0..n).map(|j| alpha[(t, j)] * beta[j]).collect();
            let total: f64 = row.iter().sum();
            for j in 0..n {
                probabilities[(t, j)] = if total > 0.0 { row[j] / total } else { 1.0 / n as f64 };
            }
        }

        Ok((probabilities, log_likelihood))
    }

    /// Most probable state path by log-space dynamic programming
    pub(crate) fn viterbi(&self) -> Vec<usize> {
        let length = self.len();
        if length == 0 {
            return Vec::new();
        }
        let n = self.n_states();
        let ln = |p: f64| if p > 0.0 { p.ln() } else { f64::NEG_INFINITY };

        let mut score: Vec<f64> = (0..n)
            .map(|j| ln(self.initial[j]) + self.log_densities[(0, j)])
            .collect();
        let mut back = vec![vec![0usize; n]; length];

        for t in 1..length {
            let gamma = self.transitions.at(t);
            let mut next = vec![f64::NEG_INFINITY; n];
            for j in 0..n {
                let (best, value) = (0..n)
                    .map(|i| (i, score[i] + ln(gamma[(i, j)])))
                    .fold((0, f64::NEG_INFINITY), |acc, cand| if cand.1 > acc.1 { cand } else { acc });
                back[t][j] = best;
                next[j] = value + self.log_densities[(t, j)];
            }
            score = next;
        }

        let mut state = argmax(&score);
        let mut path = vec![0usize; length];
        path[length - 1] = state;
        for t in (1..length).rev() {
            state = back[t][state];
            path[t - 1] = state;
        }
        path
    }
}

fn propagate(phi: &[f64], gamma: &DMatrix<f64>) -> Vec<f64> {
    let n = phi.len();
    (0..n)
        .map(|j| (0..n).map(|i| phi[i] * gamma[(i, j)]).sum())
        .collect()
}

fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc })
        .0
}

/// Prepare every sequence of `data` under `params`
pub(crate) fn prepare_all(
    params: &HmmParameters,
    config: &HmmConfig,
    data: &HmmData,
) -> Result<Vec<PreparedSequence>> {
    let columns = data.covariate_columns(&config.transition_covariates)?;
    data.sequences()
        .iter()
        .map(|s| PreparedSequence::new(params, config, s, &columns))
        .collect()
}

/// Total log-likelihood of independent sequences
pub fn log_likelihood(params: &HmmParameters, config: &HmmConfig, data: &HmmData) -> Result<f64> {
    params.validate(config)?;
    Ok(prepare_all(params, config, data)?
        .iter()
        .map(PreparedSequence::log_likelihood)
        .sum())
}

/// Smoothed state probabilities (`T x N`) of every sequence
pub fn state_probabilities(
    params: &HmmParameters,
    config: &HmmConfig,
    data: &HmmData,
) -> Result<Vec<DMatrix<f64>>> {
    params.validate(config)?;
    prepare_all(params, config, data)?
        .iter()
        .map(|s| s.forward_backward().map(|(probs, _)| probs))
        .collect()
}

/// Most probable state path of every sequence
pub fn viterbi(params: &HmmParameters, config: &HmmConfig, data: &HmmData) -> Result<Vec<Vec<usize>>> {
    params.validate(config)?;
    Ok(prepare_all(params, config, data)?
        .iter()
        .map(PreparedSequence::viterbi)
        .collect())
}
