//! Model structure and fitting options

use movetrack_core::{Error, OptimizerSettings, Result};
use serde::{Deserialize, Serialize};

/// How the turning-angle mean is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AngleMean {
    /// Each state estimates its own mean direction
    Estimated,
    /// Mean direction fixed at zero in every state
    FixedZero,
}

/// How the distribution of the first state is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitialDistribution {
    /// Free parameters estimated with the rest of the model
    Estimated,
    /// Stationary distribution of the first transition matrix
    Stationary,
}

/// Numerical optimiser used for the likelihood fit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerKind {
    Bfgs,
    NelderMead,
}

/// Structure of an HMM and the options used to fit it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HmmConfig {
    /// Number of hidden states
    pub n_states: usize,
    pub angle_mean: AngleMean,
    /// Whether step lengths carry a point mass at zero
    pub zero_inflation: bool,
    pub initial_distribution: InitialDistribution,
    /// Covariates entering the transition probabilities, in data order
    pub transition_covariates: Vec<String>,
    pub optimizer: OptimizerKind,
    pub settings: OptimizerSettings,
}

impl Default for HmmConfig {
    fn default() -> Self {
        Self::two_state()
    }
}

impl HmmConfig {
    /// Two states, estimated angle means, no covariates, BFGS
    pub fn two_state() -> Self {
        Self::with_states(2)
    }

    pub fn with_states(n_states: usize) -> Self {
        Self {
            n_states,
            angle_mean: AngleMean::Estimated,
            zero_inflation: false,
            initial_distribution: InitialDistribution::Estimated,
            transition_covariates: Vec::new(),
            optimizer: OptimizerKind::Bfgs,
            settings: OptimizerSettings::default(),
        }
    }

    pub fn with_angle_mean(mut self, angle_mean: AngleMean) -> Self {
        self.angle_mean = angle_mean;
        self
    }

    pub fn with_zero_inflation(mut self, zero_inflation: bool) -> Self {
        self.zero_inflation = zero_inflation;
        self
    }

    pub fn with_initial_distribution(mut self, initial: InitialDistribution) -> Self {
        self.initial_distribution = initial;
        self
    }

    pub fn with_transition_covariates<I, S>(mut self, covariates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.transition_covariates = covariates.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_optimizer(mut self, optimizer: OptimizerKind) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_settings(mut self, settings: OptimizerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn n_covariates(&self) -> usize {
        self.transition_covariates.len()
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_states == 0 {
            return Err(Error::InvalidParameter(
                "an HMM needs at least one state".to_string(),
            ));
        }
        if self.n_states == 1 && self.n_covariates() > 0 {
            return Err(Error::InvalidParameter(
                "a single-state model has no transitions for covariates to act on".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = HmmConfig::two_state()
            .with_angle_mean(AngleMean::FixedZero)
            .with_transition_covariates(["temp"])
            .with_optimizer(OptimizerKind::NelderMead);
        assert_eq!(config.n_states, 2);
        assert_eq!(config.n_covariates(), 1);
        assert!(config.validate().is_ok());
        assert!(HmmConfig::with_states(0).validate().is_err());
        assert!(HmmConfig::with_states(1)
            .with_transition_covariates(["temp"])
            .validate()
            .is_err());
    }
}
