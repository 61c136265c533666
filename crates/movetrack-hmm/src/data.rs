//! Observation sequences for HMM fitting
//!
//! One sequence per individual. Each observation is a step (length and the
//! turning angle at its start) plus the covariate values at the fix the step
//! leaves from. Sequences are independent: the likelihood is the product of
//! the per-sequence likelihoods.

use movetrack_core::{Error, Result};
use movetrack_track::Trajectory;
use tracing::debug;

/// One step of one individual
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Step length in metres, `None` when missing
    pub step: Option<f64>,
    /// Turning angle in radians, `None` when undefined
    pub angle: Option<f64>,
    /// Covariate values, aligned with [`HmmData::covariate_names`]
    pub covariates: Vec<f64>,
}

impl Observation {
    pub fn new(step: Option<f64>, angle: Option<f64>) -> Self {
        Self {
            step,
            angle,
            covariates: Vec::new(),
        }
    }
}

/// The observations of one individual, in time order
#[derive(Debug, Clone, PartialEq)]
pub struct HmmSequence {
    pub id: String,
    pub observations: Vec<Observation>,
}

impl HmmSequence {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Independent observation sequences sharing one set of covariates
#[derive(Debug, Clone, PartialEq)]
pub struct HmmData {
    sequences: Vec<HmmSequence>,
    covariate_names: Vec<String>,
}

impl HmmData {
    pub fn new(sequences: Vec<HmmSequence>, covariate_names: Vec<String>) -> Result<Self> {
        for sequence in &sequences {
            for (t, obs) in sequence.observations.iter().enumerate() {
                if obs.covariates.len() != covariate_names.len() {
                    return Err(Error::size_mismatch(
                        covariate_names.len(),
                        obs.covariates.len(),
                        "observation covariates",
                    ));
                }
                if let Some(k) = obs.covariates.iter().position(|z| !z.is_finite()) {
                    return Err(Error::InvalidInput(format!(
                        "covariate '{}' is missing at observation {t} of sequence '{}'",
                        covariate_names[k], sequence.id
                    )));
                }
                if obs.step.is_some_and(|s| !(s >= 0.0) || !s.is_finite()) {
                    return Err(Error::InvalidInput(format!(
                        "invalid step length at observation {t} of sequence '{}'",
                        sequence.id
                    )));
                }
                if obs.angle.is_some_and(|a| !a.is_finite()) {
                    return Err(Error::non_finite("turning angles"));
                }
            }
        }
        Ok(Self {
            sequences,
            covariate_names,
        })
    }

    /// Single sequence from parallel step-length and turning-angle slices
    pub fn from_steps(id: &str, steps: &[f64], angles: &[Option<f64>]) -> Result<Self> {
        if steps.len() != angles.len() {
            return Err(Error::size_mismatch(steps.len(), angles.len(), "turning angles"));
        }
        let observations = steps
            .iter()
            .zip(angles)
            .map(|(&s, &a)| Observation::new(Some(s), a))
            .collect();
        Self::new(
            vec![HmmSequence {
                id: id.to_string(),
                observations,
            }],
            Vec::new(),
        )
    }

    /// Steps of one trajectory, with the named covariates taken at each step's first fix
    pub fn from_trajectory(trajectory: &Trajectory, covariates: &[&str]) -> Result<Self> {
        Self::from_trajectories(std::slice::from_ref(trajectory), covariates)
    }

    /// Steps of several trajectories, one sequence each
    pub fn from_trajectories(trajectories: &[Trajectory], covariates: &[&str]) -> Result<Self> {
        let mut sequences = Vec::with_capacity(trajectories.len());
        for trajectory in trajectories {
            let columns = covariates
                .iter()
                .map(|name| {
                    trajectory.covariate(name).ok_or_else(|| {
                        Error::Configuration(format!(
                            "trajectory '{}' has no covariate '{name}'",
                            trajectory.individual_id()
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let observations = trajectory
                .steps()
                .iter()
                .map(|step| Observation {
                    step: Some(step.length),
                    angle: step.turn_angle,
                    covariates: columns.iter().map(|c| c[step.index]).collect(),
                })
                .collect();
            sequences.push(HmmSequence {
                id: trajectory.individual_id().to_string(),
                observations,
            });
        }
        debug!(
            sequences = sequences.len(),
            covariates = covariates.len(),
            "prepared HMM observation sequences"
        );
        Self::new(sequences, covariates.iter().map(|s| s.to_string()).collect())
    }

    pub fn sequences(&self) -> &[HmmSequence] {
        &self.sequences
    }

    pub fn covariate_names(&self) -> &[String] {
        &self.covariate_names
    }

    /// Total number of observations over all sequences
    pub fn n_observations(&self) -> usize {
        self.sequences.iter().map(HmmSequence::len).sum()
    }

    /// Number of zero-length steps
    pub fn zero_steps(&self) -> usize {
        self.sequences
            .iter()
            .flat_map(|s| &s.observations)
            .filter(|o| o.step == Some(0.0))
            .count()
    }

    /// Column indices of the named covariates
    pub fn covariate_columns(&self, names: &[String]) -> Result<Vec<usize>> {
        names
            .iter()
            .map(|name| {
                self.covariate_names
                    .iter()
                    .position(|c| c == name)
                    .ok_or_else(|| {
                        Error::Configuration(format!("covariate '{name}' is not in the data"))
                    })
            })
            .collect()
    }
}
