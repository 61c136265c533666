//! Simulation from a parameterised HMM
//!
//! Used to generate synthetic tracks with a known state sequence, for
//! checking that a fit recovers the parameters it was simulated from.

use crate::config::HmmConfig;
use crate::data::{HmmData, HmmSequence, Observation};
use crate::parameters::HmmParameters;
use movetrack_core::math::circular::wrap_angle;
use movetrack_core::{Error, Result};
use rand::Rng;
use std::f64::consts::PI;
use tracing::debug;

/// A simulated state sequence with its observations and positions
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedTrack {
    /// True state of every step (0-based)
    pub states: Vec<usize>,
    /// Step lengths and turning angles; the first angle is undefined
    pub sequence: HmmSequence,
    /// Positions of the `len + 1` fixes, starting at the origin
    pub positions: Vec<(f64, f64)>,
}

impl SimulatedTrack {
    /// Wrap the simulated sequence as a dataset with the given covariate names
    pub fn into_data(self, covariate_names: Vec<String>) -> Result<HmmData> {
        HmmData::new(vec![self.sequence], covariate_names)
    }
}

/// Simulate `length` steps
///
/// `covariates` is either empty or holds one row of covariate values per
/// step, in the order of the configuration's transition covariates.
pub fn simulate<R: Rng + ?Sized>(
    params: &HmmParameters,
    config: &HmmConfig,
    id: &str,
    length: usize,
    covariates: &[Vec<f64>],
    rng: &mut R,
) -> Result<SimulatedTrack> {
    params.validate(config)?;
    let ncov = config.n_covariates();
    if ncov > 0 && covariates.len() != length {
        return Err(Error::size_mismatch(length, covariates.len(), "covariate rows"));
    }
    if let Some(row) = covariates.iter().find(|row| row.len() != ncov) {
        return Err(Error::size_mismatch(ncov, row.len(), "covariate values"));
    }
    let covariates_at = |t: usize| row_at(covariates, t);

    let mut states = Vec::with_capacity(length);
    let mut observations = Vec::with_capacity(length);
    let mut positions = Vec::with_capacity(length + 1);
    let (mut x, mut y) = (0.0, 0.0);
    let mut heading = rng.gen_range(-PI..PI);
    positions.push((x, y));

    for t in 0..length {
        let probabilities = if t == 0 {
            params.initial_distribution(config, covariates_at(0))?
        } else {
            let gamma = params.transition_matrix(covariates_at(t));
            let previous = states[t - 1];
            gamma.row(previous).iter().copied().collect()
        };
        let state = draw(&probabilities, rng);
        states.push(state);

        let step = params.steps[state].sample(rng)?;
        let angle = if t == 0 {
            None
        } else {
            let turn = params.angles[state].sample(rng);
            heading = wrap_angle(heading + turn);
            Some(turn)
        };
        x += step * heading.cos();
        y += step * heading.sin();
        positions.push((x, y));

        observations.push(Observation {
            step: Some(step),
            angle,
            covariates: covariates_at(t).to_vec(),
        });
    }

    debug!(id, length, "simulated HMM track");
    Ok(SimulatedTrack {
        states,
        sequence: HmmSequence {
            id: id.to_string(),
            observations,
        },
        positions,
    })
}

fn row_at(covariates: &[Vec<f64>], t: usize) -> &[f64] {
    covariates.get(t).map(Vec::as_slice).unwrap_or(&[])
}

/// Draw an index from a discrete distribution
fn draw<R: Rng + ?Sized>(probabilities: &[f64], rng: &mut R) -> usize {
    let u: f64 = rng.gen();
    let mut cumulative = 0.0;
    for (i, p) in probabilities.iter().enumerate() {
        cumulative += p;
        if u < cumulative {
            return i;
        }
    }
    probabilities.len().saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::{AngleDistribution, StepDistribution};
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params() -> HmmParameters {
        HmmParameters::new(
            vec![StepDistribution::gamma(20.0, 10.0), StepDistribution::gamma(300.0, 100.0)],
            vec![
                AngleDistribution::von_mises(PI, 0.5),
                AngleDistribution::von_mises(0.0, 8.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_simulated_shapes() {
        let mut rng = StdRng::seed_from_u64(7);
        let sim = simulate(&params(), &HmmConfig::two_state(), "sim", 50, &[], &mut rng).unwrap();
        assert_eq!(sim.states.len(), 50);
        assert_eq!(sim.sequence.len(), 50);
        assert_eq!(sim.positions.len(), 51);
        assert!(sim.sequence.observations[0].angle.is_none());
        assert!(sim.sequence.observations[1..].iter().all(|o| o.angle.is_some()));

        let (x0, y0) = sim.positions[0];
        let (x1, y1) = sim.positions[1];
        let first = sim.sequence.observations[0].step.unwrap();
        assert_abs_diff_eq!((x1 - x0).hypot(y1 - y0), first, epsilon = 1e-9);
    }

    #[test]
    fn test_covariate_rows_must_match_length() {
        let config = HmmConfig::two_state().with_transition_covariates(["temp"]);
        let p = params().with_covariate_count(1);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(simulate(&p, &config, "sim", 5, &vec![vec![0.0]; 4], &mut rng).is_err());
        let sim = simulate(&p, &config, "sim", 5, &vec![vec![0.0]; 5], &mut rng).unwrap();
        let data = sim.into_data(vec!["temp".to_string()]).unwrap();
        assert_eq!(data.n_observations(), 5);
    }

    #[test]
    fn test_draw() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(draw(&[0.0, 1.0], &mut rng), 1);
        assert_eq!(draw(&[1.0, 0.0], &mut rng), 0);
    }
}
