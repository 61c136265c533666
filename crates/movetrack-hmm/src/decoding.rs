//! Decoded state sequences

use crate::data::HmmData;
use crate::likelihood::PreparedSequence;
use movetrack_core::{Error, Result, TabularOutput};
use nalgebra::DMatrix;
use serde::Serialize;

/// Viterbi path and smoothed probabilities of one sequence
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSequence {
    pub id: String,
    /// Most probable state of every observation (0-based)
    pub states: Vec<usize>,
    /// `T x N` smoothed state probabilities
    pub probabilities: DMatrix<f64>,
    pub log_likelihood: f64,
}

impl DecodedSequence {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of observations assigned to each state
    pub fn state_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.probabilities.ncols()];
        for &s in &self.states {
            counts[s] += 1;
        }
        counts
    }

    /// Index of the first observation of each run of identical states
    pub fn switches(&self) -> Vec<usize> {
        self.states
            .windows(2)
            .enumerate()
            .filter(|(_, w)| w[0] != w[1])
            .map(|(t, _)| t + 1)
            .collect()
    }
}

/// Decoding of every sequence of a dataset
#[derive(Debug, Clone, PartialEq)]
pub struct StateDecoding {
    sequences: Vec<DecodedSequence>,
    steps: Vec<Vec<(Option<f64>, Option<f64>)>>,
}

impl StateDecoding {
    pub(crate) fn from_prepared(data: &HmmData, prepared: &[PreparedSequence]) -> Result<Self> {
        if data.sequences().len() != prepared.len() {
            return Err(Error::size_mismatch(
                data.sequences().len(),
                prepared.len(),
                "prepared sequences",
            ));
        }
        let sequences = data
            .sequences()
            .iter()
            .zip(prepared)
            .map(|(sequence, p)| {
                let (probabilities, log_likelihood) = p.forward_backward()?;
                Ok(DecodedSequence {
                    id: sequence.id.clone(),
                    states: p.viterbi(),
                    probabilities,
                    log_likelihood,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let steps = data
            .sequences()
            .iter()
            .map(|s| s.observations.iter().map(|o| (o.step, o.angle)).collect())
            .collect();
        Ok(Self { sequences, steps })
    }

    pub fn sequences(&self) -> &[DecodedSequence] {
        &self.sequences
    }

    pub fn sequence(&self, id: &str) -> Option<&DecodedSequence> {
        self.sequences.iter().find(|s| s.id == id)
    }
}

/// One decoded observation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedRow {
    pub sequence: String,
    pub index: usize,
    pub step: Option<f64>,
    pub angle: Option<f64>,
    /// Viterbi state, numbered from 1
    pub state: usize,
    /// Smoothed probability of the Viterbi state
    pub probability: f64,
}

impl TabularOutput for StateDecoding {
    type Row = DecodedRow;

    fn rows(&self) -> Vec<DecodedRow> {
        self.sequences
            .iter()
            .zip(&self.steps)
            .flat_map(|(decoded, steps)| {
                decoded.states.iter().enumerate().map(move |(t, &state)| DecodedRow {
                    sequence: decoded.id.clone(),
                    index: t,
                    step: steps[t].0,
                    angle: steps[t].1,
                    state: state + 1,
                    probability: decoded.probabilities[(t, state)],
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switches_and_counts() {
        let decoded = DecodedSequence {
            id: "a".to_string(),
            states: vec![0, 0, 1, 1, 0],
            probabilities: DMatrix::from_element(5, 2, 0.5),
            log_likelihood: -1.0,
        };
        assert_eq!(decoded.switches(), vec![2, 4]);
        assert_eq!(decoded.state_counts(), vec![3, 2]);
    }
}
