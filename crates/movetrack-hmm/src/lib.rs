//! Hidden Markov models of animal movement
//!
//! Each step of a track is emitted by one of N behavioural states. A state
//! draws its step length from a gamma distribution (optionally with a point
//! mass at zero) and its turning angle from a von Mises distribution. State
//! switching follows a Markov chain whose transition probabilities may
//! depend on covariates through a multinomial logit link.
//!
//! - [`config`]: model structure ([`HmmConfig`])
//! - [`parameters`]: natural and working parameters ([`HmmParameters`])
//! - [`data`]: observation sequences ([`HmmData`])
//! - [`likelihood`]: forward algorithm, smoothing and Viterbi decoding
//! - [`fit`]: maximum likelihood fitting ([`HmmFitter`], [`FittedHmm`])
//! - [`decoding`]: decoded state sequences and CSV output
//! - [`comparison`]: AIC/BIC ranking of fitted models
//! - [`simulate`](mod@simulate): synthetic tracks from known parameters
//!
//! ## Usage
//!
//! ```rust
//! use movetrack_hmm::{AngleDistribution, HmmConfig, HmmData, HmmFitter, HmmParameters, StepDistribution};
//!
//! let steps = [12.0, 9.0, 15.0, 11.0, 250.0, 310.0, 280.0, 260.0, 10.0, 14.0, 8.0, 13.0];
//! let angles = [None, Some(2.1), Some(-1.7), Some(2.9), Some(0.1), Some(-0.05),
//!               Some(0.12), Some(0.02), Some(-2.4), Some(1.5), Some(-3.0), Some(2.2)];
//! let data = HmmData::from_steps("bird", &steps, &angles).unwrap();
//!
//! let initial = HmmParameters::new(
//!     vec![StepDistribution::gamma(15.0, 10.0), StepDistribution::gamma(200.0, 100.0)],
//!     vec![AngleDistribution::von_mises(0.0, 0.5), AngleDistribution::von_mises(0.0, 5.0)],
//! ).unwrap();
//!
//! let fit = HmmFitter::new(HmmConfig::two_state()).unwrap().fit(&data, &initial).unwrap();
//! let path = fit.viterbi(&data).unwrap();
//! assert_eq!(path[0].len(), steps.len());
//! ```

pub mod comparison;
pub mod config;
pub mod data;
pub mod decoding;
pub mod distributions;
pub mod fit;
pub mod likelihood;
pub mod parameters;
pub mod simulate;

pub use comparison::{ModelComparison, ModelSummary};
pub use config::{AngleMean, HmmConfig, InitialDistribution, OptimizerKind};
pub use data::{HmmData, HmmSequence, Observation};
pub use decoding::{DecodedRow, DecodedSequence, StateDecoding};
pub use distributions::{AngleDistribution, StepDistribution};
pub use fit::{boundary_states, FitDiagnostics, FittedHmm, HmmFitter};
pub use parameters::{stationary, HmmParameters};
pub use simulate::{simulate, SimulatedTrack};
