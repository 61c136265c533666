//! Behavioural change point analysis (BCPA)
//!
//! The response, by default the persistence velocity `V cos θ`, is modelled
//! as a continuous-time autocorrelated Gaussian process whose mean, standard
//! deviation and autocorrelation may change at unknown times. A window
//! slides along the series; in each window the single most likely break is
//! located and the eight models of which parameters change across it are
//! compared by BIC. The window results are then summarised:
//!
//! - **flat**: window breaks merged by single-linkage clustering and a
//!   support threshold into change points and homogeneous phases
//! - **smooth**: per-observation averages of the window estimates and the
//!   density of breaks
//!
//! # Modules
//!
//! - [`response`]: velocity series extracted from a trajectory
//! - [`likelihood`]: segment likelihood and parameter estimates
//! - [`models`]: break search and model selection within a window
//! - [`sweep`]: the window sweep
//! - [`summary`]: flat and smooth summaries
//! - [`types`]: change models and change points
//!
//! ## Usage
//!
//! ```rust
//! use movetrack_bcpa::{ChangePointSummaryParameters, WindowSweep, WindowSweepParameters};
//!
//! let times: Vec<f64> = (0..60).map(|i| i as f64).collect();
//! let values: Vec<f64> = (0..60)
//!     .map(|i| if i < 30 { (i % 3) as f64 } else { 20.0 + (i % 4) as f64 })
//!     .collect();
//!
//! let sweep = WindowSweep::new(WindowSweepParameters::new(20, 2.0)).unwrap();
//! let result = sweep.sweep(&times, &values).unwrap();
//!
//! let flat = result.flat_summary(&ChangePointSummaryParameters::new(2.0, 3).unwrap()).unwrap();
//! assert!(flat.change_points().iter().any(|cp| (28..=32).contains(&cp.index)));
//! ```

pub mod likelihood;
pub mod models;
pub mod response;
pub mod summary;
pub mod sweep;
pub mod types;

pub use likelihood::{fit_segment, SegmentEstimate};
pub use models::{best_break, select_model, ModelScore, ModelSelection};
pub use response::{ResponseKind, VelocitySeries, VelocityStep};
pub use summary::{
    cluster_break_times, BreakCluster, ChangePointRow, ChangePointSummaryParameters, FlatSummary,
    Phase, PhaseTable, SmoothRow, SmoothSummary,
};
pub use sweep::{ModelScoreRow, ModelScoreTable, SweepResult, WindowResult, WindowRow, WindowSweep, WindowSweepParameters};
pub use types::{ChangeModel, ChangePoint};
