//! Core types, traits and numerical routines for movement analysis
//!
//! This crate provides the shared foundation of the movetrack workspace:
//!
//! - [`error`]: the unified [`Error`] type and [`Result`] alias
//! - [`math`]: circular arithmetic, log-densities and sample statistics
//! - [`optimize`]: BFGS, Nelder-Mead and golden-section minimisation with
//!   explicit convergence diagnostics
//! - [`traits`]: analyzer properties and CSV-dumpable result tables
//! - [`time`]: timestamp parsing and durations in hours
//!
//! # Example
//!
//! ```rust
//! use movetrack_core::optimize::{bfgs, OptimizerSettings};
//!
//! let outcome = bfgs(|x| (x[0] - 2.0).powi(2), &[0.0], &OptimizerSettings::default()).unwrap();
//! assert!(outcome.converged);
//! assert!((outcome.x[0] - 2.0).abs() < 1e-4);
//! ```

pub mod error;
pub mod math;
pub mod optimize;
pub mod time;
pub mod traits;

// Re-export core types
pub use error::{Error, Result};
pub use optimize::{OptimizationOutcome, OptimizerSettings};
pub use traits::{AnalyzerProperties, TabularOutput};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::optimize::{OptimizationOutcome, OptimizerSettings};
    pub use crate::traits::{AnalyzerProperties, TabularOutput};
}
