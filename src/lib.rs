//! Animal movement analysis toolkit
//!
//! Re-exports the workspace crates under one roof:
//!
//! - [`core`]: error type, circular maths, optimisers and result tables
//! - [`track`]: Movebank loading, UTM projection and path metrics
//! - [`fpt`]: first passage time curves
//! - [`hmm`]: gamma / von Mises hidden Markov models
//! - [`bcpa`]: behavioural change point analysis
//!
//! # Example
//!
//! ```rust
//! use movetrack::prelude::*;
//!
//! let params = FptParameters::by_step(10.0, 50.0, 10.0).unwrap();
//! assert_eq!(params.radii.len(), 5);
//! ```

pub use movetrack_bcpa as bcpa;
pub use movetrack_core as core;
pub use movetrack_fpt as fpt;
pub use movetrack_hmm as hmm;
pub use movetrack_track as track;

pub use movetrack_core::{Error, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use movetrack_core::prelude::*;

    pub use movetrack_track::{
        Hemisphere, LoaderConfig, ProjectedTrack, ProjectionConfig, Track, TrackLoader, Trajectory,
    };

    pub use movetrack_fpt::{FirstPassageTime, FptParameters};

    pub use movetrack_hmm::{
        AngleDistribution, HmmConfig, HmmData, HmmFitter, HmmParameters, ModelComparison,
        StepDistribution,
    };

    pub use movetrack_bcpa::{
        ChangePointSummaryParameters, ResponseKind, VelocitySeries, WindowSweep,
        WindowSweepParameters,
    };
}
