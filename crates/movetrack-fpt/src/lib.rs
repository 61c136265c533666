//! First passage time (FPT) analysis
//!
//! For every fix of a trajectory and every radius of a sweep, the FPT is the
//! time the animal needs to leave a circle of that radius centred on the fix.
//! The variance of ln(FPT) across fixes, plotted against radius, peaks at the
//! spatial scale at which the animal concentrates its search effort.
//!
//! - [`parameters`]: the radius sweep
//! - [`passage`]: the passage time computation and [`FirstPassageTime`] analyzer
//! - [`curve`]: the log-variance curve and CSV tables
//!
//! ## Usage
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use movetrack_fpt::{FirstPassageTime, FptParameters};
//! use movetrack_track::Trajectory;
//!
//! let start = Utc.with_ymd_and_hms(2012, 5, 1, 0, 0, 0).unwrap();
//! let points: Vec<(f64, f64)> = (0..20).map(|i| (i as f64 * 100.0, 0.0)).collect();
//! let trajectory = Trajectory::from_xy("A", start, 1.0, &points).unwrap();
//!
//! let analyzer = FirstPassageTime::new(FptParameters::linear(50.0, 500.0, 10).unwrap()).unwrap();
//! let result = analyzer.analyze(&trajectory).unwrap();
//! for point in result.curve().points() {
//!     assert!(point.log_variance.map_or(true, |v| v >= 0.0));
//! }
//! ```

pub mod curve;
pub mod parameters;
pub mod passage;

pub use curve::{FptCurve, FptCurvePoint, FptMatrix, FptRow};
pub use parameters::FptParameters;
pub use passage::{passage_times, FirstPassageTime, FptResult};
