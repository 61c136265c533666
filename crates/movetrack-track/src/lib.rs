//! GPS track loading, UTM projection and path metrics
//!
//! This crate turns a delimited relocation file into per-individual
//! trajectories in projected metres:
//!
//! - [`loader`]: reads Movebank-style files, dropping incomplete rows
//! - [`config`]: column layout and projection parameters
//! - [`projection`]: forward UTM projection
//! - [`types`]: [`Track`], [`ProjectedTrack`] and [`Trajectory`]
//! - [`metrics`]: steps, turning angles and the path metric table
//!
//! ## Usage
//!
//! ```rust
//! use movetrack_track::{Hemisphere, LoaderConfig, ProjectionConfig, TrackLoader};
//!
//! let data = "timestamp,location-long,location-lat,individual-local-identifier\n\
//!             2009-02-10 19:00:00,15.00,45.0,A\n\
//!             2009-02-10 20:00:00,15.01,45.0,A\n";
//! let loader = TrackLoader::new(LoaderConfig::movebank_csv());
//! let (track, report) = loader.from_reader(data.as_bytes()).unwrap();
//! assert_eq!(report.rows_kept, 2);
//!
//! let projection = ProjectionConfig::utm(33, Hemisphere::North).unwrap();
//! let trajectory = track.project(&projection).unwrap().trajectory("A").unwrap();
//! let steps = trajectory.steps();
//! assert!(steps[0].length > 700.0 && steps[0].length < 900.0);
//! ```

pub mod config;
pub mod loader;
pub mod metrics;
pub mod projection;
pub mod types;

pub use config::{Ellipsoid, Hemisphere, LoaderConfig, ProjectionConfig};
pub use loader::{LoadReport, TrackLoader};
pub use metrics::{PathMetric, PathMetricTable, Step};
pub use projection::UtmProjection;
pub use types::{Fix, ProjectedRelocation, ProjectedTrack, Relocation, Track, Trajectory};
