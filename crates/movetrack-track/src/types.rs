//! Track types: geographic relocations, projected tracks and per-individual trajectories

use crate::config::ProjectionConfig;
use crate::metrics::{self, PathMetricTable, Step};
use crate::projection::UtmProjection;
use chrono::{DateTime, Utc};
use movetrack_core::time::duration_hours;
use movetrack_core::{Error, Result};
use std::fmt;
use tracing::{debug, warn};

/// Longitude offset from the central meridian beyond which UTM distortion is notable
const ZONE_HALF_WIDTH_DEGREES: f64 = 3.0;

/// One GPS fix in geographic coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Relocation {
    pub individual_id: String,
    pub tag_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Longitude in degrees
    pub longitude: f64,
    /// Latitude in degrees
    pub latitude: f64,
    /// Covariate values, aligned with [`Track::covariate_names`]
    pub covariates: Vec<f64>,
}

/// Relocations of one or more individuals
///
/// Records are grouped by individual in first-seen order and sorted by
/// timestamp within each individual, so timestamps never decrease inside an
/// individual's sub-sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    records: Vec<Relocation>,
    covariate_names: Vec<String>,
}

impl Track {
    pub fn new(records: Vec<Relocation>, covariate_names: Vec<String>) -> Result<Self> {
        if let Some(bad) = records
            .iter()
            .find(|r| r.covariates.len() != covariate_names.len())
        {
            return Err(Error::size_mismatch(
                covariate_names.len(),
                bad.covariates.len(),
                "relocation covariates",
            ));
        }

        let records = group_and_sort(records, |r| r.individual_id.as_str(), |r| r.timestamp);
        Ok(Self {
            records,
            covariate_names,
        })
    }

    pub fn records(&self) -> &[Relocation] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn covariate_names(&self) -> &[String] {
        &self.covariate_names
    }

    /// Individual identifiers in the order they first appear
    pub fn individuals(&self) -> Vec<&str> {
        individuals_in_order(self.records.iter().map(|r| r.individual_id.as_str()))
    }

    /// Sub-track holding only `individual_id`
    pub fn individual(&self, individual_id: &str) -> Option<Track> {
        let records: Vec<Relocation> = self
            .records
            .iter()
            .filter(|r| r.individual_id == individual_id)
            .cloned()
            .collect();
        if records.is_empty() {
            None
        } else {
            Some(Self {
                records,
                covariate_names: self.covariate_names.clone(),
            })
        }
    }

    /// Reproject every relocation to UTM metres
    pub fn project(&self, config: &ProjectionConfig) -> Result<ProjectedTrack> {
        let projection = UtmProjection::new(*config)?;
        let mut outside_zone = 0usize;

        let records = self
            .records
            .iter()
            .map(|r| {
                if projection.meridian_offset(r.longitude) > ZONE_HALF_WIDTH_DEGREES {
                    outside_zone += 1;
                }
                let (x, y) = projection.project(r.longitude, r.latitude)?;
                Ok(ProjectedRelocation {
                    individual_id: r.individual_id.clone(),
                    tag_id: r.tag_id.clone(),
                    timestamp: r.timestamp,
                    x,
                    y,
                    covariates: r.covariates.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if outside_zone > 0 {
            warn!(
                outside_zone,
                zone = config.zone,
                "relocations lie outside the configured UTM zone; distances will be distorted"
            );
        }
        debug!(records = records.len(), projection = %config, "projected track");

        Ok(ProjectedTrack {
            records,
            covariate_names: self.covariate_names.clone(),
            projection: *config,
        })
    }
}

/// One GPS fix in projected metres
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedRelocation {
    pub individual_id: String,
    pub tag_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    /// Easting in metres
    pub x: f64,
    /// Northing in metres
    pub y: f64,
    pub covariates: Vec<f64>,
}

/// A track reprojected to planar metres
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedTrack {
    records: Vec<ProjectedRelocation>,
    covariate_names: Vec<String>,
    projection: ProjectionConfig,
}

impl ProjectedTrack {
    pub fn records(&self) -> &[ProjectedRelocation] {
        &self.records
    }

    pub fn projection(&self) -> &ProjectionConfig {
        &self.projection
    }

    pub fn covariate_names(&self) -> &[String] {
        &self.covariate_names
    }

    pub fn individuals(&self) -> Vec<&str> {
        individuals_in_order(self.records.iter().map(|r| r.individual_id.as_str()))
    }

    /// Trajectory of a single individual
    pub fn trajectory(&self, individual_id: &str) -> Result<Trajectory> {
        let fixes: Vec<Fix> = self
            .records
            .iter()
            .filter(|r| r.individual_id == individual_id)
            .map(|r| Fix {
                timestamp: r.timestamp,
                x: r.x,
                y: r.y,
                covariates: r.covariates.clone(),
            })
            .collect();
        if fixes.is_empty() {
            return Err(Error::InvalidInput(format!(
                "no relocations for individual '{individual_id}'"
            )));
        }
        Trajectory::new(individual_id, fixes, self.covariate_names.clone())
    }

    /// Trajectories of all individuals, in first-seen order
    pub fn trajectories(&self) -> Result<Vec<Trajectory>> {
        self.individuals()
            .into_iter()
            .map(|id| self.trajectory(id))
            .collect()
    }
}

/// A projected fix of a single individual
#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    pub timestamp: DateTime<Utc>,
    pub x: f64,
    pub y: f64,
    pub covariates: Vec<f64>,
}

impl Fix {
    pub fn new(timestamp: DateTime<Utc>, x: f64, y: f64) -> Self {
        Self {
            timestamp,
            x,
            y,
            covariates: Vec::new(),
        }
    }
}

/// The time-ordered path of one individual in planar coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    individual_id: String,
    fixes: Vec<Fix>,
    covariate_names: Vec<String>,
}

impl Trajectory {
    /// Build a trajectory; timestamps must be non-decreasing
    pub fn new(
        individual_id: impl Into<String>,
        fixes: Vec<Fix>,
        covariate_names: Vec<String>,
    ) -> Result<Self> {
        if let Some(i) = fixes
            .windows(2)
            .position(|w| w[1].timestamp < w[0].timestamp)
        {
            return Err(Error::InvalidInput(format!(
                "timestamps decrease between fixes {} and {}",
                i,
                i + 1
            )));
        }
        if let Some(i) = fixes
            .iter()
            .position(|f| !f.x.is_finite() || !f.y.is_finite())
        {
            return Err(Error::InvalidInput(format!("fix {i} has non-finite coordinates")));
        }
        if let Some(bad) = fixes.iter().find(|f| f.covariates.len() != covariate_names.len()) {
            return Err(Error::size_mismatch(
                covariate_names.len(),
                bad.covariates.len(),
                "fix covariates",
            ));
        }
        Ok(Self {
            individual_id: individual_id.into(),
            fixes,
            covariate_names,
        })
    }

    /// Regularly sampled trajectory from planar points
    pub fn from_xy(
        individual_id: impl Into<String>,
        start: DateTime<Utc>,
        interval_hours: f64,
        points: &[(f64, f64)],
    ) -> Result<Self> {
        if !(interval_hours >= 0.0) {
            return Err(Error::InvalidParameter(format!(
                "sampling interval must be non-negative, got {interval_hours}"
            )));
        }
        let fixes = points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                let offset = chrono::Duration::milliseconds(
                    (i as f64 * interval_hours * 3_600_000.0).round() as i64,
                );
                Fix::new(start + offset, x, y)
            })
            .collect();
        Self::new(individual_id, fixes, Vec::new())
    }

    pub fn individual_id(&self) -> &str {
        &self.individual_id
    }

    pub fn fixes(&self) -> &[Fix] {
        &self.fixes
    }

    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    pub fn covariate_names(&self) -> &[String] {
        &self.covariate_names
    }

    /// Values of a named covariate at every fix
    pub fn covariate(&self, name: &str) -> Option<Vec<f64>> {
        let column = self.covariate_names.iter().position(|n| n == name)?;
        Some(self.fixes.iter().map(|f| f.covariates[column]).collect())
    }

    /// Hours elapsed since the first fix, for every fix
    pub fn elapsed_hours(&self) -> Vec<f64> {
        match self.fixes.first() {
            Some(first) => self
                .fixes
                .iter()
                .map(|f| duration_hours(first.timestamp, f.timestamp))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Steps between consecutive fixes
    pub fn steps(&self) -> Vec<Step> {
        metrics::steps(&self.fixes)
    }

    /// Squared distance of every fix from the first fix
    pub fn net_squared_displacement(&self) -> Vec<f64> {
        metrics::net_squared_displacement(&self.fixes)
    }

    /// Per-fix path metric table
    pub fn path_metrics(&self) -> PathMetricTable {
        PathMetricTable::from_trajectory(self)
    }

    /// Same timestamps with coordinates mapped through `f`
    pub fn map_coordinates<F>(&self, mut f: F) -> Result<Self>
    where
        F: FnMut(f64, f64) -> (f64, f64),
    {
        let fixes = self
            .fixes
            .iter()
            .map(|fix| {
                let (x, y) = f(fix.x, fix.y);
                Fix { x, y, ..fix.clone() }
            })
            .collect();
        Self::new(self.individual_id.clone(), fixes, self.covariate_names.clone())
    }
}

impl fmt::Display for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.fixes.first(), self.fixes.last()) {
            (Some(first), Some(last)) => write!(
                f,
                "Trajectory {} ({} fixes, {} to {})",
                self.individual_id,
                self.fixes.len(),
                first.timestamp.to_rfc3339(),
                last.timestamp.to_rfc3339()
            ),
            _ => write!(f, "Trajectory {} (empty)", self.individual_id),
        }
    }
}

fn individuals_in_order<'a>(ids: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = Vec::new();
    for id in ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

/// Group records by individual (first-seen order), stable-sorting each group by time
fn group_and_sort<T, K, S>(records: Vec<T>, key: K, time: S) -> Vec<T>
where
    K: Fn(&T) -> &str,
    S: Fn(&T) -> DateTime<Utc>,
{
    let mut order: Vec<String> = Vec::new();
    for record in &records {
        let id = key(record);
        if !order.iter().any(|o| o == id) {
            order.push(id.to_string());
        }
    }

    let mut indexed: Vec<(usize, T)> = records
        .into_iter()
        .map(|r| {
            let group = order.iter().position(|o| o == key(&r)).unwrap_or(0);
            (group, r)
        })
        .collect();

    let was_sorted = indexed
        .windows(2)
        .all(|w| (w[0].0, time(&w[0].1)) <= (w[1].0, time(&w[1].1)));
    if !was_sorted {
        debug!("reordered relocations by individual and timestamp");
    }
    indexed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| time(&a.1).cmp(&time(&b.1))));
    indexed.into_iter().map(|(_, r)| r).collect()
}
