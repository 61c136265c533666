//! First passage time computation
//!
//! The first passage time of fix `i` at radius `r` is the time between the
//! animal entering and leaving the circle of radius `r` centred on fix `i`.
//! Both crossings are located by linear interpolation along the segment that
//! crosses the circle. A passage that does not close before the track starts
//! or ends is censored and reported as `None`.

use crate::curve::{FptCurve, FptCurvePoint};
use crate::parameters::FptParameters;
use movetrack_core::math::statistics::{mean, sample_variance};
use movetrack_core::{AnalyzerProperties, Error, Result};
use movetrack_track::{Fix, Trajectory};
use tracing::{debug, instrument};

/// Fraction along the segment `from -> to` where it leaves the circle
///
/// `from` must lie inside or on the circle and `to` outside it.
fn exit_fraction(center: (f64, f64), from: (f64, f64), to: (f64, f64), radius: f64) -> f64 {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let (ex, ey) = (from.0 - center.0, from.1 - center.1);
    let a = dx * dx + dy * dy;
    let b = ex * dx + ey * dy;
    let c = ex * ex + ey * ey - radius * radius;
    if a <= 0.0 {
        return 0.0;
    }
    let discriminant = (b * b - a * c).max(0.0);
    ((-b + discriminant.sqrt()) / a).clamp(0.0, 1.0)
}

/// Time at which the path leaves the circle when walking away from `center_index`
fn crossing_time(
    xy: &[(f64, f64)],
    hours: &[f64],
    center_index: usize,
    radius: f64,
    forward: bool,
) -> Option<f64> {
    let center = xy[center_index];
    let r2 = radius * radius;
    let outside = |p: (f64, f64)| {
        let (dx, dy) = (p.0 - center.0, p.1 - center.1);
        dx * dx + dy * dy > r2
    };

    let mut previous = center_index;
    loop {
        let next = if forward {
            let n = previous + 1;
            if n >= xy.len() {
                return None;
            }
            n
        } else {
            previous.checked_sub(1)?
        };
        if outside(xy[next]) {
            let t = exit_fraction(center, xy[previous], xy[next], radius);
            return Some(hours[previous] + t * (hours[next] - hours[previous]));
        }
        previous = next;
    }
}

/// First passage times of every fix at one radius
pub fn passage_times(fixes: &[Fix], hours: &[f64], radius: f64) -> Vec<Option<f64>> {
    let xy: Vec<(f64, f64)> = fixes.iter().map(|f| (f.x, f.y)).collect();
    (0..xy.len())
        .map(|i| {
            let exit_before = crossing_time(&xy, hours, i, radius, false)?;
            let exit_after = crossing_time(&xy, hours, i, radius, true)?;
            Some(exit_after - exit_before)
        })
        .collect()
}

/// First passage time analyzer for a single individual
#[derive(Debug, Clone)]
pub struct FirstPassageTime {
    params: FptParameters,
}

impl FirstPassageTime {
    pub fn new(params: FptParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn parameters(&self) -> &FptParameters {
        &self.params
    }

    /// Compute passage times and the log-variance curve for every radius
    #[instrument(skip(self, trajectory), fields(individual = trajectory.individual_id(), radii = self.params.radii.len()))]
    pub fn analyze(&self, trajectory: &Trajectory) -> Result<FptResult> {
        let n = trajectory.len();
        if n < self.minimum_sample_size() {
            return Err(Error::InsufficientData {
                expected: self.minimum_sample_size(),
                actual: n,
            });
        }

        let hours = trajectory.elapsed_hours();
        let mut passage = Vec::with_capacity(self.params.radii.len());
        let mut points = Vec::with_capacity(self.params.radii.len());

        for &radius in &self.params.radii {
            let times = passage_times(trajectory.fixes(), &hours, radius);
            let point = summarise_radius(radius, &times);
            debug!(
                radius,
                uncensored = point.uncensored,
                log_variance = ?point.log_variance,
                "first passage times computed"
            );
            points.push(point);
            passage.push(times);
        }

        Ok(FptResult {
            individual_id: trajectory.individual_id().to_string(),
            elapsed_hours: hours,
            radii: self.params.radii.clone(),
            passage,
            curve: FptCurve::new(points),
        })
    }
}

impl AnalyzerProperties for FirstPassageTime {
    fn algorithm_name(&self) -> &'static str {
        "First Passage Time"
    }

    fn minimum_sample_size(&self) -> usize {
        3
    }
}

/// Per-radius summary of one column of passage times
///
/// Log statistics ignore zero-duration passages, which only occur when
/// several fixes share a timestamp.
fn summarise_radius(radius: f64, times: &[Option<f64>]) -> FptCurvePoint {
    let closed: Vec<f64> = times.iter().flatten().copied().collect();
    let logs: Vec<f64> = closed.iter().filter(|t| **t > 0.0).map(|t| t.ln()).collect();
    FptCurvePoint {
        radius,
        log_variance: sample_variance(&logs),
        mean_fpt: mean(&closed),
        uncensored: closed.len(),
        censored: times.len() - closed.len(),
    }
}

/// Passage times for every radius and fix, plus the log-variance curve
#[derive(Debug, Clone)]
pub struct FptResult {
    individual_id: String,
    elapsed_hours: Vec<f64>,
    radii: Vec<f64>,
    passage: Vec<Vec<Option<f64>>>,
    curve: FptCurve,
}

impl FptResult {
    pub fn individual_id(&self) -> &str {
        &self.individual_id
    }

    pub fn radii(&self) -> &[f64] {
        &self.radii
    }

    /// Hours since the first fix for every fix
    pub fn elapsed_hours(&self) -> &[f64] {
        &self.elapsed_hours
    }

    /// Passage times of every fix at the `radius_index`-th radius
    pub fn passage_times(&self, radius_index: usize) -> Option<&[Option<f64>]> {
        self.passage.get(radius_index).map(Vec::as_slice)
    }

    /// Passage time of one fix at one radius, `None` when censored or out of range
    pub fn passage_time(&self, radius_index: usize, fix_index: usize) -> Option<f64> {
        self.passage.get(radius_index)?.get(fix_index).copied().flatten()
    }

    pub fn curve(&self) -> &FptCurve {
        &self.curve
    }

    /// Long-format table of every passage time
    pub fn matrix(&self) -> crate::curve::FptMatrix<'_> {
        crate::curve::FptMatrix::new(self)
    }

    pub(crate) fn columns(&self) -> impl Iterator<Item = (f64, &[Option<f64>])> + '_ {
        self.radii
            .iter()
            .copied()
            .zip(self.passage.iter().map(Vec::as_slice))
    }
}
