//! Flat and smooth summaries of a window sweep
//!
//! The flat summary merges the breaks of all windows that selected a
//! change. Breaks are sorted by time and chained into one cluster while the
//! gap to the previous break is at most `clusterwidth` (single linkage);
//! a cluster is represented by the mean time of its breaks. Clusters backed
//! by fewer than `threshold` windows are discarded, and the survivors cut
//! the series into phases.
//!
//! The smooth summary averages, for every observation, the estimates of
//! the windows covering it, taking each window's parameters from the side of
//! its break on which the observation lies.

use crate::likelihood::{characteristic_time, fit_segment, segment_sd, MIN_SEGMENT};
use crate::sweep::SweepResult;
use crate::types::{ChangeModel, ChangePoint};
use movetrack_core::math::statistics::mean;
use movetrack_core::{Error, Result, TabularOutput};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Clustering and threshold of the flat summary
///
/// Neither value has a default: they trade spurious change points against
/// missed ones and are chosen by the analyst.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChangePointSummaryParameters {
    /// Largest gap, in time units, between breaks merged into one change point
    pub clusterwidth: f64,
    /// Fewest supporting windows a change point needs
    pub threshold: usize,
}

impl ChangePointSummaryParameters {
    pub fn new(clusterwidth: f64, threshold: usize) -> Result<Self> {
        let params = Self {
            clusterwidth,
            threshold,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.clusterwidth >= 0.0) || !self.clusterwidth.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "clusterwidth must be finite and non-negative, got {}",
                self.clusterwidth
            )));
        }
        if self.threshold == 0 {
            return Err(Error::InvalidParameter(
                "threshold must be at least one window".to_string(),
            ));
        }
        Ok(())
    }
}

/// Breaks merged by single-linkage clustering
#[derive(Debug, Clone, PartialEq)]
pub struct BreakCluster {
    /// Mean time of the member breaks
    pub time: f64,
    /// Indices of the member breaks in the clustered slice
    pub members: Vec<usize>,
}

impl BreakCluster {
    pub fn size(&self) -> usize {
        self.members.len()
    }
}

/// Single-linkage clusters of break times, in time order
///
/// Re-clustering the cluster times with the same width returns the same
/// times: the gap between the means of two clusters is never smaller than
/// the gap between their closest members.
pub fn cluster_break_times(times: &[f64], clusterwidth: f64) -> Vec<BreakCluster> {
    let mut order: Vec<usize> = (0..times.len()).collect();
    order.sort_by(|&a, &b| times[a].total_cmp(&times[b]));

    let mut clusters: Vec<Vec<usize>> = Vec::new();
    let mut previous: Option<f64> = None;
    for i in order {
        match (clusters.last_mut(), previous) {
            (Some(current), Some(last)) if times[i] - last <= clusterwidth => current.push(i),
            _ => clusters.push(vec![i]),
        }
        previous = Some(times[i]);
    }

    clusters
        .into_iter()
        .map(|members| {
            let member_times: Vec<f64> = members.iter().map(|&i| times[i]).collect();
            BreakCluster {
                time: mean(&member_times).unwrap_or(f64::NAN),
                members,
            }
        })
        .collect()
}

/// A stretch of the series between two change points
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Phase {
    /// Phase number, from 1
    pub phase: usize,
    pub start_index: usize,
    /// One past the last observation
    pub end_index: usize,
    pub start_time: f64,
    /// Start of the next phase, or the last observation time
    pub end_time: f64,
    pub duration: f64,
    pub n: usize,
    pub mean: f64,
    pub sd: Option<f64>,
    pub rho: Option<f64>,
    pub tau: Option<f64>,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Phase {} [{:.2}, {:.2}): n = {}, mean = {:.3}",
            self.phase, self.start_time, self.end_time, self.n, self.mean
        )?;
        if let Some(sd) = self.sd {
            write!(f, ", sd = {sd:.3}")?;
        }
        if let (Some(rho), Some(tau)) = (self.rho, self.tau) {
            write!(f, ", rho = {rho:.3}, tau = {tau:.3}")?;
        }
        Ok(())
    }
}

/// Significant change points and the phases they delimit
#[derive(Debug, Clone)]
pub struct FlatSummary {
    change_points: Vec<ChangePoint>,
    phases: Vec<Phase>,
    parameters: ChangePointSummaryParameters,
    sample_size: usize,
}

impl FlatSummary {
    pub fn change_points(&self) -> &[ChangePoint] {
        &self.change_points
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn parameters(&self) -> &ChangePointSummaryParameters {
        &self.parameters
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn count(&self) -> usize {
        self.change_points.len()
    }

    pub fn has_changepoints(&self) -> bool {
        !self.change_points.is_empty()
    }

    /// Change point backed by the most windows
    pub fn most_supported(&self) -> Option<&ChangePoint> {
        self.change_points.iter().max_by_key(|cp| cp.support)
    }

    pub fn phase_table(&self) -> PhaseTable<'_> {
        PhaseTable {
            phases: &self.phases,
        }
    }
}

impl fmt::Display for FlatSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Change point summary:")?;
        writeln!(
            f,
            "  Clusterwidth: {}, threshold: {}",
            self.parameters.clusterwidth, self.parameters.threshold
        )?;
        writeln!(f, "  Sample size: {}", self.sample_size)?;
        writeln!(f, "  Change points: {}", self.count())?;
        for cp in &self.change_points {
            writeln!(f, "    {cp}")?;
        }
        writeln!(f, "  Phases: {}", self.phases.len())?;
        for phase in &self.phases {
            writeln!(f, "    {phase}")?;
        }
        Ok(())
    }
}

pub(crate) fn flat_summary(sweep: &SweepResult, params: &ChangePointSummaryParameters) -> Result<FlatSummary> {
    params.validate()?;
    let times = sweep.times();
    let candidates: Vec<_> = sweep.change_windows().collect();
    let break_times: Vec<f64> = candidates.iter().map(|w| w.break_time).collect();

    let clusters = cluster_break_times(&break_times, params.clusterwidth);
    let n_clusters = clusters.len();
    let mut change_points = Vec::new();
    for cluster in merge_by_index(times, &break_times, clusters) {
        let index = nearest_index(times, cluster.time);
        if cluster.size() < params.threshold || index == 0 || index >= times.len() {
            continue;
        }
        let covering = sweep.windows().iter().filter(|w| w.contains(index)).count();
        let models: Vec<ChangeModel> = cluster.members.iter().map(|&m| candidates[m].model).collect();
        change_points.push(ChangePoint {
            index,
            time: cluster.time,
            support: cluster.size(),
            confidence: (cluster.size() as f64 / covering.max(1) as f64).min(1.0),
            change_type: modal_model(&models),
        });
    }
    debug!(
        candidates = break_times.len(),
        clusters = n_clusters,
        kept = change_points.len(),
        "clustered window breaks"
    );

    let phases = phases(sweep, &change_points)?;
    Ok(FlatSummary {
        change_points,
        phases,
        parameters: *params,
        sample_size: sweep.len(),
    })
}

/// Pool clusters that resolve to the same observation
///
/// Clusters arrive sorted by time, so pooled clusters are adjacent. A pooled
/// cluster keeps every member and its time is the mean over all of them.
fn merge_by_index(times: &[f64], break_times: &[f64], clusters: Vec<BreakCluster>) -> Vec<BreakCluster> {
    let mut merged: Vec<(usize, BreakCluster)> = Vec::with_capacity(clusters.len());
    for cluster in clusters {
        let index = nearest_index(times, cluster.time);
        match merged.last_mut() {
            Some((last, pooled)) if *last == index => {
                pooled.members.extend(cluster.members);
                let member_times: Vec<f64> = pooled.members.iter().map(|&m| break_times[m]).collect();
                pooled.time = mean(&member_times).unwrap_or(pooled.time);
            }
            _ => merged.push((index, cluster)),
        }
    }
    merged.into_iter().map(|(_, cluster)| cluster).collect()
}

/// Observation index closest to `time`; ties go to the later observation
fn nearest_index(times: &[f64], time: f64) -> usize {
    let after = times.partition_point(|&t| t < time);
    if after == 0 {
        return 0;
    }
    if after == times.len() {
        return times.len() - 1;
    }
    if time - times[after - 1] < times[after] - time {
        after - 1
    } else {
        after
    }
}

/// Most frequent model; ties go to the lower model number
fn modal_model(models: &[ChangeModel]) -> ChangeModel {
    let mut counts: HashMap<ChangeModel, usize> = HashMap::new();
    for &m in models {
        *counts.entry(m).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by_key(|(m, count)| (*count, std::cmp::Reverse(m.index())))
        .map_or(ChangeModel::NONE, |(m, _)| m)
}

fn phases(sweep: &SweepResult, change_points: &[ChangePoint]) -> Result<Vec<Phase>> {
    let times = sweep.times();
    let values = sweep.values();
    let n = values.len();
    let mut bounds = vec![0];
    bounds.extend(change_points.iter().map(|cp| cp.index));
    bounds.push(n);

    bounds
        .windows(2)
        .enumerate()
        .map(|(k, b)| {
            let (start, end) = (b[0], b[1]);
            let x = &values[start..end];
            let t = &times[start..end];
            let end_time = if end < n { times[end] } else { times[n - 1] };
            let (rho, tau) = if x.len() >= MIN_SEGMENT {
                let fit = fit_segment(x, t)?;
                (Some(fit.rho), Some(characteristic_time(fit.rho)))
            } else {
                (None, None)
            };
            Ok(Phase {
                phase: k + 1,
                start_index: start,
                end_index: end,
                start_time: times[start],
                end_time,
                duration: end_time - times[start],
                n: x.len(),
                mean: mean(x).ok_or_else(|| Error::empty_input("phase"))?,
                sd: (x.len() >= 2).then(|| segment_sd(x)),
                rho,
                tau,
            })
        })
        .collect()
}

/// One change point in CSV form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangePointRow {
    pub index: usize,
    pub time: f64,
    pub support: usize,
    pub confidence: f64,
    pub model: usize,
    pub changed: String,
}

impl TabularOutput for FlatSummary {
    type Row = ChangePointRow;

    fn rows(&self) -> Vec<ChangePointRow> {
        self.change_points
            .iter()
            .map(|cp| ChangePointRow {
                index: cp.index,
                time: cp.time,
                support: cp.support,
                confidence: cp.confidence,
                model: cp.change_type.index(),
                changed: cp.change_type.changed().join("+"),
            })
            .collect()
    }
}

/// Phases of a flat summary as a table
#[derive(Debug, Clone, Copy)]
pub struct PhaseTable<'a> {
    phases: &'a [Phase],
}

impl TabularOutput for PhaseTable<'_> {
    type Row = Phase;

    fn rows(&self) -> Vec<Phase> {
        self.phases.to_vec()
    }
}

/// Window-averaged estimates at one observation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmoothRow {
    pub index: usize,
    pub time: f64,
    pub value: f64,
    pub mean: Option<f64>,
    pub sd: Option<f64>,
    pub rho: Option<f64>,
    pub tau: Option<f64>,
    /// Windows covering the observation
    pub windows: usize,
    /// Weighted share of covering windows that place a change here
    pub break_density: f64,
}

/// Per-observation averages of the window estimates
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothSummary {
    rows: Vec<SmoothRow>,
    bandwidth: Option<f64>,
}

impl SmoothSummary {
    pub fn rows(&self) -> &[SmoothRow] {
        &self.rows
    }

    pub fn bandwidth(&self) -> Option<f64> {
        self.bandwidth
    }

    /// Observations whose break density reaches `min_density`
    pub fn peaks(&self, min_density: f64) -> Vec<&SmoothRow> {
        self.rows
            .iter()
            .filter(|r| r.windows > 0 && r.break_density >= min_density)
            .collect()
    }
}

impl TabularOutput for SmoothSummary {
    type Row = SmoothRow;

    fn rows(&self) -> Vec<SmoothRow> {
        self.rows.clone()
    }
}

/// Averages over covering windows
///
/// Without a bandwidth every covering window has weight one. With a
/// bandwidth `h` a window is weighted by a Gaussian kernel of the distance
/// between the observation and the window's mid time.
pub(crate) fn smooth_summary(sweep: &SweepResult, bandwidth: Option<f64>) -> Result<SmoothSummary> {
    if let Some(h) = bandwidth {
        if !(h > 0.0) || !h.is_finite() {
            return Err(Error::not_positive("bandwidth", h));
        }
    }
    let times = sweep.times();
    let values = sweep.values();

    let rows = (0..values.len())
        .map(|i| {
            let mut total = 0.0;
            let (mut mu, mut sd, mut rho, mut breaks) = (0.0, 0.0, 0.0, 0.0);
            let mut covering = 0;
            for w in sweep.windows().iter().filter(|w| w.contains(i)) {
                let weight = match bandwidth {
                    Some(h) => {
                        let centre = 0.5 * (times[w.start] + times[w.end - 1]);
                        let z = (times[i] - centre) / h;
                        (-0.5 * z * z).exp()
                    }
                    None => 1.0,
                };
                let side = w.estimate_at(i);
                covering += 1;
                total += weight;
                mu += weight * side.mean;
                sd += weight * side.sd;
                rho += weight * side.rho;
                if w.has_change() && w.break_index == i {
                    breaks += weight;
                }
            }
            let average = |sum: f64| (total > 0.0).then(|| sum / total);
            SmoothRow {
                index: i,
                time: times[i],
                value: values[i],
                mean: average(mu),
                sd: average(sd),
                rho: average(rho),
                tau: average(rho).map(characteristic_time),
                windows: covering,
                break_density: average(breaks).unwrap_or(0.0),
            }
        })
        .collect();

    Ok(SmoothSummary { rows, bandwidth })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_linkage() {
        let clusters = cluster_break_times(&[10.0, 1.0, 2.0, 3.0, 9.0, 20.0], 1.0);
        let times: Vec<f64> = clusters.iter().map(|c| c.time).collect();
        assert_eq!(times, vec![2.0, 9.5, 20.0]);
        assert_eq!(clusters[0].members, vec![1, 2, 3]);
        assert_eq!(clusters[1].members, vec![4, 0]);
    }

    #[test]
    fn test_chaining() {
        let clusters = cluster_break_times(&[0.0, 0.9, 1.8, 2.7], 1.0);
        assert_eq!(clusters.len(), 1);
        assert!(cluster_break_times(&[], 1.0).is_empty());
        assert_eq!(cluster_break_times(&[1.0, 1.5], 0.0).len(), 2);
    }

    #[test]
    fn test_clusters_on_one_observation_are_pooled() {
        // observations are sparse around t = 10, so both clusters resolve to index 1
        let times = [0.0, 10.0, 30.0];
        let break_times = [8.0, 8.5, 11.5, 12.0, 29.0];
        let clusters = cluster_break_times(&break_times, 1.0);
        assert_eq!(clusters.len(), 3);

        let merged = merge_by_index(&times, &break_times, clusters);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].size(), 4);
        assert_eq!(merged[0].members, vec![0, 1, 2, 3]);
        assert!((merged[0].time - 10.0).abs() < 1e-12);
        assert_eq!(nearest_index(&times, merged[0].time), 1);
        assert_eq!(merged[1].members, vec![4]);
    }

    #[test]
    fn test_nearest_index() {
        let t = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(nearest_index(&t, -1.0), 0);
        assert_eq!(nearest_index(&t, 1.2), 1);
        assert_eq!(nearest_index(&t, 1.5), 2);
        assert_eq!(nearest_index(&t, 1.8), 2);
        assert_eq!(nearest_index(&t, 9.0), 3);
    }

    #[test]
    fn test_modal_model() {
        let m1 = ChangeModel::new(true, false, false);
        let m2 = ChangeModel::new(false, true, false);
        assert_eq!(modal_model(&[m2, m1, m2]), m2);
        assert_eq!(modal_model(&[m2, m1]), m1);
        assert_eq!(modal_model(&[]), ChangeModel::NONE);
    }

    #[test]
    fn test_parameters() {
        assert!(ChangePointSummaryParameters::new(1.0, 3).is_ok());
        assert!(ChangePointSummaryParameters::new(-1.0, 3).is_err());
        assert!(ChangePointSummaryParameters::new(1.0, 0).is_err());
    }
}
