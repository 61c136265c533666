//! Path metrics derived from consecutive fixes
//!
//! Steps are recomputed on demand and never stored with the track. Angles
//! are in radians: the absolute angle is measured counter-clockwise from the
//! +x (east) axis, the turning angle is the wrapped change in absolute angle
//! between consecutive steps.

use crate::types::{Fix, Trajectory};
use movetrack_core::math::circular::wrap_angle;
use movetrack_core::time::duration_hours;
use movetrack_core::TabularOutput;
use serde::Serialize;

/// Displacement between two consecutive fixes of one individual
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Index of the fix the step starts from
    pub index: usize,
    pub dx: f64,
    pub dy: f64,
    /// Euclidean length in metres
    pub length: f64,
    /// Duration in hours
    pub duration_hours: f64,
    /// Heading from the +x axis; `None` for zero-length steps
    pub absolute_angle: Option<f64>,
    /// Change of heading from the previous step; `None` for the first step
    /// and around zero-length steps
    pub turn_angle: Option<f64>,
}

impl Step {
    /// Speed in metres per hour, `None` when no time elapsed
    pub fn speed(&self) -> Option<f64> {
        if self.duration_hours > 0.0 {
            Some(self.length / self.duration_hours)
        } else {
            None
        }
    }
}

/// Steps between consecutive fixes
pub fn steps(fixes: &[Fix]) -> Vec<Step> {
    let mut previous_heading: Option<f64> = None;
    fixes
        .windows(2)
        .enumerate()
        .map(|(index, pair)| {
            let dx = pair[1].x - pair[0].x;
            let dy = pair[1].y - pair[0].y;
            let length = dx.hypot(dy);
            let absolute_angle = if length > 0.0 { Some(dy.atan2(dx)) } else { None };
            let turn_angle = match (previous_heading, absolute_angle) {
                (Some(prev), Some(current)) => Some(wrap_angle(current - prev)),
                _ => None,
            };
            previous_heading = absolute_angle;
            Step {
                index,
                dx,
                dy,
                length,
                duration_hours: duration_hours(pair[0].timestamp, pair[1].timestamp),
                absolute_angle,
                turn_angle,
            }
        })
        .collect()
}

/// Squared distance of every fix from the first one
pub fn net_squared_displacement(fixes: &[Fix]) -> Vec<f64> {
    let Some(origin) = fixes.first() else {
        return Vec::new();
    };
    fixes
        .iter()
        .map(|f| {
            let dx = f.x - origin.x;
            let dy = f.y - origin.y;
            dx * dx + dy * dy
        })
        .collect()
}

/// One row of the path metric table, describing a fix and the step leaving it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathMetric {
    pub x: f64,
    pub y: f64,
    pub date: String,
    pub dx: Option<f64>,
    pub dy: Option<f64>,
    pub dist: Option<f64>,
    pub dt_hours: Option<f64>,
    pub r2n: f64,
    pub abs_angle: Option<f64>,
    pub rel_angle: Option<f64>,
}

/// Per-fix path metrics for one trajectory
#[derive(Debug, Clone, PartialEq)]
pub struct PathMetricTable {
    pub individual_id: String,
    pub rows: Vec<PathMetric>,
}

impl PathMetricTable {
    pub fn from_trajectory(trajectory: &Trajectory) -> Self {
        let fixes = trajectory.fixes();
        let steps = steps(fixes);
        let nsd = net_squared_displacement(fixes);

        let rows = fixes
            .iter()
            .enumerate()
            .map(|(i, fix)| {
                let step = steps.get(i);
                // The turn at fix i is between the step arriving and the step leaving it
                let rel_angle = step.and_then(|s| s.turn_angle);
                PathMetric {
                    x: fix.x,
                    y: fix.y,
                    date: fix.timestamp.to_rfc3339(),
                    dx: step.map(|s| s.dx),
                    dy: step.map(|s| s.dy),
                    dist: step.map(|s| s.length),
                    dt_hours: step.map(|s| s.duration_hours),
                    r2n: nsd[i],
                    abs_angle: step.and_then(|s| s.absolute_angle),
                    rel_angle,
                }
            })
            .collect();

        Self {
            individual_id: trajectory.individual_id().to_string(),
            rows,
        }
    }

    /// Total path length in metres
    pub fn total_distance(&self) -> f64 {
        self.rows.iter().filter_map(|r| r.dist).sum()
    }
}

impl TabularOutput for PathMetricTable {
    type Row = PathMetric;

    fn rows(&self) -> Vec<PathMetric> {
        self.rows.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::{TimeZone, Utc};
    use std::f64::consts::FRAC_PI_2;

    fn trajectory(points: &[(f64, f64)]) -> Trajectory {
        let start = Utc.with_ymd_and_hms(2021, 3, 1, 0, 0, 0).unwrap();
        Trajectory::from_xy("t", start, 1.0, points).unwrap()
    }

    #[test]
    fn test_straight_line_at_constant_speed() {
        let v = 250.0;
        let points: Vec<(f64, f64)> = (0..10).map(|i| (i as f64 * v, 0.0)).collect();
        let steps = trajectory(&points).steps();
        assert_eq!(steps.len(), 9);
        for step in &steps {
            assert_eq!(step.length, v);
            assert_eq!(step.duration_hours, 1.0);
            assert_eq!(step.speed(), Some(v));
            assert_eq!(step.absolute_angle, Some(0.0));
        }
        assert!(steps[0].turn_angle.is_none());
        assert!(steps[1..].iter().all(|s| s.turn_angle == Some(0.0)));
    }

    #[test]
    fn test_left_turn_is_positive() {
        let steps = trajectory(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]).steps();
        assert_abs_diff_eq!(steps[1].turn_angle.unwrap(), FRAC_PI_2, epsilon = 1e-12);
        let steps = trajectory(&[(0.0, 0.0), (1.0, 0.0), (1.0, -1.0)]).steps();
        assert_abs_diff_eq!(steps[1].turn_angle.unwrap(), -FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_length_step_has_no_angles() {
        let steps = trajectory(&[(0.0, 0.0), (1.0, 0.0), (1.0, 0.0), (2.0, 0.0)]).steps();
        assert!(steps[1].absolute_angle.is_none());
        assert!(steps[1].turn_angle.is_none());
        assert!(steps[2].turn_angle.is_none());
    }

    #[test]
    fn test_nsd_starts_at_zero() {
        let t = trajectory(&[(3.0, 4.0), (6.0, 8.0), (0.0, 0.0)]);
        let nsd = t.net_squared_displacement();
        assert_eq!(nsd[0], 0.0);
        assert_abs_diff_eq!(nsd[1], 25.0, epsilon = 1e-12);
        assert_abs_diff_eq!(nsd[2], 25.0, epsilon = 1e-12);
        assert_eq!(trajectory(&[(5.0, 5.0)]).net_squared_displacement(), vec![0.0]);
    }

    #[test]
    fn test_path_metric_table() {
        let table = trajectory(&[(0.0, 0.0), (3.0, 4.0), (3.0, 10.0)]).path_metrics();
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0].dist, Some(5.0));
        assert!(table.rows[0].rel_angle.is_none());
        assert!(table.rows[1].rel_angle.is_some());
        assert!(table.rows[2].dist.is_none());
        assert_abs_diff_eq!(table.total_distance(), 11.0, epsilon = 1e-12);

        let csv = table.to_csv_string().unwrap();
        assert!(csv.starts_with("x,y,date,dx,dy,dist,dt_hours,r2n,abs_angle,rel_angle"));
        assert_eq!(csv.lines().count(), 4);
    }
}
