//! Velocity series extracted from a trajectory
//!
//! Every step that has both a defined turning angle and a positive duration
//! yields one observation, stamped at the midpoint of the step. The first
//! step never has a turning angle and is therefore never part of the series.

use chrono::{DateTime, Utc};
use movetrack_core::{Error, Result, TabularOutput};
use movetrack_track::Trajectory;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument};

/// Scalar response analysed by the window sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResponseKind {
    /// Velocity persistence `V cos θ`
    #[default]
    Persistence,
    /// Turning velocity `V sin θ`
    Turning,
    /// Speed `V`
    Speed,
}

impl ResponseKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Persistence => "persistence velocity",
            Self::Turning => "turning velocity",
            Self::Speed => "speed",
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Velocity components of one step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VelocityStep {
    /// Index of the step in the trajectory
    pub step: usize,
    /// Time of the fix the step leaves from
    pub timestamp: DateTime<Utc>,
    /// Hours since the first fix at the start, end and midpoint of the step
    pub start_hours: f64,
    pub end_hours: f64,
    pub mid_hours: f64,
    /// Metres per hour
    pub speed: f64,
    pub turn_angle: f64,
    pub persistence: f64,
    pub turning: f64,
}

impl VelocityStep {
    pub fn value(&self, kind: ResponseKind) -> f64 {
        match kind {
            ResponseKind::Persistence => self.persistence,
            ResponseKind::Turning => self.turning,
            ResponseKind::Speed => self.speed,
        }
    }
}

/// Velocity observations of one individual, in time order
#[derive(Debug, Clone, PartialEq)]
pub struct VelocitySeries {
    individual_id: String,
    steps: Vec<VelocityStep>,
}

impl VelocitySeries {
    #[instrument(skip_all, fields(individual = trajectory.individual_id()))]
    pub fn from_trajectory(trajectory: &Trajectory) -> Result<Self> {
        let hours = trajectory.elapsed_hours();
        let fixes = trajectory.fixes();
        let all = trajectory.steps();
        let mut skipped = 0;
        let mut steps = Vec::with_capacity(all.len());

        for step in &all {
            let (Some(speed), Some(theta)) = (step.speed(), step.turn_angle) else {
                skipped += 1;
                continue;
            };
            let start = hours[step.index];
            let end = hours[step.index + 1];
            steps.push(VelocityStep {
                step: step.index,
                timestamp: fixes[step.index].timestamp,
                start_hours: start,
                end_hours: end,
                mid_hours: 0.5 * (start + end),
                speed,
                turn_angle: theta,
                persistence: speed * theta.cos(),
                turning: speed * theta.sin(),
            });
        }
        if steps.is_empty() {
            return Err(Error::InsufficientData {
                expected: 1,
                actual: 0,
            });
        }
        debug!(kept = steps.len(), skipped, "extracted velocity series");

        Ok(Self {
            individual_id: trajectory.individual_id().to_string(),
            steps,
        })
    }

    pub fn individual_id(&self) -> &str {
        &self.individual_id
    }

    pub fn steps(&self) -> &[VelocityStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step midpoints in hours since the first fix
    pub fn times(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.mid_hours).collect()
    }

    pub fn response(&self, kind: ResponseKind) -> Vec<f64> {
        self.steps.iter().map(|s| s.value(kind)).collect()
    }
}

impl TabularOutput for VelocitySeries {
    type Row = VelocityStep;

    fn rows(&self) -> Vec<VelocityStep> {
        self.steps.clone()
    }
}
