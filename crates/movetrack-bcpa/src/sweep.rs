//! Window sweep over a response series
//!
//! A window of fixed size slides along the series in steps of
//! `window_step` observations. Only complete windows are analysed: the
//! first starts at observation 0 and the last ends at or before the end of
//! the series, so no truncated window is ever fitted.

use crate::likelihood::{SegmentEstimate, MIN_SEGMENT};
use crate::models::{best_break, select_model, ModelScore};
use crate::response::{ResponseKind, VelocitySeries};
use crate::summary::{self, ChangePointSummaryParameters, FlatSummary, SmoothSummary};
use crate::types::ChangeModel;
use movetrack_core::{AnalyzerProperties, Error, Result, TabularOutput};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, instrument};

/// Window sweep parameters
///
/// The window size and the sensitivity `K` have no defaults: both shape the
/// result and have to be chosen for the data at hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSweepParameters {
    /// Observations per window
    pub window_size: usize,
    /// Observations between consecutive window starts
    pub window_step: usize,
    /// Multiplier `K` of the BIC penalty; larger values select fewer changes
    pub sensitivity: f64,
    /// Central fraction of the window searched for the break
    pub break_range: f64,
    pub response: ResponseKind,
}

impl WindowSweepParameters {
    pub fn new(window_size: usize, sensitivity: f64) -> Self {
        Self {
            window_size,
            window_step: 1,
            sensitivity,
            break_range: 0.6,
            response: ResponseKind::default(),
        }
    }

    pub fn with_window_step(mut self, window_step: usize) -> Self {
        self.window_step = window_step;
        self
    }

    pub fn with_break_range(mut self, break_range: f64) -> Self {
        self.break_range = break_range;
        self
    }

    pub fn with_response(mut self, response: ResponseKind) -> Self {
        self.response = response;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size < 2 * MIN_SEGMENT {
            return Err(Error::InsufficientData {
                expected: 2 * MIN_SEGMENT,
                actual: self.window_size,
            });
        }
        if self.window_step == 0 {
            return Err(Error::InvalidParameter(
                "window step must be at least one observation".to_string(),
            ));
        }
        if !(self.sensitivity > 0.0) || !self.sensitivity.is_finite() {
            return Err(Error::not_positive("sensitivity", self.sensitivity));
        }
        if !(self.break_range > 0.0 && self.break_range <= 1.0) {
            return Err(Error::InvalidParameter(format!(
                "break range must lie in (0, 1], got {}",
                self.break_range
            )));
        }
        Ok(())
    }
}

/// Break and selected model of one window
#[derive(Debug, Clone, PartialEq)]
pub struct WindowResult {
    /// First observation of the window
    pub start: usize,
    /// One past the last observation of the window
    pub end: usize,
    /// First observation after the break, as an index into the series
    pub break_index: usize,
    pub break_time: f64,
    pub model: ChangeModel,
    pub left: SegmentEstimate,
    pub right: SegmentEstimate,
    /// Scores of all eight models
    pub scores: Vec<ModelScore>,
}

impl WindowResult {
    pub fn has_change(&self) -> bool {
        self.model.has_change()
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..self.end).contains(&index)
    }

    /// Parameters on the side of the break holding `index`
    pub fn estimate_at(&self, index: usize) -> &SegmentEstimate {
        if index < self.break_index {
            &self.left
        } else {
            &self.right
        }
    }
}

/// Behavioural change point analysis by window sweep
#[derive(Debug, Clone)]
pub struct WindowSweep {
    params: WindowSweepParameters,
}

impl WindowSweep {
    pub fn new(params: WindowSweepParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn parameters(&self) -> &WindowSweepParameters {
        &self.params
    }

    /// Sweep the configured response of a velocity series
    pub fn analyze(&self, series: &VelocitySeries) -> Result<SweepResult> {
        self.sweep(&series.times(), &series.response(self.params.response))
    }

    /// Sweep an arbitrary series observed at strictly increasing times
    #[instrument(skip_all, fields(n = values.len(), window = self.params.window_size))]
    pub fn sweep(&self, times: &[f64], values: &[f64]) -> Result<SweepResult> {
        let n = values.len();
        if times.len() != n {
            return Err(Error::size_mismatch(n, times.len(), "observation times"));
        }
        let w = self.params.window_size;
        if n < w {
            return Err(Error::InsufficientData {
                expected: w,
                actual: n,
            });
        }
        if values.iter().chain(times).any(|v| !v.is_finite()) {
            return Err(Error::non_finite("window sweep input"));
        }
        if times.windows(2).any(|p| p[1] <= p[0]) {
            return Err(Error::InvalidInput(
                "observation times must be strictly increasing".to_string(),
            ));
        }

        let mut windows = Vec::with_capacity((n - w) / self.params.window_step + 1);
        for start in (0..=n - w).step_by(self.params.window_step) {
            let x = &values[start..start + w];
            let t = &times[start..start + w];
            let b = best_break(x, t, self.params.break_range)?;
            let selection = select_model(x, t, b, self.params.sensitivity)?;
            windows.push(WindowResult {
                start,
                end: start + w,
                break_index: start + b,
                break_time: times[start + b],
                model: selection.selected,
                left: selection.left,
                right: selection.right,
                scores: selection.scores,
            });
        }

        let changes = windows.iter().filter(|w| w.has_change()).count();
        info!(windows = windows.len(), changes, "window sweep finished");

        Ok(SweepResult {
            times: times.to_vec(),
            values: values.to_vec(),
            windows,
            parameters: self.params.clone(),
        })
    }
}

impl AnalyzerProperties for WindowSweep {
    fn algorithm_name(&self) -> &'static str {
        "Behavioural change point analysis"
    }

    fn minimum_sample_size(&self) -> usize {
        self.params.window_size
    }
}

/// Windows of a sweep together with the series they were fitted to
#[derive(Debug, Clone, PartialEq)]
pub struct SweepResult {
    times: Vec<f64>,
    values: Vec<f64>,
    windows: Vec<WindowResult>,
    parameters: WindowSweepParameters,
}

impl SweepResult {
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn windows(&self) -> &[WindowResult] {
        &self.windows
    }

    pub fn parameters(&self) -> &WindowSweepParameters {
        &self.parameters
    }

    /// Number of observations in the series
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Windows whose selected model has a change
    pub fn change_windows(&self) -> impl Iterator<Item = &WindowResult> {
        self.windows.iter().filter(|w| w.has_change())
    }

    /// Clustered, thresholded change points and the phases between them
    pub fn flat_summary(&self, params: &ChangePointSummaryParameters) -> Result<FlatSummary> {
        summary::flat_summary(self, params)
    }

    /// Per-observation averages of the window estimates
    pub fn smooth_summary(&self, bandwidth: Option<f64>) -> Result<SmoothSummary> {
        summary::smooth_summary(self, bandwidth)
    }

    /// Per-window BIC of every model
    pub fn model_scores(&self) -> ModelScoreTable<'_> {
        ModelScoreTable { sweep: self }
    }
}

impl fmt::Display for SweepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Window sweep of {}:", self.parameters.response)?;
        writeln!(
            f,
            "  {} observations, window {} step {}, K = {}",
            self.len(),
            self.parameters.window_size,
            self.parameters.window_step,
            self.parameters.sensitivity
        )?;
        write!(
            f,
            "  {} windows, {} with a change",
            self.windows.len(),
            self.change_windows().count()
        )
    }
}

/// One window in CSV form
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowRow {
    pub start: usize,
    pub end: usize,
    pub break_index: usize,
    pub break_time: f64,
    pub model: usize,
    pub bic: f64,
    pub mean_left: f64,
    pub sd_left: f64,
    pub rho_left: f64,
    pub tau_left: f64,
    pub mean_right: f64,
    pub sd_right: f64,
    pub rho_right: f64,
    pub tau_right: f64,
}

impl TabularOutput for SweepResult {
    type Row = WindowRow;

    fn rows(&self) -> Vec<WindowRow> {
        self.windows
            .iter()
            .map(|w| WindowRow {
                start: w.start,
                end: w.end,
                break_index: w.break_index,
                break_time: w.break_time,
                model: w.model.index(),
                bic: w.scores[w.model.index()].bic,
                mean_left: w.left.mean,
                sd_left: w.left.sd,
                rho_left: w.left.rho,
                tau_left: w.left.tau(),
                mean_right: w.right.mean,
                sd_right: w.right.sd,
                rho_right: w.right.rho,
                tau_right: w.right.tau(),
            })
            .collect()
    }
}

/// Long-format table of every model score of every window
#[derive(Debug, Clone, Copy)]
pub struct ModelScoreTable<'a> {
    sweep: &'a SweepResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelScoreRow {
    pub window_start: usize,
    pub break_index: usize,
    pub model: usize,
    pub changed: String,
    pub log_likelihood: f64,
    pub bic: f64,
    pub selected: bool,
}

impl TabularOutput for ModelScoreTable<'_> {
    type Row = ModelScoreRow;

    fn rows(&self) -> Vec<ModelScoreRow> {
        self.sweep
            .windows
            .iter()
            .flat_map(|w| {
                w.scores.iter().map(move |s| ModelScoreRow {
                    window_start: w.start,
                    break_index: w.break_index,
                    model: s.model.index(),
                    changed: s.model.changed().join("+"),
                    log_likelihood: s.log_likelihood,
                    bic: s.bic,
                    selected: s.model == w.model,
                })
            })
            .collect()
    }
}
