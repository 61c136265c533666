//! Break location and model selection within one window
//!
//! The break maximises the summed likelihood of the two segments, each with
//! its own parameters. At that break every one of the eight change models
//! is scored by `BIC = -2 lnL + K k ln n`; parameters a model keeps fixed
//! across the break are estimated from the whole window.

use crate::likelihood::{ar_log_likelihood, estimate_rho, fit_segment, SegmentEstimate, MIN_SEGMENT};
use crate::types::ChangeModel;
use movetrack_core::{Error, Result};
use ordered_float::OrderedFloat;

/// Information criterion of one model at one break
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelScore {
    pub model: ChangeModel,
    pub log_likelihood: f64,
    pub bic: f64,
}

/// The scored models of a window and the parameters of the selected one
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSelection {
    /// Position of the break within the window (first index of the right segment)
    pub break_at: usize,
    /// Scores of all eight models, in numbering order
    pub scores: Vec<ModelScore>,
    pub selected: ChangeModel,
    /// Parameters left of the break under the selected model
    pub left: SegmentEstimate,
    /// Parameters right of the break under the selected model
    pub right: SegmentEstimate,
}

impl ModelSelection {
    pub fn selected_score(&self) -> &ModelScore {
        &self.scores[self.selected.index()]
    }
}

/// Candidate break positions for a window of `n` observations
///
/// `range` is the central fraction of the window searched; both segments
/// keep at least [`MIN_SEGMENT`] observations.
pub fn break_candidates(n: usize, range: f64) -> Result<std::ops::RangeInclusive<usize>> {
    let margin = ((n as f64) * (1.0 - range) / 2.0).floor() as usize;
    let lower = margin.max(MIN_SEGMENT);
    let upper = n.saturating_sub(margin).min(n.saturating_sub(MIN_SEGMENT));
    if n < 2 * MIN_SEGMENT || lower > upper {
        return Err(Error::InsufficientData {
            expected: 2 * MIN_SEGMENT,
            actual: n,
        });
    }
    Ok(lower..=upper)
}

/// Break position with the largest two-segment likelihood; ties go to the earliest
pub fn best_break(x: &[f64], t: &[f64], range: f64) -> Result<usize> {
    let mut best: Option<(usize, f64)> = None;
    for b in break_candidates(x.len(), range)? {
        let left = fit_segment(&x[..b], &t[..b])?;
        let right = fit_segment(&x[b..], &t[b..])?;
        let ll = segment_ll(&x[..b], &t[..b], &left) + segment_ll(&x[b..], &t[b..], &right);
        if best.map_or(true, |(_, value)| ll > value) {
            best = Some((b, ll));
        }
    }
    best.map(|(b, _)| b)
        .ok_or_else(|| Error::Computation("no break candidate could be scored".to_string()))
}

/// Score all eight models at a break and select the one with the lowest BIC
pub fn select_model(x: &[f64], t: &[f64], break_at: usize, sensitivity: f64) -> Result<ModelSelection> {
    let n = x.len();
    if break_at < MIN_SEGMENT || n < break_at + MIN_SEGMENT {
        return Err(Error::InvalidParameter(format!(
            "break at {break_at} leaves a segment shorter than {MIN_SEGMENT} in a window of {n}"
        )));
    }
    let (xl, tl) = (&x[..break_at], &t[..break_at]);
    let (xr, tr) = (&x[break_at..], &t[break_at..]);
    let whole = fit_segment(x, t)?;
    let left = fit_segment(xl, tl)?;
    let right = fit_segment(xr, tr)?;
    let penalty = sensitivity * (n as f64).ln();

    let mut scores = Vec::with_capacity(ChangeModel::MODELS.len());
    let mut estimates = Vec::with_capacity(ChangeModel::MODELS.len());
    for model in ChangeModel::MODELS {
        let l = constrained(model, xl, tl, &left, &whole)?;
        let r = constrained(model, xr, tr, &right, &whole)?;
        let log_likelihood = segment_ll(xl, tl, &l) + segment_ll(xr, tr, &r);
        scores.push(ModelScore {
            model,
            log_likelihood,
            bic: -2.0 * log_likelihood + penalty * model.n_parameters() as f64,
        });
        estimates.push((l, r));
    }

    let selected = scores
        .iter()
        .enumerate()
        .min_by_key(|(i, s)| (OrderedFloat(s.bic), *i))
        .map_or(ChangeModel::NONE, |(_, s)| s.model);
    let (left, right) = estimates[selected.index()];

    Ok(ModelSelection {
        break_at,
        scores,
        selected,
        left,
        right,
    })
}

/// Side parameters under a model: changed parameters from the side, the rest from the window
fn constrained(
    model: ChangeModel,
    x: &[f64],
    t: &[f64],
    side: &SegmentEstimate,
    whole: &SegmentEstimate,
) -> Result<SegmentEstimate> {
    let mean = if model.mean { side.mean } else { whole.mean };
    let sd = if model.sd { side.sd } else { whole.sd };
    let rho = if !model.rho {
        whole.rho
    } else if model.mean && model.sd {
        side.rho
    } else {
        estimate_rho(x, t, mean, sd)?
    };
    Ok(SegmentEstimate {
        mean,
        sd,
        rho,
        n: x.len(),
    })
}

fn segment_ll(x: &[f64], t: &[f64], p: &SegmentEstimate) -> f64 {
    ar_log_likelihood(x, t, p.mean, p.sd, p.rho)
}
