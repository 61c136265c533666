//! FPT curve and tabular outputs

use crate::passage::FptResult;
use movetrack_core::TabularOutput;
use ordered_float::OrderedFloat;
use serde::Serialize;
use std::fmt;

/// Summary of all passage times at one radius
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FptCurvePoint {
    /// Radius in metres
    pub radius: f64,
    /// Sample variance of ln(FPT); `None` with fewer than two closed passages
    pub log_variance: Option<f64>,
    /// Mean FPT in hours over closed passages
    pub mean_fpt: Option<f64>,
    pub uncensored: usize,
    pub censored: usize,
}

/// Variance of log FPT as a function of radius
#[derive(Debug, Clone, PartialEq)]
pub struct FptCurve {
    points: Vec<FptCurvePoint>,
}

impl FptCurve {
    pub fn new(points: Vec<FptCurvePoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[FptCurvePoint] {
        &self.points
    }

    /// Radii with a defined log-variance, paired with it
    pub fn defined(&self) -> impl DoubleEndedIterator<Item = (f64, f64)> + '_ {
        self.points
            .iter()
            .filter_map(|p| p.log_variance.map(|v| (p.radius, v)))
    }

    /// Radius with the largest log-variance
    ///
    /// Only a selection aid for the analyst. Ties resolve to the smallest radius.
    pub fn characteristic_scale(&self) -> Option<f64> {
        self.defined()
            .rev()
            .max_by_key(|&(_, v)| OrderedFloat(v))
            .map(|(r, _)| r)
    }
}

impl fmt::Display for FptCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "First passage time curve:")?;
        for p in &self.points {
            match p.log_variance {
                Some(v) => writeln!(
                    f,
                    "  r = {:>10.1} m  var(ln FPT) = {:.4}  ({} closed, {} censored)",
                    p.radius, v, p.uncensored, p.censored
                )?,
                None => writeln!(
                    f,
                    "  r = {:>10.1} m  var(ln FPT) undefined  ({} closed, {} censored)",
                    p.radius, p.uncensored, p.censored
                )?,
            }
        }
        if let Some(scale) = self.characteristic_scale() {
            writeln!(f, "  Peak variance at r = {scale:.1} m")?;
        }
        Ok(())
    }
}

impl TabularOutput for FptCurve {
    type Row = FptCurvePoint;

    fn rows(&self) -> Vec<FptCurvePoint> {
        self.points.clone()
    }
}

/// One passage time in long format
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FptRow {
    pub individual_id: String,
    pub fix: usize,
    pub elapsed_hours: f64,
    pub radius: f64,
    pub fpt_hours: Option<f64>,
}

/// Every passage time of a result, one row per fix and radius
#[derive(Debug, Clone, Copy)]
pub struct FptMatrix<'a> {
    result: &'a FptResult,
}

impl<'a> FptMatrix<'a> {
    pub(crate) fn new(result: &'a FptResult) -> Self {
        Self { result }
    }
}

impl TabularOutput for FptMatrix<'_> {
    type Row = FptRow;

    fn rows(&self) -> Vec<FptRow> {
        let hours = self.result.elapsed_hours();
        self.result
            .columns()
            .flat_map(|(radius, times)| {
                times.iter().enumerate().map(move |(fix, t)| FptRow {
                    individual_id: self.result.individual_id().to_string(),
                    fix,
                    elapsed_hours: hours[fix],
                    radius,
                    fpt_hours: *t,
                })
            })
            .collect()
    }
}
