//! Radius sweep parameters

use movetrack_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Radii (metres) at which first passage times are computed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FptParameters {
    /// Circle radii in metres, strictly positive and finite
    pub radii: Vec<f64>,
}

impl FptParameters {
    pub fn new(radii: Vec<f64>) -> Result<Self> {
        let params = Self { radii };
        params.validate()?;
        Ok(params)
    }

    /// `count` radii evenly spaced from `start` to `end` inclusive
    pub fn linear(start: f64, end: f64, count: usize) -> Result<Self> {
        if count == 0 {
            return Err(Error::InvalidParameter(
                "radius sweep needs at least one radius".to_string(),
            ));
        }
        if !(end >= start) {
            return Err(Error::InvalidParameter(format!(
                "radius sweep end {end} is below start {start}"
            )));
        }
        let radii = if count == 1 {
            vec![start]
        } else {
            let step = (end - start) / (count - 1) as f64;
            (0..count).map(|i| start + step * i as f64).collect()
        };
        Self::new(radii)
    }

    /// Radii from `start` up to and including `end` every `step` metres
    pub fn by_step(start: f64, end: f64, step: f64) -> Result<Self> {
        if !(step > 0.0) || !step.is_finite() {
            return Err(Error::not_positive("radius step", step));
        }
        if !(end >= start) {
            return Err(Error::InvalidParameter(format!(
                "radius sweep end {end} is below start {start}"
            )));
        }
        // Tolerate rounding so that `end` itself is included when it lies on the grid
        let count = ((end - start) / step + 1e-9).floor() as usize + 1;
        Self::new((0..count).map(|i| start + step * i as f64).collect())
    }

    pub fn validate(&self) -> Result<()> {
        if self.radii.is_empty() {
            return Err(Error::InvalidParameter(
                "radius sweep needs at least one radius".to_string(),
            ));
        }
        if let Some(&bad) = self.radii.iter().find(|r| !(**r > 0.0) || !r.is_finite()) {
            return Err(Error::not_positive("radius", bad));
        }
        Ok(())
    }
}
