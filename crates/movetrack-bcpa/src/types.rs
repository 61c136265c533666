//! Types used for change point analysis

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which parameters differ on the two sides of a break
///
/// The eight models are numbered as usual: M0 no change, M1 mean, M2 SD,
/// M3 autocorrelation, M4 mean and SD, M5 mean and autocorrelation, M6 SD
/// and autocorrelation, M7 all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeModel {
    pub mean: bool,
    pub sd: bool,
    pub rho: bool,
}

impl ChangeModel {
    pub const NONE: Self = Self::new(false, false, false);
    pub const ALL_PARAMETERS: Self = Self::new(true, true, true);

    /// Every model, in numbering order
    pub const MODELS: [Self; 8] = [
        Self::new(false, false, false),
        Self::new(true, false, false),
        Self::new(false, true, false),
        Self::new(false, false, true),
        Self::new(true, true, false),
        Self::new(true, false, true),
        Self::new(false, true, true),
        Self::new(true, true, true),
    ];

    pub const fn new(mean: bool, sd: bool, rho: bool) -> Self {
        Self { mean, sd, rho }
    }

    /// Model number, 0 to 7
    pub fn index(&self) -> usize {
        match (self.mean, self.sd, self.rho) {
            (false, false, false) => 0,
            (true, false, false) => 1,
            (false, true, false) => 2,
            (false, false, true) => 3,
            (true, true, false) => 4,
            (true, false, true) => 5,
            (false, true, true) => 6,
            (true, true, true) => 7,
        }
    }

    /// Free parameters in a window under this model
    pub fn n_parameters(&self) -> usize {
        3 + self.mean as usize + self.sd as usize + self.rho as usize
    }

    pub fn has_change(&self) -> bool {
        self.mean || self.sd || self.rho
    }

    /// Names of the changing parameters
    pub fn changed(&self) -> Vec<&'static str> {
        [(self.mean, "mean"), (self.sd, "sd"), (self.rho, "rho")]
            .into_iter()
            .filter_map(|(changed, name)| changed.then_some(name))
            .collect()
    }
}

impl fmt::Display for ChangeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_change() {
            write!(f, "M{} ({})", self.index(), self.changed().join(", "))
        } else {
            write!(f, "M0 (no change)")
        }
    }
}

/// A significant change point of the flat summary
#[derive(Debug, Clone, PartialEq)]
pub struct ChangePoint {
    /// First observation of the new phase
    pub index: usize,
    /// Representative time of the merged window breaks
    pub time: f64,
    /// Number of window breaks merged into this change point
    pub support: usize,
    /// Fraction of the windows covering the change point that support it
    pub confidence: f64,
    /// Most frequent model among the supporting windows
    pub change_type: ChangeModel,
}

impl fmt::Display for ChangePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ChangePoint {{ index: {}, time: {:.3}, support: {}, confidence: {:.3}, type: {} }}",
            self.index, self.time, self.support, self.confidence, self.change_type
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_numbering() {
        for (i, model) in ChangeModel::MODELS.iter().enumerate() {
            assert_eq!(model.index(), i);
        }
        assert_eq!(ChangeModel::NONE.n_parameters(), 3);
        assert_eq!(ChangeModel::ALL_PARAMETERS.n_parameters(), 6);
        assert_eq!(ChangeModel::new(true, false, true).to_string(), "M5 (mean, rho)");
        assert_eq!(ChangeModel::NONE.to_string(), "M0 (no change)");
    }
}
