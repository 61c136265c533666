//! Information-criterion comparison of fitted models
//!
//! Lower AIC/BIC is preferred. The table only ranks models; no significance
//! test is applied and the choice stays with the analyst.

use crate::fit::FittedHmm;
use movetrack_core::TabularOutput;
use ordered_float::OrderedFloat;
use serde::Serialize;
use std::fmt;

/// One fitted model in a comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub log_likelihood: f64,
    pub n_parameters: usize,
    pub n_observations: usize,
    pub aic: f64,
    pub bic: f64,
    /// AIC difference from the best model in the comparison
    pub delta_aic: f64,
    pub converged: bool,
}

/// Ranking of fitted models by information criterion
#[derive(Debug, Clone, Default)]
pub struct ModelComparison {
    models: Vec<ModelSummary>,
}

impl ModelComparison {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fitted model under a display name
    pub fn add(mut self, name: impl Into<String>, model: &FittedHmm) -> Self {
        self.models.push(ModelSummary {
            name: name.into(),
            log_likelihood: model.log_likelihood(),
            n_parameters: model.n_parameters(),
            n_observations: model.n_observations(),
            aic: model.aic(),
            bic: model.bic(),
            delta_aic: 0.0,
            converged: model.diagnostics().is_regular(),
        });
        self.refresh_deltas();
        self
    }

    fn refresh_deltas(&mut self) {
        let best = self
            .models
            .iter()
            .map(|m| OrderedFloat(m.aic))
            .min()
            .map_or(0.0, |b| b.0);
        for m in &mut self.models {
            m.delta_aic = m.aic - best;
        }
    }

    /// Models in insertion order
    pub fn models(&self) -> &[ModelSummary] {
        &self.models
    }

    /// Models sorted by increasing AIC
    pub fn ranked_by_aic(&self) -> Vec<&ModelSummary> {
        let mut ranked: Vec<&ModelSummary> = self.models.iter().collect();
        ranked.sort_by_key(|m| OrderedFloat(m.aic));
        ranked
    }

    /// Models sorted by increasing BIC
    pub fn ranked_by_bic(&self) -> Vec<&ModelSummary> {
        let mut ranked: Vec<&ModelSummary> = self.models.iter().collect();
        ranked.sort_by_key(|m| OrderedFloat(m.bic));
        ranked
    }

    pub fn best_by_aic(&self) -> Option<&ModelSummary> {
        self.models.iter().min_by_key(|m| OrderedFloat(m.aic))
    }

    pub fn best_by_bic(&self) -> Option<&ModelSummary> {
        self.models.iter().min_by_key(|m| OrderedFloat(m.bic))
    }
}

impl fmt::Display for ModelComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<24} {:>12} {:>4} {:>12} {:>12} {:>10}",
            "model", "logLik", "k", "AIC", "BIC", "dAIC"
        )?;
        for m in self.ranked_by_aic() {
            writeln!(
                f,
                "{:<24} {:>12.3} {:>4} {:>12.3} {:>12.3} {:>10.3}{}",
                m.name,
                m.log_likelihood,
                m.n_parameters,
                m.aic,
                m.bic,
                m.delta_aic,
                if m.converged { "" } else { "  (not converged)" }
            )?;
        }
        Ok(())
    }
}

impl TabularOutput for ModelComparison {
    type Row = ModelSummary;

    fn rows(&self) -> Vec<ModelSummary> {
        self.ranked_by_aic().into_iter().cloned().collect()
    }
}
