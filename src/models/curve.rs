//! Per-group polynomial curves and the month's fitted model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{FitterConfig, Month, RankGroup};
use crate::error::ModelError;
use crate::math::{eval, eval_many, eval_second_derivative, lin_space};

/// `rnpd(d) = a0 + a1 d + ... + ak d^k`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolyCurve {
    pub coefficients: Vec<f64>,
}

impl PolyCurve {
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self { coefficients }
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len().saturating_sub(1)
    }

    pub fn eval(&self, duration: f64) -> f64 {
        eval(&self.coefficients, duration)
    }

    pub fn second_derivative(&self, duration: f64) -> f64 {
        eval_second_derivative(&self.coefficients, duration)
    }

    pub fn eval_many(&self, durations: &[f64]) -> Vec<f64> {
        eval_many(&self.coefficients, durations)
    }
}

/// Solver diagnostics recorded alongside a fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitDiagnostics {
    /// Optimal objective (data L1 error + regularization).
    pub objective: f64,
    /// `Σ |median - curve(duration)|` over all summary points.
    pub data_l1: f64,
    pub n_points: usize,
    pub n_constraints: usize,
}

/// One month's fitted curves, keyed by rank group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    pub month: Month,
    pub curves: BTreeMap<RankGroup, PolyCurve>,
    pub config: FitterConfig,
    pub diagnostics: FitDiagnostics,
}

impl FittedModel {
    /// Rank groups with a curve, ascending.
    pub fn groups(&self) -> Vec<RankGroup> {
        self.curves.keys().copied().collect()
    }

    pub fn curve(&self, group: RankGroup) -> Option<&PolyCurve> {
        self.curves.get(&group)
    }

    /// `rank_group → coefficients`, as handed to plotting/reporting consumers.
    pub fn coefficients(&self) -> BTreeMap<RankGroup, Vec<f64>> {
        self.curves
            .iter()
            .map(|(g, c)| (*g, c.coefficients.clone()))
            .collect()
    }

    /// Evaluate every curve on the configured duration grid.
    pub fn grid(&self) -> Result<(Vec<f64>, BTreeMap<RankGroup, Vec<f64>>), ModelError> {
        if self.curves.is_empty() {
            return Err(ModelError::CoefficientsUnset(self.month));
        }
        let xs = lin_space(self.config.grid_start, self.config.grid_end, self.config.grid_points)?;
        let values = self
            .curves
            .iter()
            .map(|(g, c)| (*g, c.eval_many(&xs)))
            .collect();
        Ok((xs, values))
    }

    /// Largest violation of the shape constraints (ordering, bounds,
    /// convexity) over the configured grid; `0.0` when all hold.
    pub fn max_constraint_violation(&self) -> Result<f64, ModelError> {
        let (xs, values) = self.grid()?;
        let mut worst: f64 = 0.0;

        for (g, ys) in &values {
            let curve = &self.curves[g];
            for (x, y) in xs.iter().zip(ys) {
                worst = worst.max(-y).max(y - 1.0);
                worst = worst.max(-curve.second_derivative(*x));
            }
        }

        let rows: Vec<&Vec<f64>> = values.values().collect();
        for pair in rows.windows(2) {
            for (lo, hi) in pair[0].iter().zip(pair[1].iter()) {
                worst = worst.max(self.config.epsilon - (hi - lo));
            }
        }

        Ok(worst)
    }
}
