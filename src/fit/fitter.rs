//! Joint constrained fit of one polynomial per rank group.
//!
//! For a month with groups `g_1 < g_2 < ... < g_m` and summary points
//! `(d_i, y_i)` we solve
//!
//! ```text
//! minimize   Σ_g Σ_i |y_i − p_g(d_i)|  +  λ Σ_g ‖a_g‖₁
//! subject to p_{g+1}(x) − p_g(x) ≥ ε      (adjacent groups)
//!            0 ≤ p_g(x) ≤ 1
//!            p_g''(x) ≥ 0
//! ```
//!
//! at every point `x` of the duration grid. The problem is linear once the
//! absolute values are split:
//! - each coefficient is `a = a⁺ − a⁻` with `a⁺, a⁻ ≥ 0`, so `|a| = a⁺ + a⁻`
//!   at the optimum (both carry cost `λ`)
//! - each residual is `y − p(d) = r⁺ − r⁻` with unit cost on `r⁺ + r⁻`
//!
//! Groups are fitted jointly because the ordering constraints couple them;
//! any solver failure fails the whole month.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{FitterConfig, MonthlySummary, RankGroup};
use crate::error::ModelError;
use crate::math::{LinearProgram, Relation, fill_second_derivative_row, fill_value_row, lin_space};
use crate::models::{FitDiagnostics, FittedModel, PolyCurve};

/// Accepted post-solve constraint violation (solver round-off).
const VIOLATION_TOL: f64 = 1e-6;

/// LP variable indices of one group's coefficient vector.
#[derive(Debug, Clone)]
struct GroupVars {
    pos: Vec<usize>,
    neg: Vec<usize>,
}

impl GroupVars {
    fn new(lp: &mut LinearProgram, len: usize, lambda: f64) -> Self {
        let pos = (0..len).map(|_| lp.add_var(lambda)).collect();
        let neg = (0..len).map(|_| lp.add_var(lambda)).collect();
        Self { pos, neg }
    }

    /// Append `sign · Σ row_j a_j` as LP terms.
    fn push_terms(&self, row: &[f64], sign: f64, out: &mut Vec<(usize, f64)>) {
        for (j, &r) in row.iter().enumerate() {
            out.push((self.pos[j], sign * r));
            out.push((self.neg[j], -sign * r));
        }
    }

    fn coefficients(&self, values: &[f64]) -> Vec<f64> {
        self.pos
            .iter()
            .zip(&self.neg)
            .map(|(&p, &n)| values[p] - values[n])
            .collect()
    }
}

/// Fit the month's curves from its summary.
pub fn fit_summary(summary: &MonthlySummary, config: &FitterConfig) -> Result<FittedModel, ModelError> {
    config.validate()?;
    let month = summary.month;
    if summary.is_empty() {
        return Err(ModelError::EmptySummary(month));
    }
    if summary
        .rows
        .iter()
        .any(|r| !r.median_value.is_finite())
    {
        return Err(ModelError::FitFailure {
            month,
            reason: "summary contains non-finite medians".to_string(),
        });
    }

    let groups = summary.groups();
    let grid = lin_space(config.grid_start, config.grid_end, config.grid_points)?;
    let degree = config.degree;
    let width = degree + 1;

    let mut lp = LinearProgram::minimize();
    let vars: BTreeMap<RankGroup, GroupVars> = groups
        .iter()
        .map(|&g| (g, GroupVars::new(&mut lp, width, config.lambda_reg)))
        .collect();

    let mut row = vec![0.0; width];
    let mut terms: Vec<(usize, f64)> = Vec::with_capacity(4 * width + 2);

    // Data fit: p_g(d_i) + r⁺ − r⁻ = y_i.
    for obs in &summary.rows {
        let gv = &vars[&obs.rank_group];
        let r_pos = lp.add_var(1.0);
        let r_neg = lp.add_var(1.0);
        fill_value_row(obs.duration_bucket as f64, degree, &mut row);

        terms.clear();
        gv.push_terms(&row, 1.0, &mut terms);
        terms.push((r_pos, 1.0));
        terms.push((r_neg, -1.0));
        lp.add_constraint(&terms, Relation::Equal, obs.median_value);
    }

    // Shape: bounded and convex on the grid.
    for gv in vars.values() {
        for &x in &grid {
            fill_value_row(x, degree, &mut row);
            terms.clear();
            gv.push_terms(&row, 1.0, &mut terms);
            lp.add_constraint(&terms, Relation::AtLeast, 0.0);
            lp.add_constraint(&terms, Relation::AtMost, 1.0);

            fill_second_derivative_row(x, degree, &mut row);
            terms.clear();
            gv.push_terms(&row, 1.0, &mut terms);
            lp.add_constraint(&terms, Relation::AtLeast, 0.0);
        }
    }

    // Ordering: each group sits at least ε above the previous one.
    for pair in groups.windows(2) {
        let (lo, hi) = (&vars[&pair[0]], &vars[&pair[1]]);
        for &x in &grid {
            fill_value_row(x, degree, &mut row);
            terms.clear();
            hi.push_terms(&row, 1.0, &mut terms);
            lo.push_terms(&row, -1.0, &mut terms);
            lp.add_constraint(&terms, Relation::AtLeast, config.epsilon);
        }
    }

    let n_constraints = lp.constraint_count();
    debug!(
        %month,
        groups = groups.len(),
        points = summary.rows.len(),
        vars = lp.var_count(),
        constraints = n_constraints,
        "solving curve fit"
    );

    let solution = lp.solve().map_err(|e| ModelError::FitFailure {
        month,
        reason: e.to_string(),
    })?;

    let curves: BTreeMap<RankGroup, PolyCurve> = vars
        .iter()
        .map(|(&g, gv)| (g, PolyCurve::new(gv.coefficients(&solution.values))))
        .collect();

    let data_l1 = summary
        .rows
        .iter()
        .map(|r| (r.median_value - curves[&r.rank_group].eval(r.duration_bucket as f64)).abs())
        .sum();

    let model = FittedModel {
        month,
        curves,
        config: config.clone(),
        diagnostics: FitDiagnostics {
            objective: solution.objective,
            data_l1,
            n_points: summary.rows.len(),
            n_constraints,
        },
    };

    let violation = model.max_constraint_violation()?;
    if violation > VIOLATION_TOL {
        return Err(ModelError::FitFailure {
            month,
            reason: format!("solution violates shape constraints by {violation:.3e}"),
        });
    }

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Month, SummaryRow};
    use approx::assert_abs_diff_eq;

    const TOL: f64 = 1e-6;

    fn summary(points: &[(RankGroup, i64, f64)]) -> MonthlySummary {
        let mut rows: Vec<SummaryRow> = points
            .iter()
            .map(|&(g, d, v)| SummaryRow {
                rank_group: g,
                duration_bucket: d,
                median_value: v,
            })
            .collect();
        rows.sort_by_key(|r| (r.rank_group, r.duration_bucket));
        MonthlySummary {
            month: Month::new(2020, 6).unwrap(),
            rows,
        }
    }

    fn assert_shape(model: &FittedModel) {
        let grid = lin_space(0.0, 10.0, 100).unwrap();
        let groups = model.groups();
        for &g in &groups {
            let c = model.curve(g).unwrap();
            for &x in &grid {
                let y = c.eval(x);
                assert!(y >= -TOL && y <= 1.0 + TOL, "group {g} out of bounds at {x}: {y}");
                assert!(c.second_derivative(x) >= -TOL, "group {g} not convex at {x}");
            }
        }
        for pair in groups.windows(2) {
            let (lo, hi) = (model.curve(pair[0]).unwrap(), model.curve(pair[1]).unwrap());
            for &x in &grid {
                let gap = hi.eval(x) - lo.eval(x);
                assert!(
                    gap >= model.config.epsilon - TOL,
                    "groups {}/{} gap {gap} at {x}",
                    pair[0],
                    pair[1]
                );
            }
        }
    }

    #[test]
    fn recovers_exact_line_without_regularization() {
        let points: Vec<(RankGroup, i64, f64)> =
            (1..=6).map(|d| (1, d, 0.1 + 0.02 * d as f64)).collect();
        let config = FitterConfig {
            lambda_reg: 0.0,
            ..FitterConfig::default()
        };

        let model = fit_summary(&summary(&points), &config).unwrap();
        let a = &model.curve(1).unwrap().coefficients;
        assert_eq!(a.len(), 3);
        assert_abs_diff_eq!(a[0], 0.1, epsilon = TOL);
        assert_abs_diff_eq!(a[1], 0.02, epsilon = TOL);
        assert_abs_diff_eq!(a[2], 0.0, epsilon = TOL);
        assert_abs_diff_eq!(model.diagnostics.data_l1, 0.0, epsilon = 1e-5);
        assert_eq!(model.diagnostics.n_points, 6);
    }

    #[test]
    fn three_groups_are_ordered_bounded_and_convex() {
        let mut points = Vec::new();
        for d in 1..=9 {
            let x = d as f64;
            points.push((1, d, 0.010 + 0.002 * x + 0.0002 * x * x));
            points.push((2, d, 0.040 + 0.006 * x + 0.0004 * x * x));
            points.push((3, d, 0.120 + 0.012 * x + 0.0010 * x * x));
        }

        let model = fit_summary(&summary(&points), &FitterConfig::default()).unwrap();
        assert_eq!(model.groups(), vec![1, 2, 3]);
        assert_shape(&model);
        assert!(model.diagnostics.objective >= model.diagnostics.data_l1 - TOL);
    }

    #[test]
    fn crossing_medians_are_forced_apart() {
        // Group 2's medians sit below group 1's.
        let points = vec![
            (1, 2, 0.20),
            (1, 5, 0.25),
            (1, 8, 0.30),
            (2, 2, 0.10),
            (2, 5, 0.12),
            (2, 8, 0.15),
        ];
        let model = fit_summary(&summary(&points), &FitterConfig::default()).unwrap();
        assert_shape(&model);
        assert!(model.diagnostics.data_l1 > 0.1);
    }

    #[test]
    fn single_group_concave_data_still_convex_and_bounded() {
        let points: Vec<(RankGroup, i64, f64)> = (0..=10)
            .map(|d| {
                let x = d as f64 - 5.0;
                (7, d, 0.5 - 0.01 * x * x)
            })
            .collect();
        let model = fit_summary(&summary(&points), &FitterConfig::default()).unwrap();
        assert_eq!(model.groups(), vec![7]);
        assert_shape(&model);
    }

    #[test]
    fn impossible_separation_fails_the_whole_month() {
        let points: Vec<(RankGroup, i64, f64)> =
            (1..=12).map(|g| (g, 3, 0.05 * g as f64)).collect();
        let config = FitterConfig {
            epsilon: 0.1,
            ..FitterConfig::default()
        };
        let err = fit_summary(&summary(&points), &config).unwrap_err();
        assert!(matches!(err, ModelError::FitFailure { .. }), "{err}");
    }

    #[test]
    fn empty_summary_is_reported() {
        let err = fit_summary(&summary(&[]), &FitterConfig::default()).unwrap_err();
        assert!(matches!(err, ModelError::EmptySummary(_)));
    }

    #[test]
    fn invalid_config_is_rejected_before_solving() {
        let config = FitterConfig {
            degree: 0,
            ..FitterConfig::default()
        };
        let err = fit_summary(&summary(&[(1, 1, 0.1)]), &config).unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfig(_)));
    }
}
