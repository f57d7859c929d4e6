//! Read/write curve JSON files.
//!
//! Curve JSON is the "portable" representation of a run:
//! - fitter settings and solver diagnostics per month
//! - per-group coefficients
//! - a precomputed grid for quick plotting
//!
//! The schema is defined by `domain::CurveFile`. A saved file can be turned
//! back into `FittedModel`s for classification without refitting.

use std::fs::File;
use std::path::Path;

use crate::domain::{CurveFile, CurveGrid, GroupCurve, Month, MonthCurves};
use crate::error::{AppError, ModelError};
use crate::models::{FitDiagnostics, FittedModel, PolyCurve};

/// Build the file representation of a set of fitted months.
pub fn curve_file<'a>(models: impl IntoIterator<Item = &'a FittedModel>) -> Result<CurveFile, ModelError> {
    let mut months = Vec::new();
    for model in models {
        let (duration, values) = model.grid()?;
        let curves = values
            .into_iter()
            .map(|(rank_group, rnpd)| GroupCurve {
                rank_group,
                coefficients: model.curves[&rank_group].coefficients.clone(),
                grid: CurveGrid {
                    duration: duration.clone(),
                    rnpd,
                },
            })
            .collect();
        months.push(MonthCurves {
            month: model.month,
            fitter: model.config.clone(),
            objective: model.diagnostics.objective,
            data_l1: model.diagnostics.data_l1,
            curves,
        });
    }
    Ok(CurveFile {
        tool: "rnpd".to_string(),
        months,
    })
}

impl MonthCurves {
    /// Rebuild the fitted model (point and constraint counts are not stored).
    pub fn to_model(&self) -> FittedModel {
        FittedModel {
            month: self.month,
            curves: self
                .curves
                .iter()
                .map(|c| (c.rank_group, PolyCurve::new(c.coefficients.clone())))
                .collect(),
            config: self.fitter.clone(),
            diagnostics: FitDiagnostics {
                objective: self.objective,
                data_l1: self.data_l1,
                n_points: 0,
                n_constraints: 0,
            },
        }
    }
}

impl CurveFile {
    pub fn month(&self, month: Month) -> Option<&MonthCurves> {
        self.months.iter().find(|m| m.month == month)
    }

    pub fn latest(&self) -> Option<&MonthCurves> {
        self.months.iter().max_by_key(|m| m.month)
    }
}

/// Write a curve JSON file.
pub fn write_curves_json<'a>(
    path: &Path,
    models: impl IntoIterator<Item = &'a FittedModel>,
) -> Result<(), AppError> {
    let curves = curve_file(models)?;
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create curve JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, &curves)
        .map_err(|e| AppError::new(2, format!("Failed to write curve JSON: {e}")))?;

    Ok(())
}

/// Read a curve JSON file.
pub fn read_curves_json(path: &Path) -> Result<CurveFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open curve JSON '{}': {e}", path.display())))?;
    let curves: CurveFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid curve JSON: {e}")))?;
    Ok(curves)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::FitterConfig;
    use crate::fit::classify;

    fn model(month: Month) -> FittedModel {
        FittedModel {
            month,
            curves: [
                (1, PolyCurve::new(vec![0.02, 0.003, 0.0001])),
                (4, PolyCurve::new(vec![0.20, 0.010, 0.0005])),
            ]
            .into_iter()
            .collect(),
            config: FitterConfig::default(),
            diagnostics: FitDiagnostics {
                objective: 0.4,
                data_l1: 0.3,
                n_points: 12,
                n_constraints: 600,
            },
        }
    }

    #[test]
    fn file_carries_grid_and_coefficients() {
        let m = Month::new(2021, 3).unwrap();
        let file = curve_file([&model(m)]).unwrap();

        assert_eq!(file.tool, "rnpd");
        let mc = file.month(m).unwrap();
        assert_eq!(mc.curves.len(), 2);
        assert_eq!(mc.curves[1].rank_group, 4);
        assert_eq!(mc.curves[0].grid.duration.len(), 100);
        assert_eq!(mc.curves[0].grid.rnpd.len(), 100);
        assert!((mc.curves[0].grid.rnpd[0] - 0.02).abs() < 1e-12);
    }

    #[test]
    fn json_reload_classifies_like_the_fitted_model() {
        let m = Month::new(2021, 3).unwrap();
        let fitted = model(m);
        let file = curve_file([&fitted]).unwrap();

        let json = serde_json::to_string(&file).unwrap();
        let back: CurveFile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.latest().map(|c| c.month), Some(m));

        let rebuilt = back.month(m).unwrap().to_model();
        for (d, v) in [(1.0, 0.03), (5.0, 0.25), (9.0, 0.1)] {
            assert_eq!(classify(&rebuilt, d, v).unwrap(), classify(&fitted, d, v).unwrap());
        }
    }

    #[test]
    fn empty_model_cannot_be_saved() {
        let mut m = model(Month::new(2021, 3).unwrap());
        m.curves.clear();
        assert!(matches!(curve_file([&m]), Err(ModelError::CoefficientsUnset(_))));
    }
}
