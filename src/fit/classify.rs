//! Nearest-curve classification.
//!
//! A `(duration, rnpd)` pair is assigned to the rank group whose curve value at
//! `duration` is closest to `rnpd`. Only the vertical distance is compared;
//! ties resolve to the lowest group. Curves that evaluate to a non-finite
//! value are never selected.

use rayon::prelude::*;

use crate::domain::RankGroup;
use crate::error::ModelError;
use crate::models::FittedModel;

/// Classify one observation against a fitted month.
pub fn classify(model: &FittedModel, duration: f64, value: f64) -> Result<RankGroup, ModelError> {
    if !(duration.is_finite() && value.is_finite()) {
        return Err(ModelError::NonFiniteObservation { duration, value });
    }

    let mut best: Option<(RankGroup, f64)> = None;
    for (&group, curve) in &model.curves {
        let dist = (curve.eval(duration) - value).abs();
        if !dist.is_finite() {
            continue;
        }
        match best {
            None => best = Some((group, dist)),
            Some((_, d)) if dist < d => best = Some((group, dist)),
            _ => {}
        }
    }
    best.map(|(g, _)| g)
        .ok_or(ModelError::CoefficientsUnset(model.month))
}

/// Classify a batch of `(duration, rnpd)` pairs; output is aligned with input.
pub fn classify_batch(model: &FittedModel, points: &[(f64, f64)]) -> Result<Vec<RankGroup>, ModelError> {
    if model.curves.is_empty() {
        return Err(ModelError::CoefficientsUnset(model.month));
    }
    points
        .par_iter()
        .map(|&(duration, value)| classify(model, duration, value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitterConfig, Month};
    use crate::models::{FitDiagnostics, PolyCurve};

    fn model(curves: &[(RankGroup, Vec<f64>)]) -> FittedModel {
        FittedModel {
            month: Month::new(2022, 2).unwrap(),
            curves: curves
                .iter()
                .map(|(g, a)| (*g, PolyCurve::new(a.clone())))
                .collect(),
            config: FitterConfig::default(),
            diagnostics: FitDiagnostics {
                objective: 0.0,
                data_l1: 0.0,
                n_points: 0,
                n_constraints: 0,
            },
        }
    }

    #[test]
    fn picks_closest_curve_value() {
        let m = model(&[
            (1, vec![0.02, 0.001, 0.0]),
            (2, vec![0.10, 0.002, 0.0]),
            (5, vec![0.30, 0.010, 0.001]),
        ]);
        // At d=4: g1=0.024, g2=0.108, g5=0.356.
        assert_eq!(classify(&m, 4.0, 0.03).unwrap(), 1);
        assert_eq!(classify(&m, 4.0, 0.12).unwrap(), 2);
        assert_eq!(classify(&m, 4.0, 0.9).unwrap(), 5);
    }

    #[test]
    fn ties_resolve_to_lowest_group() {
        let m = model(&[(3, vec![0.25]), (4, vec![0.75])]);
        assert_eq!(classify(&m, 7.0, 0.5).unwrap(), 3);
    }

    #[test]
    fn repeated_calls_are_deterministic() {
        let m = model(&[(1, vec![0.05, 0.01, 0.0]), (2, vec![0.15, 0.01, 0.0])]);
        let first = classify(&m, 3.3, 0.14).unwrap();
        for _ in 0..10 {
            assert_eq!(classify(&m, 3.3, 0.14).unwrap(), first);
        }
    }

    #[test]
    fn batch_preserves_row_order() {
        let m = model(&[(1, vec![0.1]), (2, vec![0.5]), (3, vec![0.9])]);
        let points = vec![(1.0, 0.88), (2.0, 0.12), (3.0, 0.47), (4.0, 0.11)];
        assert_eq!(classify_batch(&m, &points).unwrap(), vec![3, 1, 2, 1]);
    }

    #[test]
    fn non_finite_inputs_are_rejected() {
        let m = model(&[(1, vec![0.1]), (2, vec![0.5])]);
        assert!(matches!(
            classify(&m, 3.0, f64::NAN),
            Err(ModelError::NonFiniteObservation { .. })
        ));
        assert!(matches!(
            classify(&m, f64::INFINITY, 0.2),
            Err(ModelError::NonFiniteObservation { .. })
        ));
        assert!(classify_batch(&m, &[(1.0, 0.1), (f64::NAN, 0.1)]).is_err());
    }

    #[test]
    fn non_finite_curve_is_never_chosen() {
        let m = model(&[(1, vec![f64::NAN]), (2, vec![0.9])]);
        assert_eq!(classify(&m, 1.0, 0.1).unwrap(), 2);

        let broken = model(&[(1, vec![f64::NAN])]);
        assert!(matches!(classify(&broken, 1.0, 0.1), Err(ModelError::CoefficientsUnset(_))));
    }

    #[test]
    fn model_without_curves_fails_loudly() {
        let m = model(&[]);
        assert!(matches!(classify(&m, 1.0, 0.1), Err(ModelError::CoefficientsUnset(_))));
        assert!(matches!(
            classify_batch(&m, &[(1.0, 0.1)]),
            Err(ModelError::CoefficientsUnset(_))
        ));
    }
}
