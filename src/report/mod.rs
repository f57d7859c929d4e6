//! Reporting utilities: prediction statistics and formatted terminal output.

use std::collections::BTreeMap;

use crate::domain::{Month, Prediction};

pub mod format;

pub use format::*;

/// Hit counts of predicted vs. reported rank group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HitCount {
    pub rows: usize,
    pub hits: usize,
    /// Predicted within one group of the reported one.
    pub near: usize,
}

impl HitCount {
    fn add(&mut self, p: &Prediction) {
        let diff = p.predicted_group.abs_diff(p.row.rank_group);
        self.rows += 1;
        if diff == 0 {
            self.hits += 1;
        }
        if diff <= 1 {
            self.near += 1;
        }
    }

    pub fn hit_rate(&self) -> f64 {
        ratio(self.hits, self.rows)
    }

    pub fn near_rate(&self) -> f64 {
        ratio(self.near, self.rows)
    }
}

fn ratio(n: usize, d: usize) -> f64 {
    if d == 0 { 0.0 } else { n as f64 / d as f64 }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionStats {
    pub overall: HitCount,
    pub by_month: BTreeMap<Month, HitCount>,
}

/// Compare each prediction with the row's reported group.
pub fn prediction_stats(predictions: &[Prediction]) -> PredictionStats {
    let mut stats = PredictionStats::default();
    for p in predictions {
        stats.overall.add(p);
        stats.by_month.entry(p.row.month).or_default().add(p);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InputRow, RankGroup};

    fn pred(month: Month, actual: RankGroup, predicted: RankGroup) -> Prediction {
        Prediction {
            row: InputRow {
                month,
                rank_group: actual,
                rnpd: 0.1,
                duration_bucket: 3,
                security_id: "S".to_string(),
                yield_: None,
                spread: None,
                duration: None,
                rank: None,
            },
            predicted_group: predicted,
            model_month: month.prev(),
        }
    }

    #[test]
    fn hit_rates_per_month() {
        let feb = Month::new(2020, 2).unwrap();
        let mar = feb.next();
        let preds = vec![
            pred(feb, 3, 3),
            pred(feb, 3, 4),
            pred(feb, 5, 1),
            pred(mar, 2, 2),
        ];
        let stats = prediction_stats(&preds);

        assert_eq!(stats.overall, HitCount { rows: 4, hits: 2, near: 3 });
        assert_eq!(stats.by_month[&feb].hits, 1);
        assert!((stats.by_month[&feb].hit_rate() - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(stats.by_month[&mar].hit_rate(), 1.0);
    }

    #[test]
    fn empty_input_has_zero_rates() {
        let stats = prediction_stats(&[]);
        assert_eq!(stats.overall.hit_rate(), 0.0);
        assert!(stats.by_month.is_empty());
    }
}
