//! Export per-security predictions to CSV.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts:
//! the canonical input columns followed by `predicted_group` and `model_month`.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::domain::{DurationBucket, Prediction, RankGroup};
use crate::error::AppError;

#[derive(Debug, Serialize)]
struct PredictionRecord<'a> {
    month: String,
    security_id: &'a str,
    rank_group: RankGroup,
    rnpd: f64,
    duration_bucket: DurationBucket,
    duration: Option<f64>,
    #[serde(rename = "yield")]
    yield_: Option<f64>,
    spread: Option<f64>,
    rank: Option<f64>,
    predicted_group: RankGroup,
    model_month: String,
}

impl<'a> From<&'a Prediction> for PredictionRecord<'a> {
    fn from(p: &'a Prediction) -> Self {
        let r = &p.row;
        Self {
            month: r.month.to_string(),
            security_id: &r.security_id,
            rank_group: r.rank_group,
            rnpd: r.rnpd,
            duration_bucket: r.duration_bucket,
            duration: r.duration,
            yield_: r.yield_,
            spread: r.spread,
            rank: r.rank,
            predicted_group: p.predicted_group,
            model_month: p.model_month.to_string(),
        }
    }
}

/// Write predictions to a CSV file.
pub fn write_predictions_csv(path: &Path, predictions: &[Prediction]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_predictions(file, predictions)
}

/// Write predictions as CSV to any writer.
pub fn write_predictions<W: Write>(out: W, predictions: &[Prediction]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    for p in predictions {
        writer
            .serialize(PredictionRecord::from(p))
            .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InputRow, Month};

    #[test]
    fn header_and_rows_are_written() {
        let row = InputRow {
            month: Month::new(2020, 2).unwrap(),
            rank_group: 3,
            rnpd: 0.125,
            duration_bucket: 4,
            security_id: "X1".to_string(),
            yield_: Some(0.05),
            spread: None,
            duration: Some(3.8),
            rank: None,
        };
        let preds = vec![Prediction {
            row,
            predicted_group: 2,
            model_month: Month::new(2020, 1).unwrap(),
        }];

        let mut buf = Vec::new();
        write_predictions(&mut buf, &preds).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next(),
            Some("month,security_id,rank_group,rnpd,duration_bucket,duration,yield,spread,rank,predicted_group,model_month")
        );
        assert_eq!(lines.next(), Some("2020-02,X1,3,0.125,4,3.8,0.05,,,2,2020-01"));
        assert_eq!(lines.next(), None);
    }
}
