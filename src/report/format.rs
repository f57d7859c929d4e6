//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::{FitOutcome, PredictionRun, TrainReport};
use crate::domain::FitterConfig;
use crate::models::FittedModel;

use super::prediction_stats;

/// Format the training summary (settings + one line per month).
pub fn format_train_summary(train: &TrainReport, fitter: &FitterConfig) -> String {
    let mut out = String::new();

    out.push_str("=== rnpd - monthly RNPD term structures ===\n");
    out.push_str(&format!(
        "Fitter: degree={} | epsilon={} | lambda={} | grid=[{}, {}] x {}\n",
        fitter.degree,
        fitter.epsilon,
        fitter.lambda_reg,
        fitter.grid_start,
        fitter.grid_end,
        fitter.grid_points,
    ));
    out.push_str(&format!(
        "Months: {} | fitted: {}\n\n",
        train.months.len(),
        train.fitted()
    ));

    push_line(
        &mut out,
        format!(
            "{:<8} {:>6} {:>7} {:>7} {:>8} {:>8} {:>10} {:>10}  {}",
            "month", "rows", "dropped", "groups", "inserted", "evicted", "objective", "data_l1", "status"
        ),
    );
    push_line(
        &mut out,
        format!(
            "{:-<8} {:-<6} {:-<7} {:-<7} {:-<8} {:-<8} {:-<10} {:-<10}  {:-<6}",
            "", "", "", "", "", "", "", "", ""
        ),
    );

    for m in &train.months {
        let (objective, data_l1, status) = match &m.outcome {
            FitOutcome::Fitted {
                objective, data_l1, ..
            } => (format!("{objective:.5}"), format!("{data_l1:.5}"), "fitted".to_string()),
            FitOutcome::Skipped(reason) => ("-".to_string(), "-".to_string(), format!("skipped: {reason}")),
            FitOutcome::Failed(reason) => ("-".to_string(), "-".to_string(), format!("failed: {reason}")),
            FitOutcome::Rejected(reason) => ("-".to_string(), "-".to_string(), format!("rejected: {reason}")),
        };
        let counts = match &m.ingest {
            Some(i) => [i.rows, i.dropped, i.groups.len(), i.inserted, i.evicted].map(|n| n.to_string()),
            None => ["-"; 5].map(str::to_string),
        };
        push_line(
            &mut out,
            format!(
                "{:<8} {:>6} {:>7} {:>7} {:>8} {:>8} {:>10} {:>10}  {}",
                m.month.to_string(),
                counts[0],
                counts[1],
                counts[2],
                counts[3],
                counts[4],
                objective,
                data_l1,
                status
            ),
        );
    }

    out
}

/// Format one month's coefficient table.
pub fn format_model(model: &FittedModel) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Curves for {} ({} groups, {} summary points):\n",
        model.month,
        model.curves.len(),
        model.diagnostics.n_points
    ));

    let width = model.config.degree + 1;
    let mut header = format!("{:<6}", "group");
    for j in 0..width {
        header.push_str(&format!(" {:>12}", format!("a{j}")));
    }
    header.push_str(&format!(" {:>8} {:>8}", "p(0)", "p(10)"));
    push_line(&mut out, header);

    for (g, c) in &model.curves {
        let mut line = format!("{g:<6}");
        for a in &c.coefficients {
            line.push_str(&format!(" {a:>12.6}"));
        }
        line.push_str(&format!(" {:>8.4} {:>8.4}", c.eval(0.0), c.eval(10.0)));
        push_line(&mut out, line);
    }

    out
}

/// Format out-of-sample hit rates.
pub fn format_prediction_summary(run: &PredictionRun) -> String {
    let stats = prediction_stats(&run.predictions);
    let mut out = String::new();

    out.push_str("Out-of-sample classification (previous month's curves):\n");
    push_line(
        &mut out,
        format!("{:<8} {:>6} {:>8} {:>8}", "month", "rows", "hit", "within1"),
    );
    for (month, h) in &stats.by_month {
        push_line(
            &mut out,
            format!(
                "{:<8} {:>6} {:>7.1}% {:>7.1}%",
                month.to_string(),
                h.rows,
                100.0 * h.hit_rate(),
                100.0 * h.near_rate()
            ),
        );
    }
    push_line(
        &mut out,
        format!(
            "{:<8} {:>6} {:>7.1}% {:>7.1}%",
            "all",
            stats.overall.rows,
            100.0 * stats.overall.hit_rate(),
            100.0 * stats.overall.near_rate()
        ),
    );

    if !run.skipped.is_empty() {
        let months: Vec<String> = run.skipped.iter().map(ToString::to_string).collect();
        out.push_str(&format!("Skipped (no prior model): {}\n", months.join(", ")));
    }

    out
}

fn push_line(out: &mut String, line: String) {
    out.push_str(line.trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Month;
    use crate::models::{FitDiagnostics, PolyCurve};
    use crate::registry::IngestReport;
    use crate::app::pipeline::MonthReport;

    #[test]
    fn train_summary_lists_every_month() {
        let jan = Month::new(2020, 1).unwrap();
        let ingest = |month| IngestReport {
            month,
            rows: 10,
            dropped: 1,
            groups: vec![1, 2],
            inserted: 10,
            evicted: 0,
            summary_rows: 6,
        };
        let train = TrainReport {
            months: vec![
                MonthReport {
                    month: jan,
                    ingest: Some(ingest(jan)),
                    outcome: FitOutcome::Fitted {
                        groups: 2,
                        objective: 0.5,
                        data_l1: 0.25,
                    },
                },
                MonthReport {
                    month: jan.next(),
                    ingest: Some(ingest(jan.next())),
                    outcome: FitOutcome::Failed("infeasible".to_string()),
                },
                MonthReport {
                    month: jan.next().next(),
                    ingest: None,
                    outcome: FitOutcome::Rejected("missing required columns: rnpd".to_string()),
                },
            ],
        };

        let text = format_train_summary(&train, &FitterConfig::default());
        assert!(text.contains("Months: 3 | fitted: 1"));
        assert!(text.contains("2020-01"));
        assert!(text.contains("0.25000"));
        assert!(text.contains("failed: infeasible"));
        let rejected = text.lines().find(|l| l.starts_with("2020-03")).unwrap();
        assert!(rejected.contains("rejected: missing required columns: rnpd"));
        assert_eq!(rejected.split_whitespace().nth(1), Some("-"));
        assert!(text.lines().all(|l| l == l.trim_end()));
    }

    #[test]
    fn model_table_has_one_row_per_group() {
        let model = FittedModel {
            month: Month::new(2020, 5).unwrap(),
            curves: [
                (2, PolyCurve::new(vec![0.05, 0.01, 0.001])),
                (3, PolyCurve::new(vec![0.10, 0.01, 0.001])),
            ]
            .into_iter()
            .collect(),
            config: FitterConfig::default(),
            diagnostics: FitDiagnostics {
                objective: 0.0,
                data_l1: 0.0,
                n_points: 8,
                n_constraints: 0,
            },
        };
        let text = format_model(&model);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[1].contains("a2"));
        assert!(lines[2].starts_with("2 "));
        assert!(lines[3].contains("0.3000"));
    }
}
