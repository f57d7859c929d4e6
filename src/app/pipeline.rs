//! Shared "monthly pipeline" logic used by every CLI command.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! panel -> per-month ingest -> fit -> out-of-sample classification
//!
//! The CLI handlers can then focus on presentation (printing vs exports).

use tracing::{info, warn};

use crate::domain::{FitterConfig, Month, MonthData, Prediction, StoreConfig};
use crate::error::{AppError, ModelError};
use crate::io::IngestedPanel;
use crate::registry::{IngestReport, ModelRegistry};

/// What happened when a month was fitted.
#[derive(Debug, Clone, PartialEq)]
pub enum FitOutcome {
    Fitted { groups: usize, objective: f64, data_l1: f64 },
    /// Nothing to fit (no aggregated rows).
    Skipped(String),
    /// The optimizer failed; the month keeps no model.
    Failed(String),
    /// The month's input was refused before ingest (missing columns).
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthReport {
    pub month: Month,
    /// `None` when the month was rejected before ingest.
    pub ingest: Option<IngestReport>,
    pub outcome: FitOutcome,
}

/// Per-month results of `train`, ascending by month.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrainReport {
    pub months: Vec<MonthReport>,
}

impl TrainReport {
    pub fn fitted(&self) -> usize {
        self.months
            .iter()
            .filter(|m| matches!(m.outcome, FitOutcome::Fitted { .. }))
            .count()
    }
}

/// Out-of-sample predictions for a panel.
#[derive(Debug, Clone, Default)]
pub struct PredictionRun {
    pub predictions: Vec<Prediction>,
    /// Months with no prior-month model to classify against.
    pub skipped: Vec<Month>,
}

/// All computed outputs of a full run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub registry: ModelRegistry,
    pub train: TrainReport,
    pub predictions: PredictionRun,
}

/// Ingest and fit every month of the panel in chronological order.
pub fn train(registry: &mut ModelRegistry, panel: &IngestedPanel) -> Result<TrainReport, AppError> {
    train_months(registry, panel.split_by_month())
}

/// Ingest and fit each month in turn.
///
/// Rejected months, fit failures and empty months are logged and recorded,
/// and the next month proceeds. Only non-recoverable errors abort the run.
pub fn train_months(registry: &mut ModelRegistry, months: Vec<MonthData>) -> Result<TrainReport, AppError> {
    let mut report = TrainReport::default();

    for data in months {
        let month = data.month;
        let ingest = match registry.ingest_month(data) {
            Ok(ingest) => ingest,
            Err(e) if e.is_recoverable() => {
                warn!(%month, error = %e, "month rejected; continuing");
                report.months.push(MonthReport {
                    month,
                    ingest: None,
                    outcome: FitOutcome::Rejected(e.to_string()),
                });
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let outcome = match registry.fit_month(month) {
            Ok(model) => FitOutcome::Fitted {
                groups: model.curves.len(),
                objective: model.diagnostics.objective,
                data_l1: model.diagnostics.data_l1,
            },
            Err(e) if e.is_recoverable() => {
                warn!(%month, error = %e, "month not fitted; continuing");
                if matches!(e, ModelError::EmptySummary(_)) {
                    FitOutcome::Skipped(e.to_string())
                } else {
                    FitOutcome::Failed(e.to_string())
                }
            }
            Err(e) => return Err(e.into()),
        };

        report.months.push(MonthReport {
            month,
            ingest: Some(ingest),
            outcome,
        });
    }

    info!(
        months = report.months.len(),
        fitted = report.fitted(),
        "training finished"
    );
    Ok(report)
}

/// Classify every row with the curves fitted for the previous calendar month.
///
/// Months without such a model (the first month, or after a failed fit) are
/// skipped with a warning.
pub fn predict_panel(registry: &ModelRegistry, panel: &IngestedPanel) -> Result<PredictionRun, AppError> {
    let mut run = PredictionRun::default();

    for data in panel.split_by_month() {
        let month = data.month;
        let model_month = month.prev();
        if registry.model(model_month).is_none() {
            warn!(%month, %model_month, "no model for the previous month; skipping predictions");
            run.skipped.push(month);
            continue;
        }

        let points: Vec<(f64, f64)> = data
            .rows
            .iter()
            .map(|r| (r.classify_duration(), r.rnpd))
            .collect();
        let groups = registry.predict(model_month, &points)?;

        run.predictions.extend(
            data.rows
                .into_iter()
                .zip(groups)
                .map(|(row, predicted_group)| Prediction {
                    row,
                    predicted_group,
                    model_month,
                }),
        );
    }

    Ok(run)
}

/// Train on the panel, then classify it out of sample.
pub fn run_panel(
    panel: &IngestedPanel,
    store: StoreConfig,
    fitter: FitterConfig,
) -> Result<RunOutput, AppError> {
    let mut registry = ModelRegistry::new(store, fitter)?;
    let train = train(&mut registry, panel)?;
    let predictions = predict_panel(&registry, panel)?;
    Ok(RunOutput {
        registry,
        train,
        predictions,
    })
}
