//! Model registry: owns the cumulative sample store and every per-month artifact.
//!
//! Per month the lifecycle is `empty → ingested → fitted`. Months are expected
//! in ascending order: the store's eviction policy ("drop the oldest month")
//! is only meaningful under monotonic time. Re-ingesting or re-fitting a month
//! is allowed and overwrites the previous artifacts.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::aggregate::summarize;
use crate::domain::{
    FitterConfig, InputRow, MAX_RANK_GROUP, MIN_RANK_GROUP, Month, MonthData, MonthState,
    MonthlySummary, Observation, RankGroup, StoreConfig,
};
use crate::error::ModelError;
use crate::fit::{classify, classify_batch, fit_summary};
use crate::models::FittedModel;
use crate::store::SampleStore;

/// What `ingest_month` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub month: Month,
    /// Rows accepted into the store.
    pub rows: usize,
    /// Rows skipped for invalid fields or a foreign month.
    pub dropped: usize,
    pub groups: Vec<RankGroup>,
    pub inserted: usize,
    pub evicted: usize,
    pub summary_rows: usize,
}

#[derive(Debug, Clone)]
pub struct ModelRegistry {
    fitter: FitterConfig,
    store: SampleStore,
    data: BTreeMap<Month, MonthData>,
    summaries: BTreeMap<Month, MonthlySummary>,
    models: BTreeMap<Month, FittedModel>,
}

impl ModelRegistry {
    pub fn new(store: StoreConfig, fitter: FitterConfig) -> Result<Self, ModelError> {
        fitter.validate()?;
        Ok(Self {
            fitter,
            store: SampleStore::new(store)?,
            data: BTreeMap::new(),
            summaries: BTreeMap::new(),
            models: BTreeMap::new(),
        })
    }

    pub fn fitter_config(&self) -> &FitterConfig {
        &self.fitter
    }

    pub fn store(&self) -> &SampleStore {
        &self.store
    }

    /// Check the month's columns, skip invalid rows, then feed the store and
    /// recompute the month's summary.
    ///
    /// Nothing is mutated when required columns are missing.
    pub fn ingest_month(&mut self, mut data: MonthData) -> Result<IngestReport, ModelError> {
        let month = data.month;
        check_columns(&data)?;

        let total = data.rows.len();
        data.rows.retain(|row| match invalid_row_reason(month, row) {
            Some(reason) => {
                warn!(%month, security = %row.security_id, "skipping row: {reason}");
                false
            }
            None => true,
        });
        let dropped = total - data.rows.len();

        if let Some(latest) = self.data.keys().next_back().copied() {
            if month < latest {
                warn!(%month, %latest, "ingesting a month older than the latest one; eviction order may be wrong");
            }
        }

        let mut by_group: BTreeMap<RankGroup, Vec<Observation>> = BTreeMap::new();
        for row in &data.rows {
            by_group.entry(row.rank_group).or_default().push(row.observation());
        }

        let mut inserted = 0;
        let mut evicted = 0;
        for (group, observations) in &by_group {
            let stats = self.store.ingest(*group, observations);
            inserted += stats.inserted;
            evicted += stats.evicted;
        }

        let summary = summarize(&self.store, month);
        let report = IngestReport {
            month,
            rows: data.rows.len(),
            dropped,
            groups: by_group.keys().copied().collect(),
            inserted,
            evicted,
            summary_rows: summary.rows.len(),
        };

        self.summaries.insert(month, summary);
        self.data.insert(month, data);
        debug!(
            %month,
            rows = report.rows,
            dropped,
            inserted,
            evicted,
            summary_rows = report.summary_rows,
            "month ingested"
        );
        Ok(report)
    }

    /// Fit the month's curves from its stored summary.
    ///
    /// A month without summary rows is skipped with `EmptySummary` and stays
    /// in the ingested state. A failed fit discards any earlier model for the
    /// month, so it drops back to the ingested state.
    pub fn fit_month(&mut self, month: Month) -> Result<&FittedModel, ModelError> {
        let summary = match self.summaries.get(&month) {
            Some(s) if !s.is_empty() => s,
            _ => {
                warn!(%month, "no aggregated data for month; skipping fit");
                return Err(ModelError::EmptySummary(month));
            }
        };

        let model = match fit_summary(summary, &self.fitter) {
            Ok(model) => model,
            Err(e) => {
                if self.models.remove(&month).is_some() {
                    warn!(%month, "discarding the previous model after a failed refit");
                }
                return Err(e);
            }
        };
        info!(
            %month,
            groups = model.curves.len(),
            objective = model.diagnostics.objective,
            "month fitted"
        );
        self.models.insert(month, model);
        self.models
            .get(&month)
            .ok_or(ModelError::ModelNotFound(month))
    }

    /// Ingest then fit one month.
    pub fn ingest_and_fit(&mut self, data: MonthData) -> Result<&FittedModel, ModelError> {
        let month = data.month;
        self.ingest_month(data)?;
        self.fit_month(month)
    }

    /// Classify one `(duration, rnpd)` pair against `month`'s model.
    pub fn classify(&self, duration: f64, value: f64, month: Month) -> Result<RankGroup, ModelError> {
        classify(self.require_model(month)?, duration, value)
    }

    /// Classify a batch against `month_of_model`; output is aligned with input.
    pub fn predict(&self, month_of_model: Month, observations: &[(f64, f64)]) -> Result<Vec<RankGroup>, ModelError> {
        classify_batch(self.require_model(month_of_model)?, observations)
    }

    fn require_model(&self, month: Month) -> Result<&FittedModel, ModelError> {
        self.models.get(&month).ok_or(ModelError::ModelNotFound(month))
    }

    pub fn month_state(&self, month: Month) -> MonthState {
        if self.models.contains_key(&month) {
            MonthState::Fitted
        } else if self.data.contains_key(&month) {
            MonthState::Ingested
        } else {
            MonthState::Empty
        }
    }

    pub fn model(&self, month: Month) -> Option<&FittedModel> {
        self.models.get(&month)
    }

    pub fn models(&self) -> impl Iterator<Item = &FittedModel> {
        self.models.values()
    }

    pub fn summary(&self, month: Month) -> Option<&MonthlySummary> {
        self.summaries.get(&month)
    }

    pub fn data(&self, month: Month) -> Option<&MonthData> {
        self.data.get(&month)
    }

    /// Ingested months, ascending.
    pub fn months(&self) -> Vec<Month> {
        self.data.keys().copied().collect()
    }
}

fn check_columns(data: &MonthData) -> Result<(), ModelError> {
    let missing = data.missing_columns();
    if missing.is_empty() {
        return Ok(());
    }
    Err(ModelError::Schema {
        month: data.month,
        detail: format!("missing required columns: {}", missing.join(", ")),
    })
}

fn invalid_row_reason(month: Month, row: &InputRow) -> Option<String> {
    if row.month != month {
        return Some(format!("belongs to month {}", row.month));
    }
    if !(MIN_RANK_GROUP..=MAX_RANK_GROUP).contains(&row.rank_group) {
        return Some(format!(
            "rank group {} outside {MIN_RANK_GROUP}..={MAX_RANK_GROUP}",
            row.rank_group
        ));
    }
    if !(row.rnpd.is_finite() && (0.0..=1.0).contains(&row.rnpd)) {
        return Some(format!("rnpd {} outside [0, 1]", row.rnpd));
    }
    None
}
