//! Monthly aggregation: reduce every window to its median.
//!
//! The output ordering (ascending group, then bucket) comes straight from the
//! store's key order; the fitter relies on it when pairing adjacent groups.

use crate::domain::{Month, MonthlySummary, SummaryRow};
use crate::store::SampleStore;

/// Median with the usual middle / mean-of-two-middles definition.
///
/// Returns `None` for an empty slice. Sorts `values` in place.
pub fn median_mut(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Build the month's summary from the store's current windows.
pub fn summarize(store: &SampleStore, month: Month) -> MonthlySummary {
    let mut rows = Vec::with_capacity(store.len());
    for (key, window) in store.windows() {
        let mut values: Vec<f64> = window.values().collect();
        let Some(median_value) = median_mut(&mut values) else {
            continue;
        };
        rows.push(SummaryRow {
            rank_group: key.rank_group,
            duration_bucket: key.duration_bucket,
            median_value,
        });
    }
    MonthlySummary { month, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Observation, StoreConfig};
    use approx::assert_relative_eq;

    #[test]
    fn median_odd_and_even() {
        assert_relative_eq!(median_mut(&mut [0.10, 0.12, 0.11]).unwrap(), 0.11);
        assert_relative_eq!(median_mut(&mut [0.4, 0.1, 0.3, 0.2]).unwrap(), 0.25);
        assert!(median_mut(&mut []).is_none());
    }

    #[test]
    fn summarize_orders_rows_by_group_then_bucket() {
        let month = Month::new(2021, 6).unwrap();
        let mut store = SampleStore::new(StoreConfig::default()).unwrap();
        let o = |g, d, v| Observation {
            month,
            rank_group: g,
            value: v,
            duration_bucket: d,
        };

        store.ingest(4, &[o(4, 3, 0.5), o(4, 1, 0.4)]);
        store.ingest(1, &[o(1, 2, 0.10), o(1, 2, 0.12), o(1, 2, 0.11)]);

        let summary = summarize(&store, month);
        let keys: Vec<(u32, i64)> = summary
            .rows
            .iter()
            .map(|r| (r.rank_group, r.duration_bucket))
            .collect();
        assert_eq!(keys, vec![(1, 2), (4, 1), (4, 3)]);
        assert_relative_eq!(summary.rows[0].median_value, 0.11);
        assert_eq!(summary.month, month);
    }

    #[test]
    fn summarize_empty_store_is_empty() {
        let store = SampleStore::new(StoreConfig::default()).unwrap();
        assert!(summarize(&store, Month::new(2021, 1).unwrap()).is_empty());
    }
}
