//! Sample store: rolling windows of RNPD observations.
//!
//! Windows are keyed by `(rank_group, duration_bucket)` in one ordered map, so
//! a rank group's buckets are a contiguous key range and iteration order is
//! always ascending group then ascending bucket.
//!
//! The store is cumulative across months: a bucket that gets no traffic in a
//! month keeps its previous observations untouched.

pub mod window;

pub use window::*;

use std::collections::BTreeMap;

use tracing::trace;

use crate::domain::{DurationBucket, Observation, RankGroup, StoreConfig};
use crate::error::ModelError;

/// Composite window key. Field order defines the iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowKey {
    pub rank_group: RankGroup,
    pub duration_bucket: DurationBucket,
}

/// What a single `ingest` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub inserted: usize,
    pub evicted: usize,
    pub windows_created: usize,
    pub windows_touched: usize,
}

#[derive(Debug, Clone)]
pub struct SampleStore {
    config: StoreConfig,
    windows: BTreeMap<WindowKey, Window>,
}

impl SampleStore {
    pub fn new(config: StoreConfig) -> Result<Self, ModelError> {
        config.validate()?;
        Ok(Self {
            config,
            windows: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Feed one month's observations for `rank_group`.
    ///
    /// Observations for other groups are ignored. Buckets are processed in
    /// ascending order; within a bucket, observations are inserted in the
    /// order given.
    pub fn ingest(&mut self, rank_group: RankGroup, rows: &[Observation]) -> IngestStats {
        let mut stats = IngestStats::default();

        let mut buckets: Vec<DurationBucket> = rows
            .iter()
            .filter(|o| o.rank_group == rank_group)
            .map(|o| o.duration_bucket)
            .collect();
        buckets.sort_unstable();
        buckets.dedup();

        let capacity = self.config.capacity(rank_group);
        for bucket in buckets {
            let key = WindowKey {
                rank_group,
                duration_bucket: bucket,
            };
            let window = self.windows.entry(key).or_insert_with(|| {
                stats.windows_created += 1;
                Window::new(capacity)
            });
            stats.windows_touched += 1;

            for obs in rows
                .iter()
                .filter(|o| o.rank_group == rank_group && o.duration_bucket == bucket)
            {
                if window.insert(*obs).is_some() {
                    stats.evicted += 1;
                }
                stats.inserted += 1;
            }
        }

        trace!(
            rank_group,
            inserted = stats.inserted,
            evicted = stats.evicted,
            windows_created = stats.windows_created,
            "sample store updated"
        );
        stats
    }

    pub fn window(&self, rank_group: RankGroup, duration_bucket: DurationBucket) -> Option<&Window> {
        self.windows.get(&WindowKey {
            rank_group,
            duration_bucket,
        })
    }

    /// All windows in ascending `(group, bucket)` order.
    pub fn windows(&self) -> impl Iterator<Item = (&WindowKey, &Window)> {
        self.windows.iter()
    }

    /// Rank groups that have at least one window, ascending.
    pub fn groups(&self) -> Vec<RankGroup> {
        let mut groups: Vec<RankGroup> = self.windows.keys().map(|k| k.rank_group).collect();
        groups.dedup();
        groups
    }

    /// Buckets seen so far for `rank_group`, ascending.
    pub fn buckets(&self, rank_group: RankGroup) -> Vec<DurationBucket> {
        let lo = WindowKey {
            rank_group,
            duration_bucket: DurationBucket::MIN,
        };
        let hi = WindowKey {
            rank_group,
            duration_bucket: DurationBucket::MAX,
        };
        self.windows
            .range(lo..=hi)
            .map(|(k, _)| k.duration_bucket)
            .collect()
    }

    /// Number of windows.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn observation_count(&self) -> usize {
        self.windows.values().map(Window::len).sum()
    }
}
