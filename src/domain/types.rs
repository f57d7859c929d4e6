//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory by the sample store and the fitter
//! - exported to JSON/CSV
//! - reloaded later for classification

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Credit-rank bucket. Lower is better credit.
pub type RankGroup = u32;

/// Rounded bond duration (years).
pub type DurationBucket = i64;

pub const MIN_RANK_GROUP: RankGroup = 1;
pub const MAX_RANK_GROUP: RankGroup = 12;

/// Window capacity used for every rank group unless overridden.
pub const DEFAULT_WINDOW_CAPACITY: usize = 20;

pub const DEFAULT_POLY_DEGREE: usize = 2;
/// Minimum vertical gap between adjacent rank-group curves.
pub const DEFAULT_GROUP_EPSILON: f64 = 0.02;
/// Weight of the L1 penalty on each group's coefficient vector.
pub const DEFAULT_LAMBDA_REG: f64 = 1e-3;

pub const DEFAULT_GRID_START: f64 = 0.0;
pub const DEFAULT_GRID_END: f64 = 10.0;
pub const DEFAULT_GRID_POINTS: usize = 100;

/// Canonical names of the columns every month's input must carry.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "month",
    "rank_group",
    "rnpd",
    "duration_bucket",
    "security_id",
];

/// Calendar month key (`YYYY-MM`).
///
/// Ordering is chronological because `year` is compared before `month`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    /// Returns `None` unless `month` is in `1..=12`.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(self) -> i32 {
        self.year
    }

    pub fn month(self) -> u32 {
        self.month
    }

    /// The preceding calendar month.
    pub fn prev(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// The following calendar month.
    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // Full dates are truncated to their month.
        const DATE_FMTS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
        for fmt in DATE_FMTS {
            if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
                return Ok(Self::from_date(d));
            }
        }

        let invalid = || format!("Invalid month '{s}'. Expected YYYY-MM or YYYY-MM-DD.");
        let (year, month) = s.split_once(['-', '/']).ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).ok_or_else(invalid)
    }
}

impl TryFrom<String> for Month {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Month> for String {
    fn from(value: Month) -> Self {
        value.to_string()
    }
}

/// One security's RNPD observation for a month, as fed to the sample store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub month: Month,
    pub rank_group: RankGroup,
    /// Probability in `[0, 1]`.
    pub value: f64,
    pub duration_bucket: DurationBucket,
}

/// A parsed input row (required fields plus passthrough columns).
#[derive(Debug, Clone, PartialEq)]
pub struct InputRow {
    pub month: Month,
    pub rank_group: RankGroup,
    pub rnpd: f64,
    pub duration_bucket: DurationBucket,
    pub security_id: String,

    pub yield_: Option<f64>,
    pub spread: Option<f64>,
    /// Raw, unrounded duration.
    pub duration: Option<f64>,
    pub rank: Option<f64>,
}

impl InputRow {
    pub fn observation(&self) -> Observation {
        Observation {
            month: self.month,
            rank_group: self.rank_group,
            value: self.rnpd,
            duration_bucket: self.duration_bucket,
        }
    }

    /// Duration used when classifying this row: the raw duration if known,
    /// otherwise the bucket.
    pub fn classify_duration(&self) -> f64 {
        self.duration.unwrap_or(self.duration_bucket as f64)
    }
}

/// One month's slice of the tabular input, with the columns it was read with.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthData {
    pub month: Month,
    pub columns: Vec<String>,
    pub rows: Vec<InputRow>,
}

impl MonthData {
    /// Canonical required columns absent from `columns`.
    pub fn missing_columns(&self) -> Vec<&'static str> {
        REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|name| !self.columns.iter().any(|c| c == name))
            .collect()
    }
}

/// Median of one window, as consumed by the fitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub rank_group: RankGroup,
    pub duration_bucket: DurationBucket,
    pub median_value: f64,
}

/// All summary rows for a month, ordered by group then bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub month: Month,
    pub rows: Vec<SummaryRow>,
}

impl MonthlySummary {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct rank groups, ascending.
    pub fn groups(&self) -> Vec<RankGroup> {
        let mut groups: Vec<RankGroup> = self.rows.iter().map(|r| r.rank_group).collect();
        groups.dedup();
        groups
    }

    /// `(duration, median)` points for one group.
    pub fn points(&self, group: RankGroup) -> Vec<(f64, f64)> {
        self.rows
            .iter()
            .filter(|r| r.rank_group == group)
            .map(|r| (r.duration_bucket as f64, r.median_value))
            .collect()
    }
}

/// Sample-store settings.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub default_capacity: usize,
    /// Per-group capacities that differ from the default.
    pub capacity_overrides: BTreeMap<RankGroup, usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_capacity: DEFAULT_WINDOW_CAPACITY,
            capacity_overrides: BTreeMap::new(),
        }
    }
}

impl StoreConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            default_capacity: capacity,
            capacity_overrides: BTreeMap::new(),
        }
    }

    pub fn capacity(&self, group: RankGroup) -> usize {
        self.capacity_overrides
            .get(&group)
            .copied()
            .unwrap_or(self.default_capacity)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.default_capacity == 0 || self.capacity_overrides.values().any(|&c| c == 0) {
            return Err(ModelError::InvalidConfig(
                "window capacity must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Curve-fitter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitterConfig {
    pub degree: usize,
    /// Required gap between adjacent group curves on the grid.
    pub epsilon: f64,
    pub lambda_reg: f64,
    pub grid_start: f64,
    pub grid_end: f64,
    pub grid_points: usize,
}

impl Default for FitterConfig {
    fn default() -> Self {
        Self {
            degree: DEFAULT_POLY_DEGREE,
            epsilon: DEFAULT_GROUP_EPSILON,
            lambda_reg: DEFAULT_LAMBDA_REG,
            grid_start: DEFAULT_GRID_START,
            grid_end: DEFAULT_GRID_END,
            grid_points: DEFAULT_GRID_POINTS,
        }
    }
}

impl FitterConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.degree < 1 {
            return Err(ModelError::InvalidConfig(
                "polynomial degree must be >= 1".to_string(),
            ));
        }
        if !(self.epsilon.is_finite() && self.epsilon >= 0.0) {
            return Err(ModelError::InvalidConfig(format!(
                "epsilon must be finite and >= 0, got {}",
                self.epsilon
            )));
        }
        if !(self.lambda_reg.is_finite() && self.lambda_reg >= 0.0) {
            return Err(ModelError::InvalidConfig(format!(
                "lambda_reg must be finite and >= 0, got {}",
                self.lambda_reg
            )));
        }
        if self.grid_points < 2 {
            return Err(ModelError::InvalidConfig(
                "grid must have at least 2 points".to_string(),
            ));
        }
        if !(self.grid_start.is_finite() && self.grid_end.is_finite() && self.grid_end > self.grid_start) {
            return Err(ModelError::InvalidConfig(format!(
                "invalid grid range: start={}, end={}",
                self.grid_start, self.grid_end
            )));
        }
        Ok(())
    }
}

/// Lifecycle of a month inside the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthState {
    Empty,
    Ingested,
    Fitted,
}

/// One classified input row.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub row: InputRow,
    pub predicted_group: RankGroup,
    /// Month whose curves produced the prediction.
    pub model_month: Month,
}

/// A saved curves file (JSON): every fitted month with its evaluated grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveFile {
    pub tool: String,
    pub months: Vec<MonthCurves>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthCurves {
    pub month: Month,
    pub fitter: FitterConfig,
    pub objective: f64,
    pub data_l1: f64,
    pub curves: Vec<GroupCurve>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupCurve {
    pub rank_group: RankGroup,
    pub coefficients: Vec<f64>,
    pub grid: CurveGrid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveGrid {
    pub duration: Vec<f64>,
    pub rnpd: Vec<f64>,
}
