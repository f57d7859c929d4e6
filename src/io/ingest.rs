//! CSV ingest and normalization.
//!
//! This module turns a monthly RNPD panel export into clean `InputRow`s the
//! registry can consume.
//!
//! Design goals:
//! - **Strict schema** for required fields (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Header aliases** so raw exports (`M`, `Rnpd`, `SecurityID`, ...) load as-is
//! - **Separation of concerns**: no store/fitting logic here

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::{
    DurationBucket, InputRow, MAX_RANK_GROUP, MIN_RANK_GROUP, Month, MonthData, RankGroup,
};
use crate::error::AppError;

/// Canonical column name → accepted header spellings (lower-cased).
const COLUMN_ALIASES: [(&str, &[&str]); 9] = [
    ("month", &["month"]),
    ("rank_group", &["rank_group", "m"]),
    ("rnpd", &["rnpd", "y"]),
    ("duration_bucket", &["duration_bucket", "x"]),
    ("security_id", &["security_id", "securityid"]),
    ("yield", &["yield", "yieldbruto"]),
    ("spread", &["spread", "zspread"]),
    ("duration", &["duration", "durationbruto"]),
    ("rank", &["rank", "rankid", "rankid1"]),
];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

/// Ingest output: normalized rows + the canonical columns they came with.
#[derive(Debug, Clone)]
pub struct IngestedPanel {
    /// Canonical names of the columns present (a derived `duration_bucket`
    /// counts as present).
    pub columns: Vec<String>,
    pub rows: Vec<InputRow>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

impl IngestedPanel {
    /// Distinct months, ascending.
    pub fn months(&self) -> Vec<Month> {
        let mut months: Vec<Month> = self.rows.iter().map(|r| r.month).collect();
        months.sort_unstable();
        months.dedup();
        months
    }

    /// One `MonthData` per month, ascending; row order is preserved within a month.
    pub fn split_by_month(&self) -> Vec<MonthData> {
        let mut by_month: BTreeMap<Month, Vec<InputRow>> = BTreeMap::new();
        for row in &self.rows {
            by_month.entry(row.month).or_default().push(row.clone());
        }
        by_month
            .into_iter()
            .map(|(month, rows)| MonthData {
                month,
                columns: self.columns.clone(),
                rows,
            })
            .collect()
    }
}

/// Load and normalize a CSV panel from disk.
pub fn load_panel(path: &Path) -> Result<IngestedPanel, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let panel = read_panel(file)?;
    if panel.rows.is_empty() {
        return Err(AppError::new(
            3,
            format!("No valid rows in '{}'.", path.display()),
        ));
    }
    Ok(panel)
}

/// Normalize a CSV panel from any reader.
pub fn read_panel<R: Read>(input: R) -> Result<IngestedPanel, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();

    let header_map = build_header_map(&headers);
    ensure_required_columns_exist(&header_map)?;

    let mut columns: Vec<String> = COLUMN_ALIASES
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| header_map.contains_key(*name))
        .map(str::to_string)
        .collect();
    if !header_map.contains_key("duration_bucket") {
        columns.push("duration_bucket".to_string());
    }

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header line and lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    id: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map) {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError {
                line,
                id: get_optional(&record, &header_map, "security_id").map(str::to_string),
                message,
            }),
        }
    }

    Ok(IngestedPanel {
        columns,
        rows,
        row_errors,
        rows_read,
    })
}

/// Map canonical column names to record indices.
fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, raw) in headers.iter().enumerate() {
        let name = normalize_header_name(raw);
        for (canonical, aliases) in COLUMN_ALIASES {
            if aliases.contains(&name.as_str()) {
                map.entry(canonical.to_string()).or_insert(idx);
            }
        }
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_required_columns_exist(header_map: &HashMap<String, usize>) -> Result<(), AppError> {
    for name in ["month", "rank_group", "rnpd", "security_id"] {
        if !header_map.contains_key(name) {
            return Err(AppError::new(2, format!("Missing required column: `{name}`")));
        }
    }
    if !header_map.contains_key("duration_bucket") && !header_map.contains_key("duration") {
        return Err(AppError::new(
            2,
            "Missing required column: `duration_bucket` (or a raw `duration` to round)",
        ));
    }
    Ok(())
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<InputRow, String> {
    let security_id = get_required(record, header_map, "security_id")?.to_string();
    let month: Month = get_required(record, header_map, "month")?.parse()?;

    let rank_group = parse_rank_group(get_required(record, header_map, "rank_group")?)?;

    let rnpd = parse_f64(get_required(record, header_map, "rnpd")?, "rnpd")?;
    if !(0.0..=1.0).contains(&rnpd) {
        return Err(format!("`rnpd` {rnpd} outside [0, 1]."));
    }

    let duration = parse_opt_f64(get_optional(record, header_map, "duration"));
    let duration_bucket = match get_optional(record, header_map, "duration_bucket") {
        Some(s) => round_bucket(parse_f64(s, "duration_bucket")?)?,
        None => match duration {
            Some(d) => round_bucket(d)?,
            None => return Err("Missing required value: `duration_bucket`".to_string()),
        },
    };

    Ok(InputRow {
        month,
        rank_group,
        rnpd,
        duration_bucket,
        security_id,
        yield_: parse_opt_f64(get_optional(record, header_map, "yield")),
        spread: parse_opt_f64(get_optional(record, header_map, "spread")),
        duration,
        rank: parse_opt_f64(get_optional(record, header_map, "rank")),
    })
}

fn parse_rank_group(s: &str) -> Result<RankGroup, String> {
    let v = parse_f64(s, "rank_group")?;
    if v.fract() != 0.0 || v < MIN_RANK_GROUP as f64 || v > MAX_RANK_GROUP as f64 {
        return Err(format!(
            "`rank_group` '{s}' is not an integer in {MIN_RANK_GROUP}..={MAX_RANK_GROUP}."
        ));
    }
    Ok(v as RankGroup)
}

fn round_bucket(duration: f64) -> Result<DurationBucket, String> {
    if duration < 0.0 {
        return Err(format!("Negative duration {duration}."));
    }
    Ok(duration.round() as DurationBucket)
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_f64(s: &str, name: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("Invalid `{name}` value '{s}'.")),
    }
}

fn parse_opt_f64(s: Option<&str>) -> Option<f64> {
    let s = s?;
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
