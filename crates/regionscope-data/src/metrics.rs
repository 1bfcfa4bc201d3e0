//! The per-region metrics table.
//!
//! Source exports arrive in long format (one row per region and measure) and are
//! pivoted here into one wide [`RegionMetrics`] row per region. Metric names keep the
//! `Category | Measure` shape of the exports so that callers can group them.

use std::{fs::File, io::BufReader, path::Path};

use ahash::AHashMap as HashMap;
use chrono::{DateTime, Utc};
use itertools::{Itertools, izip};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::{DataError, Result};

const REGION_ID_WIDTH: usize = 9;
const ID_COLUMN: &str = "SA2 ID";
const NAME_COLUMN: &str = "SA2 Name";
const AMOUNT_COLUMN: &str = "Amount";

/// Pads purely numeric region ids to the 9-digit ABS form (`"101021007"`).
///
/// Ids containing anything other than ASCII digits are only trimmed.
pub fn normalize_region_id(id: &str) -> String {
    let id = id.trim();
    if !id.is_empty() && id.len() < REGION_ID_WIDTH && id.bytes().all(|b| b.is_ascii_digit()) {
        format!("{id:0>width$}", width = REGION_ID_WIDTH)
    } else {
        id.to_string()
    }
}

/// Category prefix of a metric name: `"Demographics | Median age"` → `"Demographics"`.
pub fn metric_category(metric: &str) -> Option<&str> {
    metric.split_once('|').map(|(category, _)| category.trim())
}

/// Parses an export amount, tolerating thousands separators and stray whitespace.
fn clean_amount(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => clean_amount_str(s),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn clean_amount_str(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn json_text(row: &Map<String, Value>, key: &str) -> Option<String> {
    match row.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Where in the hierarchy a region sits. Every field is optional; a region without a
/// state code still takes part in national comparisons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionHierarchy {
    pub state_code: Option<String>,
    pub sa4_code: Option<String>,
    pub sa3_code: Option<String>,
}

/// One region's full metric row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionMetrics {
    pub region_id: String,
    pub region_name: Option<String>,
    pub state_code: Option<String>,
    pub sa4_code: Option<String>,
    pub sa3_code: Option<String>,
    /// Sparse: a missing key means "no data", never zero.
    pub values: HashMap<String, f64>,
}

impl RegionMetrics {
    pub fn new(region_id: impl AsRef<str>) -> Self {
        Self {
            region_id: normalize_region_id(region_id.as_ref()),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.region_name = Some(name.into());
        self
    }

    pub fn with_hierarchy(mut self, hierarchy: RegionHierarchy) -> Self {
        self.set_hierarchy(hierarchy);
        self
    }

    pub fn with_value(mut self, metric: impl Into<String>, value: f64) -> Self {
        self.values.insert(metric.into(), value);
        self
    }

    pub fn set_hierarchy(&mut self, hierarchy: RegionHierarchy) {
        self.state_code = hierarchy.state_code;
        self.sa4_code = hierarchy.sa4_code;
        self.sa3_code = hierarchy.sa3_code;
    }

    /// The value of `metric`, or `None` when absent or NaN.
    pub fn value(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).copied().filter(|v| !v.is_nan())
    }
}

/// Column layout of a long-format export, which decides how metric names are composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongFormat {
    /// `Demographics | {Description}`
    Demographics,
    /// `{Parent Description} | {Description}` (economics and health exports)
    ParentDescription,
    /// `{Category} | {Type}` (DSS payment exports)
    CategoryType,
}

impl LongFormat {
    /// (prefix column, measure column). A `None` prefix column means the prefix is fixed.
    fn columns(self) -> (Option<&'static str>, &'static str) {
        match self {
            Self::Demographics => (None, "Description"),
            Self::ParentDescription => (Some("Parent Description"), "Description"),
            Self::CategoryType => (Some("Category"), "Type"),
        }
    }

    fn metric_key(self, prefix: Option<&str>, measure: &str) -> Option<String> {
        let prefix = match (self, prefix) {
            (Self::Demographics, _) => "Demographics",
            (_, Some(prefix)) if !prefix.trim().is_empty() => prefix.trim(),
            _ => return None,
        };
        let measure = measure.trim();
        (!measure.is_empty()).then(|| format!("{prefix} | {measure}"))
    }
}

/// One long-format observation after the metric key has been composed.
#[derive(Debug, Clone, PartialEq)]
pub struct LongRow {
    pub region_id: String,
    pub region_name: Option<String>,
    pub metric: String,
    pub value: f64,
}

impl LongRow {
    pub fn new(region_id: &str, metric: impl Into<String>, value: f64) -> Self {
        Self {
            region_id: normalize_region_id(region_id),
            region_name: None,
            metric: metric.into(),
            value,
        }
    }
}

/// Reads a long-format JSON export: an array of row objects keyed `SA2 ID`, `SA2 Name`,
/// `Amount` plus the layout's metric columns. Rows without an id, a metric, or a
/// parsable amount are skipped.
#[instrument(name = "Read long-format JSON", level = "info", skip_all)]
pub fn read_long_json(path: impl AsRef<Path>, format: LongFormat) -> Result<Vec<LongRow>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DataError::MissingFile(path.to_path_buf()));
    }
    let raw: Vec<Map<String, Value>> = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    let (prefix_col, measure_col) = format.columns();

    let total = raw.len();
    let rows = raw
        .iter()
        .filter_map(|row| {
            let region_id = json_text(row, ID_COLUMN)?;
            let prefix = prefix_col.and_then(|col| json_text(row, col));
            let metric = format.metric_key(prefix.as_deref(), &json_text(row, measure_col)?)?;
            let Some(value) = row.get(AMOUNT_COLUMN).and_then(clean_amount) else {
                debug!(region_id, metric, "Skipping row with unparsable amount");
                return None;
            };
            Some(LongRow {
                region_id: normalize_region_id(&region_id),
                region_name: json_text(row, NAME_COLUMN),
                metric,
                value,
            })
        })
        .collect_vec();

    info!(path = %path.display(), total, kept = rows.len(), "Read long-format rows");
    Ok(rows)
}

fn string_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a StringChunked> {
    let column = df
        .column(name)
        .map_err(|_| DataError::MissingColumn(name.to_string()))?;
    Ok(column.str()?)
}

/// First column present among historical naming variants.
fn find_string_column<'a>(df: &'a DataFrame, names: &[&str]) -> Option<&'a StringChunked> {
    names
        .iter()
        .find_map(|name| df.column(name).ok())
        .and_then(|column| column.str().ok())
}

fn read_csv_as_strings(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(DataError::MissingFile(path.to_path_buf()));
    }
    // Schema inference is disabled so ids keep their leading zeros.
    Ok(LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()?
        .collect()?)
}

/// Reads a long-format CSV export with the same columns as [`read_long_json`].
#[instrument(name = "Read long-format CSV", level = "info", skip_all)]
pub fn read_long_csv(path: impl AsRef<Path>, format: LongFormat) -> Result<Vec<LongRow>> {
    let path = path.as_ref();
    let df = read_csv_as_strings(path)?;
    let (prefix_col, measure_col) = format.columns();

    let ids = string_column(&df, ID_COLUMN)?;
    let names = string_column(&df, NAME_COLUMN)?;
    let measures = string_column(&df, measure_col)?;
    let amounts = string_column(&df, AMOUNT_COLUMN)?;
    let prefixes = prefix_col.map(|col| string_column(&df, col)).transpose()?;

    let mut rows = Vec::with_capacity(df.height());
    for (idx, (id, name, measure, amount)) in izip!(ids, names, measures, amounts).enumerate() {
        let (Some(id), Some(measure)) = (id, measure) else {
            continue;
        };
        let prefix = prefixes.and_then(|ca| ca.get(idx));
        let Some(metric) = format.metric_key(prefix, measure) else {
            continue;
        };
        let Some(value) = amount.and_then(clean_amount_str) else {
            debug!(region_id = id, metric, "Skipping row with unparsable amount");
            continue;
        };
        rows.push(LongRow {
            region_id: normalize_region_id(id),
            region_name: name.map(str::trim).filter(|n| !n.is_empty()).map(String::from),
            metric,
            value,
        });
    }

    info!(path = %path.display(), total = df.height(), kept = rows.len(), "Read long-format rows");
    Ok(rows)
}

const SA2_CODE_COLUMNS: [&str; 3] = ["SA2_CODE_2021", "SA2_CODE21", "sa2_code_2021"];
const SA3_CODE_COLUMNS: [&str; 3] = ["SA3_CODE_2021", "SA3_CODE21", "sa3_code_2021"];
const SA4_CODE_COLUMNS: [&str; 3] = ["SA4_CODE_2021", "SA4_CODE21", "sa4_code_2021"];
const STATE_CODE_COLUMNS: [&str; 3] = ["STATE_CODE_2021", "STE_CODE21", "state_code_2021"];

/// Reads an SA2 → (state, SA4, SA3) correspondence CSV keyed by normalised SA2 id.
#[instrument(name = "Read hierarchy CSV", level = "info", skip_all)]
pub fn read_hierarchy_csv(path: impl AsRef<Path>) -> Result<HashMap<String, RegionHierarchy>> {
    let df = read_csv_as_strings(path.as_ref())?;

    let ids = find_string_column(&df, &SA2_CODE_COLUMNS)
        .ok_or_else(|| DataError::MissingColumn(SA2_CODE_COLUMNS[0].to_string()))?;
    let sa3 = find_string_column(&df, &SA3_CODE_COLUMNS);
    let sa4 = find_string_column(&df, &SA4_CODE_COLUMNS);
    let state = find_string_column(&df, &STATE_CODE_COLUMNS);

    let pick = |ca: Option<&StringChunked>, idx: usize| {
        ca.and_then(|ca| ca.get(idx))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    let mut out = HashMap::with_capacity(df.height());
    for (idx, id) in ids.into_iter().enumerate() {
        let Some(id) = id else { continue };
        out.insert(
            normalize_region_id(id),
            RegionHierarchy {
                state_code: pick(state, idx),
                sa4_code: pick(sa4, idx),
                sa3_code: pick(sa3, idx),
            },
        );
    }
    info!(regions = out.len(), "Read region hierarchy");
    Ok(out)
}

/// Wide metrics rows in load order, with an id lookup.
#[derive(Debug, Clone)]
pub struct MetricsTable {
    regions: Vec<RegionMetrics>,
    index: HashMap<String, usize>,
    loaded_at: DateTime<Utc>,
}

impl Default for MetricsTable {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MetricsTable {
    /// Builds a table from wide rows. A repeated region id replaces the earlier row.
    pub fn new(regions: impl IntoIterator<Item = RegionMetrics>) -> Self {
        let mut table = Self {
            regions: Vec::new(),
            index: HashMap::new(),
            loaded_at: Utc::now(),
        };
        for region in regions {
            if let Some(&idx) = table.index.get(&region.region_id) {
                warn!(region_id = region.region_id, "Duplicate region row, keeping latest");
                table.regions[idx] = region;
            } else {
                table.index.insert(region.region_id.clone(), table.regions.len());
                table.regions.push(region);
            }
        }
        table
    }

    /// Pivots long-format rows into wide rows.
    pub fn from_long_rows(rows: impl IntoIterator<Item = LongRow>) -> Self {
        let mut table = Self::default();
        table.extend_long_rows(rows);
        table
    }

    /// Merges further long-format rows, e.g. from a second export. A repeated
    /// (region, metric) pair keeps the latest value.
    pub fn extend_long_rows(&mut self, rows: impl IntoIterator<Item = LongRow>) {
        let mut duplicates = 0usize;
        for row in rows {
            let idx = match self.index.get(&row.region_id) {
                Some(&idx) => idx,
                None => {
                    let idx = self.regions.len();
                    self.index.insert(row.region_id.clone(), idx);
                    self.regions.push(RegionMetrics::new(&row.region_id));
                    idx
                }
            };
            let region = &mut self.regions[idx];
            if region.region_name.is_none() {
                region.region_name = row.region_name;
            }
            if region.values.insert(row.metric, row.value).is_some() {
                duplicates += 1;
            }
        }
        if duplicates > 0 {
            warn!(duplicates, "Duplicate metric values overwritten, keeping latest");
        }
        self.loaded_at = Utc::now();
    }

    /// Applies hierarchy attribution; regions missing from `hierarchy` are left untouched.
    pub fn attach_hierarchy(&mut self, hierarchy: &HashMap<String, RegionHierarchy>) {
        let mut attached = 0usize;
        for region in &mut self.regions {
            if let Some(h) = hierarchy.get(&region.region_id) {
                region.set_hierarchy(h.clone());
                attached += 1;
            }
        }
        info!(
            attached,
            regions = self.regions.len(),
            "Attached hierarchy attribution"
        );
    }

    pub fn get(&self, region_id: &str) -> Option<&RegionMetrics> {
        self.index
            .get(&normalize_region_id(region_id))
            .map(|&idx| &self.regions[idx])
    }

    /// All region ids, sorted.
    pub fn region_ids(&self) -> Vec<&str> {
        self.regions
            .iter()
            .map(|r| r.region_id.as_str())
            .sorted_unstable()
            .collect()
    }

    /// Every metric name present in any row, sorted and de-duplicated.
    pub fn metric_names(&self) -> Vec<String> {
        self.regions
            .iter()
            .flat_map(|r| r.values.keys())
            .unique()
            .sorted()
            .cloned()
            .collect()
    }

    pub fn regions(&self) -> &[RegionMetrics] {
        &self.regions
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegionMetrics> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}
