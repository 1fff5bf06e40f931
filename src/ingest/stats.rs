//! Statistics Aggregator
//!
//! Descriptive statistics follow dataframe `describe` conventions: sample
//! standard deviation (ddof = 1) and linearly interpolated quartiles, with
//! every non-finite result masked to literal 0 in the reported summary;
//! masked, not skipped, so a zero-observation numeric column still yields
//! a full all-zero entry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ingest::normalize::{ColumnKind, NormalizedTable};
use crate::types::{EquipmentRecord, CANONICAL_FIELDS};

/// Rows shown in the summary preview
pub const PREVIEW_ROWS: usize = 10;

/// Descriptive statistics for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub count: f64,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    #[serde(rename = "25%")]
    pub p25: f64,
    #[serde(rename = "50%")]
    pub p50: f64,
    #[serde(rename = "75%")]
    pub p75: f64,
    pub max: f64,
}

/// Per-dataset summary computed once at ingestion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total_rows: usize,
    pub columns: Vec<String>,
    /// First rows verbatim; empty cells render as `""`, never null
    pub preview: Vec<EquipmentRecord>,
    pub numerical_stats: BTreeMap<String, ColumnStats>,
    pub type_counts: BTreeMap<String, u64>,
}

impl Summary {
    /// Empty-table summary: zero rows, canonical columns, no stats.
    pub fn empty() -> Self {
        Self {
            total_rows: 0,
            columns: CANONICAL_FIELDS.iter().map(|f| f.to_string()).collect(),
            preview: Vec::new(),
            numerical_stats: BTreeMap::new(),
            type_counts: BTreeMap::new(),
        }
    }
}

/// Summarize a normalized (and classified) table in one pass per column.
pub fn summarize(table: &NormalizedTable) -> Summary {
    let columns: Vec<String> = CANONICAL_FIELDS.iter().map(|f| f.to_string()).collect();
    let preview: Vec<EquipmentRecord> = table.rows.iter().take(PREVIEW_ROWS).cloned().collect();

    let mut numerical_stats = BTreeMap::new();
    for (idx, field) in CANONICAL_FIELDS.iter().enumerate() {
        if !table.column_kinds[idx].is_numeric() {
            continue;
        }
        let observations: Vec<f64> = table
            .rows
            .iter()
            .filter_map(|row| row.get(field).and_then(|cell| cell.as_f64()))
            .collect();
        numerical_stats.insert(field.to_string(), describe(&observations));
    }

    let mut type_counts = BTreeMap::new();
    if table.column_kind("type") != Some(ColumnKind::Filled) {
        for row in &table.rows {
            if !row.kind.is_empty() {
                *type_counts.entry(row.kind.render()).or_insert(0) += 1;
            }
        }
    }

    Summary {
        total_rows: table.rows.len(),
        columns,
        preview,
        numerical_stats,
        type_counts,
    }
}

/// Descriptive statistics over the non-missing observations of one column.
/// Missing cells never enter the aggregation; they only shrink the count.
fn describe(observations: &[f64]) -> ColumnStats {
    let mut sorted = observations.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    // Sample standard deviation (ddof = 1); undefined below two observations
    let std = if sorted.len() > 1 {
        (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    } else {
        f64::NAN
    };

    ColumnStats {
        count: n,
        mean: mask(mean),
        std: mask(std),
        min: mask(sorted.first().copied().unwrap_or(f64::NAN)),
        p25: mask(percentile(&sorted, 0.25)),
        p50: mask(percentile(&sorted, 0.50)),
        p75: mask(percentile(&sorted, 0.75)),
        max: mask(sorted.last().copied().unwrap_or(f64::NAN)),
    }
}

/// Non-finite results are reported as literal 0
fn mask(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Linear interpolation between closest ranks
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let idx = p * (sorted.len() - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = idx - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}
