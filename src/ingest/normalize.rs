//! Schema Normalizer: arbitrary CSV headers → the canonical field set
//!
//! Headers are trimmed, lowercased, and matched by substring containment in
//! a fixed priority order, so `Press (bar)` lands on `pressure` and
//! `EquipmentName` on `name`. Canonical fields with no source column are
//! created and filled with empty cells; everything else is dropped.

use csv::ReaderBuilder;
use tracing::debug;

use crate::errors::MalformedInputError;
use crate::types::{CellValue, EquipmentRecord, CANONICAL_FIELDS};

/// Substring patterns checked in priority order; the first containment
/// match claims the header.
const HEADER_PATTERNS: [(&str, &str); 6] = [
    ("name", "name"),
    ("type", "type"),
    ("flow", "flow"),
    ("press", "pressure"),
    ("status", "status"),
    ("temp", "temp"),
];

/// Column-wide type inferred for each canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every cell parses as an integer and none is blank
    Integer,
    /// Every non-blank cell parses as a number (a column of only blanks is
    /// numeric with zero observations)
    Float,
    /// Mixed or textual content, cells kept verbatim
    Text,
    /// Created by the fill-missing policy; all cells empty
    Filled,
}

impl ColumnKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }
}

/// A table reduced to the six canonical fields, row order preserved.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub rows: Vec<EquipmentRecord>,
    /// Inferred kind per canonical field, in `CANONICAL_FIELDS` order
    pub column_kinds: [ColumnKind; 6],
}

impl NormalizedTable {
    pub fn column_kind(&self, field: &str) -> Option<ColumnKind> {
        CANONICAL_FIELDS
            .iter()
            .position(|f| *f == field)
            .map(|i| self.column_kinds[i])
    }

    pub(crate) fn set_column_kind(&mut self, field: &str, kind: ColumnKind) {
        if let Some(i) = CANONICAL_FIELDS.iter().position(|f| *f == field) {
            self.column_kinds[i] = kind;
        }
    }
}

/// Parse raw CSV bytes into a normalized table.
///
/// Fails only when the input cannot be read as tabular data at all; a
/// zero-row table is valid output. Short rows are padded with empty cells
/// and surplus cells are ignored.
pub fn normalize_csv(bytes: &[u8]) -> Result<NormalizedTable, MalformedInputError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(bytes);

    let headers = reader.headers()?.clone();
    let mapping = map_headers(headers.iter());

    let mut raw_rows: Vec<csv::StringRecord> = Vec::new();
    for row in reader.records() {
        raw_rows.push(row?);
    }

    // Per canonical field: the first matching source column, or None
    let mut columns: Vec<Vec<&str>> = Vec::with_capacity(CANONICAL_FIELDS.len());
    for (idx, field) in CANONICAL_FIELDS.iter().enumerate() {
        let source = mapping[idx];
        debug!(field = *field, source_column = ?source, "mapped canonical column");
        let cells = raw_rows
            .iter()
            .map(|row| source.and_then(|col| row.get(col)).unwrap_or(""))
            .collect();
        columns.push(cells);
    }

    let mut column_kinds = [ColumnKind::Filled; 6];
    let mut typed_columns: Vec<Vec<CellValue>> = Vec::with_capacity(CANONICAL_FIELDS.len());
    for (idx, cells) in columns.into_iter().enumerate() {
        let (kind, typed) = if mapping[idx].is_some() {
            infer_column(&cells)
        } else {
            (ColumnKind::Filled, vec![CellValue::Empty; cells.len()])
        };
        column_kinds[idx] = kind;
        typed_columns.push(typed);
    }

    let mut rows = Vec::with_capacity(raw_rows.len());
    for row_idx in 0..raw_rows.len() {
        let mut record = EquipmentRecord::default();
        for (col_idx, field) in CANONICAL_FIELDS.iter().enumerate() {
            record.set(field, typed_columns[col_idx][row_idx].clone());
        }
        rows.push(record);
    }

    Ok(NormalizedTable { rows, column_kinds })
}

/// Resolve each canonical field to the first source column claimed for it.
/// Returns source column indices in `CANONICAL_FIELDS` order.
fn map_headers<'a>(headers: impl Iterator<Item = &'a str>) -> [Option<usize>; 6] {
    let mut mapping: [Option<usize>; 6] = [None; 6];

    for (col, header) in headers.enumerate() {
        let normalized = header.trim().to_lowercase();
        let claimed = HEADER_PATTERNS
            .iter()
            .find(|(pattern, _)| normalized.contains(pattern))
            .map(|(_, field)| *field);

        if let Some(field) = claimed {
            let idx = CANONICAL_FIELDS
                .iter()
                .position(|f| *f == field)
                .unwrap_or_default();
            if mapping[idx].is_none() {
                mapping[idx] = Some(col);
            }
        }
    }

    mapping
}

/// Column-wide type inference over the raw string cells.
fn infer_column(cells: &[&str]) -> (ColumnKind, Vec<CellValue>) {
    let non_empty: Vec<&str> = cells
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();

    let has_blanks = non_empty.len() < cells.len();
    let all_int = non_empty.iter().all(|c| c.parse::<i64>().is_ok());
    let all_float = non_empty.iter().all(|c| c.parse::<f64>().is_ok());

    // An integer column with blanks degrades to float, the way a dataframe
    // promotes int columns containing missing values
    if all_int && !has_blanks && !non_empty.is_empty() {
        let typed = cells
            .iter()
            .map(|c| CellValue::Int(c.trim().parse::<i64>().unwrap_or_default()))
            .collect();
        return (ColumnKind::Integer, typed);
    }

    if all_float {
        let typed = cells
            .iter()
            .map(|c| {
                let trimmed = c.trim();
                if trimmed.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Float(trimmed.parse::<f64>().unwrap_or_default())
                }
            })
            .collect();
        return (ColumnKind::Float, typed);
    }

    let typed = cells.iter().map(|c| CellValue::from(*c)).collect();
    (ColumnKind::Text, typed)
}
