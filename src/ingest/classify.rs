//! Status Classifier
//!
//! Tolerates upstream CSVs that already carry a canonical status label, and
//! recovers from numeric parse artifacts that overwrote the status column.

use crate::ingest::normalize::{ColumnKind, NormalizedTable};
use crate::types::{CellValue, EquipmentRecord, Status};

/// Classification thresholds (pressure in bar, temperature in °C)
pub const PRESSURE_CRITICAL: f64 = 15.0;
pub const TEMP_CRITICAL: f64 = 130.0;
pub const PRESSURE_WARNING: f64 = 9.0;
pub const TEMP_WARNING: f64 = 115.0;

/// Classify one record. Pure, order-independent, idempotent: an existing
/// canonical label (any casing) is authoritative; anything else (empty,
/// numeric garbage, unknown text) is recomputed from pressure and temp.
pub fn classify(record: &EquipmentRecord) -> Status {
    if let CellValue::Text(label) = &record.status {
        if let Some(existing) = Status::parse(label) {
            return existing;
        }
    }
    derive_status(
        record.pressure.as_f64().unwrap_or(0.0),
        record.temp.as_f64().unwrap_or(0.0),
    )
}

fn derive_status(pressure: f64, temp: f64) -> Status {
    if pressure > PRESSURE_CRITICAL || temp > TEMP_CRITICAL {
        Status::Critical
    } else if pressure > PRESSURE_WARNING || temp > TEMP_WARNING {
        Status::Warning
    } else {
        Status::Stable
    }
}

/// Write the classification back into the record. A status cell that is
/// already a canonical label is left byte-for-byte unchanged.
pub fn classify_record(record: &mut EquipmentRecord) {
    if let CellValue::Text(label) = &record.status {
        if Status::parse(label).is_some() {
            return;
        }
    }
    let status = classify(record);
    record.status = CellValue::Text(status.as_str().to_string());
}

/// Classify every row of a normalized table.
pub fn classify_table(table: &mut NormalizedTable) {
    for record in &mut table.rows {
        classify_record(record);
    }
    // The status column now holds labels regardless of what the source had
    table.set_column_kind("status", ColumnKind::Text);
}
