//! Core type definitions for the chemsync engine
//!
//! Domain records use a fixed-field struct over the six canonical columns;
//! the generic key/value shape only exists at the wire layer (see
//! `docstore::codec`), keeping the two concerns structurally distinct.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::ingest::stats::Summary;

/// The six canonical record fields, in table order.
pub const CANONICAL_FIELDS: [&str; 6] = ["name", "type", "flow", "pressure", "temp", "status"];

/// A single cell of a normalized record.
///
/// `Empty` is the canonical representation of a missing or blank cell and
/// always renders as an empty string, never as a null marker.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    Int(i64),
    Float(f64),
    Text(String),
    #[default]
    Empty,
}

impl CellValue {
    /// Numeric view of the cell. Text cells are parsed; `Empty` has no value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(v) => Some(*v as f64),
            CellValue::Float(v) => Some(*v),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            CellValue::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Outward-facing rendering: `Empty` becomes `""`, never a null marker.
    pub fn render(&self) -> String {
        match self {
            CellValue::Int(v) => v.to_string(),
            CellValue::Float(v) => v.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Empty => String::new(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Int(v) => serializer.serialize_i64(*v),
            CellValue::Float(v) => serializer.serialize_f64(*v),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Empty => serializer.serialize_str(""),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CellVisitor;

        impl Visitor<'_> for CellVisitor {
            type Value = CellValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number, a string, or null")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<CellValue, E> {
                Ok(CellValue::Int(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<CellValue, E> {
                i64::try_from(v)
                    .map(CellValue::Int)
                    .or(Ok(CellValue::Float(v as f64)))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<CellValue, E> {
                Ok(CellValue::Float(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<CellValue, E> {
                Ok(CellValue::from(v))
            }

            fn visit_unit<E: de::Error>(self) -> Result<CellValue, E> {
                Ok(CellValue::Empty)
            }
        }

        deserializer.deserialize_any(CellVisitor)
    }
}

/// One normalized equipment reading. Always fully populated: columns absent
/// from the source are carried as `Empty`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRecord {
    #[serde(default)]
    pub name: CellValue,
    #[serde(rename = "type", default)]
    pub kind: CellValue,
    #[serde(default)]
    pub flow: CellValue,
    #[serde(default)]
    pub pressure: CellValue,
    #[serde(default)]
    pub temp: CellValue,
    #[serde(default)]
    pub status: CellValue,
}

impl EquipmentRecord {
    /// Field access by canonical name. Unknown names are a caller bug.
    pub fn get(&self, field: &str) -> Option<&CellValue> {
        match field {
            "name" => Some(&self.name),
            "type" => Some(&self.kind),
            "flow" => Some(&self.flow),
            "pressure" => Some(&self.pressure),
            "temp" => Some(&self.temp),
            "status" => Some(&self.status),
            _ => None,
        }
    }

    pub fn set(&mut self, field: &str, value: CellValue) {
        match field {
            "name" => self.name = value,
            "type" => self.kind = value,
            "flow" => self.flow = value,
            "pressure" => self.pressure = value,
            "temp" => self.temp = value,
            "status" => self.status = value,
            _ => {}
        }
    }

    /// Iterate the fields in canonical table order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &CellValue)> {
        [
            ("name", &self.name),
            ("type", &self.kind),
            ("flow", &self.flow),
            ("pressure", &self.pressure),
            ("temp", &self.temp),
            ("status", &self.status),
        ]
        .into_iter()
    }
}

/// Health status of a single equipment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Stable,
    Warning,
    Critical,
}

impl Status {
    /// Case-insensitive parse of a canonical label. Anything else (empty,
    /// numeric artifacts from a bad CSV parse, garbage) is `None`.
    pub fn parse(label: &str) -> Option<Status> {
        match label.trim().to_ascii_lowercase().as_str() {
            "stable" => Some(Status::Stable),
            "warning" => Some(Status::Warning),
            "critical" => Some(Status::Critical),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Stable => "Stable",
            Status::Warning => "Warning",
            Status::Critical => "Critical",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ingested dataset. Immutable once persisted: the summary is computed
/// exactly once at ingestion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub id: Uuid,
    pub filename: String,
    pub created_at: DateTime<Utc>,
    pub records: Vec<EquipmentRecord>,
    pub summary: Summary,
}

impl Dataset {
    pub fn new(filename: impl Into<String>, records: Vec<EquipmentRecord>, summary: Summary) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename: filename.into(),
            created_at: Utc::now(),
            records,
            summary,
        }
    }
}

/// One entry of the recent-upload history, local or remote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub filename: String,
    pub timestamp: DateTime<Utc>,
    pub item_count: usize,
    pub records: Vec<EquipmentRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_render_never_null() {
        assert_eq!(CellValue::Empty.render(), "");
        assert_eq!(CellValue::Int(16).render(), "16");
        assert_eq!(CellValue::Text("Pump".into()).render(), "Pump");
    }

    #[test]
    fn test_cell_numeric_view() {
        assert_eq!(CellValue::Int(5).as_f64(), Some(5.0));
        assert_eq!(CellValue::Text(" 7.5 ".into()).as_f64(), Some(7.5));
        assert_eq!(CellValue::Text("Valve".into()).as_f64(), None);
        assert_eq!(CellValue::Empty.as_f64(), None);
    }

    #[test]
    fn test_cell_json_round_trip() {
        let cells = vec![
            CellValue::Int(42),
            CellValue::Float(1.5),
            CellValue::Text("Reactor".into()),
            CellValue::Empty,
        ];
        let json = serde_json::to_string(&cells).unwrap();
        let back: Vec<CellValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(cells, back);
    }

    #[test]
    fn test_status_parse_case_insensitive() {
        assert_eq!(Status::parse("CRITICAL"), Some(Status::Critical));
        assert_eq!(Status::parse("stable"), Some(Status::Stable));
        assert_eq!(Status::parse("12.5"), None);
        assert_eq!(Status::parse(""), None);
    }

    #[test]
    fn test_record_field_order() {
        let record = EquipmentRecord::default();
        let names: Vec<&str> = record.fields().map(|(n, _)| n).collect();
        assert_eq!(names, CANONICAL_FIELDS);
    }
}
