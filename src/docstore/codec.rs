//! Typed-Document Codec
//!
//! Bidirectional mapping between native record values and the remote
//! store's self-describing wire format, where every leaf carries a kind
//! tag (`stringValue`, `integerValue`, `doubleValue`, `timestampValue`,
//! `arrayValue`, `mapValue`). Decoding is deliberately lossy: a field
//! whose kind the decoder does not recognize is dropped, never an error.
//! The codec has no size awareness; the sync orchestrator gates payload
//! size before encoding.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::types::{CellValue, Dataset, EquipmentRecord, HistoryEntry, Status};

/// Placeholder for the blob URL field; record data lives inline in the
/// document rather than in a separate blob store.
pub const DATA_LOCATION: &str = "Stored in Database";

/// Self-describing value tree used on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    String(String),
    Integer(i64),
    Double(f64),
    Timestamp(DateTime<Utc>),
    Array(Vec<TypedValue>),
    Map(BTreeMap<String, TypedValue>),
}

impl TypedValue {
    /// Render as tagged wire JSON. Integers serialize as decimal strings
    /// per the wire convention.
    pub fn to_wire(&self) -> Value {
        match self {
            TypedValue::String(s) => json!({ "stringValue": s }),
            TypedValue::Integer(v) => json!({ "integerValue": v.to_string() }),
            TypedValue::Double(v) => json!({ "doubleValue": v }),
            TypedValue::Timestamp(ts) => {
                json!({ "timestampValue": ts.to_rfc3339_opts(SecondsFormat::Micros, true) })
            }
            TypedValue::Array(values) => {
                let values: Vec<Value> = values.iter().map(TypedValue::to_wire).collect();
                json!({ "arrayValue": { "values": values } })
            }
            TypedValue::Map(fields) => {
                let fields: serde_json::Map<String, Value> = fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_wire()))
                    .collect();
                json!({ "mapValue": { "fields": fields } })
            }
        }
    }

    /// Parse tagged wire JSON. An unrecognized or missing kind tag yields
    /// `None`, which drops the enclosing field from the decoded output.
    pub fn from_wire(value: &Value) -> Option<TypedValue> {
        let obj = value.as_object()?;

        if let Some(s) = obj.get("stringValue").and_then(Value::as_str) {
            return Some(TypedValue::String(s.to_string()));
        }
        if let Some(v) = obj.get("integerValue") {
            // Decimal string on the wire; tolerate a bare number
            return match v {
                Value::String(s) => s.parse::<i64>().ok().map(TypedValue::Integer),
                Value::Number(n) => n.as_i64().map(TypedValue::Integer),
                _ => None,
            };
        }
        if let Some(v) = obj.get("doubleValue").and_then(Value::as_f64) {
            return Some(TypedValue::Double(v));
        }
        if let Some(s) = obj.get("timestampValue").and_then(Value::as_str) {
            return DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|ts| TypedValue::Timestamp(ts.with_timezone(&Utc)));
        }
        if let Some(arr) = obj.get("arrayValue") {
            let values = arr
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().filter_map(TypedValue::from_wire).collect())
                .unwrap_or_default();
            return Some(TypedValue::Array(values));
        }
        if let Some(map) = obj.get("mapValue") {
            let fields = map
                .get("fields")
                .and_then(Value::as_object)
                .map(decode_fields)
                .unwrap_or_default();
            return Some(TypedValue::Map(fields));
        }

        None
    }
}

/// Decode a wire `fields` object, dropping entries with unrecognized kinds.
pub fn decode_fields(fields: &serde_json::Map<String, Value>) -> BTreeMap<String, TypedValue> {
    fields
        .iter()
        .filter_map(|(k, v)| TypedValue::from_wire(v).map(|tv| (k.clone(), tv)))
        .collect()
}

fn encode_cell(cell: &CellValue) -> TypedValue {
    match cell {
        CellValue::Int(v) => TypedValue::Integer(*v),
        CellValue::Float(v) => TypedValue::Double(*v),
        CellValue::Text(s) => TypedValue::String(s.clone()),
        CellValue::Empty => TypedValue::String(String::new()),
    }
}

fn decode_cell(value: &TypedValue) -> CellValue {
    match value {
        TypedValue::String(s) => CellValue::from(s.as_str()),
        TypedValue::Integer(v) => CellValue::Int(*v),
        TypedValue::Double(v) => CellValue::Float(*v),
        TypedValue::Timestamp(ts) => {
            CellValue::Text(ts.to_rfc3339_opts(SecondsFormat::Micros, true))
        }
        // Nested structures are not representable as record cells
        TypedValue::Array(_) | TypedValue::Map(_) => CellValue::Empty,
    }
}

/// Encode one record as a `Map` of tagged cells.
pub fn encode_record(record: &EquipmentRecord) -> TypedValue {
    let fields = record
        .fields()
        .map(|(name, cell)| (name.to_string(), encode_cell(cell)))
        .collect();
    TypedValue::Map(fields)
}

/// Decode a record from a `Map`. Canonical fields absent from the map,
/// including those dropped for unrecognized kinds, come back `Empty`.
pub fn decode_record(value: &TypedValue) -> EquipmentRecord {
    let mut record = EquipmentRecord::default();
    if let TypedValue::Map(fields) = value {
        for (name, tv) in fields {
            record.set(name, decode_cell(tv));
        }
    }
    record
}

/// Build the full dataset document uploaded to the remote store.
pub fn encode_dataset_document(dataset: &Dataset) -> TypedValue {
    let critical = dataset
        .records
        .iter()
        .filter(|r| Status::parse(&r.status.render()) == Some(Status::Critical))
        .count() as i64;

    let mut summary = BTreeMap::new();
    summary.insert("total".to_string(), TypedValue::Integer(dataset.records.len() as i64));
    summary.insert("critical".to_string(), TypedValue::Integer(critical));

    let parsed_data = dataset.records.iter().map(encode_record).collect();

    let mut fields = BTreeMap::new();
    fields.insert("filename".to_string(), TypedValue::String(dataset.filename.clone()));
    fields.insert("url".to_string(), TypedValue::String(DATA_LOCATION.to_string()));
    fields.insert("createdAt".to_string(), TypedValue::Timestamp(dataset.created_at));
    fields.insert("summary".to_string(), TypedValue::Map(summary));
    fields.insert("parsedData".to_string(), TypedValue::Array(parsed_data));

    TypedValue::Map(fields)
}

/// Decode one stored document into a history entry.
///
/// Documents without a valid `createdAt` are rejected; the recency-ordered
/// query cannot return them anyway, so this only guards hand-written data.
pub fn decode_history_document(fields: &BTreeMap<String, TypedValue>) -> Option<HistoryEntry> {
    let filename = match fields.get("filename") {
        Some(TypedValue::String(s)) => s.clone(),
        _ => "Unknown".to_string(),
    };

    let timestamp = match fields.get("createdAt") {
        Some(TypedValue::Timestamp(ts)) => *ts,
        _ => return None,
    };

    let records: Vec<EquipmentRecord> = match fields.get("parsedData") {
        Some(TypedValue::Array(values)) => values.iter().map(decode_record).collect(),
        _ => Vec::new(),
    };

    Some(HistoryEntry {
        filename,
        timestamp,
        item_count: records.len(),
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> EquipmentRecord {
        EquipmentRecord {
            name: CellValue::Text("P-101".into()),
            kind: CellValue::Text("Pump".into()),
            flow: CellValue::Int(120),
            pressure: CellValue::Float(16.5),
            temp: CellValue::Int(40),
            status: CellValue::Text("Critical".into()),
        }
    }

    #[test]
    fn test_record_round_trip() {
        let record = sample_record();
        let decoded = decode_record(&TypedValue::from_wire(&encode_record(&record).to_wire()).unwrap());
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_empty_cell_round_trips_as_empty_string() {
        let record = EquipmentRecord::default();
        let wire = encode_record(&record).to_wire();
        assert_eq!(wire["mapValue"]["fields"]["name"], json!({ "stringValue": "" }));
        let decoded = decode_record(&TypedValue::from_wire(&wire).unwrap());
        assert_eq!(decoded.name, CellValue::Empty);
    }

    #[test]
    fn test_integer_serializes_as_decimal_string() {
        let wire = TypedValue::Integer(42).to_wire();
        assert_eq!(wire, json!({ "integerValue": "42" }));
        assert_eq!(TypedValue::from_wire(&wire), Some(TypedValue::Integer(42)));
    }

    #[test]
    fn test_unrecognized_kind_drops_field_only() {
        let wire = json!({
            "mapValue": {
                "fields": {
                    "name": { "stringValue": "P-101" },
                    "status": { "booleanValue": true }
                }
            }
        });
        let decoded = decode_record(&TypedValue::from_wire(&wire).unwrap());
        assert_eq!(decoded.name, CellValue::Text("P-101".into()));
        // The unrecognized field is absent, not defaulted and not an error
        assert_eq!(decoded.status, CellValue::Empty);
    }

    #[test]
    fn test_timestamp_round_trip() {
        let ts = "2026-08-06T10:15:30.123456Z";
        let wire = json!({ "timestampValue": ts });
        let value = TypedValue::from_wire(&wire).unwrap();
        assert_eq!(value.to_wire(), wire);
    }

    #[test]
    fn test_dataset_document_shape() {
        let stable = EquipmentRecord {
            status: CellValue::Text("Stable".into()),
            ..EquipmentRecord::default()
        };
        let dataset = Dataset::new(
            "plant.csv",
            vec![sample_record(), stable],
            crate::ingest::stats::Summary::empty(),
        );

        let wire = encode_dataset_document(&dataset).to_wire();
        let fields = &wire["mapValue"]["fields"];
        assert_eq!(fields["filename"], json!({ "stringValue": "plant.csv" }));
        assert_eq!(fields["url"], json!({ "stringValue": DATA_LOCATION }));
        assert_eq!(
            fields["summary"]["mapValue"]["fields"]["total"],
            json!({ "integerValue": "2" })
        );
        assert_eq!(
            fields["summary"]["mapValue"]["fields"]["critical"],
            json!({ "integerValue": "1" })
        );
        assert_eq!(
            fields["parsedData"]["arrayValue"]["values"]
                .as_array()
                .unwrap()
                .len(),
            2
        );
    }

    #[test]
    fn test_history_document_decode() {
        let doc = encode_dataset_document(&Dataset::new(
            "plant.csv",
            vec![sample_record()],
            crate::ingest::stats::Summary::empty(),
        ));
        let fields = match TypedValue::from_wire(&doc.to_wire()).unwrap() {
            TypedValue::Map(fields) => fields,
            _ => panic!("expected map"),
        };
        let entry = decode_history_document(&fields).unwrap();
        assert_eq!(entry.filename, "plant.csv");
        assert_eq!(entry.item_count, 1);
        assert_eq!(entry.records[0], sample_record());
    }

    #[test]
    fn test_history_document_without_timestamp_rejected() {
        let mut fields = BTreeMap::new();
        fields.insert("filename".to_string(), TypedValue::String("x.csv".into()));
        assert!(decode_history_document(&fields).is_none());
    }
}
