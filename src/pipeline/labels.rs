//! Join a document's label file with the field vocabulary.

use crate::error::DocumentError;
use crate::fields::{FieldType, FieldVocabulary};
use crate::output::FieldRecord;
use crate::pipeline::normalize::normalize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// `invoices/a.pdf` → `invoices/a.json`.
pub fn label_path(document: &Path) -> PathBuf {
    document.with_extension("json")
}

/// Read and parse the flat label object of `document`.
pub fn read_labels(document: &Path) -> Result<Map<String, Value>, DocumentError> {
    let path = label_path(document);
    let err = |detail: String| DocumentError::LabelRead {
        path: path.clone(),
        detail,
    };
    let raw = std::fs::read_to_string(&path).map_err(|e| err(e.to_string()))?;
    match serde_json::from_str::<Value>(&raw).map_err(|e| err(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(err(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
    }
}

/// Produce a record holding every vocabulary field.
///
/// Present typed fields are normalised, falling back to the raw value (with a
/// warning) when normalisation fails. Absent or `null` fields become `""`.
pub fn join_labels(labels: &Map<String, Value>, vocabulary: &FieldVocabulary) -> FieldRecord {
    let mut record = FieldRecord::new();
    for (name, ty) in vocabulary.iter() {
        let value = match labels.get(name).and_then(label_text) {
            Some(raw) => normalize_or_raw(name, &raw, ty),
            None => String::new(),
        };
        record.insert(name.to_string(), value);
    }

    for key in labels.keys().filter(|k| !vocabulary.contains(k)) {
        debug!("Ignoring label '{}' outside the field vocabulary", key);
    }
    record
}

fn normalize_or_raw(name: &str, raw: &str, ty: FieldType) -> String {
    match normalize(raw, ty) {
        Ok(v) => v,
        Err(e) => {
            warn!("Field '{}': {}; keeping raw value", name, e);
            raw.to_string()
        }
    }
}

fn label_text(v: &Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
