//! The field vocabulary: the closed set of field names the extraction model
//! learns to predict, each with a declared [`FieldType`].
//!
//! The vocabulary decides the key set of every written
//! [`crate::output::FieldRecord`] and which values go through
//! [`crate::pipeline::normalize`].

use crate::error::PrepareError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Declared type of a vocabulary field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free text, passed through verbatim.
    Text,
    /// Monetary amount, normalised to a two-decimal string.
    Amount,
    /// Calendar date, normalised to `YYYY-MM-DD`.
    Date,
}

impl FieldType {
    /// Name used as the key in an n-gram's `parses` map.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Amount => "amount",
            FieldType::Date => "date",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered list of `(field name, type)` pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldVocabulary {
    fields: Vec<(String, FieldType)>,
}

impl Default for FieldVocabulary {
    fn default() -> Self {
        Self::new([
            ("vendor_name", FieldType::Text),
            ("invoice_number", FieldType::Text),
            ("invoice_date", FieldType::Date),
            ("due_date", FieldType::Date),
            ("subtotal", FieldType::Amount),
            ("tax", FieldType::Amount),
            ("total", FieldType::Amount),
        ])
    }
}

impl FieldVocabulary {
    /// Build a vocabulary; a repeated name keeps its first declared type.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, FieldType)>,
        S: Into<String>,
    {
        let mut out: Vec<(String, FieldType)> = Vec::new();
        for (name, ty) in fields {
            let name = name.into();
            if !out.iter().any(|(n, _)| *n == name) {
                out.push((name, ty));
            }
        }
        Self { fields: out }
    }

    /// Load a vocabulary from a flat JSON object `{"name": "text"|"amount"|"date"}`.
    ///
    /// Entries are ordered by name since JSON objects carry no order.
    pub fn from_json_file(path: &Path) -> Result<Self, PrepareError> {
        let err = |detail: String| PrepareError::FieldVocabulary {
            path: path.to_path_buf(),
            detail,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| err(e.to_string()))?;
        let map: BTreeMap<String, FieldType> =
            serde_json::from_str(&raw).map_err(|e| err(e.to_string()))?;
        if map.is_empty() {
            return Err(err("vocabulary declares no fields".into()));
        }
        Ok(Self::new(map))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, FieldType)> {
        self.fields.iter().map(|(n, t)| (n.as_str(), *t))
    }

    pub fn get(&self, name: &str) -> Option<FieldType> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, t)| *t)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
