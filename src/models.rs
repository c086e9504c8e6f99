//! Core data structures and types for microdata decoding.
//!
//! Defines declared variable types, decoded values and records, and the
//! record structure of an extract.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Record structure declared by the codebook's `fileStrc` element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordStructure {
    Rectangular,
    Hierarchical,
}

impl RecordStructure {
    pub fn is_hierarchical(&self) -> bool {
        matches!(self, RecordStructure::Hierarchical)
    }
}

/// Declared type of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableType {
    Numeric,
    String,
}

/// Column type a variable decodes into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Int64,
    Float64,
    String,
}

impl ColumnType {
    pub fn to_polars(&self) -> polars::prelude::DataType {
        use polars::prelude::DataType;
        match self {
            ColumnType::Int64 => DataType::Int64,
            ColumnType::Float64 => DataType::Float64,
            ColumnType::String => DataType::String,
        }
    }
}

/// A single decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Missing,
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{}", s),
            Value::Missing => Ok(()),
        }
    }
}

/// One decoded line: values keyed by variable name, in layout order
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    pub record_type: String,
    pub fields: Vec<(String, Value)>,
}

impl DecodedRecord {
    pub fn new(record_type: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            fields: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Int(42).as_i64(), Some(42));
        assert_eq!(Value::Int(42).as_f64(), Some(42.0));
        assert_eq!(Value::Float(1.5).as_i64(), None);
        assert_eq!(Value::Str(" A".to_string()).as_str(), Some(" A"));
        assert!(Value::Missing.is_missing());
        assert_eq!(Value::Missing.to_string(), "");
    }

    #[test]
    fn test_decoded_record_lookup() {
        let mut record = DecodedRecord::new("person");
        record.fields.push(("AGE".to_string(), Value::Int(42)));
        record.fields.push(("SEX".to_string(), Value::Int(2)));

        assert_eq!(record.get("AGE"), Some(&Value::Int(42)));
        assert_eq!(record.get("age"), None);
        assert_eq!(record.names().collect::<Vec<_>>(), vec!["AGE", "SEX"]);
        assert_eq!(record.len(), 2);
    }
}
