//! Variable descriptions: one variable's column span, scaling and labels.

use crate::models::{ColumnType, Value, VariableType};
use std::ops::Range;

/// Layout and metadata for a single variable declared in the codebook
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDescription {
    /// Variable id (same as its name in extract codebooks)
    pub id: String,

    /// Canonical variable name, unique within a codebook
    pub name: String,

    /// Record type codes this variable belongs to; empty for rectangular extracts
    pub rectypes: Vec<String>,

    /// Value labels as (code, label) pairs in declaration order
    pub codes: Vec<(String, String)>,

    /// First column of the variable, 1-based inclusive
    pub start: usize,

    /// Last column of the variable, 1-based inclusive
    pub end: usize,

    pub label: String,
    pub description: String,
    pub concept: String,
    pub vartype: VariableType,
    pub notes: String,

    /// Number of implied decimal places; 0 for plain integers
    pub implied_decimals: u32,
}

impl VariableDescription {
    /// Width of the variable in bytes
    pub fn width(&self) -> usize {
        self.end + 1 - self.start
    }

    /// Half-open, 0-based byte range of the variable within a line
    pub fn byte_range(&self) -> Range<usize> {
        (self.start - 1)..self.end
    }

    /// Column type this variable decodes into
    pub fn column_type(&self) -> ColumnType {
        match self.vartype {
            VariableType::String => ColumnType::String,
            VariableType::Numeric if self.implied_decimals > 0 => ColumnType::Float64,
            VariableType::Numeric => ColumnType::Int64,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.vartype == VariableType::Numeric
    }

    /// Whether the variable appears on records of the given type
    pub fn belongs_to(&self, rectype: &str) -> bool {
        self.rectypes.iter().any(|code| code == rectype)
    }

    /// Whether the variable spans overlap
    pub fn overlaps(&self, other: &VariableDescription) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Add a value label; a repeated code replaces the earlier label in place
    pub fn insert_code(&mut self, code: impl Into<String>, label: impl Into<String>) {
        let code = code.into();
        let label = label.into();
        match self.codes.iter_mut().find(|(existing, _)| *existing == code) {
            Some(entry) => entry.1 = label,
            None => self.codes.push((code, label)),
        }
    }

    /// Label for a raw code
    pub fn label_for(&self, code: &str) -> Option<&str> {
        self.codes
            .iter()
            .find(|(existing, _)| existing == code)
            .map(|(_, label)| label.as_str())
    }

    /// Label for a decoded value; numeric codes compare by value so that
    /// `"01"` labels the integer `1`
    pub fn label_for_value(&self, value: &Value) -> Option<&str> {
        match value {
            Value::Int(v) => self
                .codes
                .iter()
                .find(|(code, _)| code.trim().parse::<i64>().ok() == Some(*v))
                .map(|(_, label)| label.as_str()),
            Value::Float(v) => self
                .codes
                .iter()
                .find(|(code, _)| code.trim().parse::<f64>().ok() == Some(*v))
                .map(|(_, label)| label.as_str()),
            Value::Str(s) => self.label_for(s).or_else(|| self.label_for(s.trim())),
            Value::Missing => None,
        }
    }
}
