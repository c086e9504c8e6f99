//! Record layouts: the ordered variables that make up each record type.
//!
//! Rectangular extracts have a single layout holding every variable.
//! Hierarchical extracts have one layout per record type, made of the
//! variables common to all types plus the type's own variables. Spans may
//! overlap across record types but never within one layout.

use super::variable::VariableDescription;
use crate::error::{MicrodataError, Result};
use crate::models::ColumnType;
use std::ops::Range;

/// A record type declared by the codebook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordType {
    /// Discriminator code as it appears in the data file
    pub code: String,

    /// Human-readable record type name, used to key output tables
    pub name: String,
}

/// Ordered variables of one record type
#[derive(Debug, Clone, PartialEq)]
pub struct RecordLayout {
    pub record_type: RecordType,

    /// Variables ordered by start column
    pub variables: Vec<VariableDescription>,

    /// Expected physical line length: the largest end column of the layout
    pub line_length: usize,
}

impl RecordLayout {
    /// Build a layout, ordering variables by start column and rejecting overlaps
    pub fn new(record_type: RecordType, mut variables: Vec<VariableDescription>) -> Result<Self> {
        variables.sort_by_key(|var| var.start);

        for pair in variables.windows(2) {
            if pair[0].overlaps(&pair[1]) {
                return Err(MicrodataError::malformed(
                    format!("record type {}", record_type.name),
                    format!(
                        "{} (columns {}-{}) overlaps {} (columns {}-{})",
                        pair[0].name,
                        pair[0].start,
                        pair[0].end,
                        pair[1].name,
                        pair[1].start,
                        pair[1].end
                    ),
                ));
            }
        }

        let line_length = variables.iter().map(|var| var.end).max().unwrap_or(0);

        Ok(Self {
            record_type,
            variables,
            line_length,
        })
    }

    pub fn name(&self) -> &str {
        &self.record_type.name
    }

    pub fn get(&self, name: &str) -> Option<&VariableDescription> {
        self.variables.iter().find(|var| var.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Column names and types in layout order
    pub fn schema(&self) -> Vec<(String, ColumnType)> {
        self.variables
            .iter()
            .map(|var| (var.name.clone(), var.column_type()))
            .collect()
    }
}

/// The record type discriminator column of a hierarchical extract
#[derive(Debug, Clone, PartialEq)]
pub struct Discriminator {
    /// Name of the discriminator variable
    pub variable: String,

    /// First column, 1-based inclusive
    pub start: usize,

    /// Last column, 1-based inclusive
    pub end: usize,
}

impl Discriminator {
    pub fn byte_range(&self) -> Range<usize> {
        (self.start - 1)..self.end
    }
}
