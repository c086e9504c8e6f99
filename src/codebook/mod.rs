//! Codebook model for microdata extracts
//!
//! The codebook is the machine-readable description of an extract's data
//! file: where each variable sits on a line, how numbers are scaled, which
//! values carry labels, and (for hierarchical extracts) which record types
//! the file interleaves and how to tell them apart.
//!
//! ## Architecture
//!
//! - [`parser`] - DDI markup to model
//! - [`xml`] - Element tree over quick-xml events
//! - [`variable`] - Per-variable layout descriptors
//! - [`layout`] - Per-record-type ordered layouts and the discriminator
//! - [`source`] - Locating and opening codebook files
//!
//! A codebook is immutable once built and can be shared freely between
//! decode sessions.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use microdata_processor::codebook::read_codebook;
//!
//! # fn example() -> microdata_processor::error::Result<()> {
//! let codebook = read_codebook(std::path::Path::new("cps_00006.xml"))?;
//! let age = codebook.get_variable_info("age")?;
//! println!("AGE spans columns {}-{}", age.start, age.end);
//! # Ok(())
//! # }
//! ```

pub mod layout;
pub mod parser;
pub mod source;
pub mod variable;
pub mod xml;

#[cfg(test)]
pub mod tests;

pub use layout::{Discriminator, RecordLayout, RecordType};
pub use source::read_codebook;
pub use variable::VariableDescription;

use crate::constants::{RECTANGULAR_RECORD_TYPE, RECTYPE_VARIABLE};
use crate::error::{MicrodataError, Result};
use crate::models::{ColumnType, RecordStructure};
use std::collections::HashSet;
use tracing::warn;

/// A record group declared in the file structure of a hierarchical codebook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordGroup {
    /// Discriminator code
    pub code: String,
    /// Record type name (the group label, or the code when unlabeled)
    pub name: String,
    /// Variable identifying the record type
    pub id_variable: String,
    /// Variables linking records across record types
    pub key_variables: Vec<String>,
}

/// File-level metadata of the extract's data file
#[derive(Debug, Clone, PartialEq)]
pub struct FileDescription {
    pub filename: String,
    pub description: String,
    pub structure: RecordStructure,
    /// Record groups; empty for rectangular extracts
    pub record_groups: Vec<RecordGroup>,
    /// Lowercased character set label of the data file
    pub encoding: String,
    pub format: String,
    pub place: String,
}

/// Study-level metadata, passed through untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudyDescription {
    pub citation: String,
    pub conditions: String,
    pub collection: String,
    pub doi: String,
    pub samples: Vec<String>,
}

/// Parsed and validated codebook
#[derive(Debug, Clone, PartialEq)]
pub struct Codebook {
    pub file_description: FileDescription,
    pub study: StudyDescription,
    variables: Vec<VariableDescription>,
    layouts: Vec<RecordLayout>,
    discriminator: Option<Discriminator>,
    linking_variables: Vec<String>,
}

impl Codebook {
    /// Parse codebook markup
    pub fn from_xml_str(xml: &str) -> Result<Self> {
        parser::parse_codebook(xml)
    }

    /// Assemble a codebook from parsed parts, deriving and validating layouts
    pub fn new(
        file_description: FileDescription,
        variables: Vec<VariableDescription>,
        study: StudyDescription,
    ) -> Result<Self> {
        if variables.is_empty() {
            return Err(MicrodataError::malformed(
                "dataDscr",
                "codebook declares no variables",
            ));
        }

        let mut seen = HashSet::new();
        for var in &variables {
            if !seen.insert(var.name.as_str()) {
                return Err(MicrodataError::malformed(
                    format!("var {}", var.name),
                    "duplicate variable name",
                ));
            }
        }

        let (layouts, discriminator, linking_variables) = match file_description.structure {
            RecordStructure::Rectangular => {
                let record_type = RecordType {
                    code: String::new(),
                    name: RECTANGULAR_RECORD_TYPE.to_string(),
                };
                let layout = RecordLayout::new(record_type, variables.clone())?;
                (vec![layout], None, Vec::new())
            }
            RecordStructure::Hierarchical => {
                build_hierarchical_layouts(&file_description, &variables)?
            }
        };

        Ok(Self {
            file_description,
            study,
            variables,
            layouts,
            discriminator,
            linking_variables,
        })
    }

    pub fn structure(&self) -> RecordStructure {
        self.file_description.structure
    }

    pub fn is_hierarchical(&self) -> bool {
        self.structure().is_hierarchical()
    }

    /// Declared character set of the data file
    pub fn encoding(&self) -> &str {
        &self.file_description.encoding
    }

    /// Notice that use of the data requires citing it, with the conditions
    /// of use when the codebook states them
    pub fn citation_notice(&self) -> Option<String> {
        let citation = self.study.citation.trim();
        if citation.is_empty() {
            return None;
        }
        let conditions = self.study.conditions.trim();
        Some(if conditions.is_empty() {
            format!("Use of this data requires citation: {}", citation)
        } else {
            format!(
                "Use of this data requires citation: {} Conditions of use: {}",
                citation, conditions
            )
        })
    }

    /// Variables in declaration order; see [`Codebook::variables_in_column_order`]
    pub fn variables(&self) -> &[VariableDescription] {
        &self.variables
    }

    /// Variables ordered by start column, the order decoded columns follow
    pub fn variables_in_column_order(&self) -> Vec<&VariableDescription> {
        let mut ordered: Vec<_> = self.variables.iter().collect();
        ordered.sort_by_key(|var| var.start);
        ordered
    }

    /// Look up a variable by name, ignoring case
    pub fn get_variable_info(&self, name: &str) -> Result<&VariableDescription> {
        self.variables
            .iter()
            .find(|var| var.name == name)
            .or_else(|| {
                self.variables
                    .iter()
                    .find(|var| var.name.eq_ignore_ascii_case(name))
            })
            .ok_or_else(|| MicrodataError::UnknownVariable {
                name: name.to_string(),
            })
    }

    /// Record types in declaration order
    pub fn record_types(&self) -> impl Iterator<Item = &RecordType> {
        self.layouts.iter().map(|layout| &layout.record_type)
    }

    /// Layouts in record type declaration order
    pub fn layouts(&self) -> &[RecordLayout] {
        &self.layouts
    }

    /// Layout of a record type, by name
    pub fn layout(&self, record_type: &str) -> Option<&RecordLayout> {
        self.layouts
            .iter()
            .find(|layout| layout.record_type.name == record_type)
    }

    /// Layout of a record type, by discriminator code
    pub fn layout_for_code(&self, code: &str) -> Option<&RecordLayout> {
        self.layouts
            .iter()
            .find(|layout| layout.record_type.code == code)
    }

    /// Record type discriminator; `None` for rectangular extracts
    pub fn discriminator(&self) -> Option<&Discriminator> {
        self.discriminator.as_ref()
    }

    /// Variables shared by every record type that link records together
    pub fn linking_variables(&self) -> &[String] {
        &self.linking_variables
    }

    /// Decoded column type of every variable, in declaration order
    pub fn column_types(&self) -> Vec<(String, ColumnType)> {
        self.variables
            .iter()
            .map(|var| (var.name.clone(), var.column_type()))
            .collect()
    }

    /// Resolve user-supplied variable names to canonical names
    pub fn resolve_names<S: AsRef<str>>(&self, names: &[S]) -> Result<HashSet<String>> {
        names
            .iter()
            .map(|name| {
                self.get_variable_info(name.as_ref().trim())
                    .map(|var| var.name.clone())
            })
            .collect()
    }
}

type HierarchicalParts = (Vec<RecordLayout>, Option<Discriminator>, Vec<String>);

fn build_hierarchical_layouts(
    file_description: &FileDescription,
    variables: &[VariableDescription],
) -> Result<HierarchicalParts> {
    let find = |name: &str| variables.iter().find(|var| var.name == name);

    let mut record_types: Vec<RecordType> = file_description
        .record_groups
        .iter()
        .map(|group| RecordType {
            code: group.code.clone(),
            name: group.name.clone(),
        })
        .collect();

    // Some codebooks omit record groups; the discriminator's own record type
    // list is then the declaration of record types.
    if record_types.is_empty() {
        if let Some(rectype) = find(RECTYPE_VARIABLE) {
            record_types = rectype
                .rectypes
                .iter()
                .map(|code| RecordType {
                    code: code.clone(),
                    name: code.clone(),
                })
                .collect();
        }
    }

    if record_types.is_empty() {
        return Err(MicrodataError::malformed(
            "fileStrc/recGrp",
            "hierarchical codebook declares no record types",
        ));
    }

    let mut codes = HashSet::new();
    for record_type in &record_types {
        if !codes.insert(record_type.code.as_str()) {
            return Err(MicrodataError::malformed(
                "fileStrc/recGrp",
                format!("duplicate record type code '{}'", record_type.code),
            ));
        }
    }

    let declared_id = file_description
        .record_groups
        .iter()
        .map(|group| group.id_variable.as_str())
        .find(|name| !name.is_empty());

    let id_variable = match declared_id {
        Some(name) => find(name).ok_or_else(|| {
            MicrodataError::malformed(
                "fileStrc/recGrp",
                format!("record type variable {} is not declared", name),
            )
        })?,
        None => find(RECTYPE_VARIABLE)
            .or_else(|| {
                variables
                    .iter()
                    .filter(|var| {
                        record_types
                            .iter()
                            .all(|record_type| var.belongs_to(&record_type.code))
                    })
                    .min_by_key(|var| var.start)
            })
            .ok_or_else(|| {
                MicrodataError::malformed(
                    "dataDscr",
                    "no record type variable found for hierarchical codebook",
                )
            })?,
    };

    let discriminator = Discriminator {
        variable: id_variable.name.clone(),
        start: id_variable.start,
        end: id_variable.end,
    };

    for var in variables {
        for code in &var.rectypes {
            if !codes.contains(code.as_str()) {
                warn!(
                    "Variable {} references undeclared record type '{}'",
                    var.name, code
                );
            }
        }
    }

    let layouts = record_types
        .into_iter()
        .map(|record_type| {
            let members = variables
                .iter()
                .filter(|var| var.rectypes.is_empty() || var.belongs_to(&record_type.code))
                .cloned()
                .collect();
            RecordLayout::new(record_type, members)
        })
        .collect::<Result<Vec<_>>>()?;

    let linking_variables: Vec<String> = file_description
        .record_groups
        .iter()
        .map(|group| &group.key_variables)
        .find(|keys| !keys.is_empty())
        .cloned()
        .unwrap_or_default();

    for key in &linking_variables {
        if find(key).is_none() {
            return Err(MicrodataError::malformed(
                "fileStrc/recGrp",
                format!("linking variable {} is not declared", key),
            ));
        }
    }

    Ok((layouts, Some(discriminator), linking_variables))
}
