//! Configuration management and validation.
//!
//! Provides the decode configuration: batch sizing, hierarchical output
//! shape, column restriction, strictness and the blank numeric policy.

use crate::constants::DEFAULT_MAX_RECORDED_ERRORS;
use crate::error::{MicrodataError, Result};
use serde::{Deserialize, Serialize};

/// How a blank numeric field is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlankNumericPolicy {
    /// Blank numerics decode to zero, the convention of the source data
    #[default]
    Zero,
    /// Blank numerics decode to a missing value (null in output tables)
    Missing,
}

/// Configuration for one decode session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Rows per emitted batch; `None` materializes the whole table
    pub chunk_size: Option<usize>,

    /// Hierarchical extracts: return one table per record type instead of a
    /// rectangularized table
    pub as_dict: bool,

    /// Restrict decoding to these variables (matched case-insensitively)
    pub column_subset: Option<Vec<String>>,

    /// Escalate record classification and field conversion errors to fatal
    pub strict_mode: bool,

    /// Decoding of blank numeric fields
    pub blank_numeric: BlankNumericPolicy,

    /// Character set override for string fields
    pub encoding: Option<String>,

    /// Keep base records without subordinate records when rectangularizing
    pub preserve_unmatched_base: bool,

    /// Number of error messages retained verbatim in the decode summary
    pub max_recorded_errors: usize,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            chunk_size: None,
            as_dict: true,
            column_subset: None,
            strict_mode: false,
            blank_numeric: BlankNumericPolicy::Zero,
            encoding: None,
            preserve_unmatched_base: false,
            max_recorded_errors: DEFAULT_MAX_RECORDED_ERRORS,
        }
    }
}

impl DecodeConfig {
    /// Load a configuration from a JSON document; absent keys take defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: DecodeConfig = serde_json::from_str(json).map_err(|e| {
            MicrodataError::configuration(format!("Invalid decode configuration: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn with_as_dict(mut self, as_dict: bool) -> Self {
        self.as_dict = as_dict;
        self
    }

    pub fn with_column_subset<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column_subset = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_strict_mode(mut self) -> Self {
        self.strict_mode = true;
        self
    }

    pub fn with_blank_numeric(mut self, policy: BlankNumericPolicy) -> Self {
        self.blank_numeric = policy;
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Household-only structural variant: base rows survive rectangularization
    pub fn with_preserved_base_records(mut self) -> Self {
        self.preserve_unmatched_base = true;
        self
    }

    pub fn with_max_recorded_errors(mut self, max: usize) -> Self {
        self.max_recorded_errors = max;
        self
    }

    /// Validate settings that cannot be expressed in the types
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == Some(0) {
            return Err(MicrodataError::configuration(
                "chunk_size must be a positive row count",
            ));
        }

        if let Some(subset) = &self.column_subset {
            if subset.is_empty() {
                return Err(MicrodataError::configuration(
                    "column_subset must name at least one variable",
                ));
            }
        }

        if let Some(label) = &self.encoding {
            if encoding_rs::Encoding::for_label(label.as_bytes()).is_none() {
                return Err(MicrodataError::configuration(format!(
                    "Unknown character encoding '{}'",
                    label
                )));
            }
        }

        Ok(())
    }
}
