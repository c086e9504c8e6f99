//! Error handling for codebook parsing and microdata decoding.
//!
//! Codebook and I/O failures abort an operation outright. Record
//! classification, field conversion and line length problems are absorbed
//! per line by the decode session and only surface here in strict mode.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MicrodataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Malformed codebook in {section}: {reason}")]
    MalformedCodebook { section: String, reason: String },

    #[error("Malformed codebook: unknown record structure '{value}'")]
    UnknownRecordStructure { value: String },

    #[error("Unknown record type code '{code}' on line {line}")]
    UnknownRecordType { line: u64, code: String },

    #[error("Cannot decode value '{raw}' for {variable} on line {line}: {reason}")]
    ValueDecode {
        line: u64,
        variable: String,
        raw: String,
        reason: String,
    },

    #[error(
        "Line {line} of record type {record_type} is {found} bytes long, expected {expected}"
    )]
    LineLength {
        line: u64,
        record_type: String,
        expected: usize,
        found: usize,
    },

    #[error("No description found for variable {name}")]
    UnknownVariable { name: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported data file format: {path}")]
    UnsupportedFormat { path: PathBuf },
}

impl MicrodataError {
    pub fn malformed(section: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedCodebook {
            section: section.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Whether this error aborts a decode when strict mode is off.
    ///
    /// Per-line and per-field problems are counted and skipped; everything
    /// else indicates an unusable codebook, configuration or input stream.
    pub fn is_fatal_by_default(&self) -> bool {
        !matches!(
            self,
            Self::UnknownRecordType { .. } | Self::ValueDecode { .. } | Self::LineLength { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, MicrodataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let unknown = MicrodataError::UnknownRecordType {
            line: 3,
            code: "X".to_string(),
        };
        assert!(!unknown.is_fatal_by_default());

        let malformed = MicrodataError::malformed("dataDscr/var", "missing location");
        assert!(malformed.is_fatal_by_default());

        let io = MicrodataError::from(std::io::Error::other("disk gone"));
        assert!(io.is_fatal_by_default());
    }

    #[test]
    fn test_error_messages() {
        let err = MicrodataError::ValueDecode {
            line: 7,
            variable: "AGE".to_string(),
            raw: "4x".to_string(),
            reason: "non-digit character".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot decode value '4x' for AGE on line 7: non-digit character"
        );

        let err = MicrodataError::UnknownRecordStructure {
            value: "nested".to_string(),
        };
        assert!(err.to_string().contains("unknown record structure 'nested'"));
    }
}
