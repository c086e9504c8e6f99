//! Decode statistics surfaced to the caller once decoding completes
//!
//! Counts are exact; error messages are retained verbatim only up to the
//! session's configured bound.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Summary of one decode session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodeSummary {
    /// Physical lines (or delimited records) read from the source
    pub lines_read: u64,

    /// Rows decoded into output tables
    pub rows_decoded: u64,

    /// Empty lines skipped without decoding
    pub blank_lines: u64,

    /// Lines skipped because their record type code was not declared
    pub unknown_record_types: u64,

    /// Fields replaced with a sentinel because their raw text did not convert
    pub invalid_values: u64,

    /// Lines shorter than their record type's line length
    pub short_lines: u64,

    /// Lines longer than their record type's line length (truncated)
    pub long_lines: u64,

    /// Subordinate rows dropped while rectangularizing for lack of a base row
    pub unmatched_subordinate_rows: u64,

    /// Base rows dropped while rectangularizing for lack of subordinate rows
    pub dropped_base_rows: u64,

    /// First recorded error messages for debugging
    pub errors: Vec<String>,
}

impl DecodeSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines that were read but produced no row
    pub fn skipped_lines(&self) -> u64 {
        self.unknown_record_types
    }

    /// Decoded rows as a percentage of non-blank lines read
    pub fn success_rate(&self) -> f64 {
        let candidates = self.lines_read.saturating_sub(self.blank_lines);
        if candidates == 0 {
            0.0
        } else {
            (self.rows_decoded as f64 / candidates as f64) * 100.0
        }
    }

    /// Whether any line or field needed intervention
    pub fn has_problems(&self) -> bool {
        self.unknown_record_types > 0
            || self.invalid_values > 0
            || self.short_lines > 0
            || self.long_lines > 0
            || self.unmatched_subordinate_rows > 0
    }

    /// Emit one warning per problem category
    pub fn log_warnings(&self) {
        if self.blank_lines > 0 {
            warn!("Skipped {} empty lines", self.blank_lines);
        }
        if self.unknown_record_types > 0 {
            warn!(
                "Skipped {} lines with an unknown record type",
                self.unknown_record_types
            );
        }
        if self.invalid_values > 0 {
            warn!(
                "Substituted {} field values that could not be decoded",
                self.invalid_values
            );
        }
        if self.short_lines > 0 {
            warn!(
                "{} lines were shorter than their record layout; missing columns decoded as blank",
                self.short_lines
            );
        }
        if self.long_lines > 0 {
            warn!(
                "{} lines were longer than their record layout and were truncated",
                self.long_lines
            );
        }
        if self.unmatched_subordinate_rows > 0 {
            warn!(
                "Dropped {} subordinate rows with no matching base record",
                self.unmatched_subordinate_rows
            );
        }
    }
}
