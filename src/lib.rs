//! Microdata Processor Library
//!
//! A Rust library for decoding census and survey microdata extracts from
//! fixed-width data files, using the DDI XML codebook that ships with each
//! extract.
//!
//! This library provides tools for:
//! - Parsing codebooks into variable layouts, value labels and record types
//! - Classifying lines of hierarchical extracts by record type
//! - Decoding fixed-width fields with implied decimals into typed columns
//! - Streaming decoded rows into tables, whole or in batches
//! - Rectangularizing hierarchical extracts on their linking variables
//! - Reading gzip-compressed and delimited (CSV) extracts
//! - Tabulating decoded variables against their value labels

pub mod codebook;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod error;
pub mod models;
pub mod tabulate;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use codebook::{Codebook, VariableDescription, read_codebook};
pub use config::{BlankNumericPolicy, DecodeConfig};
pub use decoder::{
    DecodeSummary, HierarchicalOutput, Table, TableSet, read_hierarchical_microdata,
    read_microdata, read_microdata_chunked,
};
pub use error::{MicrodataError, Result};
pub use models::{ColumnType, DecodedRecord, RecordStructure, Value, VariableType};
pub use tabulate::{TabulationRow, tabulate};
