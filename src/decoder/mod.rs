//! Microdata decoding
//!
//! Turns extract data files into columnar tables using a parsed codebook.
//!
//! ## Architecture
//!
//! - [`source`] - Path resolution, gzip detection and the line cursor
//! - [`classifier`] - Record type classification for hierarchical extracts
//! - [`line`] - Fixed-width field slicing and numeric conversion
//! - [`session`] / [`stats`] - Per-decode error policy and counters
//! - [`table`] - Columnar tables and table sets
//! - [`streaming`] - Row sources, table builder and batch iterator
//! - [`delimited`] - CSV extracts
//! - [`rectangularize`] - Flattening hierarchical table sets
//!
//! ## Usage
//!
//! ```rust,no_run
//! use microdata_processor::codebook::read_codebook;
//! use microdata_processor::config::DecodeConfig;
//! use microdata_processor::decoder::read_microdata;
//! use std::path::Path;
//!
//! # fn example() -> microdata_processor::error::Result<()> {
//! let codebook = read_codebook(Path::new("cps_00006.xml"))?;
//! let (table, summary) =
//!     read_microdata(&codebook, Path::new("cps_00006.dat.gz"), &DecodeConfig::default())?;
//! println!("{} rows, {} fields substituted", table.height(), summary.invalid_values);
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod delimited;
pub mod line;
pub mod rectangularize;
pub mod session;
pub mod source;
pub mod stats;
pub mod streaming;
pub mod table;

pub use classifier::RecordClassifier;
pub use delimited::DelimitedRows;
pub use line::LineDecoder;
pub use rectangularize::rectangularize;
pub use session::DecodeSession;
pub use source::{DataFormat, LineSource, open_data_file, resolve_data_path};
pub use stats::DecodeSummary;
pub use streaming::{BatchIter, FixedWidthRows, RowSource, StreamingTableBuilder};
pub use table::{ColumnData, Table, TableSet};

use crate::codebook::Codebook;
use crate::config::DecodeConfig;
use crate::constants::DEFAULT_CHUNK_SIZE;
use crate::error::{MicrodataError, Result};
use std::path::Path;
use tracing::info;

/// Row source over any data file the decoder understands
pub type BoxedRows = Box<dyn RowSource + Send>;

/// Result of decoding a hierarchical extract
#[derive(Debug, Clone, PartialEq)]
pub enum HierarchicalOutput {
    /// One table per record type
    Tables(TableSet),
    /// One rectangularized table
    Rectangular(Table),
}

impl HierarchicalOutput {
    pub fn as_tables(&self) -> Option<&TableSet> {
        match self {
            HierarchicalOutput::Tables(tables) => Some(tables),
            HierarchicalOutput::Rectangular(_) => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            HierarchicalOutput::Tables(_) => None,
            HierarchicalOutput::Rectangular(table) => Some(table),
        }
    }
}

/// Open a data file as a row source, dispatching on its format
pub fn open_rows(codebook: &Codebook, path: &Path, config: &DecodeConfig) -> Result<BoxedRows> {
    config.validate()?;
    let path = resolve_data_path(path)?;
    let format = DataFormat::from_path(&path)?;
    info!("Reading {:?} data from {}", format, path.display());

    let reader = open_data_file(&path)?;
    Ok(match format {
        DataFormat::FixedWidth => Box::new(FixedWidthRows::new(codebook, reader, config)?),
        DataFormat::Delimited => Box::new(DelimitedRows::new(codebook, reader, config)?),
    })
}

/// Decode a rectangular extract into one table
pub fn read_microdata(
    codebook: &Codebook,
    path: &Path,
    config: &DecodeConfig,
) -> Result<(Table, DecodeSummary)> {
    if codebook.is_hierarchical() {
        return Err(MicrodataError::configuration(
            "Codebook describes a hierarchical extract; use read_hierarchical_microdata",
        ));
    }

    let rows = open_rows(codebook, path, config)?;
    StreamingTableBuilder::new(rows, config).read_table()
}

/// Decode an extract lazily, in batches of the configured chunk size.
///
/// Hierarchical extracts yield batches of one record type each.
pub fn read_microdata_chunked(
    codebook: &Codebook,
    path: &Path,
    config: &DecodeConfig,
) -> Result<BatchIter<BoxedRows>> {
    let rows = open_rows(codebook, path, config)?;
    let chunk_size = config.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
    StreamingTableBuilder::new(rows, config).into_batches(chunk_size)
}

/// Decode a hierarchical extract into a table set, or into one
/// rectangularized table when `as_dict` is off
pub fn read_hierarchical_microdata(
    codebook: &Codebook,
    path: &Path,
    config: &DecodeConfig,
) -> Result<(HierarchicalOutput, DecodeSummary)> {
    if !codebook.is_hierarchical() {
        return Err(MicrodataError::configuration(
            "Codebook describes a rectangular extract; use read_microdata",
        ));
    }

    let rows = open_rows(codebook, path, config)?;
    let (tables, mut summary) = StreamingTableBuilder::new(rows, config).read_table_set()?;

    if config.as_dict {
        return Ok((HierarchicalOutput::Tables(tables), summary));
    }

    let table = rectangularize(
        &tables,
        codebook.linking_variables(),
        config.preserve_unmatched_base,
        &mut summary,
    )?;
    Ok((HierarchicalOutput::Rectangular(table), summary))
}
