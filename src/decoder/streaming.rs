//! Streaming table builder
//!
//! Drives a row source sequentially and accumulates decoded rows into
//! per-record-type column buffers. Output is a single table, a table set,
//! or a lazy sequence of bounded batches.
//!
//! ## Batching
//!
//! In chunked mode each record type has its own buffer. A buffer that
//! reaches the batch size is flushed immediately; at end of input the
//! remaining partial buffers are flushed in record type order. Batches are
//! yielded in flush order, so concatenating the batches of one record type
//! reproduces that type's rows in input order.

use super::classifier::RecordClassifier;
use super::line::LineDecoder;
use super::session::DecodeSession;
use super::source::LineSource;
use super::stats::DecodeSummary;
use super::table::{Table, TableSet};
use crate::codebook::Codebook;
use crate::config::DecodeConfig;
use crate::error::{MicrodataError, Result};
use crate::models::{ColumnType, Value};
use std::collections::VecDeque;
use std::io::BufRead;
use tracing::{debug, info};

/// Schema of each layout index: record type name and its columns
pub type RecordSchemas = Vec<(String, Vec<(String, ColumnType)>)>;

/// A sequential source of decoded rows
pub trait RowSource {
    /// Output schema per layout index
    fn schemas(&self) -> RecordSchemas;

    /// Decode the next row, returning its layout index and values in column
    /// order; `None` at end of input
    fn next_row(&mut self, session: &mut DecodeSession) -> Result<Option<(usize, Vec<Value>)>>;
}

impl<S: RowSource + ?Sized> RowSource for Box<S> {
    fn schemas(&self) -> RecordSchemas {
        (**self).schemas()
    }

    fn next_row(&mut self, session: &mut DecodeSession) -> Result<Option<(usize, Vec<Value>)>> {
        (**self).next_row(session)
    }
}

/// Rows of a fixed-width file, classified when the extract is hierarchical
pub struct FixedWidthRows<R> {
    lines: LineSource<R>,
    classifier: Option<RecordClassifier>,
    decoders: Vec<LineDecoder>,
}

impl<R: BufRead> FixedWidthRows<R> {
    pub fn new(codebook: &Codebook, reader: R, config: &DecodeConfig) -> Result<Self> {
        Ok(Self {
            lines: LineSource::new(reader),
            classifier: RecordClassifier::new(codebook),
            decoders: LineDecoder::for_codebook(codebook, config)?,
        })
    }
}

impl<R: BufRead> RowSource for FixedWidthRows<R> {
    fn schemas(&self) -> RecordSchemas {
        self.decoders
            .iter()
            .map(|decoder| (decoder.record_type().to_string(), decoder.schema()))
            .collect()
    }

    fn next_row(&mut self, session: &mut DecodeSession) -> Result<Option<(usize, Vec<Value>)>> {
        while let Some((line_number, line)) = self.lines.next_line()? {
            session.line_read();
            // Whitespace-only lines are records whose fields are all blank
            if line.is_empty() {
                session.blank_line();
                continue;
            }

            let index = match &self.classifier {
                Some(classifier) => match classifier.classify(line, line_number) {
                    Ok(index) => index,
                    Err(e) => {
                        session.record(e)?;
                        continue;
                    }
                },
                None => 0,
            };

            let values = self.decoders[index].decode_values(line, line_number, session)?;
            session.row_decoded();
            return Ok(Some((index, values)));
        }
        Ok(None)
    }
}

/// Accumulates decoded rows into tables
pub struct StreamingTableBuilder<S> {
    rows: S,
    schemas: RecordSchemas,
    session: DecodeSession,
}

impl<S: RowSource> StreamingTableBuilder<S> {
    pub fn new(rows: S, config: &DecodeConfig) -> Self {
        let schemas = rows.schemas();
        Self {
            rows,
            schemas,
            session: DecodeSession::new(config),
        }
    }

    /// Decode every row into one table; the source must have a single record type
    pub fn read_table(mut self) -> Result<(Table, DecodeSummary)> {
        let [(record_type, schema)] = self.schemas.as_slice() else {
            return Err(MicrodataError::configuration(format!(
                "Expected a single record type, found {}",
                self.schemas.len()
            )));
        };
        let mut table = Table::new(record_type.clone(), schema);

        info!("Decoding {} rows", record_type);
        while let Some((_, values)) = self.rows.next_row(&mut self.session)? {
            table.push_row(values);
        }

        let summary = finish(self.session);
        Ok((table, summary))
    }

    /// Decode every row into one table per record type
    pub fn read_table_set(mut self) -> Result<(TableSet, DecodeSummary)> {
        let mut tables = TableSet::new(self.schemas.clone());

        info!("Decoding {} record types", self.schemas.len());
        while let Some((index, values)) = self.rows.next_row(&mut self.session)? {
            tables.entry(&self.schemas[index].0)?.push_row(values);
        }

        let summary = finish(self.session);
        Ok((tables, summary))
    }

    /// Lazy sequence of batches of at most `chunk_size` rows
    pub fn into_batches(self, chunk_size: usize) -> Result<BatchIter<S>> {
        if chunk_size == 0 {
            return Err(MicrodataError::configuration(
                "chunk_size must be a positive row count",
            ));
        }

        let buffers = self
            .schemas
            .iter()
            .map(|(record_type, schema)| Table::new(record_type.clone(), schema))
            .collect();

        Ok(BatchIter {
            rows: self.rows,
            session: self.session,
            chunk_size,
            buffers,
            ready: VecDeque::new(),
            finished: false,
        })
    }
}

fn finish(session: DecodeSession) -> DecodeSummary {
    let summary = session.into_summary();
    info!(
        "Decoded {} rows from {} lines",
        summary.rows_decoded, summary.lines_read
    );
    summary.log_warnings();
    summary
}

/// One-pass cursor over decoded batches.
///
/// Dropping the iterator early releases the underlying source; no further
/// lines are read.
pub struct BatchIter<S> {
    rows: S,
    session: DecodeSession,
    chunk_size: usize,
    buffers: Vec<Table>,
    ready: VecDeque<Table>,
    finished: bool,
}

impl<S: RowSource> BatchIter<S> {
    /// Counters so far; complete once the iterator is exhausted
    pub fn summary(&self) -> &DecodeSummary {
        self.session.summary()
    }

    pub fn into_summary(self) -> DecodeSummary {
        self.session.into_summary()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl<S: RowSource> Iterator for BatchIter<S> {
    type Item = Result<Table>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(batch) = self.ready.pop_front() {
                return Some(Ok(batch));
            }
            if self.finished {
                return None;
            }

            match self.rows.next_row(&mut self.session) {
                Ok(Some((index, values))) => {
                    let buffer = &mut self.buffers[index];
                    buffer.push_row(values);
                    if buffer.height() >= self.chunk_size {
                        debug!("Flushing {} batch of {} rows", buffer.record_type, buffer.height());
                        self.ready.push_back(buffer.take_batch());
                    }
                }
                Ok(None) => {
                    self.finished = true;
                    for buffer in &mut self.buffers {
                        if !buffer.is_empty() {
                            debug!(
                                "Flushing final {} batch of {} rows",
                                buffer.record_type,
                                buffer.height()
                            );
                            self.ready.push_back(buffer.take_batch());
                        }
                    }
                    let summary = self.session.summary();
                    info!(
                        "Decoded {} rows from {} lines",
                        summary.rows_decoded, summary.lines_read
                    );
                    summary.log_warnings();
                }
                Err(e) => {
                    self.finished = true;
                    self.ready.clear();
                    return Some(Err(e));
                }
            }
        }
    }
}
