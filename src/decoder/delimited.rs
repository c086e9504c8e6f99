//! Delimited (CSV) extracts
//!
//! Columns are matched to codebook variables by header name, ignoring case.
//! Numeric cells carry explicit decimal points, so implied decimals are not
//! applied. Only rectangular extracts are available in delimited form.

use super::line::LineDecoder;
use super::session::DecodeSession;
use super::streaming::{RecordSchemas, RowSource};
use crate::codebook::Codebook;
use crate::config::DecodeConfig;
use crate::error::{MicrodataError, Result};
use crate::models::Value;
use csv::{ByteRecord, ReaderBuilder};
use std::io::Read;
use tracing::debug;

pub struct DelimitedRows<R: Read> {
    reader: csv::Reader<R>,
    record: ByteRecord,
    decoder: LineDecoder,
    /// Header position of each decoded field
    positions: Vec<usize>,
}

impl<R: Read> DelimitedRows<R> {
    pub fn new(codebook: &Codebook, reader: R, config: &DecodeConfig) -> Result<Self> {
        if codebook.is_hierarchical() {
            return Err(MicrodataError::configuration(
                "Hierarchical extracts are not supported in delimited format",
            ));
        }

        let decoder = LineDecoder::for_codebook(codebook, config)?
            .into_iter()
            .next()
            .ok_or_else(|| MicrodataError::configuration("Codebook declares no record layout"))?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(|h| String::from_utf8_lossy(h).trim().to_string())
            .collect();

        let positions = decoder
            .fields()
            .iter()
            .map(|field| {
                headers
                    .iter()
                    .position(|h| h.eq_ignore_ascii_case(&field.name))
                    .ok_or_else(|| {
                        MicrodataError::configuration(format!(
                            "Column {} not found in delimited file header",
                            field.name
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Mapped {} of {} delimited columns",
            positions.len(),
            headers.len()
        );

        Ok(Self {
            reader,
            record: ByteRecord::new(),
            decoder,
            positions,
        })
    }
}

impl<R: Read> RowSource for DelimitedRows<R> {
    fn schemas(&self) -> RecordSchemas {
        vec![(self.decoder.record_type().to_string(), self.decoder.schema())]
    }

    fn next_row(&mut self, session: &mut DecodeSession) -> Result<Option<(usize, Vec<Value>)>> {
        if !self.reader.read_byte_record(&mut self.record)? {
            return Ok(None);
        }
        session.line_read();
        let line_number = self
            .record
            .position()
            .map(|p| p.line())
            .unwrap_or_default();

        let mut values = Vec::with_capacity(self.positions.len());
        for (field, &position) in self.decoder.fields().iter().zip(&self.positions) {
            let raw = self.record.get(position);
            values.push(
                self.decoder
                    .decode_field(field, raw, false, line_number, session)?,
            );
        }

        session.row_decoded();
        Ok(Some((0, values)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codebook::tests::{hierarchical_codebook, rectangular_codebook};
    use crate::decoder::streaming::StreamingTableBuilder;

    const DATA: &str = "year,serial,month,statefip,wtfinl,name,sex,age\n\
2020,1,3,27,1234.5678,Ann,2,42\n\
2020,2,3,1,,Bo,1,\n\
2020,3,3,1,10,Cy,x,7\n";

    #[test]
    fn test_delimited_rows() {
        let codebook = rectangular_codebook();
        let config = DecodeConfig::default();
        let rows = DelimitedRows::new(&codebook, DATA.as_bytes(), &config).unwrap();

        let (table, summary) = StreamingTableBuilder::new(rows, &config)
            .read_table()
            .unwrap();

        assert_eq!(table.height(), 3);
        // Explicit decimal points, no implied scaling
        assert_eq!(table.value("WTFINL", 0), Some(Value::Float(1234.5678)));
        assert_eq!(table.value("WTFINL", 2), Some(Value::Float(10.0)));
        assert_eq!(table.value("AGE", 0), Some(Value::Int(42)));
        assert_eq!(table.value("AGE", 1), Some(Value::Int(0)));
        assert_eq!(table.value("NAME", 1), Some(Value::Str("Bo".to_string())));
        assert_eq!(table.value("SEX", 2), Some(Value::Int(0)));
        assert_eq!(summary.invalid_values, 1);
        assert!(summary.errors[0].contains("on line 4"));
    }

    #[test]
    fn test_missing_header_column() {
        let codebook = rectangular_codebook();
        let config = DecodeConfig::default();
        let data = "year,serial\n2020,1\n";

        assert!(matches!(
            DelimitedRows::new(&codebook, data.as_bytes(), &config),
            Err(MicrodataError::Configuration { .. })
        ));

        let config = DecodeConfig::default().with_column_subset(["YEAR", "serial"]);
        assert!(DelimitedRows::new(&codebook, data.as_bytes(), &config).is_ok());
    }

    #[test]
    fn test_hierarchical_rejected() {
        let config = DecodeConfig::default();
        assert!(DelimitedRows::new(&hierarchical_codebook(), "RECTYPE\n".as_bytes(), &config).is_err());
    }
}
