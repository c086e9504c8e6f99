//! Record classification for hierarchical extracts
//!
//! The discriminator occupies the same columns on every record type, so a
//! line is classified by slicing that span and looking the trimmed code up
//! in the codebook's declared record types.

use crate::codebook::Codebook;
use crate::error::{MicrodataError, Result};
use std::borrow::Cow;
use std::collections::HashMap;
use std::ops::Range;

#[derive(Debug, Clone)]
pub struct RecordClassifier {
    range: Range<usize>,
    codes: HashMap<String, usize>,
    names: Vec<String>,
}

impl RecordClassifier {
    /// Build a classifier over the codebook's layouts; `None` for rectangular extracts
    pub fn new(codebook: &Codebook) -> Option<Self> {
        let discriminator = codebook.discriminator()?;

        let codes = codebook
            .layouts()
            .iter()
            .enumerate()
            .map(|(index, layout)| (layout.record_type.code.trim().to_string(), index))
            .collect();
        let names = codebook
            .layouts()
            .iter()
            .map(|layout| layout.record_type.name.clone())
            .collect();

        Some(Self {
            range: discriminator.byte_range(),
            codes,
            names,
        })
    }

    /// Raw discriminator code of a line, trimmed; empty when the line is too short
    pub fn code_of<'a>(&self, line: &'a [u8]) -> Cow<'a, str> {
        let end = self.range.end.min(line.len());
        match line.get(self.range.start..end) {
            Some(raw) => match String::from_utf8_lossy(raw) {
                Cow::Borrowed(code) => Cow::Borrowed(code.trim()),
                Cow::Owned(code) => Cow::Owned(code.trim().to_string()),
            },
            None => Cow::Borrowed(""),
        }
    }

    /// Layout index of the line's record type
    pub fn classify(&self, line: &[u8], line_number: u64) -> Result<usize> {
        let code = self.code_of(line);
        self.codes
            .get(code.as_ref())
            .copied()
            .ok_or_else(|| MicrodataError::UnknownRecordType {
                line: line_number,
                code: code.into_owned(),
            })
    }

    /// Record type name of the line
    pub fn classify_name(&self, line: &[u8], line_number: u64) -> Result<&str> {
        let index = self.classify(line, line_number)?;
        Ok(&self.names[index])
    }
}
