//! Line decoding: fixed-width slices to typed values.
//!
//! A [`LineDecoder`] is prepared once per record type from its layout (and
//! the optional column subset) and then applied to every line of that type.
//! Field problems never abort a row: the field takes the blank sentinel and
//! the problem is routed through the decode session.

use super::session::DecodeSession;
use crate::codebook::{Codebook, RecordLayout, VariableDescription};
use crate::config::{BlankNumericPolicy, DecodeConfig};
use crate::error::{MicrodataError, Result};
use crate::models::{ColumnType, DecodedRecord, Value};
use encoding_rs::Encoding;
use std::collections::HashSet;
use std::ops::Range;

/// One decoded column of a record type
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub range: Range<usize>,
    pub column_type: ColumnType,
    pub implied_decimals: u32,
}

impl FieldSpec {
    fn from_variable(var: &VariableDescription) -> Self {
        Self {
            name: var.name.clone(),
            range: var.byte_range(),
            column_type: var.column_type(),
            implied_decimals: var.implied_decimals,
        }
    }
}

/// Decoder for the lines of one record type
#[derive(Debug, Clone)]
pub struct LineDecoder {
    record_type: String,
    fields: Vec<FieldSpec>,
    line_length: usize,
    encoding: &'static Encoding,
    blank: BlankNumericPolicy,
}

impl LineDecoder {
    pub fn new(
        layout: &RecordLayout,
        subset: Option<&HashSet<String>>,
        encoding: &'static Encoding,
        blank: BlankNumericPolicy,
    ) -> Self {
        let fields = layout
            .variables
            .iter()
            .filter(|var| subset.is_none_or(|names| names.contains(&var.name)))
            .map(FieldSpec::from_variable)
            .collect();

        Self {
            record_type: layout.record_type.name.clone(),
            fields,
            line_length: layout.line_length,
            encoding,
            blank,
        }
    }

    /// One decoder per record type, in layout order, honoring the configured
    /// subset, encoding override and blank policy
    pub fn for_codebook(codebook: &Codebook, config: &DecodeConfig) -> Result<Vec<Self>> {
        let subset = config
            .column_subset
            .as_ref()
            .map(|names| codebook.resolve_names(names))
            .transpose()?;
        let encoding = resolve_encoding(config.encoding.as_deref().unwrap_or(codebook.encoding()))?;

        Ok(codebook
            .layouts()
            .iter()
            .map(|layout| Self::new(layout, subset.as_ref(), encoding, config.blank_numeric))
            .collect())
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn line_length(&self) -> usize {
        self.line_length
    }

    /// Output column names and types, in column order
    pub fn schema(&self) -> Vec<(String, ColumnType)> {
        self.fields
            .iter()
            .map(|field| (field.name.clone(), field.column_type))
            .collect()
    }

    /// Decode a line into one value per field, in column order
    pub fn decode_values(
        &self,
        line: &[u8],
        line_number: u64,
        session: &mut DecodeSession,
    ) -> Result<Vec<Value>> {
        if line.len() != self.line_length {
            session.record(MicrodataError::LineLength {
                line: line_number,
                record_type: self.record_type.clone(),
                expected: self.line_length,
                found: line.len(),
            })?;
        }

        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            // Fields past the end of a short line decode as blank
            let raw = line.get(field.range.clone());
            values.push(self.decode_field(field, raw, true, line_number, session)?);
        }
        Ok(values)
    }

    /// Decode a line into a named record
    pub fn decode(
        &self,
        line: &[u8],
        line_number: u64,
        session: &mut DecodeSession,
    ) -> Result<DecodedRecord> {
        let values = self.decode_values(line, line_number, session)?;
        Ok(DecodedRecord {
            record_type: self.record_type.clone(),
            fields: self
                .fields
                .iter()
                .map(|field| field.name.clone())
                .zip(values)
                .collect(),
        })
    }

    /// Decode one raw field; `scaled` applies implied decimals (fixed-width
    /// text) rather than reading explicit decimal points (delimited text)
    pub fn decode_field(
        &self,
        field: &FieldSpec,
        raw: Option<&[u8]>,
        scaled: bool,
        line_number: u64,
        session: &mut DecodeSession,
    ) -> Result<Value> {
        let Some(raw) = raw else {
            return Ok(self.sentinel(field.column_type));
        };

        match self.convert(field, raw, scaled) {
            Ok(value) => Ok(value),
            Err(reason) => {
                session.record(MicrodataError::ValueDecode {
                    line: line_number,
                    variable: field.name.clone(),
                    raw: String::from_utf8_lossy(raw).into_owned(),
                    reason,
                })?;
                Ok(self.sentinel(field.column_type))
            }
        }
    }

    fn convert(&self, field: &FieldSpec, raw: &[u8], scaled: bool) -> std::result::Result<Value, String> {
        match field.column_type {
            ColumnType::String => self
                .encoding
                .decode_without_bom_handling_and_without_replacement(raw)
                .map(|text| Value::Str(text.into_owned()))
                .ok_or_else(|| format!("bytes are not valid {}", self.encoding.name())),
            ColumnType::Int64 => Ok(match parse_integer(raw)? {
                Some(v) => Value::Int(v),
                None => self.sentinel(ColumnType::Int64),
            }),
            ColumnType::Float64 if scaled => Ok(match parse_integer(raw)? {
                Some(v) => Value::Float(apply_implied_decimals(v, field.implied_decimals)),
                None => self.sentinel(ColumnType::Float64),
            }),
            ColumnType::Float64 => Ok(match parse_decimal(raw)? {
                Some(v) => Value::Float(v),
                None => self.sentinel(ColumnType::Float64),
            }),
        }
    }

    /// Value substituted for blank, missing or undecodable fields
    pub fn sentinel(&self, column_type: ColumnType) -> Value {
        match (self.blank, column_type) {
            (BlankNumericPolicy::Missing, _) => Value::Missing,
            (BlankNumericPolicy::Zero, ColumnType::Int64) => Value::Int(0),
            (BlankNumericPolicy::Zero, ColumnType::Float64) => Value::Float(0.0),
            (BlankNumericPolicy::Zero, ColumnType::String) => Value::Str(String::new()),
        }
    }
}

/// Look up a character encoding by its WHATWG label
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
        MicrodataError::configuration(format!("Unknown character encoding '{}'", label))
    })
}

/// Parse a signed integer token; `Ok(None)` when the token is blank
pub fn parse_integer(raw: &[u8]) -> std::result::Result<Option<i64>, String> {
    let token = raw.trim_ascii();
    if token.is_empty() {
        return Ok(None);
    }

    let (negative, digits) = match token[0] {
        b'-' => (true, &token[1..]),
        b'+' => (false, &token[1..]),
        _ => (false, token),
    };
    if digits.is_empty() {
        return Err("sign without digits".to_string());
    }

    let mut magnitude: i64 = 0;
    for &byte in digits {
        if !byte.is_ascii_digit() {
            return Err(format!("non-digit character '{}'", byte.escape_ascii()));
        }
        magnitude = magnitude
            .checked_mul(10)
            .and_then(|m| m.checked_add(i64::from(byte - b'0')))
            .ok_or_else(|| "value out of range".to_string())?;
    }

    Ok(Some(if negative { -magnitude } else { magnitude }))
}

/// Parse a token with an optional explicit decimal point; `Ok(None)` when blank
pub fn parse_decimal(raw: &[u8]) -> std::result::Result<Option<f64>, String> {
    let token = raw.trim_ascii();
    if token.is_empty() {
        return Ok(None);
    }
    if !token.contains(&b'.') {
        return parse_integer(token).map(|v| v.map(|v| v as f64));
    }

    let valid = token
        .iter()
        .enumerate()
        .all(|(i, b)| b.is_ascii_digit() || *b == b'.' || (i == 0 && (*b == b'-' || *b == b'+')));
    if !valid {
        return Err("invalid decimal number".to_string());
    }

    std::str::from_utf8(token)
        .ok()
        .and_then(|text| text.parse::<f64>().ok())
        .map(Some)
        .ok_or_else(|| "invalid decimal number".to_string())
}

/// Divide a stored integer by 10^decimals
pub fn apply_implied_decimals(stored: i64, decimals: u32) -> f64 {
    if decimals == 0 {
        stored as f64
    } else {
        stored as f64 / 10i64.pow(decimals) as f64
    }
}

/// Encode a value back into its fixed-width field: numerics zero-padded to
/// the field width with implied decimals re-applied, strings left-justified
pub fn encode_field(value: &Value, var: &VariableDescription) -> String {
    let width = var.width();
    let stored = match value {
        Value::Int(v) => Some(*v),
        Value::Float(v) => Some((v * 10i64.pow(var.implied_decimals) as f64).round() as i64),
        Value::Str(s) => return format!("{:<width$}", s, width = width),
        Value::Missing => None,
    };

    match stored {
        Some(v) if v < 0 => format!("-{:0>width$}", v.unsigned_abs(), width = width - 1),
        Some(v) => format!("{:0>width$}", v, width = width),
        None => " ".repeat(width),
    }
}
