//! Columnar tables of decoded rows
//!
//! A [`Table`] holds the rows of one record type as typed column buffers in
//! layout order; a [`TableSet`] holds one table per record type encountered
//! in a hierarchical file. Both convert to polars `DataFrame`s.

use crate::error::{MicrodataError, Result};
use crate::models::{ColumnType, DecodedRecord, Value};
use polars::prelude::{Column, DataFrame};
use std::mem;

/// Typed buffer for one column; missing values are `None`
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int64(Vec<Option<i64>>),
    Float64(Vec<Option<f64>>),
    String(Vec<Option<String>>),
}

impl ColumnData {
    pub fn new(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Int64 => ColumnData::Int64(Vec::new()),
            ColumnType::Float64 => ColumnData::Float64(Vec::new()),
            ColumnType::String => ColumnData::String(Vec::new()),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnData::Int64(_) => ColumnType::Int64,
            ColumnData::Float64(_) => ColumnType::Float64,
            ColumnData::String(_) => ColumnType::String,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int64(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a value; values of another kind are stored as missing
    pub fn push(&mut self, value: Value) {
        match (self, value) {
            (ColumnData::Int64(v), Value::Int(x)) => v.push(Some(x)),
            (ColumnData::Float64(v), Value::Float(x)) => v.push(Some(x)),
            (ColumnData::Float64(v), Value::Int(x)) => v.push(Some(x as f64)),
            (ColumnData::String(v), Value::Str(x)) => v.push(Some(x)),
            (ColumnData::Int64(v), _) => v.push(None),
            (ColumnData::Float64(v), _) => v.push(None),
            (ColumnData::String(v), _) => v.push(None),
        }
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        let value = match self {
            ColumnData::Int64(v) => v.get(index)?.map(Value::Int),
            ColumnData::Float64(v) => v.get(index)?.map(Value::Float),
            ColumnData::String(v) => v.get(index)?.clone().map(Value::Str),
        };
        Some(value.unwrap_or(Value::Missing))
    }

    /// Gather rows by index; `None` positions become missing values
    pub fn gather(&self, indices: &[Option<usize>]) -> ColumnData {
        fn pick<T: Clone>(values: &[Option<T>], indices: &[Option<usize>]) -> Vec<Option<T>> {
            indices
                .iter()
                .map(|index| index.and_then(|i| values.get(i).cloned().flatten()))
                .collect()
        }

        match self {
            ColumnData::Int64(v) => ColumnData::Int64(pick(v, indices)),
            ColumnData::Float64(v) => ColumnData::Float64(pick(v, indices)),
            ColumnData::String(v) => ColumnData::String(pick(v, indices)),
        }
    }

    fn append(&mut self, other: ColumnData) -> Result<()> {
        match (self, other) {
            (ColumnData::Int64(a), ColumnData::Int64(b)) => a.extend(b),
            (ColumnData::Float64(a), ColumnData::Float64(b)) => a.extend(b),
            (ColumnData::String(a), ColumnData::String(b)) => a.extend(b),
            (a, b) => {
                return Err(MicrodataError::configuration(format!(
                    "Cannot append a {:?} column to a {:?} column",
                    b.column_type(),
                    a.column_type()
                )));
            }
        }
        Ok(())
    }

    fn take(&mut self) -> ColumnData {
        let column_type = self.column_type();
        mem::replace(self, ColumnData::new(column_type))
    }

    pub fn to_column(&self, name: &str) -> Column {
        match self {
            ColumnData::Int64(v) => Column::new(name.into(), v.as_slice()),
            ColumnData::Float64(v) => Column::new(name.into(), v.as_slice()),
            ColumnData::String(v) => Column::new(name.into(), v.as_slice()),
        }
    }
}

/// Rows of one record type, stored column-wise in layout order
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub record_type: String,
    columns: Vec<(String, ColumnData)>,
    rows: usize,
}

impl Table {
    /// Empty table with the given schema
    pub fn new(record_type: impl Into<String>, schema: &[(String, ColumnType)]) -> Self {
        Self {
            record_type: record_type.into(),
            columns: schema
                .iter()
                .map(|(name, column_type)| (name.clone(), ColumnData::new(*column_type)))
                .collect(),
            rows: 0,
        }
    }

    /// Assemble a table from equal-length columns
    pub fn from_columns(
        record_type: impl Into<String>,
        columns: Vec<(String, ColumnData)>,
    ) -> Result<Self> {
        let rows = columns.first().map(|(_, c)| c.len()).unwrap_or(0);
        if let Some((name, _)) = columns.iter().find(|(_, c)| c.len() != rows) {
            return Err(MicrodataError::configuration(format!(
                "Column {} does not have {} rows",
                name, rows
            )));
        }
        Ok(Self {
            record_type: record_type.into(),
            columns,
            rows,
        })
    }

    /// Rows held; a table with no columns still counts its records
    pub fn height(&self) -> usize {
        self.rows
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn columns(&self) -> &[(String, ColumnData)] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnData> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, data)| data)
    }

    pub fn schema(&self) -> Vec<(String, ColumnType)> {
        self.columns
            .iter()
            .map(|(name, data)| (name.clone(), data.column_type()))
            .collect()
    }

    /// Append one row of values given in column order
    pub fn push_row(&mut self, values: Vec<Value>) {
        for ((_, column), value) in self.columns.iter_mut().zip(values) {
            column.push(value);
        }
        self.rows += 1;
    }

    pub fn value(&self, column: &str, row: usize) -> Option<Value> {
        self.column(column)?.get(row)
    }

    /// One row as a named record
    pub fn row(&self, index: usize) -> Option<DecodedRecord> {
        if index >= self.height() {
            return None;
        }
        let fields = self
            .columns
            .iter()
            .map(|(name, data)| (name.clone(), data.get(index).unwrap_or(Value::Missing)))
            .collect();
        Some(DecodedRecord {
            record_type: self.record_type.clone(),
            fields,
        })
    }

    /// Append the rows of a table with the same schema
    pub fn append(&mut self, other: Table) -> Result<()> {
        if self.schema() != other.schema() {
            return Err(MicrodataError::configuration(format!(
                "Cannot append {} rows to a {} table with a different schema",
                other.record_type, self.record_type
            )));
        }
        for ((_, column), (_, data)) in self.columns.iter_mut().zip(other.columns) {
            column.append(data)?;
        }
        self.rows += other.rows;
        Ok(())
    }

    /// Move all rows out into a new table, leaving this one empty
    pub fn take_batch(&mut self) -> Table {
        Table {
            record_type: self.record_type.clone(),
            columns: self
                .columns
                .iter_mut()
                .map(|(name, data)| (name.clone(), data.take()))
                .collect(),
            rows: std::mem::take(&mut self.rows),
        }
    }

    pub fn to_dataframe(&self) -> Result<DataFrame> {
        if self.columns.is_empty() {
            return Ok(DataFrame::empty_with_height(self.rows));
        }
        let columns = self
            .columns
            .iter()
            .map(|(name, data)| data.to_column(name))
            .collect();
        Ok(DataFrame::new(columns)?)
    }
}

/// Tables keyed by record type name, in order of first encounter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSet {
    tables: Vec<Table>,
    declared: Vec<(String, Vec<(String, ColumnType)>)>,
}

impl TableSet {
    /// Empty set over the declared record types and their schemas
    pub fn new(declared: Vec<(String, Vec<(String, ColumnType)>)>) -> Self {
        Self {
            tables: Vec::new(),
            declared,
        }
    }

    /// Table for a record type, created on first use
    pub fn entry(&mut self, record_type: &str) -> Result<&mut Table> {
        let position = match self.tables.iter().position(|t| t.record_type == record_type) {
            Some(position) => position,
            None => {
                let schema = self.schema(record_type).ok_or_else(|| {
                    MicrodataError::configuration(format!(
                        "Record type {} is not declared",
                        record_type
                    ))
                })?;
                let table = Table::new(record_type, schema);
                self.tables.push(table);
                self.tables.len() - 1
            }
        };
        Ok(&mut self.tables[position])
    }

    pub fn get(&self, record_type: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.record_type == record_type)
    }

    /// Record type names in order of first encounter
    pub fn names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.record_type.as_str()).collect()
    }

    /// Declared record type names in codebook order
    pub fn declared_types(&self) -> Vec<&str> {
        self.declared.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Declared schema of a record type, whether or not it was encountered
    pub fn schema(&self, record_type: &str) -> Option<&[(String, ColumnType)]> {
        self.declared
            .iter()
            .find(|(name, _)| name == record_type)
            .map(|(_, schema)| schema.as_slice())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }

    pub fn into_tables(self) -> Vec<Table> {
        self.tables
    }

    pub fn to_dataframes(&self) -> Result<Vec<(String, DataFrame)>> {
        self.tables
            .iter()
            .map(|table| Ok((table.record_type.clone(), table.to_dataframe()?)))
            .collect()
    }
}
