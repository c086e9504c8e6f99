//! Frequency tabulation of a decoded variable
//!
//! Produces one row per distinct value (sorted, missing last) with its
//! count, its share of all rows and, when the variable carries value
//! labels, the matching label.

use crate::codebook::VariableDescription;
use crate::decoder::{ColumnData, Table};
use crate::error::{MicrodataError, Result};
use crate::models::Value;
use polars::prelude::{Column, DataFrame};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub struct TabulationRow {
    pub value: Value,
    pub count: u64,
    pub proportion: f64,
    pub label: Option<String>,
}

/// Tabulate a variable's column in a decoded table
pub fn tabulate(variable: &VariableDescription, table: &Table) -> Result<Vec<TabulationRow>> {
    let column = table
        .column(&variable.name)
        .ok_or_else(|| MicrodataError::UnknownVariable {
            name: variable.name.clone(),
        })?;

    let counts = match column {
        ColumnData::Int64(values) => run_lengths(values, |a, b| a.cmp(b), |v| Value::Int(*v)),
        ColumnData::Float64(values) => {
            run_lengths(values, |a, b| a.total_cmp(b), |v| Value::Float(*v))
        }
        ColumnData::String(values) => {
            run_lengths(values, |a, b| a.cmp(b), |v| Value::Str(v.clone()))
        }
    };

    let total = column.len() as f64;
    Ok(counts
        .into_iter()
        .map(|(value, count)| TabulationRow {
            label: variable.label_for_value(&value).map(str::to_string),
            proportion: if total > 0.0 { count as f64 / total } else { 0.0 },
            value,
            count,
        })
        .collect())
}

/// Sorted distinct values with their counts; missing values sort last
fn run_lengths<T: Clone>(
    values: &[Option<T>],
    compare: impl Fn(&T, &T) -> Ordering,
    to_value: impl Fn(&T) -> Value,
) -> Vec<(Value, u64)> {
    let mut sorted: Vec<&Option<T>> = values.iter().collect();
    sorted.sort_by(|a, b| match (a, b) {
        (Some(a), Some(b)) => compare(a, b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    let mut counts: Vec<(Value, u64)> = Vec::new();
    let mut previous: Option<&Option<T>> = None;
    for value in sorted {
        let same = match (previous, value) {
            (Some(Some(p)), Some(v)) => compare(p, v) == Ordering::Equal,
            (Some(None), None) => true,
            _ => false,
        };
        match counts.last_mut() {
            Some((_, count)) if same => *count += 1,
            _ => counts.push((value.as_ref().map(&to_value).unwrap_or(Value::Missing), 1)),
        }
        previous = Some(value);
    }
    counts
}

/// Tabulation as a DataFrame with `value`, `count`, `proportion` and `label` columns
pub fn tabulation_frame(rows: &[TabulationRow]) -> Result<DataFrame> {
    let values: Vec<Option<String>> = rows
        .iter()
        .map(|row| (!row.value.is_missing()).then(|| row.value.to_string()))
        .collect();
    let counts: Vec<u64> = rows.iter().map(|row| row.count).collect();
    let proportions: Vec<f64> = rows.iter().map(|row| row.proportion).collect();
    let labels: Vec<Option<String>> = rows.iter().map(|row| row.label.clone()).collect();

    Ok(DataFrame::new(vec![
        Column::new("value".into(), values),
        Column::new("count".into(), counts),
        Column::new("proportion".into(), proportions),
        Column::new("label".into(), labels),
    ])?)
}
