//! Rectangularizing hierarchical table sets
//!
//! The first declared record type is the base. Every subordinate row is
//! joined onto the base row sharing its linking key values, so a base row
//! expands into one output row per matching subordinate row. Output rows
//! follow base row order, then subordinate record type order, then input
//! order. Output columns are the base columns followed by each subordinate
//! type's columns not already present.

use super::stats::DecodeSummary;
use super::table::{ColumnData, Table, TableSet};
use crate::constants::RECTANGULAR_RECORD_TYPE;
use crate::error::{MicrodataError, Result};
use crate::models::{ColumnType, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Output row provenance: base row and, unless the base row is preserved
/// on its own, the subordinate record type and row it was joined with
type JoinedRow = (usize, Option<(usize, usize)>);

/// Flatten a table set into one table joined on the linking columns
pub fn rectangularize(
    tables: &TableSet,
    linking_columns: &[String],
    preserve_unmatched_base: bool,
    summary: &mut DecodeSummary,
) -> Result<Table> {
    if linking_columns.is_empty() {
        return Err(MicrodataError::configuration(
            "Codebook declares no linking variables; cannot rectangularize",
        ));
    }

    let declared = tables.declared_types();
    let Some((&base_type, subordinate_types)) = declared.split_first() else {
        return Err(MicrodataError::configuration(
            "Table set declares no record types",
        ));
    };

    for record_type in &declared {
        let schema = tables.schema(record_type).unwrap_or_default();
        for key in linking_columns {
            if !schema.iter().any(|(name, _)| name == key) {
                return Err(MicrodataError::configuration(format!(
                    "Linking column {} is not retained for record type {}; include it in the column subset",
                    key, record_type
                )));
            }
        }
    }

    let base_schema = tables.schema(base_type).unwrap_or_default();
    let empty_base = Table::new(base_type, base_schema);
    let base = tables.get(base_type).unwrap_or(&empty_base);

    let mut base_index: HashMap<Vec<String>, usize> = HashMap::new();
    for row in 0..base.height() {
        let key = link_key(base, linking_columns, row);
        if base_index.contains_key(&key) {
            debug!("Duplicate base key {:?} on row {}; keeping the first", key, row);
            continue;
        }
        base_index.insert(key, row);
    }

    let mut matches: Vec<Vec<(usize, usize)>> = vec![Vec::new(); base.height()];
    let mut unmatched = 0u64;
    let subordinates: Vec<Option<&Table>> = subordinate_types
        .iter()
        .map(|record_type| tables.get(record_type))
        .collect();

    for (type_index, table) in subordinates.iter().enumerate() {
        let Some(table) = table else { continue };
        for row in 0..table.height() {
            match base_index.get(&link_key(table, linking_columns, row)) {
                Some(&base_row) => matches[base_row].push((type_index, row)),
                None => unmatched += 1,
            }
        }
    }

    let mut joined: Vec<JoinedRow> = Vec::new();
    let mut dropped_base = 0u64;
    for (base_row, subordinate_rows) in matches.iter().enumerate() {
        if subordinate_rows.is_empty() {
            if preserve_unmatched_base {
                joined.push((base_row, None));
            } else {
                dropped_base += 1;
            }
            continue;
        }
        joined.extend(subordinate_rows.iter().map(|&m| (base_row, Some(m))));
    }

    if unmatched > 0 {
        warn!(
            "Dropped {} subordinate rows with no matching {} record",
            unmatched, base_type
        );
    }
    summary.unmatched_subordinate_rows += unmatched;
    summary.dropped_base_rows += dropped_base;

    let base_rows: Vec<Option<usize>> = joined.iter().map(|&(base_row, _)| Some(base_row)).collect();
    let mut columns: Vec<(String, ColumnData)> = base
        .columns()
        .iter()
        .map(|(name, data)| (name.clone(), data.gather(&base_rows)))
        .collect();

    for (type_index, record_type) in subordinate_types.iter().enumerate() {
        let schema = tables.schema(record_type).unwrap_or_default();
        let rows: Vec<Option<usize>> = joined
            .iter()
            .map(|&(_, m)| m.filter(|&(t, _)| t == type_index).map(|(_, row)| row))
            .collect();

        for (name, column_type) in schema {
            if columns.iter().any(|(existing, _)| existing == name) {
                continue;
            }
            let data = match subordinates[type_index].and_then(|t| t.column(name)) {
                Some(source) => source.gather(&rows),
                None => ColumnData::new(*column_type).gather(&rows),
            };
            columns.push((name.clone(), data));
        }
    }

    debug!(
        "Rectangularized {} {} rows into {} rows",
        base.height(),
        base_type,
        joined.len()
    );

    Table::from_columns(RECTANGULAR_RECORD_TYPE, columns)
}

/// Normalized linking key of a row: trimmed, uppercased display values
fn link_key(table: &Table, linking_columns: &[String], row: usize) -> Vec<String> {
    linking_columns
        .iter()
        .map(|column| {
            table
                .value(column, row)
                .map(|value| normalize_key(&value))
                .unwrap_or_default()
        })
        .collect()
}

fn normalize_key(value: &Value) -> String {
    value.to_string().trim().to_uppercase()
}

/// Output schema of a rectangularized table set
pub fn rectangular_schema(tables: &TableSet) -> Vec<(String, ColumnType)> {
    let mut schema: Vec<(String, ColumnType)> = Vec::new();
    for record_type in tables.declared_types() {
        for (name, column_type) in tables.schema(record_type).unwrap_or_default() {
            if !schema.iter().any(|(existing, _)| existing == name) {
                schema.push((name.clone(), *column_type));
            }
        }
    }
    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codebook::tests::{hierarchical_codebook, hierarchical_lines, person_line};
    use crate::config::DecodeConfig;
    use crate::decoder::streaming::{FixedWidthRows, StreamingTableBuilder};

    fn table_set(lines: &[String], config: &DecodeConfig) -> (TableSet, DecodeSummary) {
        let codebook = hierarchical_codebook();
        let data = lines.join("\n");
        let rows = FixedWidthRows::new(&codebook, data.as_bytes(), config).unwrap();
        StreamingTableBuilder::new(rows, config)
            .read_table_set()
            .unwrap()
    }

    fn linking() -> Vec<String> {
        vec!["SERIAL".to_string()]
    }

    #[test]
    fn test_three_households_six_persons() {
        let (tables, mut summary) = table_set(&hierarchical_lines(), &DecodeConfig::default());

        let table = rectangularize(&tables, &linking(), false, &mut summary).unwrap();

        assert_eq!(table.height(), 6);
        assert_eq!(
            table.column_names(),
            vec![
                "RECTYPE", "YEAR", "SERIAL", "NUMPREC", "HHWT", "STATEFIP", "PERNUM", "PERWT",
                "AGE", "SEX"
            ]
        );
        assert_eq!(table.schema(), rectangular_schema(&tables));

        let serials: Vec<_> = (0..6).map(|r| table.value("SERIAL", r).unwrap()).collect();
        assert_eq!(
            serials,
            [1, 1, 2, 3, 3, 3].map(Value::Int).to_vec()
        );

        // Household attributes repeat across every person of the household
        for row in 3..6 {
            assert_eq!(table.value("HHWT", row), Some(Value::Float(150.75)));
            assert_eq!(table.value("STATEFIP", row), Some(Value::Int(27)));
        }
        assert_eq!(table.value("AGE", 5), Some(Value::Int(5)));
        assert_eq!(summary.unmatched_subordinate_rows, 0);
    }

    #[test]
    fn test_unmatched_subordinate_dropped() {
        let mut lines = hierarchical_lines();
        lines.push(person_line(99, 1, 100, 30, 1));
        let (tables, mut summary) = table_set(&lines, &DecodeConfig::default());

        let table = rectangularize(&tables, &linking(), false, &mut summary).unwrap();

        assert_eq!(table.height(), 6);
        assert_eq!(summary.unmatched_subordinate_rows, 1);
        assert!(summary.has_problems());
    }

    #[test]
    fn test_base_without_subordinates() {
        let mut lines = hierarchical_lines();
        lines.remove(4); // the single person of household 2
        let (tables, mut summary) = table_set(&lines, &DecodeConfig::default());

        let dropped = rectangularize(&tables, &linking(), false, &mut summary).unwrap();
        assert_eq!(dropped.height(), 5);
        assert_eq!(summary.dropped_base_rows, 1);

        let preserved = rectangularize(&tables, &linking(), true, &mut summary).unwrap();
        assert_eq!(preserved.height(), 6);
        assert_eq!(preserved.value("SERIAL", 2), Some(Value::Int(2)));
        assert_eq!(preserved.value("PERNUM", 2), Some(Value::Missing));
    }

    #[test]
    fn test_linking_column_must_be_retained() {
        let config = DecodeConfig::default().with_column_subset(["AGE", "NUMPREC"]);
        let (tables, mut summary) = table_set(&hierarchical_lines(), &config);

        assert!(matches!(
            rectangularize(&tables, &linking(), false, &mut summary),
            Err(MicrodataError::Configuration { .. })
        ));
        assert!(rectangularize(&tables, &[], false, &mut summary).is_err());
    }

    #[test]
    fn test_string_keys_are_normalized() {
        assert_eq!(normalize_key(&Value::Str(" ab12 ".to_string())), "AB12");
        assert_eq!(normalize_key(&Value::Int(7)), "7");
    }
}
