//! Data quality summaries for any table, raw or derived.

use std::{collections::BTreeMap, collections::HashSet, mem};

use serde::Serialize;

use crate::{data::Value, table::Table};

const ROW_KEY_SEPARATOR: char = '\u{1f}';
const NULL_MARKER: &str = "\u{0}";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityReport {
    pub dataset: String,
    pub rows: usize,
    pub columns: usize,
    pub missing_values: usize,
    pub duplicate_rows: usize,
    /// Column count per declared semantic type.
    pub data_types: BTreeMap<String, usize>,
    pub numeric_columns: usize,
    pub categorical_columns: usize,
    pub datetime_columns: usize,
    pub memory_bytes: usize,
}

impl QualityReport {
    pub fn memory_mb(&self) -> f64 {
        self.memory_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Summarizes `table` without modifying it.
pub fn quality_report(table: &Table) -> QualityReport {
    let mut data_types: BTreeMap<String, usize> = BTreeMap::new();
    let (mut numeric, mut categorical, mut datetime) = (0usize, 0usize, 0usize);
    for column in table.columns() {
        *data_types
            .entry(column.datatype.as_str().to_string())
            .or_default() += 1;
        if column.datatype.is_numeric() {
            numeric += 1;
        } else if column.datatype.is_temporal() {
            datetime += 1;
        } else if column.datatype.is_categorical() {
            categorical += 1;
        }
    }

    let mut missing_values = 0usize;
    let mut duplicate_rows = 0usize;
    let mut heap_bytes = 0usize;
    let mut seen: HashSet<String> = HashSet::with_capacity(table.row_count());
    for row in table.rows() {
        let mut key = String::new();
        for (idx, cell) in row.iter().enumerate() {
            if idx > 0 {
                key.push(ROW_KEY_SEPARATOR);
            }
            match cell {
                Some(value) => {
                    heap_bytes += value.estimated_size();
                    key.push_str(&value.as_display());
                }
                None => {
                    missing_values += 1;
                    key.push_str(NULL_MARKER);
                }
            }
        }
        if !seen.insert(key) {
            duplicate_rows += 1;
        }
    }

    let header_bytes = table
        .columns()
        .iter()
        .map(|c| c.name.len() + mem::size_of_val(c))
        .sum::<usize>();
    let cell_bytes = table.row_count() * table.column_count() * mem::size_of::<Option<Value>>();

    QualityReport {
        dataset: table.name().to_string(),
        rows: table.row_count(),
        columns: table.column_count(),
        missing_values,
        duplicate_rows,
        data_types,
        numeric_columns: numeric,
        categorical_columns: categorical,
        datetime_columns: datetime,
        memory_bytes: header_bytes + cell_bytes + heap_bytes,
    }
}
