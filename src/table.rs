//! In-memory tables shared by every pipeline stage.
//!
//! A [`Table`] is an ordered sequence of rows with a declared column set.
//! Stages never mutate a table they were handed; they build a new one, usually
//! through [`Table::with_column`], which replaces a same-named column instead
//! of appending a duplicate.

use anyhow::{Result, ensure};

use crate::{
    data::{Value, canonical_column_name},
    schema::{ColumnMeta, ColumnType},
};

pub type Row = Vec<Option<Value>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<ColumnMeta>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnMeta>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(
        name: impl Into<String>,
        columns: Vec<ColumnMeta>,
        rows: Vec<Row>,
    ) -> Result<Self> {
        let mut table = Self::new(name, columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Looks a column up by canonical name (case and punctuation insensitive).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = canonical_column_name(name);
        self.columns
            .iter()
            .position(|c| canonical_column_name(&c.name) == wanted)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.column_index(name).map(|idx| self.columns[idx].datatype)
    }

    pub fn value(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column)).and_then(Option::as_ref)
    }

    /// Cells of one column in row order, nulls included.
    pub fn column_values(&self, column: usize) -> impl Iterator<Item = Option<&Value>> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(column).and_then(Option::as_ref))
    }

    /// Cells of a named column; empty when the column is absent.
    pub fn values_of<'a>(&'a self, name: &str) -> Vec<Option<&'a Value>> {
        match self.column_index(name) {
            Some(idx) => self.column_values(idx).collect(),
            None => Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Row) -> Result<()> {
        ensure!(
            row.len() == self.columns.len(),
            "Row has {} value(s) but table '{}' declares {} column(s)",
            row.len(),
            self.name,
            self.columns.len()
        );
        self.rows.push(row);
        Ok(())
    }

    /// Returns a table with `name` set to `values`, replacing an existing
    /// column of the same canonical name in place or appending a new one.
    pub fn with_column(
        mut self,
        name: &str,
        datatype: ColumnType,
        values: Vec<Option<Value>>,
    ) -> Result<Self> {
        ensure!(
            values.len() == self.rows.len(),
            "Column '{name}' has {} value(s) but table '{}' has {} row(s)",
            values.len(),
            self.name,
            self.rows.len()
        );
        match self.column_index(name) {
            Some(idx) => {
                self.columns[idx].datatype = datatype;
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(ColumnMeta::new(name, datatype));
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(self)
    }

    /// Returns a table whose column at `index` is rebuilt by `map`.
    pub fn map_column<F>(mut self, index: usize, datatype: ColumnType, mut map: F) -> Self
    where
        F: FnMut(Option<Value>) -> Option<Value>,
    {
        if index >= self.columns.len() {
            return self;
        }
        self.columns[index].datatype = datatype;
        for row in &mut self.rows {
            let current = row[index].take();
            row[index] = map(current);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            "sample",
            vec![
                ColumnMeta::new("Unit Price USD", ColumnType::Decimal),
                ColumnMeta::new("Name", ColumnType::String),
            ],
            vec![
                vec![Some(Value::Integer(1)), Some(Value::String("a".into()))],
                vec![None, Some(Value::String("b".into()))],
            ],
        )
        .unwrap()
    }

    #[test]
    fn column_lookup_is_canonical() {
        let table = sample();
        assert_eq!(table.column_index("UnitPriceUSD"), Some(0));
        assert_eq!(table.column_index("unit_price_usd"), Some(0));
        assert_eq!(table.column_index("Missing"), None);
    }

    #[test]
    fn with_column_replaces_existing_column() {
        let table = sample()
            .with_column(
                "name",
                ColumnType::Integer,
                vec![Some(Value::Integer(7)), None],
            )
            .unwrap();
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.value(0, 1), Some(&Value::Integer(7)));
        assert_eq!(table.column_type("Name"), Some(ColumnType::Integer));
    }

    #[test]
    fn push_row_rejects_ragged_rows() {
        let mut table = sample();
        assert!(table.push_row(vec![None]).is_err());
        assert!(
            table
                .clone()
                .with_column("Extra", ColumnType::String, vec![None])
                .is_err()
        );
    }
}
