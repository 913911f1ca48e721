//! Left-outer star join of the sales fact table with its dimensions.
//!
//! Dimensions are joined in a fixed order (products, customers, stores), each
//! against the growing intermediate result. Output columns are decided up
//! front by [`plan_columns`]: every non-key dimension column whose canonical
//! name appears in more than one source is suffixed with its role, e.g.
//! `Country (customer)` and `Country (store)`. Fact columns keep their names.
//!
//! An unmatched or null foreign key yields null dimension attributes. A key
//! that matches several dimension rows fans the fact row out; the output is
//! then larger than the fact table, which the validator reports.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use log::{info, warn};
use serde::Serialize;

use crate::{
    data::{Value, canonical_column_name},
    schema::{ColumnMeta, ColumnType, TableRole},
    table::{Row, Table},
};

pub const JOINED_TABLE_NAME: &str = "Sales Analysis";

#[derive(Debug, Clone, Copy)]
pub struct DimensionJoin<'a> {
    pub role: TableRole,
    pub key: &'a str,
    pub table: &'a Table,
}

impl<'a> DimensionJoin<'a> {
    /// Joins on the role's declared key column.
    pub fn for_role(role: TableRole, table: &'a Table) -> Option<Self> {
        role.key_column().map(|key| Self { role, key, table })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSource {
    Fact,
    Dimension(TableRole),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedColumn {
    pub source: ColumnSource,
    /// Position in the source table.
    pub index: usize,
    pub source_name: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinPlan {
    pub columns: Vec<PlannedColumn>,
}

impl JoinPlan {
    /// `(source header, output name)` for every column renamed to avoid a collision.
    pub fn renames(&self) -> Vec<(String, String)> {
        self.columns
            .iter()
            .filter(|c| c.name != c.source_name)
            .map(|c| (c.source_name.clone(), c.name.clone()))
            .collect()
    }
}

/// Match counts for one dimension. Dimensions are joined in order, so the
/// counts are over the rows entering that step: after an earlier dimension
/// fans rows out, `matched_rows + unmatched_rows` exceeds the fact row count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinStats {
    pub role: String,
    pub matched_rows: usize,
    pub unmatched_rows: usize,
    /// Dimension key values that occur on more than one dimension row.
    pub duplicate_keys: usize,
}

#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub table: Table,
    pub plan: JoinPlan,
    pub stats: Vec<JoinStats>,
}

/// Decides the output column set and names of the star join.
pub fn plan_columns(fact: &Table, dimensions: &[DimensionJoin<'_>]) -> JoinPlan {
    let mut occurrences: HashMap<String, usize> = HashMap::new();
    for column in fact.columns() {
        *occurrences
            .entry(canonical_column_name(&column.name))
            .or_default() += 1;
    }
    for dimension in dimensions {
        for (_, column) in attribute_columns(dimension) {
            *occurrences
                .entry(canonical_column_name(&column.name))
                .or_default() += 1;
        }
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut columns = Vec::new();
    for (index, column) in fact.columns().iter().enumerate() {
        seen.insert(canonical_column_name(&column.name));
        columns.push(PlannedColumn {
            source: ColumnSource::Fact,
            index,
            source_name: column.name.clone(),
            name: column.name.clone(),
        });
    }
    for dimension in dimensions {
        for (index, column) in attribute_columns(dimension) {
            let canonical = canonical_column_name(&column.name);
            let mut candidate = if occurrences.get(&canonical).copied().unwrap_or(0) > 1 {
                format!("{} ({})", column.name, dimension.role.suffix())
            } else {
                column.name.clone()
            };
            let base = candidate.clone();
            let mut counter = 2usize;
            while seen.contains(&canonical_column_name(&candidate)) {
                candidate = format!("{base} {counter}");
                counter += 1;
            }
            seen.insert(canonical_column_name(&candidate));
            columns.push(PlannedColumn {
                source: ColumnSource::Dimension(dimension.role),
                index,
                source_name: column.name.clone(),
                name: candidate,
            });
        }
    }
    JoinPlan { columns }
}

pub fn join_fact(fact: &Table, dimensions: &[DimensionJoin<'_>]) -> Result<JoinOutcome> {
    let plan = plan_columns(fact, dimensions);
    let mut rows: Vec<Row> = fact.rows().to_vec();
    let mut stats = Vec::with_capacity(dimensions.len());

    for dimension in dimensions {
        let attributes = attribute_columns(dimension)
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();
        let fact_key = fact.column_index(dimension.key);
        if fact_key.is_none() {
            warn!(
                "{} has no '{}' column; {} attributes will be null",
                fact.name(),
                dimension.key,
                dimension.role
            );
        }
        let (lookup, duplicate_keys) = build_lookup(dimension);
        if duplicate_keys > 0 {
            warn!(
                "{} has {} duplicated '{}' value(s); matching fact rows will fan out",
                dimension.role, duplicate_keys, dimension.key
            );
        }

        let mut joined = Vec::with_capacity(rows.len());
        let mut matched_rows = 0usize;
        let mut unmatched_rows = 0usize;
        for row in rows {
            let key = fact_key
                .and_then(|idx| row.get(idx))
                .and_then(Option::as_ref)
                .map(join_key);
            let matches = key.as_ref().and_then(|k| lookup.get(k));
            match matches {
                Some(bucket) => {
                    matched_rows += 1;
                    for dim_row in bucket {
                        let mut combined = row.clone();
                        combined.extend(
                            attributes
                                .iter()
                                .map(|idx| dimension.table.rows()[*dim_row][*idx].clone()),
                        );
                        joined.push(combined);
                    }
                }
                None => {
                    unmatched_rows += 1;
                    let mut combined = row;
                    combined.extend(attributes.iter().map(|_| None));
                    joined.push(combined);
                }
            }
        }
        rows = joined;
        stats.push(JoinStats {
            role: dimension.role.label().to_string(),
            matched_rows,
            unmatched_rows,
            duplicate_keys,
        });
    }

    let columns = plan
        .columns
        .iter()
        .map(|planned| {
            let datatype = match &planned.source {
                ColumnSource::Fact => fact.columns()[planned.index].datatype,
                ColumnSource::Dimension(role) => dimensions
                    .iter()
                    .find(|d| d.role == *role)
                    .map(|d| d.table.columns()[planned.index].datatype)
                    .unwrap_or(ColumnType::String),
            };
            ColumnMeta::new(planned.name.clone(), datatype)
        })
        .collect::<Vec<_>>();
    let table = Table::from_rows(JOINED_TABLE_NAME, columns, rows)?;
    let matched = stats
        .iter()
        .map(|s| format!("{} {}/{}", s.role, s.matched_rows, s.matched_rows + s.unmatched_rows))
        .collect::<Vec<_>>()
        .join(", ");
    info!(
        "Joined {} fact row(s) into {} row(s) x {} column(s); matched {}",
        fact.row_count(),
        table.row_count(),
        table.column_count(),
        if matched.is_empty() { "-" } else { matched.as_str() }
    );
    Ok(JoinOutcome { table, plan, stats })
}

/// Key used to match fact and dimension rows regardless of numeric storage.
pub fn join_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.as_display(),
    }
}

fn attribute_columns<'a>(
    dimension: &'a DimensionJoin<'_>,
) -> impl Iterator<Item = (usize, &'a ColumnMeta)> + 'a {
    let key = canonical_column_name(dimension.key);
    dimension
        .table
        .columns()
        .iter()
        .enumerate()
        .filter(move |(_, column)| canonical_column_name(&column.name) != key)
}

fn build_lookup(dimension: &DimensionJoin<'_>) -> (HashMap<String, Vec<usize>>, usize) {
    let mut lookup: HashMap<String, Vec<usize>> = HashMap::new();
    let Some(key_idx) = dimension.table.column_index(dimension.key) else {
        warn!(
            "{} has no '{}' column; no fact rows will match",
            dimension.role, dimension.key
        );
        return (lookup, 0);
    };
    for (row_idx, value) in dimension.table.column_values(key_idx).enumerate() {
        if let Some(value) = value {
            lookup.entry(join_key(value)).or_default().push(row_idx);
        }
    }
    let duplicates = lookup.values().filter(|rows| rows.len() > 1).count();
    (lookup, duplicates)
}
