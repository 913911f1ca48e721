//! Type normalization of raw string tables.
//!
//! Declared [`CoercionRule`]s retype known columns (currency amounts, dates,
//! counts). Coercion is lossy-safe: a cell that fails to parse becomes null
//! and is tallied in the [`CoercionReport`] instead of aborting the run.
//! Columns without a rule are inferred from their values the same way a
//! schema probe would: integer if every present value is an integer, decimal
//! if every value is numeric, otherwise left as text.
//!
//! Rows are never reordered or dropped.

use log::{debug, warn};
use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::Serialize;

use crate::{
    data::{Value, parse_currency_decimal, parse_decimal_literal, parse_naive_date},
    schema::{ColumnType, TableRole, columns},
    table::Table,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// Strip `$`, thousands separators and whitespace, then parse as decimal.
    Currency,
    Date,
    Integer,
    Decimal,
}

impl Coercion {
    fn target_type(&self) -> ColumnType {
        match self {
            Coercion::Currency | Coercion::Decimal => ColumnType::Decimal,
            Coercion::Date => ColumnType::Date,
            Coercion::Integer => ColumnType::Integer,
        }
    }

    fn apply(&self, raw: &str) -> Option<Value> {
        match self {
            Coercion::Currency => parse_currency_decimal(raw).ok().map(Value::Decimal),
            Coercion::Decimal => parse_decimal_literal(raw).ok().map(Value::Decimal),
            Coercion::Date => parse_naive_date(raw).ok().map(Value::Date),
            Coercion::Integer => parse_integer(raw).map(Value::Integer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoercionRule {
    pub column: String,
    pub coercion: Coercion,
    /// Nulls left in a required column after coercion are logged.
    pub required: bool,
}

impl CoercionRule {
    pub fn new(column: &str, coercion: Coercion) -> Self {
        Self {
            column: column.to_string(),
            coercion,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Fixed coercion rules for each extract.
pub fn rules_for(role: TableRole) -> Vec<CoercionRule> {
    match role {
        TableRole::Sales => vec![
            CoercionRule::new(columns::ORDER_DATE, Coercion::Date).required(),
            CoercionRule::new(columns::DELIVERY_DATE, Coercion::Date),
            CoercionRule::new(columns::QUANTITY, Coercion::Integer).required(),
        ],
        TableRole::Products => vec![
            CoercionRule::new(columns::UNIT_COST_USD, Coercion::Currency).required(),
            CoercionRule::new(columns::UNIT_PRICE_USD, Coercion::Currency).required(),
        ],
        TableRole::Customers => vec![CoercionRule::new(columns::BIRTHDAY, Coercion::Date)],
        TableRole::Stores => vec![
            CoercionRule::new(columns::OPEN_DATE, Coercion::Date),
            CoercionRule::new(columns::SQUARE_METERS, Coercion::Decimal),
        ],
        TableRole::ExchangeRates => vec![
            CoercionRule::new(columns::DATE, Coercion::Date).required(),
            CoercionRule::new(columns::EXCHANGE, Coercion::Decimal).required(),
        ],
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoercionIssue {
    pub column: String,
    pub failures: usize,
    pub first_value: String,
}

/// Cells absorbed as null during coercion, one entry per affected column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoercionReport {
    issues: Vec<CoercionIssue>,
}

impl CoercionReport {
    pub fn issues(&self) -> &[CoercionIssue] {
        &self.issues
    }

    pub fn total_failures(&self) -> usize {
        self.issues.iter().map(|issue| issue.failures).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn failures_for(&self, column: &str) -> usize {
        self.issues
            .iter()
            .find(|issue| issue.column == column)
            .map(|issue| issue.failures)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub table: Table,
    pub report: CoercionReport,
}

pub fn normalize_table(raw: &Table, rules: &[CoercionRule]) -> Normalized {
    let mut table = raw.clone();
    let mut report = CoercionReport::default();
    let mut ruled = vec![false; raw.column_count()];

    for rule in rules {
        let Some(idx) = table.column_index(&rule.column) else {
            continue;
        };
        ruled[idx] = true;
        if table.columns()[idx].datatype == ColumnType::String {
            table = coerce_column(table, idx, rule, &mut report);
        }
        if rule.required {
            let nulls = table.column_values(idx).filter(Option::is_none).count();
            if nulls > 0 {
                warn!(
                    "{}: required column '{}' has {} null value(s)",
                    table.name(),
                    table.columns()[idx].name,
                    nulls
                );
            }
        }
    }

    for (idx, is_ruled) in ruled.into_iter().enumerate() {
        if is_ruled || table.columns()[idx].datatype != ColumnType::String {
            continue;
        }
        let inferred = infer_column_type(&table, idx);
        if inferred != ColumnType::String {
            table = table.map_column(idx, inferred, |cell| match cell {
                Some(Value::String(s)) => retype(&s, inferred),
                other => other,
            });
        }
    }

    Normalized { table, report }
}

fn coerce_column(
    table: Table,
    idx: usize,
    rule: &CoercionRule,
    report: &mut CoercionReport,
) -> Table {
    let mut failures = 0usize;
    let mut first_value: Option<String> = None;
    let table = table.map_column(idx, rule.coercion.target_type(), |cell| {
        let raw = match cell {
            Some(Value::String(s)) => s,
            other => return other,
        };
        let coerced = rule.coercion.apply(&raw);
        if coerced.is_none() {
            failures += 1;
            first_value.get_or_insert(raw);
        }
        coerced
    });
    if failures > 0 {
        let column = table.columns()[idx].name.clone();
        let first_value = first_value.unwrap_or_default();
        warn!(
            "{}: {} value(s) in '{}' could not be coerced to {} (first: '{}')",
            table.name(),
            failures,
            column,
            rule.coercion.target_type(),
            first_value
        );
        report.issues.push(CoercionIssue {
            column,
            failures,
            first_value,
        });
    }
    table
}

/// Replaces nulls in a numeric `column` with the median of its present values.
pub fn fill_missing_with_median(table: Table, column: &str) -> Table {
    let Some(idx) = table.column_index(column) else {
        return table;
    };
    if !table.columns()[idx].datatype.is_numeric() {
        return table;
    }
    let mut present = table
        .column_values(idx)
        .flatten()
        .filter_map(Value::as_decimal)
        .collect::<Vec<_>>();
    if present.is_empty() || present.len() == table.row_count() {
        return table;
    }
    present.sort();
    let mid = present.len() / 2;
    let median = if present.len().is_multiple_of(2) {
        let (low, high) = (present[mid - 1], present[mid]);
        low.checked_add(high)
            .map(|sum| sum / Decimal::TWO)
            .unwrap_or_else(|| low / Decimal::TWO + high / Decimal::TWO)
    } else {
        present[mid]
    };
    let filled = table.row_count() - present.len();
    debug!("Filled {filled} missing '{column}' value(s) with median {median}");
    table.map_column(idx, ColumnType::Decimal, |cell| {
        Some(Value::Decimal(
            cell.and_then(|v| v.as_decimal()).unwrap_or(median),
        ))
    })
}

fn parse_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    trimmed.parse::<i64>().ok().or_else(|| {
        parse_decimal_literal(trimmed)
            .ok()
            .filter(|d| d.fract().is_zero())
            .and_then(|d| d.to_i64())
    })
}

fn infer_column_type(table: &Table, idx: usize) -> ColumnType {
    let mut possible_integer = true;
    let mut possible_decimal = true;
    let mut seen_any = false;
    for value in table.column_values(idx).flatten() {
        let Value::String(s) = value else { continue };
        seen_any = true;
        let trimmed = s.trim();
        if possible_integer && trimmed.parse::<i64>().is_err() {
            possible_integer = false;
        }
        if possible_decimal && parse_decimal_literal(trimmed).is_err() {
            possible_decimal = false;
        }
        if !possible_integer && !possible_decimal {
            break;
        }
    }
    if !seen_any {
        ColumnType::String
    } else if possible_integer {
        ColumnType::Integer
    } else if possible_decimal {
        ColumnType::Decimal
    } else {
        ColumnType::String
    }
}

fn retype(raw: &str, datatype: ColumnType) -> Option<Value> {
    match datatype {
        ColumnType::Integer => raw.trim().parse().ok().map(Value::Integer),
        ColumnType::Decimal => parse_decimal_literal(raw).ok().map(Value::Decimal),
        _ => Some(Value::String(raw.to_string())),
    }
}
