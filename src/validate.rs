//! Structural and business-rule validation of a pipeline run.
//!
//! Every rule runs independently and is always reported, even when an
//! earlier rule failed or its inputs are missing. Nothing here returns an
//! error: whether a failed report blocks downstream use is the caller's call.

use std::collections::HashSet;

use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    data::Value,
    join::join_key,
    schema::{TableRole, columns},
    table::Table,
};

/// Inclusive bounds for plausible order dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleOutcome {
    pub rule: String,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    outcomes: Vec<RuleOutcome>,
}

impl ValidationReport {
    fn record(&mut self, rule: impl Into<String>, passed: bool, detail: impl Into<String>) {
        self.outcomes.push(RuleOutcome {
            rule: rule.into(),
            passed,
            detail: detail.into(),
        });
    }

    pub fn outcomes(&self) -> &[RuleOutcome] {
        &self.outcomes
    }

    /// Pass/fail of a named rule, `None` if the rule was not evaluated.
    pub fn get(&self, rule: &str) -> Option<bool> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.rule == rule)
            .map(|outcome| outcome.passed)
    }

    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.passed)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Normalized source tables plus, when available, the joined fact table.
#[derive(Debug, Clone, Copy)]
pub struct ValidationInput<'a> {
    pub sales: &'a Table,
    pub products: &'a Table,
    pub customers: &'a Table,
    pub stores: &'a Table,
    pub joined: Option<&'a Table>,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationOptions {
    pub order_date_range: DateRange,
}

pub fn validate(input: &ValidationInput<'_>, options: &ValidationOptions) -> ValidationReport {
    let mut report = ValidationReport::default();
    let roles = [
        (TableRole::Sales, input.sales),
        (TableRole::Products, input.products),
        (TableRole::Customers, input.customers),
        (TableRole::Stores, input.stores),
    ];

    for (role, table) in roles {
        check_required_columns(&mut report, role, table);
    }
    for (role, table) in &roles[1..] {
        check_unique_key(&mut report, *role, table);
    }
    check_non_negative_prices(&mut report, input.products);
    check_missing_prices(&mut report, input.products);
    check_order_dates(&mut report, input.sales, &options.order_date_range);
    for (role, table) in &roles[1..] {
        check_referential(&mut report, *role, input.sales, table);
    }
    if let Some(joined) = input.joined {
        let passed = joined.row_count() == input.sales.row_count();
        report.record(
            "Join preserved row count",
            passed,
            format!(
                "{} sales row(s), {} joined row(s)",
                input.sales.row_count(),
                joined.row_count()
            ),
        );
    }

    let failed = report.failures().count();
    if failed > 0 {
        for outcome in report.failures() {
            warn!("Validation failed: {} ({})", outcome.rule, outcome.detail);
        }
    }
    info!(
        "Validation: {} rule(s) passed, {} failed",
        report.len() - failed,
        failed
    );
    report
}

fn check_required_columns(report: &mut ValidationReport, role: TableRole, table: &Table) {
    let missing = role
        .required_columns()
        .iter()
        .filter(|column| !table.has_column(column))
        .copied()
        .collect::<Vec<_>>();
    let detail = if missing.is_empty() {
        format!("{} required column(s) present", role.required_columns().len())
    } else {
        format!("missing: {}", missing.join(", "))
    };
    report.record(
        format!("{} has required columns", role.label()),
        missing.is_empty(),
        detail,
    );
}

fn check_unique_key(report: &mut ValidationReport, role: TableRole, table: &Table) {
    let Some(key) = role.key_column() else {
        return;
    };
    let rule = format!("No duplicate {key}s");
    let Some(idx) = table.column_index(key) else {
        report.record(rule, false, format!("no '{key}' column"));
        return;
    };
    let mut seen = HashSet::new();
    let duplicates = table
        .column_values(idx)
        .flatten()
        .filter(|value| !seen.insert(join_key(value)))
        .count();
    report.record(
        rule,
        duplicates == 0,
        format!("{duplicates} duplicated row(s)"),
    );
}

fn check_non_negative_prices(report: &mut ValidationReport, products: &Table) {
    const RULE: &str = "No negative prices";
    let price_columns = [columns::UNIT_COST_USD, columns::UNIT_PRICE_USD];
    if price_columns.iter().any(|c| !products.has_column(c)) {
        report.record(RULE, false, "price columns missing");
        return;
    }
    let negatives = price_columns
        .iter()
        .flat_map(|column| products.values_of(column))
        .flatten()
        .filter(|value| value.as_decimal().is_some_and(|d| d.is_sign_negative() && !d.is_zero()))
        .count();
    report.record(
        RULE,
        negatives == 0,
        format!("{negatives} negative value(s)"),
    );
}

fn check_missing_prices(report: &mut ValidationReport, products: &Table) {
    const RULE: &str = "No missing prices";
    let price_columns = [columns::UNIT_COST_USD, columns::UNIT_PRICE_USD];
    if price_columns.iter().any(|c| !products.has_column(c)) {
        report.record(RULE, false, "price columns missing");
        return;
    }
    let missing = price_columns
        .iter()
        .flat_map(|column| products.values_of(column))
        .filter(Option::is_none)
        .count();
    report.record(RULE, missing == 0, format!("{missing} null price(s)"));
}

fn check_order_dates(report: &mut ValidationReport, sales: &Table, range: &DateRange) {
    const RULE: &str = "Reasonable date range";
    let Some(idx) = sales.column_index(columns::ORDER_DATE) else {
        report.record(RULE, false, "no order date column");
        return;
    };
    let dates = sales
        .column_values(idx)
        .flatten()
        .filter_map(Value::as_date)
        .collect::<Vec<_>>();
    let outside = dates.iter().filter(|date| !range.contains(**date)).count();
    let detail = match (dates.iter().min(), dates.iter().max()) {
        (Some(min), Some(max)) => format!(
            "{min} to {max}; {outside} outside {} to {}",
            range.start, range.end
        ),
        _ => "no order dates present".to_string(),
    };
    report.record(RULE, outside == 0, detail);
}

fn check_referential(
    report: &mut ValidationReport,
    role: TableRole,
    sales: &Table,
    dimension: &Table,
) {
    let Some(key) = role.key_column() else {
        return;
    };
    let rule = format!("All {key}s matched");
    let (Some(fact_idx), Some(dim_idx)) = (sales.column_index(key), dimension.column_index(key))
    else {
        report.record(rule, false, format!("'{key}' missing from sales or {role}"));
        return;
    };
    let known = dimension
        .column_values(dim_idx)
        .flatten()
        .map(join_key)
        .collect::<HashSet<_>>();
    let orphans = sales
        .column_values(fact_idx)
        .flatten()
        .filter(|value| !known.contains(&join_key(value)))
        .count();
    report.record(
        rule,
        orphans == 0,
        format!("{orphans} sales row(s) without a matching {}", role.suffix()),
    );
}
