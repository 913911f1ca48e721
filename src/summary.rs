//! Headline KPIs and grouped revenue over the derived fact table.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use log::warn;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    data::Value,
    derive::profit_margin,
    schema::columns,
    table::Table,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesSummary {
    /// `None` when the column total does not fit in a `Decimal`.
    pub total_revenue: Option<Decimal>,
    pub total_profit: Option<Decimal>,
    /// Overall profit as a percentage of revenue; `None` without revenue.
    pub profit_margin: Option<Decimal>,
    pub orders: usize,
    pub customers: usize,
    pub average_order_value: Option<Decimal>,
    pub top_category: Option<String>,
    pub top_product: Option<String>,
}

/// Computes the summary; missing columns contribute zero or `None`.
pub fn summarize(fact: &Table) -> SalesSummary {
    let total_revenue = column_sum(fact, columns::REVENUE);
    let total_profit = column_sum(fact, columns::PROFIT);
    let orders = distinct_count(fact, columns::ORDER_NUMBER);
    let customers = distinct_count(fact, columns::CUSTOMER_KEY);
    let average_order_value = total_revenue
        .filter(|_| orders > 0)
        .and_then(|total| total.checked_div(Decimal::from(orders)));
    let top_label = |column: &str| {
        revenue_by(fact, column, 1)
            .into_iter()
            .next()
            .map(|(label, _)| label)
    };

    SalesSummary {
        total_revenue,
        total_profit,
        profit_margin: total_profit
            .zip(total_revenue)
            .and_then(|(profit, revenue)| profit_margin(profit, revenue)),
        orders,
        customers,
        average_order_value,
        top_category: top_label(columns::CATEGORY),
        top_product: top_label(columns::PRODUCT_NAME),
    }
}

/// Revenue grouped by the values of `column`, largest first with ties broken
/// by label. Rows with a null group or revenue are left out, as are groups
/// whose total overflows; `top == 0` keeps every group.
pub fn revenue_by(fact: &Table, column: &str, top: usize) -> Vec<(String, Decimal)> {
    let (Some(group_idx), Some(revenue_idx)) = (
        fact.column_index(column),
        fact.column_index(columns::REVENUE),
    ) else {
        return Vec::new();
    };
    let mut totals: HashMap<String, Option<Decimal>> = HashMap::new();
    for row in 0..fact.row_count() {
        let (Some(group), Some(amount)) = (
            fact.value(row, group_idx).map(Value::as_display),
            fact.value(row, revenue_idx).and_then(Value::as_decimal),
        ) else {
            continue;
        };
        let total = totals.entry(group).or_insert(Some(Decimal::ZERO));
        *total = total.and_then(|sum| sum.checked_add(amount));
    }
    let sorted = totals
        .into_iter()
        .filter_map(|(group, total)| match total {
            Some(total) => Some((group, total)),
            None => {
                warn!("Revenue total for '{column}' = '{group}' overflowed; group left out");
                None
            }
        })
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    if top > 0 {
        sorted.take(top).collect()
    } else {
        sorted.collect()
    }
}

fn column_sum(fact: &Table, column: &str) -> Option<Decimal> {
    let total = fact
        .values_of(column)
        .into_iter()
        .flatten()
        .filter_map(Value::as_decimal)
        .try_fold(Decimal::ZERO, |sum, value| sum.checked_add(value));
    if total.is_none() {
        warn!("Total of '{column}' overflowed");
    }
    total
}

fn distinct_count(fact: &Table, column: &str) -> usize {
    fact.values_of(column)
        .into_iter()
        .flatten()
        .map(Value::as_display)
        .collect::<HashSet<_>>()
        .len()
}
