//! Derived business metrics over the joined fact table.
//!
//! Every derived column is a pure function of source columns only (quantity,
//! unit prices, order/delivery dates, birthday), never of another derived
//! column, so running [`derive_features`] on its own output reproduces the
//! same values. A group of columns is skipped when its inputs are absent; a
//! null input or an overflowing product yields a null output for that row
//! only.

use chrono::{Datelike, NaiveDate, Weekday};
use log::{debug, info};
use rust_decimal::Decimal;

use crate::{
    data::Value,
    schema::{ColumnType, columns},
    table::Table,
};

const DAYS_PER_YEAR: f64 = 365.25;

/// Lower bound (inclusive) of each age bucket. A bucket ends where the next
/// one starts; the last bucket is unbounded above.
pub const AGE_GROUPS: &[(f64, &str)] = &[
    (0.0, "0-25"),
    (25.0, "26-35"),
    (35.0, "36-45"),
    (45.0, "46-55"),
    (55.0, "56-65"),
    (65.0, "65+"),
];

pub fn derive_features(table: &Table) -> anyhow::Result<Table> {
    let before = table.column_count();
    let mut derived = table.clone();
    derived = derive_financials(derived)?;
    derived = derive_calendar(derived)?;
    derived = derive_customer_age(derived)?;
    derived = derive_delivery_days(derived)?;
    info!(
        "Derived features for {} row(s); {} column(s) added",
        derived.row_count(),
        derived.column_count() - before
    );
    Ok(derived)
}

/// `quantity * unit_price`; `None` when the product overflows.
pub fn revenue(quantity: Decimal, unit_price: Decimal) -> Option<Decimal> {
    quantity.checked_mul(unit_price)
}

/// `profit / revenue * 100`; `None` when revenue is zero.
pub fn profit_margin(profit: Decimal, revenue: Decimal) -> Option<Decimal> {
    if revenue.is_zero() {
        return None;
    }
    profit
        .checked_div(revenue)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
}

pub fn customer_age(order_date: NaiveDate, birthday: NaiveDate) -> f64 {
    (order_date - birthday).num_days() as f64 / DAYS_PER_YEAR
}

/// Bucket label for an age in years; negative or non-finite ages have none.
pub fn age_group(age: f64) -> Option<&'static str> {
    if !age.is_finite() {
        return None;
    }
    AGE_GROUPS
        .iter()
        .rev()
        .find(|(lower, _)| age >= *lower)
        .map(|(_, label)| *label)
}

pub fn quarter(date: NaiveDate) -> u32 {
    (date.month() - 1) / 3 + 1
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn month_name(date: NaiveDate) -> String {
    date.format("%B").to_string()
}

fn derive_financials(table: Table) -> anyhow::Result<Table> {
    let (Some(qty), Some(price), Some(cost)) = (
        table.column_index(columns::QUANTITY),
        table.column_index(columns::UNIT_PRICE_USD),
        table.column_index(columns::UNIT_COST_USD),
    ) else {
        debug!("Skipping financial metrics: quantity or unit price columns missing");
        return Ok(table);
    };

    let decimal_at = |row: usize, col: usize| table.value(row, col).and_then(Value::as_decimal);
    let mut revenues = Vec::with_capacity(table.row_count());
    let mut costs = Vec::with_capacity(table.row_count());
    let mut profits = Vec::with_capacity(table.row_count());
    let mut margins = Vec::with_capacity(table.row_count());
    for row in 0..table.row_count() {
        let quantity = decimal_at(row, qty);
        let row_revenue = quantity
            .zip(decimal_at(row, price))
            .and_then(|(q, p)| revenue(q, p));
        let row_cost = quantity
            .zip(decimal_at(row, cost))
            .and_then(|(q, c)| q.checked_mul(c));
        let row_profit = row_revenue
            .zip(row_cost)
            .and_then(|(r, c)| r.checked_sub(c));
        let row_margin = row_profit
            .zip(row_revenue)
            .and_then(|(p, r)| profit_margin(p, r));
        revenues.push(row_revenue.map(Value::Decimal));
        costs.push(row_cost.map(Value::Decimal));
        profits.push(row_profit.map(Value::Decimal));
        margins.push(row_margin.map(Value::Decimal));
    }

    table
        .with_column(columns::REVENUE, ColumnType::Decimal, revenues)?
        .with_column(columns::COST, ColumnType::Decimal, costs)?
        .with_column(columns::PROFIT, ColumnType::Decimal, profits)?
        .with_column(columns::PROFIT_MARGIN, ColumnType::Decimal, margins)
}

fn derive_calendar(table: Table) -> anyhow::Result<Table> {
    let Some(order) = table.column_index(columns::ORDER_DATE) else {
        debug!("Skipping calendar features: no order date column");
        return Ok(table);
    };
    let dates = table
        .column_values(order)
        .map(|v| v.and_then(Value::as_date))
        .collect::<Vec<_>>();
    let int_column = |f: fn(NaiveDate) -> i64| {
        dates
            .iter()
            .map(|d| d.map(|d| Value::Integer(f(d))))
            .collect::<Vec<_>>()
    };
    let years = int_column(|d| i64::from(d.year()));
    let months = int_column(|d| i64::from(d.month()));
    let quarters = int_column(|d| i64::from(quarter(d)));
    let weeks = int_column(|d| i64::from(d.iso_week().week()));
    let weekdays = dates
        .iter()
        .map(|d| d.map(|d| Value::String(weekday_name(d.weekday()).to_string())))
        .collect();
    let month_names = dates
        .iter()
        .map(|d| d.map(|d| Value::String(month_name(d))))
        .collect();

    table
        .with_column(columns::YEAR, ColumnType::Integer, years)?
        .with_column(columns::MONTH, ColumnType::Integer, months)?
        .with_column(columns::QUARTER, ColumnType::Integer, quarters)?
        .with_column(columns::DAY_OF_WEEK, ColumnType::String, weekdays)?
        .with_column(columns::MONTH_NAME, ColumnType::String, month_names)?
        .with_column(columns::WEEK_OF_YEAR, ColumnType::Integer, weeks)
}

fn derive_customer_age(table: Table) -> anyhow::Result<Table> {
    let (Some(order_idx), Some(birthday_idx)) = (
        table.column_index(columns::ORDER_DATE),
        table.column_index(columns::BIRTHDAY),
    ) else {
        debug!("Skipping customer age: order date or birthday column missing");
        return Ok(table);
    };
    let ages = (0..table.row_count())
        .map(|row| {
            let order = table.value(row, order_idx).and_then(Value::as_date)?;
            let birthday = table.value(row, birthday_idx).and_then(Value::as_date)?;
            Some(customer_age(order, birthday))
        })
        .collect::<Vec<_>>();
    let groups = ages
        .iter()
        .map(|age| {
            age.and_then(age_group)
                .map(|label| Value::String(label.to_string()))
        })
        .collect();
    let ages = ages.into_iter().map(|age| age.map(Value::Float)).collect();

    table
        .with_column(columns::CUSTOMER_AGE, ColumnType::Float, ages)?
        .with_column(columns::AGE_GROUP, ColumnType::String, groups)
}

fn derive_delivery_days(table: Table) -> anyhow::Result<Table> {
    let (Some(order_idx), Some(delivery_idx)) = (
        table.column_index(columns::ORDER_DATE),
        table.column_index(columns::DELIVERY_DATE),
    ) else {
        debug!("Skipping delivery days: order or delivery date column missing");
        return Ok(table);
    };
    let days = (0..table.row_count())
        .map(|row| {
            let order = table.value(row, order_idx).and_then(Value::as_date)?;
            let delivered = table.value(row, delivery_idx).and_then(Value::as_date)?;
            Some(Value::Integer((delivered - order).num_days()))
        })
        .collect();
    table.with_column(columns::DELIVERY_DAYS, ColumnType::Integer, days)
}
