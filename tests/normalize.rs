mod common;

use chrono::NaiveDate;
use common::{int, string_table, text};
use retail_etl::{
    data::Value,
    normalize::{fill_missing_with_median, normalize_table, rules_for},
    schema::{ColumnType, TableRole},
};
use rust_decimal::Decimal;
use std::str::FromStr;

#[test]
fn currency_cleaning_keeps_cents_and_nulls_garbage() {
    let raw = string_table(
        "Products",
        &["ProductKey", "Unit Cost USD", "Unit Price USD"],
        vec![
            vec![text("1"), text("$1,234.50"), text("$2,469.99 ")],
            vec![text("2"), text("invalid"), None],
        ],
    );
    let normalized = normalize_table(&raw, &rules_for(TableRole::Products));
    let table = &normalized.table;

    assert_eq!(
        table.value(0, 1),
        Some(&Value::Decimal(Decimal::from_str("1234.50").unwrap()))
    );
    assert_eq!(table.value(1, 1), None);
    assert_eq!(table.value(1, 2), None);
    assert_eq!(table.column_type("Unit Cost USD"), Some(ColumnType::Decimal));
    assert_eq!(table.column_type("ProductKey"), Some(ColumnType::Integer));

    // A blank cell is missing data, not a coercion failure.
    assert_eq!(normalized.report.total_failures(), 1);
    let issue = &normalized.report.issues()[0];
    assert_eq!(issue.column, "Unit Cost USD");
    assert_eq!(issue.first_value, "invalid");
}

#[test]
fn sales_dates_and_quantities_are_typed() {
    let raw = string_table(
        "Sales",
        &["Order Number", "Order Date", "Delivery Date", "Quantity"],
        vec![
            vec![text("366000"), text("1/1/2016"), None, text("3")],
            vec![text("366001"), text("2016-02-29"), text("not a date"), text("x")],
        ],
    );
    let normalized = normalize_table(&raw, &rules_for(TableRole::Sales));
    let table = &normalized.table;

    assert_eq!(
        table.value(0, 1),
        Some(&Value::Date(NaiveDate::from_ymd_opt(2016, 1, 1).unwrap()))
    );
    assert_eq!(
        table.value(1, 1),
        Some(&Value::Date(NaiveDate::from_ymd_opt(2016, 2, 29).unwrap()))
    );
    assert_eq!(table.value(0, 2), None);
    assert_eq!(table.value(1, 2), None);
    assert_eq!(table.value(0, 3), Some(&Value::Integer(3)));
    assert_eq!(table.value(1, 3), None);
    assert_eq!(normalized.report.failures_for("Delivery Date"), 1);
    assert_eq!(normalized.report.failures_for("Quantity"), 1);
    assert_eq!(table.row_count(), raw.row_count());
}

#[test]
fn untyped_columns_are_inferred() {
    let raw = string_table(
        "misc",
        &["Count", "Ratio", "Label"],
        vec![
            vec![text("1"), text("0.5"), text("a")],
            vec![text("2"), text("3"), text("7")],
        ],
    );
    let table = normalize_table(&raw, &[]).table;
    assert_eq!(table.column_type("Count"), Some(ColumnType::Integer));
    assert_eq!(table.column_type("Ratio"), Some(ColumnType::Decimal));
    assert_eq!(table.column_type("Label"), Some(ColumnType::String));
    assert_eq!(table.value(1, 0), Some(&Value::Integer(2)));
}

#[test]
fn normalization_does_not_touch_its_input() {
    let raw = string_table("Sales", &["Quantity"], vec![vec![text("4")]]);
    let before = raw.clone();
    let _ = normalize_table(&raw, &rules_for(TableRole::Sales));
    assert_eq!(raw, before);
}

#[test]
fn square_meters_nulls_take_the_median() {
    let raw = string_table(
        "Stores",
        &["StoreKey", "Square Meters"],
        vec![
            vec![text("1"), text("100")],
            vec![text("2"), None],
            vec![text("3"), text("300")],
            vec![text("4"), text("1000")],
        ],
    );
    let normalized = normalize_table(&raw, &rules_for(TableRole::Stores)).table;
    let filled = fill_missing_with_median(normalized, "Square Meters");
    assert_eq!(filled.value(1, 1), Some(&Value::Decimal(Decimal::from(300))));
    assert_eq!(filled.value(0, 1), Some(&Value::Decimal(Decimal::from(100))));
    assert_eq!(filled.value(0, 0), int(1).as_ref());
}

#[test]
fn median_fill_leaves_all_null_columns_alone() {
    let raw = string_table(
        "Stores",
        &["Square Meters"],
        vec![vec![None], vec![None]],
    );
    let normalized = normalize_table(&raw, &rules_for(TableRole::Stores)).table;
    let filled = fill_missing_with_median(normalized.clone(), "Square Meters");
    assert_eq!(filled, normalized);
}
