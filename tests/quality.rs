mod common;

use chrono::NaiveDate;
use common::{int, text, typed_table};
use retail_etl::{data::Value, quality::quality_report, schema::ColumnType};

#[test]
fn report_covers_shape_nulls_duplicates_and_types() {
    let when = Some(Value::Date(NaiveDate::from_ymd_opt(2016, 1, 1).unwrap()));
    let table = typed_table(
        "Stores",
        &[
            ("StoreKey", ColumnType::Integer),
            ("Country", ColumnType::String),
            ("Square Meters", ColumnType::Decimal),
            ("Open Date", ColumnType::Date),
        ],
        vec![
            vec![int(1), text("Canada"), None, when.clone()],
            vec![int(1), text("Canada"), None, when.clone()],
            vec![int(2), None, None, when],
        ],
    );
    let before = table.clone();
    let report = quality_report(&table);

    assert_eq!(report.dataset, "Stores");
    assert_eq!((report.rows, report.columns), (3, 4));
    assert_eq!(report.missing_values, 4);
    assert_eq!(report.duplicate_rows, 1);
    assert_eq!(report.numeric_columns, 2);
    assert_eq!(report.categorical_columns, 1);
    assert_eq!(report.datetime_columns, 1);
    assert_eq!(report.data_types.get("decimal"), Some(&1));
    assert!(report.memory_mb() > 0.0);
    assert_eq!(table, before);
}

#[test]
fn empty_table_reports_zeroes() {
    let table = typed_table("empty", &[("a", ColumnType::String)], vec![]);
    let report = quality_report(&table);
    assert_eq!(report.rows, 0);
    assert_eq!(report.missing_values, 0);
    assert_eq!(report.duplicate_rows, 0);
    assert_eq!(report.columns, 1);
}
