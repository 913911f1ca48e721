mod common;

use common::{int, string_table, text, typed_table};
use proptest::prelude::*;
use retail_etl::{
    data::Value,
    join::{DimensionJoin, JOINED_TABLE_NAME, join_fact, plan_columns},
    schema::{ColumnType, TableRole},
    table::Table,
};

fn products() -> Table {
    typed_table(
        "Products",
        &[
            ("ProductKey", ColumnType::Integer),
            ("Product Name", ColumnType::String),
            ("Category", ColumnType::String),
        ],
        vec![
            vec![int(1), text("Lens"), text("Cameras")],
            vec![int(2), text("Phone"), text("Cell phones")],
        ],
    )
}

fn customers() -> Table {
    typed_table(
        "Customers",
        &[
            ("CustomerKey", ColumnType::Integer),
            ("Name", ColumnType::String),
            ("State", ColumnType::String),
            ("Country", ColumnType::String),
        ],
        vec![
            vec![int(10), text("Ryan"), text("Ontario"), text("Canada")],
            vec![int(11), text("Amanda"), text("Kansas"), text("United States")],
        ],
    )
}

fn stores() -> Table {
    typed_table(
        "Stores",
        &[
            ("StoreKey", ColumnType::Integer),
            ("State", ColumnType::String),
            ("Country", ColumnType::String),
        ],
        vec![
            vec![int(0), text("Online"), text("Online")],
            vec![int(5), text("Bavaria"), text("Germany")],
        ],
    )
}

fn sales(rows: Vec<Vec<Option<Value>>>) -> Table {
    typed_table(
        "Sales",
        &[
            ("Order Number", ColumnType::Integer),
            ("ProductKey", ColumnType::Integer),
            ("CustomerKey", ColumnType::Integer),
            ("StoreKey", ColumnType::Integer),
        ],
        rows,
    )
}

fn star<'a>(products: &'a Table, customers: &'a Table, stores: &'a Table) -> Vec<DimensionJoin<'a>> {
    vec![
        DimensionJoin::for_role(TableRole::Products, products).unwrap(),
        DimensionJoin::for_role(TableRole::Customers, customers).unwrap(),
        DimensionJoin::for_role(TableRole::Stores, stores).unwrap(),
    ]
}

#[test]
fn star_join_appends_attributes_with_role_suffixes() {
    let (p, c, s) = (products(), customers(), stores());
    let fact = sales(vec![vec![int(100), int(2), int(11), int(5)]]);
    let outcome = join_fact(&fact, &star(&p, &c, &s)).unwrap();
    let table = &outcome.table;

    assert_eq!(table.name(), JOINED_TABLE_NAME);
    assert_eq!(
        table.headers(),
        vec![
            "Order Number",
            "ProductKey",
            "CustomerKey",
            "StoreKey",
            "Product Name",
            "Category",
            "Name",
            "State (customer)",
            "Country (customer)",
            "State (store)",
            "Country (store)",
        ]
    );
    let at = |name: &str| table.value(0, table.column_index(name).unwrap()).cloned();
    assert_eq!(at("Category"), text("Cell phones"));
    assert_eq!(at("Country (customer)"), text("United States"));
    assert_eq!(at("Country (store)"), text("Germany"));

    let renames = outcome.plan.renames();
    assert!(renames.contains(&("State".to_string(), "State (store)".to_string())));
    assert_eq!(renames.len(), 4);
}

#[test]
fn plan_is_deterministic() {
    let (p, c, s) = (products(), customers(), stores());
    let fact = sales(vec![]);
    assert_eq!(
        plan_columns(&fact, &star(&p, &c, &s)),
        plan_columns(&fact, &star(&p, &c, &s))
    );
}

#[test]
fn unmatched_and_null_keys_keep_the_row_with_null_attributes() {
    let (p, c, s) = (products(), customers(), stores());
    let fact = sales(vec![
        vec![int(100), int(99), int(10), int(0)],
        vec![int(101), None, int(10), int(0)],
    ]);
    let outcome = join_fact(&fact, &star(&p, &c, &s)).unwrap();
    let table = &outcome.table;
    assert_eq!(table.row_count(), 2);
    let category = table.column_index("Category").unwrap();
    assert_eq!(table.value(0, category), None);
    assert_eq!(table.value(1, category), None);
    assert_eq!(outcome.stats[0].role, "Products");
    assert_eq!(outcome.stats[0].unmatched_rows, 2);
    assert_eq!(outcome.stats[1].matched_rows, 2);
}

#[test]
fn duplicate_dimension_keys_fan_rows_out() {
    let duplicated = string_table(
        "Products",
        &["ProductKey", "Category"],
        vec![vec![text("1"), text("Cameras")], vec![text("1"), text("Audio")]],
    );
    let fact = sales(vec![vec![int(100), int(1), int(10), int(0)]]);
    let dims = [DimensionJoin::for_role(TableRole::Products, &duplicated).unwrap()];
    let outcome = join_fact(&fact, &dims).unwrap();
    assert_eq!(outcome.table.row_count(), 2);
    assert_eq!(outcome.stats[0].duplicate_keys, 1);
}

#[test]
fn later_dimensions_count_fanned_out_rows() {
    let duplicated = string_table(
        "Products",
        &["ProductKey", "Category"],
        vec![vec![text("1"), text("Cameras")], vec![text("1"), text("Audio")]],
    );
    let c = customers();
    let fact = sales(vec![
        vec![int(100), int(1), int(10), int(0)],
        vec![int(101), int(2), int(99), int(0)],
    ]);
    let dims = [
        DimensionJoin::for_role(TableRole::Products, &duplicated).unwrap(),
        DimensionJoin::for_role(TableRole::Customers, &c).unwrap(),
    ];
    let outcome = join_fact(&fact, &dims).unwrap();
    assert_eq!(outcome.table.row_count(), 3);
    let counts = outcome
        .stats
        .iter()
        .map(|s| (s.role.as_str(), s.matched_rows, s.unmatched_rows))
        .collect::<Vec<_>>();
    assert_eq!(counts, vec![("Products", 1, 1), ("Customers", 2, 1)]);
}

#[test]
fn fact_without_key_column_still_joins() {
    let (p, c, s) = (products(), customers(), stores());
    let fact = typed_table(
        "Sales",
        &[("Order Number", ColumnType::Integer)],
        vec![vec![int(1)]],
    );
    let outcome = join_fact(&fact, &star(&p, &c, &s)).unwrap();
    assert_eq!(outcome.table.row_count(), 1);
    assert!(outcome.table.rows()[0][1..].iter().all(Option::is_none));
}

proptest! {
    #[test]
    fn join_preserves_fact_cardinality_with_unique_keys(
        keys in prop::collection::vec(
            (prop::option::of(0i64..6), prop::option::of(9i64..13), prop::option::of(-1i64..7)),
            0..40,
        )
    ) {
        let (p, c, s) = (products(), customers(), stores());
        let rows = keys
            .iter()
            .enumerate()
            .map(|(idx, (product, customer, store))| {
                vec![
                    int(idx as i64),
                    product.map(Value::Integer),
                    customer.map(Value::Integer),
                    store.map(Value::Integer),
                ]
            })
            .collect::<Vec<_>>();
        let fact = sales(rows);
        let outcome = join_fact(&fact, &star(&p, &c, &s)).unwrap();
        prop_assert_eq!(outcome.table.row_count(), fact.row_count());
        for (row, original) in outcome.table.rows().iter().zip(fact.rows()) {
            prop_assert_eq!(&row[..4], &original[..]);
        }
        for stats in &outcome.stats {
            prop_assert_eq!(stats.matched_rows + stats.unmatched_rows, fact.row_count());
        }
    }
}
