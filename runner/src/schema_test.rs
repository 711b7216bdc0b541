use super::*;
use itertools::Itertools;
use crate::{
    config::GenerateConfig,
    database::sqlite::SQLiteConnection,
    generate::{self, RowGenerator},
};

fn populated(rows: i64) -> SQLiteConnection {
    let mut db = SQLiteConnection::open_in_memory().unwrap();
    create_table(&mut db).unwrap();

    let mut generator = RowGenerator::new(7);
    let rows = (1..=rows).map(|id| generator.row(id)).collect::<Vec<_>>();
    db.insert_rows(&rows).unwrap();

    db
}

fn index_names() -> Vec<String> {
    INDEXES
        .iter()
        .map(|index| index.name.to_owned())
        .sorted()
        .collect()
}

#[test]
pub fn drop_missing_indexes_only_warns() {
    let mut db = populated(10);

    assert_eq!(drop_indexes(&mut db).len(), INDEXES.len());
    assert_eq!(drop_indexes(&mut db).len(), INDEXES.len());
    assert!(db.indexes(TABLE).unwrap().is_empty());
}

#[test]
pub fn drop_after_setup_removes_everything() {
    let mut db = populated(10);
    setup_indexes(&mut db).unwrap();

    assert!(drop_indexes(&mut db).is_empty());
    assert!(db.indexes(TABLE).unwrap().is_empty());
    assert_eq!(drop_indexes(&mut db).len(), INDEXES.len());
}

#[test]
pub fn setup_indexes_is_idempotent() {
    let mut db = populated(10);

    setup_indexes(&mut db).unwrap();
    let first = db.indexes(TABLE).unwrap();
    setup_indexes(&mut db).unwrap();
    let second = db.indexes(TABLE).unwrap();

    assert_eq!(first, index_names());
    assert_eq!(first, second);
}

#[test]
pub fn setup_indexes_without_table_fails() {
    let mut db = SQLiteConnection::open_in_memory().unwrap();

    match setup_indexes(&mut db) {
        Err(SchemaError::CreateIndex { index, .. }) => assert_eq!(index, "idx_q1_composite"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
pub fn optimize_schema_twice_keeps_one_derived_column() {
    let mut db = populated(25);

    optimize_schema(&mut db).unwrap();
    optimize_schema(&mut db).unwrap();

    let columns = db.columns(TABLE).unwrap();
    assert_eq!(
        columns
            .iter()
            .filter(|column| column.as_str() == DERIVED_COLUMN)
            .count(),
        1
    );
    assert_eq!(columns.len(), crate::table::COLUMNS.len() + 1);
}

#[test]
pub fn optimize_schema_stores_price_times_rating() {
    let mut db = populated(25);

    optimize_schema(&mut db).unwrap();

    let mismatched = db
        .query_scalar(
            "select count(*) from test_data
             where price_rating_cache is null
                or abs(price_rating_cache - price * rating) > 0.000001",
        )
        .unwrap();
    assert_eq!(mismatched, 0);
}

const MISMATCHED_DERIVED: &str = "select count(*) from test_data
     where price_rating_cache is null
        or abs(price_rating_cache - price * rating) > 0.000001";

#[test]
pub fn rows_loaded_after_optimization_get_derived_value() {
    let mut db = populated(10);
    optimize_schema(&mut db).unwrap();
    setup_indexes(&mut db).unwrap();

    generate::load(
        &mut db,
        &GenerateConfig {
            total_rows: 50,
            batch_size: 20,
            seed: 9,
        },
    )
    .unwrap();

    assert_eq!(db.query_scalar("select count(*) from test_data").unwrap(), 50);
    assert_eq!(db.query_scalar(MISMATCHED_DERIVED).unwrap(), 0);
}

#[test]
pub fn derived_value_follows_single_writes() {
    let mut db = populated(5);
    optimize_schema(&mut db).unwrap();

    let mut generator = RowGenerator::new(13);
    db.insert_rows(&[generator.row(6)]).unwrap();
    db.execute("update test_data set price = price + 1, rating = 2.5 where order_id = 3")
        .unwrap();

    assert_eq!(db.query_scalar(MISMATCHED_DERIVED).unwrap(), 0);
}

#[test]
pub fn refresh_before_optimization_does_nothing() {
    let mut db = populated(5);

    assert_eq!(refresh_derived_column(&mut db).unwrap(), None);
    optimize_schema(&mut db).unwrap();
    assert_eq!(refresh_derived_column(&mut db).unwrap(), Some(5));
}

#[test]
pub fn index_statements() {
    assert_eq!(
        INDEXES[1].create_statement(),
        "create index if not exists idx_q2_city_price on test_data (city, price)"
    );
    assert_eq!(INDEXES[2].drop_statement(), "drop index idx_rating");
}
