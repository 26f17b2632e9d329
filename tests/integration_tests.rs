//! Integration tests for the data layer
//!
//! These tests run every operation against a temporary database file:
//! - Entity, scalar, mapper and extractor materialization
//! - List parameter expansion
//! - Atomic batches
//! - Scoped result sequences
//! - Identifier, timestamp and decimal fields stored through SQLite

use chrono::{NaiveDate, NaiveDateTime};
use rust_sqlite_data::prelude::*;
use rust_sqlite_data::{
    entity, ordinal_enum, Cursor, DataExtractor, Decimal, OrdinalEnum, RowMapper,
};
use std::collections::BTreeMap;
use tempfile::TempDir;
use uuid::Uuid;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
enum Category {
    #[default]
    Misc,
    Tools,
    Food,
}

impl OrdinalEnum for Category {
    fn from_ordinal(ordinal: i64) -> Option<Self> {
        match ordinal {
            0 => Some(Category::Misc),
            1 => Some(Category::Tools),
            2 => Some(Category::Food),
            _ => None,
        }
    }

    fn ordinal(self) -> i64 {
        self as i64
    }
}

ordinal_enum!(Category);

#[derive(Debug, Default, Clone, PartialEq)]
struct Item {
    id: i32,
    name: String,
    price: f64,
    category: Category,
    discontinued: bool,
}

entity!(Item, table = "Item", { id, name, price, category, discontinued });

fn setup() -> (TempDir, Connector) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let connector = Connector::new(dir.path().join("items.db"));

    connector
        .execute_batch(&[
            PreparedCommand::new(
                "CREATE TABLE Item (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE,
                    price REAL,
                    category INTEGER,
                    discontinued INTEGER
                )",
            ),
            seed(7, "Widget", 2.5, Category::Tools),
            seed(8, "Bread", 1.2, Category::Food),
            seed(9, "Hammer", 12.0, Category::Tools),
        ])
        .expect("Failed to seed database");

    (dir, connector)
}

fn seed(id: i32, name: &str, price: f64, category: Category) -> PreparedCommand {
    PreparedCommand::with_parameters(
        "INSERT INTO Item (id, name, price, category, discontinued) VALUES (:id, :name, :price, :category, 0)",
        [
            QueryParameter::new("id", id),
            QueryParameter::new("name", name),
            QueryParameter::new("price", price),
            QueryParameter::new("category", category),
        ],
    )
}

fn count(connector: &Connector) -> i64 {
    connector
        .select_one("SELECT COUNT(*) FROM Item", &[], RowStrategy::scalar())
        .expect("Count failed")
}

#[test]
fn test_select_entity_by_id() {
    let (_dir, connector) = setup();

    let item: Item = connector
        .select_one(
            "SELECT * FROM Item WHERE id=:ID",
            &QueryParameter::single("ID", 7),
            RowStrategy::entity(),
        )
        .expect("Select failed");

    assert_eq!(item.id, 7);
    assert_eq!(item.name, "Widget");
    assert_eq!(item.category, Category::Tools);
    assert!(!item.discontinued);
}

#[test]
fn test_select_one_without_rows_returns_default() {
    let (_dir, connector) = setup();

    let item: Item = connector
        .select_one(
            "SELECT * FROM Item WHERE id=:ID",
            &QueryParameter::single("ID", 404),
            RowStrategy::entity(),
        )
        .expect("Select failed");
    assert_eq!(item, Item::default());

    let price: f64 = connector
        .select_one(
            "SELECT price FROM Item WHERE id=:ID",
            &QueryParameter::single("ID", 404),
            RowStrategy::scalar(),
        )
        .expect("Select failed");
    assert_eq!(price, 0.0);
}

#[test]
fn test_list_parameter_expansion() {
    let (_dir, connector) = setup();

    let names: Vec<String> = connector
        .select_many(
            "SELECT name FROM Item WHERE id IN (:ids) ORDER BY id",
            &[QueryParameter::list("ids", vec![7, 9])],
            RowStrategy::scalar(),
        )
        .expect("Select failed");
    assert_eq!(names, vec!["Widget", "Hammer"]);

    let affected = connector
        .execute(
            "UPDATE Item SET discontinued = 1 WHERE category = @category AND name IN (@names)",
            &[
                QueryParameter::new("category", Category::Tools),
                QueryParameter::list("names", vec!["Widget", "Bread"]),
            ],
        )
        .expect("Update failed");
    assert_eq!(affected, 1);
}

#[test]
fn test_empty_list_matches_nothing() {
    let (_dir, connector) = setup();

    let names: Vec<String> = connector
        .select_many(
            "SELECT name FROM Item WHERE id IN (:ids)",
            &[QueryParameter::list("ids", Vec::<i32>::new())],
            RowStrategy::scalar(),
        )
        .expect("Select failed");
    assert!(names.is_empty());
}

#[test]
fn test_batch_failure_is_atomic() {
    let (_dir, connector) = setup();
    let before = count(&connector);

    let err = connector
        .execute_batch(&[
            seed(10, "Nails", 0.1, Category::Tools),
            seed(11, "Widget", 3.0, Category::Tools),
            seed(12, "Milk", 0.9, Category::Food),
        ])
        .expect_err("Duplicate name must fail the batch");

    assert!(matches!(err, DatabaseError::QueryError { .. }));
    assert!(err.to_string().contains("UNIQUE"));
    assert_eq!(count(&connector), before);
}

#[test]
fn test_batch_success_commits_everything() {
    let (_dir, connector) = setup();

    let affected = connector
        .execute_batch(&[
            seed(10, "Nails", 0.1, Category::Tools),
            PreparedCommand::with_parameters(
                "DELETE FROM Item WHERE id = :id",
                [QueryParameter::new("id", 8)],
            ),
        ])
        .expect("Batch failed");

    assert_eq!(affected, 2);
    assert_eq!(count(&connector), 3);
}

#[test]
fn test_execute_with_row_id() {
    let (_dir, connector) = setup();

    let (affected, row_id) = connector
        .execute_with_row_id(
            "INSERT INTO Item (name, price) VALUES (:name, :price)",
            &[
                QueryParameter::new("name", "Saw"),
                QueryParameter::new("price", 20.0),
            ],
        )
        .expect("Insert failed");

    assert_eq!(affected, 1);
    assert_eq!(row_id, 10);
}

struct Label;

impl RowMapper<String> for Label {
    fn map_row(&self, record: &Record<'_>) -> Result<String> {
        Ok(format!(
            "{} ({:.2})",
            record.get_named::<String>("name")?,
            record.get_named::<f64>("price")?
        ))
    }
}

struct ByCategory;

impl DataExtractor<(i64, Vec<String>)> for ByCategory {
    fn extract(&self, cursor: &mut Cursor<'_>) -> Result<Vec<(i64, Vec<String>)>> {
        let mut groups: BTreeMap<i64, Vec<String>> = BTreeMap::new();
        while let Some(record) = cursor.next_record()? {
            groups
                .entry(record.get_named("category")?)
                .or_default()
                .push(record.get_named("name")?);
        }
        Ok(groups.into_iter().collect())
    }
}

#[test]
fn test_mapper_and_extractor() {
    let (_dir, connector) = setup();

    let labels: Vec<String> = connector
        .select_many("SELECT * FROM Item ORDER BY id", &[], RowStrategy::mapper(&Label))
        .expect("Select failed");
    assert_eq!(labels, vec!["Widget (2.50)", "Bread (1.20)", "Hammer (12.00)"]);

    let groups: Vec<(i64, Vec<String>)> = connector
        .select_many(
            "SELECT * FROM Item ORDER BY id",
            &[],
            RowStrategy::extractor(&ByCategory),
        )
        .expect("Select failed");
    assert_eq!(
        groups,
        vec![
            (1, vec!["Widget".to_string(), "Hammer".to_string()]),
            (2, vec!["Bread".to_string()]),
        ]
    );
}

#[test]
fn test_lazy_results_released_on_early_exit() {
    let (_dir, connector) = setup();

    let first_two: Vec<Item> = connector
        .with_results(
            "SELECT * FROM Item ORDER BY id",
            &[],
            RowStrategy::entity(),
            |results| results.take(2).collect(),
        )
        .expect("Select failed");
    assert_eq!(first_two.len(), 2);

    // The handle was released, so a writer is not blocked
    connector
        .execute("DELETE FROM Item", &[])
        .expect("Delete failed");
    assert_eq!(count(&connector), 0);
}

#[test]
fn test_closed_results_fail_further_iteration() {
    let (_dir, connector) = setup();

    let outcome: Result<Vec<i32>> = connector.with_results(
        "SELECT id FROM Item WHERE id > :min",
        &QueryParameter::single("min", 0),
        RowStrategy::scalar(),
        |results| {
            results.next();
            results.close();
            results.collect()
        },
    );
    let err = outcome.expect_err("Closed results must fail");
    assert!(matches!(err, DatabaseError::QueryError { .. }));
    assert_eq!(err.command(), Some("SELECT id FROM Item WHERE id > :min"));
    assert!(err.to_string().contains("min"));
}

#[test]
fn test_query_error_names_command_and_parameters() {
    let (_dir, connector) = setup();

    let err = connector
        .execute(
            "INSERT INTO Missing (x) VALUES (:x)",
            &QueryParameter::single("x", 1),
        )
        .expect_err("Missing table must fail");

    assert_eq!(err.command(), Some("INSERT INTO Missing (x) VALUES (:x)"));
    assert!(err.to_string().contains(":x"));
}

#[test]
fn test_missing_placeholder_is_binding_error() {
    let (_dir, connector) = setup();

    let err = connector
        .select_many::<i32>(
            "SELECT id FROM Item WHERE id IN (:ids)",
            &[QueryParameter::list("other", vec![1, 2])],
            RowStrategy::scalar(),
        )
        .expect_err("Unknown list placeholder must fail");
    assert!(matches!(err, DatabaseError::BindingError(_)));
}

#[test]
fn test_schema_introspection() {
    let (_dir, connector) = setup();

    assert!(connector.table_exists("Item").expect("Lookup failed"));
    assert!(!connector.table_exists("Order").expect("Lookup failed"));
    assert!(connector.column_exists("Item", "Price").expect("Lookup failed"));
    assert!(!connector.column_exists("Item", "weight").expect("Lookup failed"));
}

#[test]
fn test_repository_round_trip() {
    let (_dir, connector) = setup();
    let repo: Repository<Item> = Repository::new(connector);

    let saw = Item {
        id: 20,
        name: "Saw".into(),
        price: 20.0,
        category: Category::Tools,
        discontinued: false,
    };
    assert!(repo.insert(&saw).expect("Insert failed"));
    assert_eq!(repo.get_by_id(20).expect("Select failed"), Some(saw));
    assert_eq!(repo.count().expect("Count failed"), 4);
    assert!(repo.delete(20).expect("Delete failed"));
    assert_eq!(repo.all().expect("Select failed").len(), 3);
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Shift {
    id: i64,
    token: Uuid,
    opened_at: NaiveDateTime,
    closed_at: Option<NaiveDateTime>,
    float: Decimal,
}

entity!(Shift, table = "Shift", { id, token, opened_at, closed_at, float });

fn at(day: u32, hour: u32, milli: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .expect("Invalid date")
        .and_hms_milli_opt(hour, 5, 0, milli)
        .expect("Invalid time")
}

#[test]
fn test_identifier_and_timestamp_fields_round_trip() {
    let (_dir, connector) = setup();
    connector
        .execute(
            "CREATE TABLE Shift (id INTEGER PRIMARY KEY, token TEXT, opened_at TEXT, closed_at TEXT, float TEXT)",
            &[],
        )
        .expect("Schema failed");
    let repo: Repository<Shift> = Repository::new(connector.clone());

    let morning = Shift {
        id: 1,
        token: Uuid::parse_str("6f9619ff-8b86-d011-b42d-00cf4fc964ff").expect("Invalid uuid"),
        opened_at: at(9, 8, 250),
        closed_at: Some(at(9, 16, 0)),
        float: Decimal::new(15_075, 2),
    };
    let evening = Shift {
        id: 2,
        token: Uuid::parse_str("0e984725-c51c-4bf4-9960-e1c80e27aba0").expect("Invalid uuid"),
        opened_at: at(10, 17, 999),
        closed_at: None,
        float: Decimal::new(1, 3),
    };
    repo.insert(&morning).expect("Insert failed");
    repo.insert(&evening).expect("Insert failed");

    assert_eq!(repo.get_by_id(1).expect("Select failed"), Some(morning.clone()));
    assert_eq!(repo.all().expect("Select failed"), vec![morning.clone(), evening.clone()]);

    let by_token: Shift = connector
        .select_one(
            "SELECT * FROM Shift WHERE token = :token",
            &QueryParameter::single("token", evening.token),
            RowStrategy::entity(),
        )
        .expect("Select failed");
    assert_eq!(by_token, evening);

    let opened_before: Vec<i64> = connector
        .select_many(
            "SELECT id FROM Shift WHERE opened_at < :cutoff ORDER BY id",
            &QueryParameter::single("cutoff", at(10, 0, 0)),
            RowStrategy::scalar(),
        )
        .expect("Select failed");
    assert_eq!(opened_before, vec![1]);

    let stored: String = connector
        .select_one("SELECT opened_at FROM Shift WHERE id = 1", &[], RowStrategy::scalar())
        .expect("Select failed");
    assert_eq!(stored, "2024-03-09 08:05:00.250");
}

#[test]
fn test_decimal_scalars_from_integer_and_real_storage() {
    let (_dir, connector) = setup();

    let whole: Decimal = connector
        .select_one("SELECT id + 5 FROM Item WHERE id = 7", &[], RowStrategy::scalar())
        .expect("Select failed");
    assert_eq!(whole, Decimal::from(12));

    let real: Decimal = connector
        .select_one("SELECT price FROM Item WHERE id = 7", &[], RowStrategy::scalar())
        .expect("Select failed");
    assert_eq!(real, Decimal::new(25, 1));

    let exact: Decimal = connector
        .select_one(
            "SELECT :amount",
            &QueryParameter::single("amount", Decimal::new(1_000_000_000_000_000_001, 18)),
            RowStrategy::scalar(),
        )
        .expect("Select failed");
    assert_eq!(exact, Decimal::new(1_000_000_000_000_000_001, 18));
}

#[test]
fn test_invalid_utf8_text_is_not_replaced() {
    let (_dir, connector) = setup();

    let err = connector
        .select_one::<String>("SELECT CAST(x'ff61' AS TEXT)", &[], RowStrategy::scalar())
        .expect_err("Invalid text must not convert to String");
    assert!(matches!(err, DatabaseError::ConversionError { .. }));

    let raw: Vec<u8> = connector
        .select_one("SELECT CAST(x'ff61' AS TEXT)", &[], RowStrategy::scalar())
        .expect("Select failed");
    assert_eq!(raw, vec![0xff, 0x61]);
}

#[test]
fn test_execute_runs_whole_script() {
    let (_dir, connector) = setup();

    connector
        .execute(
            "CREATE TABLE a (x INTEGER); CREATE TABLE b (y INTEGER);",
            &[],
        )
        .expect("Script failed");
    assert!(connector.table_exists("a").expect("Lookup failed"));
    assert!(connector.table_exists("b").expect("Lookup failed"));

    connector
        .execute("PRAGMA journal_mode=WAL", &[])
        .expect("Pragma with a result row failed");
    let mode: String = connector
        .select_one("PRAGMA journal_mode", &[], RowStrategy::scalar())
        .expect("Select failed");
    assert_eq!(mode, "wal");
}

#[test]
fn test_connection_string_config() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let file = dir.path().join("cs.db");
    let connector = Connector::from_connection_string(&format!(
        "Data Source={};Version=3;Foreign Keys=True;",
        file.display()
    ))
    .expect("Invalid connection string");

    connector.connect().expect("Connect failed");
    connector
        .execute_batch(&[
            PreparedCommand::new("CREATE TABLE parent (id INTEGER PRIMARY KEY)"),
            PreparedCommand::new(
                "CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER REFERENCES parent(id))",
            ),
        ])
        .expect("Schema failed");

    let err = connector
        .execute("INSERT INTO child (parent_id) VALUES (:p)", &QueryParameter::single("p", 99))
        .expect_err("Foreign keys must be enforced");
    assert!(err.to_string().contains("FOREIGN KEY"));
}

#[tokio::test]
async fn test_async_connector() {
    let (_dir, connector) = setup();
    let db = AsyncConnector::from_connector(connector);

    let items: Vec<Item> = db
        .select_entities(
            "SELECT * FROM Item WHERE category = :category ORDER BY id",
            QueryParameter::single("category", Category::Tools),
        )
        .await
        .expect("Select failed");
    assert_eq!(items.len(), 2);
    assert_eq!(items[1].name, "Hammer");

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let db = db.clone();
            tokio::spawn(async move {
                db.execute(
                    "INSERT INTO Item (name, price) VALUES (:name, 1.0)",
                    QueryParameter::single("name", format!("Bulk {}", i)),
                )
                .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.expect("Task panicked").expect("Insert failed");
    }

    let total: i64 = db
        .select_scalar("SELECT COUNT(*) FROM Item", Vec::new())
        .await
        .expect("Count failed");
    assert_eq!(total, 8);
}
