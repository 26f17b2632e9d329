//! Basic usage example
//!
//! This example demonstrates:
//! - Creating tables and inserting rows with named parameters
//! - Reading entities, scalars and mapped rows
//! - Expanding a list parameter into an `IN` predicate
//! - Running an atomic batch, and what happens when it fails
//! - Generated CRUD through a repository
//!
//! Run with: cargo run --example basic_usage

use rust_sqlite_data::prelude::*;
use rust_sqlite_data::entity;

#[derive(Debug, Default, Clone)]
struct Product {
    id: i64,
    name: String,
    price: f64,
    barcode: Option<String>,
}

entity!(Product, table = "Product", { id, name, price, barcode });

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Rust SQLite Data - Basic Usage Example ===\n");

    let dir = std::env::temp_dir().join(format!("basic_usage_{}", std::process::id()));
    std::fs::create_dir_all(&dir)?;
    let connector = Connector::new(dir.join("shop.db"));

    println!("1. Connecting to {}...", connector.config().data_file.display());
    connector.connect()?;
    println!("   ✓ Connected\n");

    println!("2. Creating table...");
    if !connector.table_exists("Product")? {
        connector.execute(
            "CREATE TABLE Product (
                ID INTEGER PRIMARY KEY,
                Name TEXT NOT NULL UNIQUE,
                Price REAL NOT NULL,
                Barcode TEXT
            )",
            &[],
        )?;
    }
    println!("   ✓ Table ready\n");

    println!("3. Inserting products...");
    let repo: Repository<Product> = Repository::new(connector.clone());
    for (name, price) in [("Coffee", 2.5), ("Tea", 1.75), ("Cake", 3.2)] {
        let id = repo.insert_with_row_id(&Product {
            name: name.to_string(),
            price,
            ..Default::default()
        })?;
        println!("   ✓ {} stored with id {}", name, id);
    }
    println!();

    println!("4. Querying...");
    let coffee: Product = connector.select_one(
        "SELECT * FROM Product WHERE Name = :name",
        &QueryParameter::single("name", "Coffee"),
        RowStrategy::entity(),
    )?;
    println!("   Coffee: {:?}", coffee);

    let total: f64 = connector.select_one("SELECT SUM(Price) FROM Product", &[], RowStrategy::scalar())?;
    println!("   Total price: {:.2}", total);

    let picked: Vec<String> = connector.select_many(
        "SELECT Name FROM Product WHERE ID IN (:ids) ORDER BY ID",
        &[QueryParameter::list("ids", vec![1, 3])],
        RowStrategy::scalar(),
    )?;
    println!("   Products 1 and 3: {:?}", picked);

    let labels: Vec<String> = connector.select_many(
        "SELECT Name, Price FROM Product ORDER BY Price DESC",
        &[],
        RowStrategy::map_with(|record| {
            Ok(format!("{} @ {:.2}", record.get::<String>(0)?, record.get::<f64>(1)?))
        }),
    )?;
    println!("   By price: {:?}\n", labels);

    println!("5. Running a batch that fails halfway...");
    let result = connector.execute_batch(&[
        PreparedCommand::with_parameters(
            "UPDATE Product SET Price = Price * 2 WHERE Name = :name",
            [QueryParameter::new("name", "Tea")],
        ),
        PreparedCommand::with_parameters(
            "INSERT INTO Product (Name, Price) VALUES (:name, :price)",
            [QueryParameter::new("name", "Coffee"), QueryParameter::new("price", 1.0)],
        ),
    ]);
    match result {
        Ok(_) => println!("   unexpected success"),
        Err(e) => println!("   ✓ Rolled back: {}", e),
    }
    let tea: f64 = connector.select_one(
        "SELECT Price FROM Product WHERE Name = :name",
        &QueryParameter::single("name", "Tea"),
        RowStrategy::scalar(),
    )?;
    println!("   Tea still costs {:.2}\n", tea);

    println!("6. Async access...");
    let db = AsyncConnector::from_connector(connector.clone());
    let count: i64 = db.select_scalar("SELECT COUNT(*) FROM Product", Vec::new()).await?;
    println!("   ✓ {} products\n", count);

    println!("7. Cleaning up...");
    for product in repo.all()? {
        repo.delete(product.id)?;
    }
    println!("   ✓ {} products left", repo.count()?);
    std::fs::remove_dir_all(&dir)?;

    println!("\n=== Example completed successfully ===");
    Ok(())
}
