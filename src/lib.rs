//! # Rust SQLite Data
//!
//! Command execution and result materialization over an embedded SQLite database.
//!
//! ## Features
//!
//! - **Named parameters**: `:name`, `@name` and `$name` placeholders, with list
//!   parameters expanded in place (`IN (:ids)` becomes `IN (:ids__0,:ids__1,...)`)
//! - **Lenient conversion**: stored values are coerced to the requested Rust type,
//!   NULL becomes the type's default; money columns read into a fixed-point [`Decimal`]
//! - **Pluggable materialization**: entities populated by column name, scalars,
//!   per-row mappers and whole-cursor extractors
//! - **Scoped handles**: every call opens and releases its own session; lazy results
//!   live inside a closure and cannot outlive it
//! - **Scripts**: `execute` runs every `;`-separated statement of its text
//! - **Atomic batches**: a list of prepared commands commits together or not at all
//! - **Async Support**: operations offloaded to Tokio's blocking pool with a timeout
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rust_sqlite_data::prelude::*;
//! use rust_sqlite_data::entity;
//!
//! #[derive(Debug, Default, Clone)]
//! struct Item {
//!     id: i64,
//!     name: String,
//! }
//!
//! entity!(Item, table = "Item", { id, name });
//!
//! fn main() -> Result<()> {
//!     let connector = Connector::new("shop.db");
//!
//!     connector.execute("CREATE TABLE IF NOT EXISTS Item (id INTEGER PRIMARY KEY, name TEXT)", &[])?;
//!     connector.execute(
//!         "INSERT INTO Item (id, name) VALUES (:id, :name)",
//!         &[QueryParameter::new("id", 7), QueryParameter::new("name", "Widget")],
//!     )?;
//!
//!     let item: Item = connector.select_one(
//!         "SELECT id, name FROM Item WHERE id = :id",
//!         &QueryParameter::single("id", 7),
//!         RowStrategy::entity(),
//!     )?;
//!     assert_eq!(item.name, "Widget");
//!
//!     let names: Vec<String> = connector.select_many(
//!         "SELECT name FROM Item WHERE id IN (:ids)",
//!         &[QueryParameter::list("ids", vec![7, 8, 9])],
//!         RowStrategy::scalar(),
//!     )?;
//!     assert_eq!(names, vec!["Widget"]);
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Transactions
//!
//! ```rust,no_run
//! use rust_sqlite_data::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let connector = Connector::new("bank.db");
//!
//!     // Either both statements apply or neither does
//!     connector.execute_batch(&[
//!         PreparedCommand::with_parameters(
//!             "UPDATE account SET balance = balance - :amount WHERE id = 1",
//!             [QueryParameter::new("amount", 100)],
//!         ),
//!         PreparedCommand::with_parameters(
//!             "UPDATE account SET balance = balance + :amount WHERE id = 2",
//!             [QueryParameter::new("amount", 100)],
//!         ),
//!     ])?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Project Structure
//!
//! ```text
//! src/
//! ├── core/              # Values, parameters, conversion and materialization
//! ├── backends/          # Sessions, the per-call connector and its async wrapper
//! ├── repository.rs      # Generated CRUD for entities
//! └── lib.rs
//! ```

/// Core types and traits
pub mod core;

/// Session and connector implementations
pub mod backends;

/// Entity CRUD
pub mod repository;

/// Prelude for convenient imports
///
/// ```rust
/// use rust_sqlite_data::prelude::*;
///
/// fn main() -> Result<()> {
///     let session = Session::open(&ConnectorConfig::default())?;
///     let one: i64 = session.select_one("SELECT 1", &[], RowStrategy::scalar())?;
///     assert_eq!(one, 1);
///     Ok(())
/// }
/// ```
pub mod prelude {
    pub use crate::backends::{AsyncConnector, Connector, Session};
    pub use crate::core::{
        CommandExecutor, ConnectorConfig, DatabaseError, DatabaseValue, Entity,
        FromDatabaseValue, PreparedCommand, QueryParameter, Record, Result, RowStrategy,
        Transaction, TransactionState,
    };
    pub use crate::repository::{Repository, RepositoryHooks};
}

// Re-export at root level for convenience
pub use crate::backends::{AsyncConnector, Connector, Session};
pub use crate::core::{
    CommandExecutor, ConnectorConfig, Cursor, DataExtractor, DataExtractorWithArgs,
    DatabaseError, DatabaseValue, Entity, FromDatabaseValue, OrdinalEnum, PreparedCommand,
    QueryParameter, Record, Result, ResultSet, RowMapper, RowStrategy, Transaction,
    TransactionState,
};
pub use crate::repository::{NoHooks, Repository, RepositoryHooks};
pub use rust_decimal::Decimal;
