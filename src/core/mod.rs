//! Core types: values, parameters, binding, conversion and row materialization
//!
//! Everything here works against a plain `rusqlite::Connection`; opening and
//! releasing handles is the job of [`crate::backends`].

pub mod binder;
pub mod config;
pub mod convert;
pub mod error;
pub mod executor;
pub mod mapping;
pub mod parameter;
pub mod record;
pub mod transaction;
pub mod value;

// Re-export commonly used types
pub use binder::{bind, BoundCommand};
pub use config::ConnectorConfig;
pub use convert::{FromDatabaseValue, OrdinalEnum};
pub use error::{DatabaseError, Result};
pub use executor::{Command, CommandExecutor};
pub use mapping::{DataExtractor, DataExtractorWithArgs, Entity, ResultSet, RowMapper, RowStrategy};
pub use parameter::{ParameterValue, PreparedCommand, QueryParameter};
pub use record::{Cursor, Record};
pub use transaction::{Transaction, TransactionState};
pub use value::DatabaseValue;
