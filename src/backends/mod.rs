//! Handle management on top of SQLite
//!
//! [`Session`] owns one handle, [`Connector`] opens one per call and
//! [`AsyncConnector`] runs connector calls on Tokio's blocking pool.

pub mod async_sqlite;
pub mod sqlite;

pub use async_sqlite::AsyncConnector;
pub use sqlite::{Connector, Session};
