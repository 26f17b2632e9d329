//! Forward-only cursor over result rows and typed access to a single row

use super::convert::FromDatabaseValue;
use super::error::{DatabaseError, Result};
use super::value::DatabaseValue;
use rusqlite::{Row, Rows};

/// One row of a result, valid while the cursor stays on it
pub struct Record<'r> {
    row: &'r Row<'r>,
}

impl<'r> Record<'r> {
    pub(crate) fn new(row: &'r Row<'r>) -> Self {
        Self { row }
    }

    /// Number of columns in the row
    pub fn column_count(&self) -> usize {
        self.row.as_ref().column_count()
    }

    /// Name of the column at `index`
    pub fn column_name(&self, index: usize) -> Result<&str> {
        Ok(self.row.as_ref().column_name(index)?)
    }

    /// Ordinal of the column called `name`, compared case-insensitively
    pub fn column_index(&self, name: &str) -> Result<usize> {
        let statement = self.row.as_ref();
        (0..statement.column_count())
            .find(|&i| {
                statement
                    .column_name(i)
                    .map(|column| column.eq_ignore_ascii_case(name))
                    .unwrap_or(false)
            })
            .ok_or_else(|| DatabaseError::other(format!("Column not found: {}", name)))
    }

    /// Raw value at `index`, in its storage class
    pub fn value(&self, index: usize) -> Result<DatabaseValue> {
        Ok(DatabaseValue::from_value_ref(self.row.get_ref(index)?))
    }

    /// Whether the value at `index` is NULL
    pub fn is_null(&self, index: usize) -> Result<bool> {
        Ok(matches!(
            self.row.get_ref(index)?,
            rusqlite::types::ValueRef::Null
        ))
    }

    /// Value at `index` converted to `T`; NULL yields `T`'s default
    ///
    /// Use `Option<T>` to tell NULL apart from a stored default.
    pub fn get<T: FromDatabaseValue>(&self, index: usize) -> Result<T> {
        let value = self.value(index)?;
        T::from_db_value(&value).map_err(|e| match self.column_name(index) {
            Ok(name) => e.in_column(name),
            Err(_) => e,
        })
    }

    /// Value of the column called `name` converted to `T`
    pub fn get_named<T: FromDatabaseValue>(&self, name: &str) -> Result<T> {
        let index = self.column_index(name)?;
        self.get(index)
    }
}

/// Forward-only, single-pass cursor produced by executing a command
///
/// The cursor borrows the command that produced it, so it cannot outlive the
/// command or the session it was prepared on.
pub struct Cursor<'s> {
    rows: Rows<'s>,
    command: &'s str,
    parameters: &'s [String],
}

impl<'s> Cursor<'s> {
    pub(crate) fn new(rows: Rows<'s>, command: &'s str, parameters: &'s [String]) -> Self {
        Self {
            rows,
            command,
            parameters,
        }
    }

    /// Advance to the next row
    pub fn next_record(&mut self) -> Result<Option<Record<'_>>> {
        match self.rows.next() {
            Ok(Some(row)) => Ok(Some(Record::new(row))),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::query(self.command, self.parameters, e)),
        }
    }

    /// Command text the cursor was produced by
    pub fn command(&self) -> &'s str {
        self.command
    }

    /// Names of the parameters bound to the command
    pub fn parameter_names(&self) -> &'s [String] {
        self.parameters
    }

    /// Column names of the result, empty for statements that return no columns
    pub fn column_names(&self) -> Vec<String> {
        self.rows
            .as_ref()
            .map(|statement| {
                statement
                    .column_names()
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}
