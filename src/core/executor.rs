//! Bound commands and the operations shared by every open handle

use super::binder;
use super::error::{DatabaseError, Result};
use super::mapping::{ResultSet, RowStrategy};
use super::parameter::QueryParameter;
use super::record::Cursor;
use rusqlite::{Batch, Connection, Statement};

const LAST_INSERT_ROW_ID: &str = "SELECT last_insert_rowid()";

const CHECK_TABLE_EXISTS: &str =
    "SELECT name FROM sqlite_master WHERE type='table' AND name=:TableName";

const CHECK_COLUMN_EXISTS: &str =
    "SELECT name FROM pragma_table_info(:TableName) WHERE name=:ColumnName COLLATE NOCASE";

/// A statement prepared on a handle with all parameters attached
pub struct Command<'c> {
    connection: &'c Connection,
    statement: Statement<'c>,
    text: String,
    parameters: Vec<String>,
}

impl<'c> Command<'c> {
    /// Expand list parameters, prepare the rewritten text and bind every parameter
    ///
    /// The text must hold exactly one statement. Scripts go through
    /// [`CommandExecutor::execute`].
    pub fn prepare(
        connection: &'c Connection,
        command_text: &str,
        parameters: &[QueryParameter],
    ) -> Result<Self> {
        let bound = binder::bind(command_text, parameters)?;
        let names = bound.parameter_names();

        let mut statement = {
            let mut statements = Batch::new(connection, &bound.text);
            let first = statements
                .next()
                .map_err(|e| DatabaseError::query(&bound.text, &names, e))?
                .ok_or_else(|| {
                    DatabaseError::query(&bound.text, &names, "command text holds no statement")
                })?;
            if !matches!(statements.next(), Ok(None)) {
                return Err(DatabaseError::query(
                    &bound.text,
                    &names,
                    "command text holds more than one statement",
                ));
            }
            first
        };
        bound.attach(&mut statement)?;

        Ok(Self {
            connection,
            statement,
            text: bound.text,
            parameters: names,
        })
    }

    /// Command text after list expansion
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Names of the attached parameters
    pub fn parameter_names(&self) -> &[String] {
        &self.parameters
    }

    /// Run the statement to completion; returns the number of affected rows
    ///
    /// Rows the statement returns are stepped past.
    pub fn execute(&mut self) -> Result<usize> {
        run_to_completion(self.connection, &mut self.statement)
            .map_err(|e| DatabaseError::query(&self.text, &self.parameters, e))
    }

    /// Run the statement and open a cursor over its rows
    pub fn query(&mut self) -> Cursor<'_> {
        Cursor::new(self.statement.raw_query(), &self.text, &self.parameters)
    }
}

/// Step `statement` to the end and count the rows it inserted, updated or deleted
///
/// `changes()` keeps its value across statements that modify nothing (DDL, PRAGMA),
/// so it is only read when the running total moved.
fn run_to_completion(connection: &Connection, statement: &mut Statement<'_>) -> rusqlite::Result<usize> {
    let before = connection.total_changes();
    if statement.column_count() == 0 {
        statement.raw_execute()?;
    } else {
        let mut rows = statement.raw_query();
        while rows.next()?.is_some() {}
    }
    if connection.total_changes() == before {
        Ok(0)
    } else {
        Ok(connection.changes() as usize)
    }
}

/// Run every statement of `command_text` in order
///
/// Each statement is prepared only after the previous one finished, so a script may
/// create a table and then fill it. Every statement gets the bindings it references.
fn execute_script(
    connection: &Connection,
    command_text: &str,
    parameters: &[QueryParameter],
) -> Result<usize> {
    let bound = binder::bind(command_text, parameters)?;
    let names = bound.parameter_names();
    let mut statements = Batch::new(connection, &bound.text);
    let mut affected = 0;

    while let Some(mut statement) = statements
        .next()
        .map_err(|e| DatabaseError::query(&bound.text, &names, e))?
    {
        bound.attach(&mut statement)?;
        affected += run_to_completion(connection, &mut statement)
            .map_err(|e| DatabaseError::query(&bound.text, &names, e))?;
    }

    Ok(affected)
}

/// Command execution against an open handle
///
/// Implemented by [`Session`](crate::Session) and [`Transaction`](crate::Transaction).
/// The generic methods make this trait unusable as a trait object.
pub trait CommandExecutor {
    /// The live connection commands run on
    fn connection(&self) -> Result<&Connection>;

    /// Prepare and bind a command
    fn command(&self, command_text: &str, parameters: &[QueryParameter]) -> Result<Command<'_>> {
        tracing::trace!(command = command_text, "preparing command");
        Command::prepare(self.connection()?, command_text, parameters)
    }

    /// Execute a command and return the number of affected rows
    ///
    /// The text may hold several `;`-separated statements; all of them run, in order.
    /// Statements that return rows (`PRAGMA journal_mode=WAL`) are stepped to the end.
    fn execute(&self, command_text: &str, parameters: &[QueryParameter]) -> Result<usize> {
        tracing::trace!(command = command_text, "executing command");
        execute_script(self.connection()?, command_text, parameters)
    }

    /// Execute a command and return the affected rows with the last inserted row id
    ///
    /// The row id is read with a second statement on the same handle.
    fn execute_with_row_id(
        &self,
        command_text: &str,
        parameters: &[QueryParameter],
    ) -> Result<(usize, i64)> {
        let affected = self.execute(command_text, parameters)?;
        let row_id = self.select_one::<i64>(LAST_INSERT_ROW_ID, &[], RowStrategy::scalar())?;
        Ok((affected, row_id))
    }

    /// Run a query and hand the lazy results to `consume`
    ///
    /// The cursor is released when `consume` returns, whether or not it read every row.
    fn with_results<'a, T, R, F>(
        &self,
        command_text: &str,
        parameters: &[QueryParameter],
        strategy: RowStrategy<'a, T>,
        consume: F,
    ) -> Result<R>
    where
        F: FnOnce(&mut ResultSet<'_, 'a, T>) -> Result<R>,
    {
        let mut command = self.command(command_text, parameters)?;
        tracing::trace!(command = command.text(), strategy = strategy.kind(), "reading results");
        let mut results = ResultSet::new(command.query(), strategy);
        let outcome = consume(&mut results);
        drop(results);
        outcome
    }

    /// Materialize every row
    fn select_many<T>(
        &self,
        command_text: &str,
        parameters: &[QueryParameter],
        strategy: RowStrategy<'_, T>,
    ) -> Result<Vec<T>> {
        self.with_results(command_text, parameters, strategy, |results| results.collect())
    }

    /// Materialize the first row, if any; remaining rows are not read
    fn select_first<T>(
        &self,
        command_text: &str,
        parameters: &[QueryParameter],
        strategy: RowStrategy<'_, T>,
    ) -> Result<Option<T>> {
        self.with_results(command_text, parameters, strategy, |results| {
            results.next().transpose()
        })
    }

    /// Materialize the first row, or `T::default()` when there is none
    fn select_one<T: Default>(
        &self,
        command_text: &str,
        parameters: &[QueryParameter],
        strategy: RowStrategy<'_, T>,
    ) -> Result<T> {
        Ok(self
            .select_first(command_text, parameters, strategy)?
            .unwrap_or_default())
    }

    /// Whether a table called `table_name` exists
    fn table_exists(&self, table_name: &str) -> Result<bool> {
        let found: Option<String> = self.select_first(
            CHECK_TABLE_EXISTS,
            &QueryParameter::single("TableName", table_name),
            RowStrategy::scalar(),
        )?;
        Ok(found.is_some())
    }

    /// Whether `table_name` has a column called `column_name` (case-insensitive)
    fn column_exists(&self, table_name: &str, column_name: &str) -> Result<bool> {
        let found: Option<String> = self.select_first(
            CHECK_COLUMN_EXISTS,
            &[
                QueryParameter::new("TableName", table_name),
                QueryParameter::new("ColumnName", column_name),
            ],
            RowStrategy::scalar(),
        )?;
        Ok(found.is_some())
    }
}
