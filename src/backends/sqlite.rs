//! SQLite sessions and the per-call connector
//!
//! A [`Session`] owns one open handle. A [`Connector`] holds the configuration and
//! opens a fresh session for every call, releasing it before the call returns.

use crate::core::{
    config::ConnectorConfig,
    error::{DatabaseError, Result},
    executor::CommandExecutor,
    mapping::{ResultSet, RowStrategy},
    parameter::{PreparedCommand, QueryParameter},
    transaction::Transaction,
};
use rusqlite::{Connection, InterruptHandle, OpenFlags};
use std::path::PathBuf;

/// One open database handle
pub struct Session {
    conn: Connection,
}

impl Session {
    /// Open a handle as described by `config`
    pub fn open(config: &ConnectorConfig) -> Result<Self> {
        if config.busy_timeout_ms > i32::MAX as u64 {
            return Err(DatabaseError::connection(format!(
                "Busy timeout of {}ms is out of range",
                config.busy_timeout_ms
            )));
        }

        let flags = if config.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX
        } else {
            OpenFlags::default()
        };

        let conn = Connection::open_with_flags(&config.data_file, flags).map_err(|e| {
            DatabaseError::connection_with_source(
                format!("Failed to open {}", config.data_file.display()),
                e,
            )
        })?;

        conn.busy_timeout(config.busy_timeout())
            .map_err(|e| DatabaseError::connection_with_source("Failed to set busy timeout", e))?;

        let pragma = if config.foreign_keys {
            "PRAGMA foreign_keys = ON"
        } else {
            "PRAGMA foreign_keys = OFF"
        };
        conn.execute_batch(pragma)
            .map_err(|e| DatabaseError::connection_with_source("Failed to configure foreign keys", e))?;

        tracing::debug!(data_file = %config.data_file.display(), read_only = config.read_only, "session opened");
        Ok(Self { conn })
    }

    /// Close the handle, reporting any failure
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| {
            DatabaseError::connection_with_source("Failed to close connection", e)
        })?;
        tracing::debug!("session closed");
        Ok(())
    }

    /// Begin a transaction; the session is borrowed until it ends
    pub fn begin_transaction(&mut self) -> Result<Transaction<'_>> {
        Transaction::begin(&mut self.conn)
    }

    /// Handle that cancels whatever statement this session is running, from any thread
    ///
    /// An interrupted statement fails, and a transaction it ran in is rolled back.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.conn.get_interrupt_handle()
    }

    /// Whether a transaction is currently open on this handle
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Execute `commands` in order inside one transaction
    ///
    /// Commits only if every command succeeds. On the first failure the failure is
    /// logged, the transaction is rolled back and that failure is returned unchanged.
    /// Returns the total number of affected rows.
    pub fn execute_batch(&mut self, commands: &[PreparedCommand]) -> Result<usize> {
        let mut tx = self.begin_transaction()?;
        let mut affected = 0;

        for (index, command) in commands.iter().enumerate() {
            match tx.execute(command.command_text(), command.parameters()) {
                Ok(rows) => affected += rows,
                Err(e) => {
                    tracing::error!(
                        index,
                        command = command.command_text(),
                        error = %e,
                        "batch command failed, rolling back"
                    );
                    if let Err(rollback_err) = tx.rollback() {
                        tracing::error!(error = %rollback_err, "rollback after failed batch command failed");
                    }
                    return Err(e);
                }
            }
        }

        tx.commit()?;
        tracing::debug!(commands = commands.len(), affected, "batch committed");
        Ok(affected)
    }
}

impl CommandExecutor for Session {
    fn connection(&self) -> Result<&Connection> {
        Ok(&self.conn)
    }
}

/// Entry point for one-shot operations against a data file
///
/// Every call opens its own [`Session`] and releases it before returning, on success
/// and on failure alike.
#[derive(Debug, Clone)]
pub struct Connector {
    config: ConnectorConfig,
}

impl Connector {
    /// Create a connector for `data_file` with default options
    pub fn new(data_file: impl Into<PathBuf>) -> Self {
        Self::with_config(ConnectorConfig::new(data_file))
    }

    pub fn with_config(config: ConnectorConfig) -> Self {
        Self { config }
    }

    /// Create a connector from a `key=value;` connection string
    pub fn from_connection_string(connection_string: &str) -> Result<Self> {
        Ok(Self::with_config(ConnectorConfig::from_connection_string(
            connection_string,
        )?))
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Verify that the data file can be opened
    pub fn connect(&self) -> Result<()> {
        self.open()?.close()
    }

    /// Open a session the caller manages
    pub fn open(&self) -> Result<Session> {
        Session::open(&self.config)
    }

    /// Run `f` on a fresh session that is released when `f` returns
    pub fn with_session<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Session) -> Result<R>,
    {
        let mut session = self.open()?;
        match f(&mut session) {
            Ok(value) => {
                session.close()?;
                Ok(value)
            }
            Err(e) => {
                drop(session);
                Err(e)
            }
        }
    }

    pub fn execute(&self, command_text: &str, parameters: &[QueryParameter]) -> Result<usize> {
        self.with_session(|session| session.execute(command_text, parameters))
    }

    pub fn execute_with_row_id(
        &self,
        command_text: &str,
        parameters: &[QueryParameter],
    ) -> Result<(usize, i64)> {
        self.with_session(|session| session.execute_with_row_id(command_text, parameters))
    }

    /// Execute `commands` atomically on one session
    pub fn execute_batch(&self, commands: &[PreparedCommand]) -> Result<usize> {
        self.with_session(|session| session.execute_batch(commands))
    }

    /// Run a query and hand the lazy results to `consume`; see [`CommandExecutor::with_results`]
    pub fn with_results<'a, T, R, F>(
        &self,
        command_text: &str,
        parameters: &[QueryParameter],
        strategy: RowStrategy<'a, T>,
        consume: F,
    ) -> Result<R>
    where
        F: FnOnce(&mut ResultSet<'_, 'a, T>) -> Result<R>,
    {
        self.with_session(|session| {
            session.with_results(command_text, parameters, strategy, consume)
        })
    }

    pub fn select_many<T>(
        &self,
        command_text: &str,
        parameters: &[QueryParameter],
        strategy: RowStrategy<'_, T>,
    ) -> Result<Vec<T>> {
        self.with_session(|session| session.select_many(command_text, parameters, strategy))
    }

    pub fn select_first<T>(
        &self,
        command_text: &str,
        parameters: &[QueryParameter],
        strategy: RowStrategy<'_, T>,
    ) -> Result<Option<T>> {
        self.with_session(|session| session.select_first(command_text, parameters, strategy))
    }

    pub fn select_one<T: Default>(
        &self,
        command_text: &str,
        parameters: &[QueryParameter],
        strategy: RowStrategy<'_, T>,
    ) -> Result<T> {
        self.with_session(|session| session.select_one(command_text, parameters, strategy))
    }

    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        self.with_session(|session| session.table_exists(table_name))
    }

    pub fn column_exists(&self, table_name: &str, column_name: &str) -> Result<bool> {
        self.with_session(|session| session.column_exists(table_name, column_name))
    }
}
