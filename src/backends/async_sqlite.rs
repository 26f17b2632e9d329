//! Async front end over [`Connector`]
//!
//! Each operation runs whole on Tokio's blocking thread pool, on its own session, with
//! an upper bound on how long it may take. When the bound is reached the running
//! statement is interrupted and the operation is awaited until it unwinds:
//!
//! - if it fails, the caller gets [`DatabaseError::QueryTimeout`]; an interrupted
//!   batch has been rolled back
//! - if it finished anyway (the interrupt arrived between statements, or after the
//!   last one), its result is returned as usual
//!
//! Statements of a plain multi-statement `execute` that completed before the
//! interrupt stay applied, since each runs in its own implicit transaction.

use super::sqlite::{Connector, Session};
use crate::core::{
    config::ConnectorConfig,
    convert::FromDatabaseValue,
    error::{DatabaseError, Result},
    executor::CommandExecutor,
    mapping::{Entity, RowStrategy},
    parameter::{PreparedCommand, QueryParameter},
    record::Record,
};
use std::path::PathBuf;

/// Async wrapper running [`Connector`] operations off the async runtime
#[derive(Debug, Clone)]
pub struct AsyncConnector {
    connector: Connector,
}

impl AsyncConnector {
    pub fn new(data_file: impl Into<PathBuf>) -> Self {
        Self::from_connector(Connector::new(data_file))
    }

    pub fn with_config(config: ConnectorConfig) -> Self {
        Self::from_connector(Connector::with_config(config))
    }

    pub fn from_connector(connector: Connector) -> Self {
        Self { connector }
    }

    /// The blocking connector operations are delegated to
    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    /// Run `operation` on a fresh session on the blocking pool, bounded by the
    /// configured operation timeout
    pub async fn run<R, F>(&self, operation: F) -> Result<R>
    where
        F: FnOnce(&mut Session) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let connector = self.connector.clone();
        let timeout = self.connector.config().operation_timeout();
        let timeout_ms = timeout.as_millis() as u64;
        let (handle_tx, handle_rx) = tokio::sync::oneshot::channel();

        let mut task = tokio::task::spawn_blocking(move || {
            connector.with_session(|session| {
                // Fails only when the caller is no longer waiting
                let _ = handle_tx.send(session.interrupt_handle());
                operation(session)
            })
        });

        tokio::select! {
            result = &mut task => {
                result.map_err(|e| DatabaseError::other(format!("Task join error: {}", e)))?
            }
            _ = tokio::time::sleep(timeout) => {
                if let Ok(handle) = handle_rx.await {
                    handle.interrupt();
                }
                tracing::warn!(timeout_ms, "operation timed out, interrupting");

                let outcome = task
                    .await
                    .map_err(|e| DatabaseError::other(format!("Task join error: {}", e)))?;
                match outcome {
                    Ok(value) => {
                        tracing::debug!(timeout_ms, "operation completed despite the timeout");
                        Ok(value)
                    }
                    Err(e) => {
                        tracing::debug!(timeout_ms, error = %e, "interrupted operation failed");
                        Err(DatabaseError::query_timeout(timeout_ms))
                    }
                }
            }
        }
    }

    /// Verify that the data file can be opened
    pub async fn connect(&self) -> Result<()> {
        self.run(|_| Ok(())).await
    }

    pub async fn execute(
        &self,
        command_text: impl Into<String>,
        parameters: Vec<QueryParameter>,
    ) -> Result<usize> {
        let command_text = command_text.into();
        self.run(move |session| session.execute(&command_text, &parameters))
            .await
    }

    pub async fn execute_with_row_id(
        &self,
        command_text: impl Into<String>,
        parameters: Vec<QueryParameter>,
    ) -> Result<(usize, i64)> {
        let command_text = command_text.into();
        self.run(move |session| session.execute_with_row_id(&command_text, &parameters))
            .await
    }

    /// Execute `commands` atomically; an interrupted batch is rolled back
    pub async fn execute_batch(&self, commands: Vec<PreparedCommand>) -> Result<usize> {
        self.run(move |session| session.execute_batch(&commands))
            .await
    }

    /// Select every row as an entity
    pub async fn select_entities<E>(
        &self,
        command_text: impl Into<String>,
        parameters: Vec<QueryParameter>,
    ) -> Result<Vec<E>>
    where
        E: Entity + Send + 'static,
    {
        let command_text = command_text.into();
        self.run(move |session| {
            session.select_many(&command_text, &parameters, RowStrategy::entity())
        })
        .await
    }

    /// Select the first column of every row
    pub async fn select_scalars<T>(
        &self,
        command_text: impl Into<String>,
        parameters: Vec<QueryParameter>,
    ) -> Result<Vec<T>>
    where
        T: FromDatabaseValue + Send + 'static,
    {
        let command_text = command_text.into();
        self.run(move |session| {
            session.select_many(&command_text, &parameters, RowStrategy::scalar())
        })
        .await
    }

    /// Select the first column of the first row, or `T::default()`
    pub async fn select_scalar<T>(
        &self,
        command_text: impl Into<String>,
        parameters: Vec<QueryParameter>,
    ) -> Result<T>
    where
        T: FromDatabaseValue + Default + Send + 'static,
    {
        let command_text = command_text.into();
        self.run(move |session| {
            session.select_one(&command_text, &parameters, RowStrategy::scalar())
        })
        .await
    }

    /// Select every row through `mapper`
    pub async fn select_mapped<T, F>(
        &self,
        command_text: impl Into<String>,
        parameters: Vec<QueryParameter>,
        mapper: F,
    ) -> Result<Vec<T>>
    where
        T: Send + 'static,
        F: FnMut(&Record<'_>) -> Result<T> + Send + 'static,
    {
        let command_text = command_text.into();
        self.run(move |session| {
            session.select_many(&command_text, &parameters, RowStrategy::map_with(mapper))
        })
        .await
    }

    pub async fn table_exists(&self, table_name: impl Into<String>) -> Result<bool> {
        let table_name = table_name.into();
        self.run(move |session| session.table_exists(&table_name))
            .await
    }

    pub async fn column_exists(
        &self,
        table_name: impl Into<String>,
        column_name: impl Into<String>,
    ) -> Result<bool> {
        let table_name = table_name.into();
        let column_name = column_name.into();
        self.run(move |session| session.column_exists(&table_name, &column_name))
            .await
    }
}
