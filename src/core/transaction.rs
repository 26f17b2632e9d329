//! Transaction guard for automatic rollback on drop
//!
//! A [`Transaction`] borrows its session mutably, so nothing else can run on the
//! session until the transaction is committed, rolled back or dropped.

use super::error::{DatabaseError, Result};
use super::executor::CommandExecutor;
use rusqlite::{Connection, TransactionBehavior};

/// Lifecycle of a [`Transaction`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Open,
    Committed,
    RolledBack,
}

/// Transaction guard that rolls back on drop if not committed
///
/// ```
/// use rust_sqlite_data::prelude::*;
///
/// # fn main() -> rust_sqlite_data::Result<()> {
/// let mut session = Session::open(&ConnectorConfig::default())?;
/// session.execute("CREATE TABLE account (id INTEGER PRIMARY KEY, balance INTEGER)", &[])?;
///
/// let mut tx = session.begin_transaction()?;
/// tx.execute("INSERT INTO account (balance) VALUES (:balance)", &QueryParameter::single("balance", 100))?;
/// tx.commit()?;
/// # Ok(())
/// # }
/// ```
pub struct Transaction<'s> {
    inner: Option<rusqlite::Transaction<'s>>,
    state: TransactionState,
}

impl<'s> Transaction<'s> {
    /// Begin a deferred transaction on `connection`
    pub fn begin(connection: &'s mut Connection) -> Result<Self> {
        let inner = rusqlite::Transaction::new(connection, TransactionBehavior::Deferred)
            .map_err(|e| DatabaseError::transaction_with_source("Failed to begin transaction", e))?;
        tracing::trace!("transaction started");

        Ok(Self {
            inner: Some(inner),
            state: TransactionState::Open,
        })
    }

    /// Commit the transaction
    pub fn commit(&mut self) -> Result<()> {
        match self.state {
            TransactionState::Committed => {
                return Err(DatabaseError::transaction("Transaction already committed"))
            }
            TransactionState::RolledBack => {
                return Err(DatabaseError::transaction(
                    "Cannot commit a rolled back transaction",
                ))
            }
            TransactionState::Open => {}
        }

        let inner = self.take_inner()?;
        inner
            .commit()
            .map_err(|e| DatabaseError::transaction_with_source("Failed to commit transaction", e))?;
        self.state = TransactionState::Committed;
        tracing::trace!("transaction committed");
        Ok(())
    }

    /// Roll the transaction back
    pub fn rollback(&mut self) -> Result<()> {
        match self.state {
            TransactionState::Committed => {
                return Err(DatabaseError::transaction(
                    "Cannot rollback a committed transaction",
                ))
            }
            TransactionState::RolledBack => {
                return Err(DatabaseError::transaction("Transaction already rolled back"))
            }
            TransactionState::Open => {}
        }

        let inner = self.take_inner()?;
        // The state is final even if the engine reports a failure; the
        // transaction cannot be resumed either way.
        self.state = TransactionState::RolledBack;
        inner.rollback().map_err(|e| {
            DatabaseError::transaction_with_source("Failed to roll back transaction", e)
        })?;
        tracing::trace!("transaction rolled back");
        Ok(())
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    fn take_inner(&mut self) -> Result<rusqlite::Transaction<'s>> {
        self.inner
            .take()
            .ok_or_else(|| DatabaseError::transaction("Transaction is no longer active"))
    }
}

impl CommandExecutor for Transaction<'_> {
    fn connection(&self) -> Result<&Connection> {
        match self.state {
            TransactionState::Open => self
                .inner
                .as_deref()
                .ok_or_else(|| DatabaseError::transaction("Transaction is no longer active")),
            TransactionState::Committed => Err(DatabaseError::transaction(
                "Cannot execute on committed transaction",
            )),
            TransactionState::RolledBack => Err(DatabaseError::transaction(
                "Cannot execute on rolled back transaction",
            )),
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.state == TransactionState::Open {
            // rusqlite rolls the inner transaction back when it is dropped
            tracing::warn!("transaction dropped without commit or rollback; rolling back");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mapping::RowStrategy;

    struct Handle(Connection);

    impl CommandExecutor for Handle {
        fn connection(&self) -> Result<&Connection> {
            Ok(&self.0)
        }
    }

    fn setup() -> Handle {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE test (id INTEGER PRIMARY KEY, value TEXT)")
            .unwrap();
        Handle(conn)
    }

    fn count(handle: &Handle) -> i64 {
        handle
            .select_one("SELECT COUNT(*) FROM test", &[], RowStrategy::scalar())
            .unwrap()
    }

    #[test]
    fn test_transaction_commit() {
        let mut handle = setup();
        {
            let mut tx = Transaction::begin(&mut handle.0).unwrap();
            tx.execute("INSERT INTO test (value) VALUES ('test1')", &[])
                .unwrap();
            tx.commit().unwrap();
            assert_eq!(tx.state(), TransactionState::Committed);
            assert!(tx.execute("INSERT INTO test (value) VALUES ('late')", &[]).is_err());
            assert!(tx.rollback().is_err());
        }
        assert_eq!(count(&handle), 1);
    }

    #[test]
    fn test_transaction_rollback_on_drop() {
        let mut handle = setup();
        {
            let tx = Transaction::begin(&mut handle.0).unwrap();
            tx.execute("INSERT INTO test (value) VALUES ('test1')", &[])
                .unwrap();
        }
        assert_eq!(count(&handle), 0);
    }

    #[test]
    fn test_transaction_explicit_rollback() {
        let mut handle = setup();
        {
            let mut tx = Transaction::begin(&mut handle.0).unwrap();
            tx.execute("INSERT INTO test (value) VALUES ('test1')", &[])
                .unwrap();
            tx.rollback().unwrap();
            assert_eq!(tx.state(), TransactionState::RolledBack);
            let err = tx.commit().unwrap_err();
            assert!(err.to_string().contains("rolled back"));
        }
        assert_eq!(count(&handle), 0);
    }
}
