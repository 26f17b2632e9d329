//! Error types for the data access layer
//!
//! This module defines all error types that can occur while binding, executing and
//! materializing commands.

/// Result type alias for database operations
pub type Result<T> = std::result::Result<T, DatabaseError>;

/// Error types for database operations
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Opening or closing a database handle failed
    #[error("Connection error: {message}")]
    ConnectionError {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    /// Parameter/placeholder mismatch while binding a command
    #[error("Binding error: {0}")]
    BindingError(String),

    /// A raw column value cannot be coerced into the requested type
    #[error("Conversion error: cannot convert {actual} to {expected}{}", column_suffix(.column))]
    ConversionError {
        expected: String,
        actual: String,
        column: Option<String>,
    },

    /// Native execution failure
    #[error("Query execution error: {source} [command: {command}; parameters: {}]", .parameters.join(", "))]
    QueryError {
        command: String,
        parameters: Vec<String>,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Query timeout
    #[error("Query timeout after {timeout_ms}ms")]
    QueryTimeout { timeout_ms: u64 },

    /// Begin, commit or rollback failure
    #[error("Transaction error: {message}")]
    TransactionError {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    /// Invalid connection string
    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// SQLite error outside of command execution
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

fn column_suffix(column: &Option<String>) -> String {
    match column {
        Some(name) => format!(" (column '{}')", name),
        None => String::new(),
    }
}

impl DatabaseError {
    /// Create a connection error
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        DatabaseError::ConnectionError {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a connection error caused by a driver failure
    pub fn connection_with_source<S: Into<String>>(msg: S, source: rusqlite::Error) -> Self {
        DatabaseError::ConnectionError {
            message: msg.into(),
            source: Some(source),
        }
    }

    /// Create a binding error
    pub fn binding<S: Into<String>>(msg: S) -> Self {
        DatabaseError::BindingError(msg.into())
    }

    /// Create a conversion error
    pub fn conversion(expected: &str, actual: &str) -> Self {
        DatabaseError::ConversionError {
            expected: expected.to_string(),
            actual: actual.to_string(),
            column: None,
        }
    }

    /// Create a query error carrying the command text and parameter names
    pub fn query<E>(command: &str, parameters: &[String], source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        DatabaseError::QueryError {
            command: command.to_string(),
            parameters: parameters.to_vec(),
            source: source.into(),
        }
    }

    /// Create a query timeout error
    pub fn query_timeout(timeout_ms: u64) -> Self {
        DatabaseError::QueryTimeout { timeout_ms }
    }

    /// Create a transaction error
    pub fn transaction<S: Into<String>>(msg: S) -> Self {
        DatabaseError::TransactionError {
            message: msg.into(),
            source: None,
        }
    }

    /// Create a transaction error caused by a driver failure
    pub fn transaction_with_source<S: Into<String>>(msg: S, source: rusqlite::Error) -> Self {
        DatabaseError::TransactionError {
            message: msg.into(),
            source: Some(source),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        DatabaseError::Other(msg.into())
    }

    /// Attach the originating column to a conversion error; other errors pass through.
    pub fn in_column(self, name: &str) -> Self {
        match self {
            DatabaseError::ConversionError {
                expected,
                actual,
                column: None,
            } => DatabaseError::ConversionError {
                expected,
                actual,
                column: Some(name.to_string()),
            },
            other => other,
        }
    }

    /// Command text of a query error, if any
    pub fn command(&self) -> Option<&str> {
        match self {
            DatabaseError::QueryError { command, .. } => Some(command),
            _ => None,
        }
    }
}
