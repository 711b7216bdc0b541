#[cfg(feature = "duckdb")]
pub mod duckdb;
pub mod sqlite;

use crate::{
    config::{Backend, DatabaseConfig},
    table::TestRow,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("SQLite error: {0}")]
    SQLite(rusqlite::Error),
    #[cfg(feature = "duckdb")]
    #[error("DuckDB error: {0}")]
    DuckDB(::duckdb::Error),
    #[error("Backend {0} was not compiled into this binary")]
    UnsupportedBackend(Backend),
}

/// Coarse classification of engine errors, only the first two are ever recovered from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AlreadyExists,
    NotFound,
    Other,
}

impl ConnectionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SQLite(error) => sqlite::classify(error),
            #[cfg(feature = "duckdb")]
            Self::DuckDB(error) => duckdb::classify(error),
            Self::UnsupportedBackend(_) => ErrorKind::Other,
        }
    }
}

/// Operations the harness needs from an engine. Every call blocks until the engine answers.
pub trait Database {
    /// short backend name for logs
    fn backend(&self) -> &'static str;

    /// run a statement that returns no rows, e.g., DDL or DML
    fn execute(&mut self, statement: &str) -> Result<usize, ConnectionError>;

    /// run a query and read every value of every row, returns the number of rows
    fn fetch_all(&mut self, statement: &str) -> Result<usize, ConnectionError>;

    /// single integer result, e.g., `select count(*) ...`
    fn query_scalar(&mut self, statement: &str) -> Result<i64, ConnectionError>;

    /// insert all rows within a single transaction
    fn insert_rows(&mut self, rows: &[TestRow]) -> Result<(), ConnectionError>;

    /// names of the indexes defined on `table`
    fn indexes(&mut self, table: &str) -> Result<Vec<String>, ConnectionError>;

    /// names of the columns of `table` in definition order
    fn columns(&mut self, table: &str) -> Result<Vec<String>, ConnectionError>;

    /// Keep `column` of `table` equal to `expression` on every later write. Returns false when the
    /// engine has no way to do so and the caller has to refresh the column itself.
    fn sync_derived_column(
        &mut self,
        table: &str,
        column: &str,
        expression: &str,
    ) -> Result<bool, ConnectionError>;

    /// move the storage to the engine's transactional, concurrent configuration
    fn optimize_storage(&mut self) -> Result<(), ConnectionError>;

    fn close(self) -> Result<(), ConnectionError>
    where
        Self: Sized;
}

/// All supported adapters, selected through `DatabaseConfig`
#[derive(Debug)]
pub enum Connection {
    SQLite(sqlite::SQLiteConnection),
    #[cfg(feature = "duckdb")]
    DuckDB(duckdb::DuckDBConnection),
}

impl Connection {
    pub fn open(config: &DatabaseConfig) -> Result<Self, ConnectionError> {
        match config.backend {
            Backend::SQLite => Ok(Self::SQLite(sqlite::SQLiteConnection::open(&config.path)?)),
            #[cfg(feature = "duckdb")]
            Backend::DuckDB => Ok(Self::DuckDB(duckdb::DuckDBConnection::open(&config.path)?)),
            #[cfg(not(feature = "duckdb"))]
            Backend::DuckDB => Err(ConnectionError::UnsupportedBackend(Backend::DuckDB)),
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $inner:ident => $call:expr) => {
        match $self {
            Connection::SQLite($inner) => $call,
            #[cfg(feature = "duckdb")]
            Connection::DuckDB($inner) => $call,
        }
    };
}

impl Database for Connection {
    fn backend(&self) -> &'static str {
        dispatch!(self, inner => inner.backend())
    }

    fn execute(&mut self, statement: &str) -> Result<usize, ConnectionError> {
        dispatch!(self, inner => inner.execute(statement))
    }

    fn fetch_all(&mut self, statement: &str) -> Result<usize, ConnectionError> {
        dispatch!(self, inner => inner.fetch_all(statement))
    }

    fn query_scalar(&mut self, statement: &str) -> Result<i64, ConnectionError> {
        dispatch!(self, inner => inner.query_scalar(statement))
    }

    fn insert_rows(&mut self, rows: &[TestRow]) -> Result<(), ConnectionError> {
        dispatch!(self, inner => inner.insert_rows(rows))
    }

    fn indexes(&mut self, table: &str) -> Result<Vec<String>, ConnectionError> {
        dispatch!(self, inner => inner.indexes(table))
    }

    fn columns(&mut self, table: &str) -> Result<Vec<String>, ConnectionError> {
        dispatch!(self, inner => inner.columns(table))
    }

    fn sync_derived_column(
        &mut self,
        table: &str,
        column: &str,
        expression: &str,
    ) -> Result<bool, ConnectionError> {
        dispatch!(self, inner => inner.sync_derived_column(table, column, expression))
    }

    fn optimize_storage(&mut self) -> Result<(), ConnectionError> {
        dispatch!(self, inner => inner.optimize_storage())
    }

    fn close(self) -> Result<(), ConnectionError> {
        dispatch!(self, inner => inner.close())
    }
}
