use super::{ConnectionError, Database, ErrorKind};
use crate::table::{Field, TestRow, INSERT_STATEMENT};
use duckdb::{
    params, params_from_iter,
    types::{ToSqlOutput, Value, ValueRef},
    Connection, ToSql,
};
use std::path::Path;
use tracing::{debug, error, info};

#[derive(Debug)]
pub struct DuckDBConnection {
    connection: Connection,
}

impl From<duckdb::Error> for ConnectionError {
    fn from(value: duckdb::Error) -> Self {
        ConnectionError::DuckDB(value)
    }
}

impl ToSql for Field<'_> {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(match *self {
            Field::Int(value) => ToSqlOutput::Owned(Value::BigInt(value)),
            Field::Float(value) => ToSqlOutput::Owned(Value::Double(value)),
            Field::Bool(value) => ToSqlOutput::Owned(Value::Boolean(value)),
            Field::Text(value) => ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes())),
        })
    }
}

/// DuckDB catalog errors carry no distinct code, only a message such as
/// "Catalog Error: Index with name idx_rating does not exist!"
pub fn classify(error: &duckdb::Error) -> ErrorKind {
    match error {
        duckdb::Error::DuckDBFailure(_, Some(message)) => {
            if message.contains("already exists") {
                ErrorKind::AlreadyExists
            } else if message.contains("does not exist") {
                ErrorKind::NotFound
            } else {
                ErrorKind::Other
            }
        }
        _ => ErrorKind::Other,
    }
}

impl DuckDBConnection {
    pub fn open(path: &Path) -> Result<Self, ConnectionError> {
        let connection = Connection::open(path)?;
        info!(path = ?path, "Opened DuckDB connection");

        Ok(Self { connection })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, ConnectionError> {
        Ok(Self {
            connection: Connection::open_in_memory()?,
        })
    }
}

impl Database for DuckDBConnection {
    fn backend(&self) -> &'static str {
        "duckdb"
    }

    fn execute(&mut self, statement: &str) -> Result<usize, ConnectionError> {
        debug!(statement = statement, "Executing");

        Ok(self.connection.execute(statement, [])?)
    }

    fn fetch_all(&mut self, statement: &str) -> Result<usize, ConnectionError> {
        let mut prepared = self.connection.prepare(statement)?;
        let mut rows = prepared.query([])?;
        // the column count is only known once the statement ran
        let columns = rows
            .as_ref()
            .map(|statement| statement.column_count())
            .unwrap_or(0);
        let mut count = 0;

        while let Some(row) = rows.next()? {
            for index in 0..columns {
                row.get_ref(index)?;
            }
            count += 1;
        }

        Ok(count)
    }

    fn query_scalar(&mut self, statement: &str) -> Result<i64, ConnectionError> {
        Ok(self.connection.query_row(statement, [], |row| row.get(0))?)
    }

    fn insert_rows(&mut self, rows: &[TestRow]) -> Result<(), ConnectionError> {
        let tx = self.connection.transaction()?;

        {
            let mut statement = tx.prepare_cached(INSERT_STATEMENT.as_str())?;
            for row in rows {
                statement.execute(params_from_iter(row.values()))?;
            }
        }
        tx.commit()?;

        debug!("Stored {} rows", rows.len());

        Ok(())
    }

    fn indexes(&mut self, table: &str) -> Result<Vec<String>, ConnectionError> {
        self.connection
            .prepare_cached(
                "select index_name from duckdb_indexes()
                 where table_name = ? order by index_name",
            )?
            .query_map(params![table], |row| row.get(0))?
            .try_fold(Vec::new(), |mut init, result| {
                init.push(result?);

                Ok::<Vec<String>, ConnectionError>(init)
            })
    }

    fn columns(&mut self, table: &str) -> Result<Vec<String>, ConnectionError> {
        self.connection
            .prepare_cached(
                "select column_name from information_schema.columns
                 where table_name = ? order by ordinal_position",
            )?
            .query_map(params![table], |row| row.get(0))?
            .try_fold(Vec::new(), |mut init, result| {
                init.push(result?);

                Ok::<Vec<String>, ConnectionError>(init)
            })
    }

    fn sync_derived_column(
        &mut self,
        _table: &str,
        column: &str,
        _expression: &str,
    ) -> Result<bool, ConnectionError> {
        // no triggers, the loader refreshes the column after writing
        debug!(column = column, "DuckDB cannot maintain derived columns");

        Ok(false)
    }

    fn optimize_storage(&mut self) -> Result<(), ConnectionError> {
        // DuckDB storage is always MVCC, folding the WAL into the database file is all there is to do
        self.connection.execute_batch("checkpoint")?;
        info!("Checkpointed DuckDB storage");

        Ok(())
    }

    fn close(mut self) -> Result<(), ConnectionError> {
        let mut counter = 0;
        while let Err((connection, error)) = self.connection.close() {
            counter += 1;
            self.connection = connection;
            error!(error = ?error, "Failed to close DuckDB connection: {error}, trying again {counter}/3");

            if counter == 3 {
                return Err(ConnectionError::DuckDB(error));
            }
        }

        info!("Closed DuckDB connection");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_missing_index() {
        let mut connection = DuckDBConnection::open_in_memory().unwrap();
        let error = connection.execute("drop index idx_missing").unwrap_err();

        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn classify_duplicate_column() {
        let mut connection = DuckDBConnection::open_in_memory().unwrap();
        connection.execute("create table t (a integer)").unwrap();
        let error = connection
            .execute("alter table t add column a integer")
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn classify_syntax_error_as_other() {
        let mut connection = DuckDBConnection::open_in_memory().unwrap();
        let error = connection.fetch_all("selec 1").unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Other);
    }

    #[test]
    fn fetch_all_reads_every_row() {
        let mut connection = DuckDBConnection::open_in_memory().unwrap();
        connection.execute("create table t (a integer, b varchar)").unwrap();
        connection
            .execute("insert into t values (1, 'x'), (2, 'y'), (3, null)")
            .unwrap();

        assert_eq!(connection.fetch_all("select * from t").unwrap(), 3);
        assert_eq!(connection.fetch_all("select * from t where a > 5").unwrap(), 0);
        assert_eq!(connection.query_scalar("select count(*) from t").unwrap(), 3);
    }

    #[test]
    fn introspection_lists_indexes_and_columns() {
        let mut connection = DuckDBConnection::open_in_memory().unwrap();
        connection.execute("create table t (a integer, b varchar)").unwrap();
        connection.execute("create index idx_b on t (b)").unwrap();

        assert_eq!(connection.indexes("t").unwrap(), vec!["idx_b".to_owned()]);
        assert_eq!(
            connection.columns("t").unwrap(),
            vec!["a".to_owned(), "b".to_owned()]
        );
    }

    #[test]
    fn derived_columns_are_left_to_the_caller() {
        let mut connection = DuckDBConnection::open_in_memory().unwrap();

        assert!(!connection.sync_derived_column("t", "c", "a * b").unwrap());
    }
}
