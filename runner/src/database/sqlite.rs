use super::{ConnectionError, Database, ErrorKind};
use crate::table::{Field, TestRow, INSERT_STATEMENT};
use itertools::Itertools;
use rusqlite::{
    params, params_from_iter,
    types::{ToSqlOutput, ValueRef},
    Connection, ToSql,
};
use std::path::Path;
use tracing::{debug, error, info};

#[derive(Debug)]
pub struct SQLiteConnection {
    connection: Connection,
}

impl From<rusqlite::Error> for ConnectionError {
    fn from(error: rusqlite::Error) -> Self {
        ConnectionError::SQLite(error)
    }
}

impl ToSql for Field<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match *self {
            Field::Int(value) => ToSqlOutput::from(value),
            Field::Float(value) => ToSqlOutput::from(value),
            Field::Bool(value) => ToSqlOutput::from(value),
            Field::Text(value) => ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes())),
        })
    }
}

/// SQLite reports most schema conflicts as a generic `SQLITE_ERROR`, the message is the only
/// reliable discriminator
pub fn classify(error: &rusqlite::Error) -> ErrorKind {
    match error {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            if message.starts_with("duplicate column name") || message.ends_with("already exists")
            {
                ErrorKind::AlreadyExists
            } else if message.starts_with("no such") {
                ErrorKind::NotFound
            } else {
                ErrorKind::Other
            }
        }
        _ => ErrorKind::Other,
    }
}

/// identifiers appearing in a simple arithmetic expression such as `price * rating`
fn referenced_columns(expression: &str) -> String {
    expression
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|token| token.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_'))
        .unique()
        .join(", ")
}

impl SQLiteConnection {
    pub fn open(path: &Path) -> Result<Self, ConnectionError> {
        let connection = Connection::open(path)?;
        info!(path = ?path, "Opened SQLite connection");

        Ok(Self { connection })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self, ConnectionError> {
        Ok(Self {
            connection: Connection::open_in_memory()?,
        })
    }
}

impl Database for SQLiteConnection {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn execute(&mut self, statement: &str) -> Result<usize, ConnectionError> {
        debug!(statement = statement, "Executing");

        Ok(self.connection.execute(statement, [])?)
    }

    fn fetch_all(&mut self, statement: &str) -> Result<usize, ConnectionError> {
        let mut prepared = self.connection.prepare(statement)?;
        let columns = prepared.column_count();
        let mut rows = prepared.query([])?;
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
        let mut tx = self.connection.transaction()?;
        tx.set_drop_behavior(rusqlite::DropBehavior::Rollback);

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
                "select name from sqlite_master
                 where type = 'index' and tbl_name = ? and sql is not null
                 order by name",
            )?
            .query_map(params![table], |row| row.get(0))?
            .try_fold(Vec::new(), |mut init, result| {
                init.push(result?);

                Ok::<Vec<String>, ConnectionError>(init)
            })
    }

    fn columns(&mut self, table: &str) -> Result<Vec<String>, ConnectionError> {
        self.connection
            .prepare_cached("select name from pragma_table_xinfo(?) order by cid")?
            .query_map(params![table], |row| row.get(0))?
            .try_fold(Vec::new(), |mut init, result| {
                init.push(result?);

                Ok::<Vec<String>, ConnectionError>(init)
            })
    }

    fn sync_derived_column(
        &mut self,
        table: &str,
        column: &str,
        expression: &str,
    ) -> Result<bool, ConnectionError> {
        // the rowid identifies the written row whatever the primary key is
        let triggers = [
            format!(
                "create trigger if not exists {column}_insert after insert on {table}
                 begin
                     update {table} set {column} = {expression} where rowid = new.rowid;
                 end"
            ),
            format!(
                "create trigger if not exists {column}_update after update of {columns} on {table}
                 begin
                     update {table} set {column} = {expression} where rowid = new.rowid;
                 end",
                columns = referenced_columns(expression),
            ),
        ];

        for trigger in triggers.iter() {
            self.execute(trigger)?;
        }
        info!(column = column, "Installed triggers for derived column");

        Ok(true)
    }

    fn optimize_storage(&mut self) -> Result<(), ConnectionError> {
        // in-memory databases stay on "memory", that is not an error
        let mode: String = self.connection.pragma_update_and_check(
            None,
            "journal_mode",
            "wal",
            |row| row.get(0),
        )?;
        info!(journal_mode = %mode, "Switched SQLite journal mode");

        Ok(())
    }

    fn close(mut self) -> Result<(), ConnectionError> {
        let mut counter = 0;
        while let Err((connection, error)) = self.connection.close() {
            counter += 1;
            self.connection = connection;
            error!(error = ?error, "Failed to close SQLite connection: {error}, trying again {counter}/3");

            if counter == 3 {
                error!("Failed to close connection");

                return Err(ConnectionError::SQLite(error));
            }
        }

        info!("Closed SQLite connection");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_missing_index() {
        let mut connection = SQLiteConnection::open_in_memory().unwrap();
        let error = connection.execute("drop index idx_missing").unwrap_err();

        assert_eq!(error.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn classify_duplicate_column() {
        let mut connection = SQLiteConnection::open_in_memory().unwrap();
        connection.execute("create table t (a integer)").unwrap();
        let error = connection
            .execute("alter table t add column a integer")
            .unwrap_err();

        assert_eq!(error.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn classify_syntax_error_as_other() {
        let mut connection = SQLiteConnection::open_in_memory().unwrap();
        let error = connection.fetch_all("selec 1").unwrap_err();

        assert_eq!(error.kind(), ErrorKind::Other);
    }

    #[test]
    fn fetch_all_counts_rows() {
        let mut connection = SQLiteConnection::open_in_memory().unwrap();
        connection.execute("create table t (a integer, b text)").unwrap();
        connection
            .execute("insert into t values (1, 'x'), (2, 'y'), (3, null)")
            .unwrap();

        assert_eq!(connection.fetch_all("select * from t").unwrap(), 3);
        assert_eq!(connection.query_scalar("select sum(a) from t").unwrap(), 6);
    }

    #[test]
    fn expression_columns() {
        assert_eq!(referenced_columns("price * rating"), "price, rating");
        assert_eq!(referenced_columns("(a + b) * 2 - a"), "a, b");
    }

    #[test]
    fn triggers_follow_inserts_and_updates() {
        let mut connection = SQLiteConnection::open_in_memory().unwrap();
        connection
            .execute("create table t (id integer primary key, a double, b double, c double)")
            .unwrap();

        assert!(connection.sync_derived_column("t", "c", "a * b").unwrap());
        // installing twice is harmless
        assert!(connection.sync_derived_column("t", "c", "a * b").unwrap());

        connection
            .execute("insert into t (id, a, b) values (1, 2, 3), (2, 4, 5)")
            .unwrap();
        assert_eq!(
            connection
                .query_scalar("select cast(sum(c) as integer) from t")
                .unwrap(),
            26
        );

        connection.execute("update t set a = 10 where id = 1").unwrap();
        assert_eq!(
            connection
                .query_scalar("select cast(c as integer) from t where id = 1")
                .unwrap(),
            30
        );
    }

    #[test]
    fn introspection_lists_user_indexes_and_columns() {
        let mut connection = SQLiteConnection::open_in_memory().unwrap();
        connection
            .execute("create table t (a integer primary key, b text unique)")
            .unwrap();
        connection.execute("create index idx_b on t (b)").unwrap();

        // the implicit unique index has no sql and is skipped
        assert_eq!(connection.indexes("t").unwrap(), vec!["idx_b".to_owned()]);
        assert_eq!(
            connection.columns("t").unwrap(),
            vec!["a".to_owned(), "b".to_owned()]
        );
    }
}
