use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, OpenFlags, params_from_iter};
use scriptledger_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::connection::{ConnectionFactory, DataTable, DbConnection, SqlValue};
use crate::schema::{LedgerSql, SQLITE};

/// Opens a new connection to a SQLite database file per operation.
#[derive(Debug, Clone)]
pub struct SqliteConnectionFactory {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteConnectionFactory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: Duration::from_millis(5000),
        }
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn configure(&self, conn: Connection) -> Result<SqliteConnection> {
        conn.busy_timeout(self.busy_timeout)
            .map_err(|e| Error::Database(format!("failed to set busy timeout: {e}")))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;

        Ok(SqliteConnection { conn })
    }
}

impl ConnectionFactory for SqliteConnectionFactory {
    type Connection = SqliteConnection;

    fn connect(&self) -> Result<SqliteConnection> {
        debug!("opening database at {}", self.path.display());
        let conn = Connection::open(&self.path)
            .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;
        self.configure(conn)
    }

    /// Opens without `SQLITE_OPEN_CREATE`, so reading a missing file leaves no
    /// empty database behind.
    fn connect_existing(&self) -> Result<Option<SqliteConnection>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&self.path, flags)
            .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;
        self.configure(conn).map(Some)
    }

    fn dialect(&self) -> &'static LedgerSql {
        &SQLITE
    }
}

pub struct SqliteConnection {
    conn: Connection,
}

impl DbConnection for SqliteConnection {
    fn execute(&mut self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| Error::Database(e.to_string()))
    }

    fn execute_with_params(&mut self, sql: &str, params: &[SqlValue]) -> Result<usize> {
        self.conn
            .execute(sql, params_from_iter(params.iter().map(to_sqlite_value)))
            .map_err(|e| Error::Database(e.to_string()))
    }

    fn query_scalar(&mut self, sql: &str) -> Result<i64> {
        let value: Value = self
            .conn
            .query_row(sql, [], |row| row.get(0))
            .map_err(|e| Error::Database(format!("scalar query failed: {e}")))?;

        from_sqlite_value(value).as_i64().ok_or_else(|| {
            Error::Database(format!("scalar query did not return an integer: {sql}"))
        })
    }

    fn query_table(&mut self, sql: &str) -> Result<DataTable> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| Error::Database(format!("failed to prepare query: {e}")))?;

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|idx| row.get_ref(idx).map(from_value_ref))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })
            .map_err(|e| Error::Database(format!("failed to execute query: {e}")))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Database(format!("failed to collect rows: {e}")))?;

        Ok(DataTable { columns, rows })
    }
}

fn to_sqlite_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(v) => Value::Integer(*v),
        SqlValue::Real(v) => Value::Real(*v),
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Blob(b) => Value::Blob(b.clone()),
    }
}

fn from_sqlite_value(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(v) => SqlValue::Integer(v),
        Value::Real(v) => SqlValue::Real(v),
        Value::Text(s) => SqlValue::Text(s),
        Value::Blob(b) => SqlValue::Blob(b),
    }
}

fn from_value_ref(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(v) => SqlValue::Integer(v),
        ValueRef::Real(v) => SqlValue::Real(v),
        ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
    }
}
