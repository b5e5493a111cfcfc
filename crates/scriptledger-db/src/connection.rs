use scriptledger_common::{Error, Result};

use crate::schema::LedgerSql;

/// A value bound to, or read back from, a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Real(v) => Some(*v as i64),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// A fully materialized result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<SqlValue>>,
}

impl DataTable {
    pub fn rows(&self) -> impl Iterator<Item = DataRow<'_>> {
        self.rows.iter().map(move |values| DataRow {
            columns: &self.columns,
            values,
        })
    }
}

/// Borrowed view of one row with lookup by column name.
#[derive(Debug, Clone, Copy)]
pub struct DataRow<'a> {
    columns: &'a [String],
    values: &'a [SqlValue],
}

impl<'a> DataRow<'a> {
    /// Column names compare case-insensitively, as catalogs usually do.
    pub fn get(&self, column: &str) -> Result<&'a SqlValue> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|idx| self.values.get(idx))
            .ok_or_else(|| Error::Database(format!("column not found in result: {column}")))
    }

    pub fn get_i64(&self, column: &str) -> Result<i64> {
        let value = self.get(column)?;
        value
            .as_i64()
            .ok_or_else(|| Error::Database(format!("column {column} is not an integer: {value:?}")))
    }

    pub fn get_str(&self, column: &str) -> Result<&'a str> {
        let value = self.get(column)?;
        value
            .as_str()
            .ok_or_else(|| Error::Database(format!("column {column} is not text: {value:?}")))
    }
}

/// One open database session. Dropping it releases the underlying connection.
pub trait DbConnection {
    /// Runs SQL that returns no rows.
    fn execute(&mut self, sql: &str) -> Result<()>;

    /// Runs one statement with positional parameters and returns the rows affected.
    fn execute_with_params(&mut self, sql: &str, params: &[SqlValue]) -> Result<usize>;

    /// Runs a query and returns the first column of its first row as an integer.
    fn query_scalar(&mut self, sql: &str) -> Result<i64>;

    fn query_table(&mut self, sql: &str) -> Result<DataTable>;

    fn begin(&mut self) -> Result<()> {
        self.execute("BEGIN")
    }

    fn commit(&mut self) -> Result<()> {
        self.execute("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        self.execute("ROLLBACK")
    }
}

/// Hands out fresh connections to the target database.
pub trait ConnectionFactory: Send + Sync {
    type Connection: DbConnection;

    fn connect(&self) -> Result<Self::Connection>;

    /// Opens the database only if it already exists. Engines whose connect never
    /// creates anything can rely on the default.
    fn connect_existing(&self) -> Result<Option<Self::Connection>> {
        self.connect().map(Some)
    }

    /// SQL texts used for the tracking table on this engine.
    fn dialect(&self) -> &'static LedgerSql;
}
