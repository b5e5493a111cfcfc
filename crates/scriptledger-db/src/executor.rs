use scriptledger_common::{Error, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::connection::{ConnectionFactory, DbConnection, SqlValue};
use crate::splitter::split_script;

/// Runs statements against the target database, one connection per call.
pub struct StatementExecutor<F> {
    factory: Arc<F>,
}

impl<F> Clone for StatementExecutor<F> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
        }
    }
}

impl<F: ConnectionFactory> StatementExecutor<F> {
    pub fn new(factory: Arc<F>) -> Self {
        Self { factory }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Splits `script` and runs every resulting statement in order.
    pub fn execute_script(&self, script: &str, cancel: &CancellationToken) -> Result<()> {
        let split = split_script(script);
        if split.is_empty() {
            return Ok(());
        }

        if split.is_delimited() {
            debug!(
                "Script has query delimiters (i.e. \";<newline>/<newline>\"), and will run as {} separate queries.",
                split.len()
            );
        } else {
            debug!("Script does not have any query delimiters (i.e. \";<newline>/<newline>\").");
        }

        self.execute_statements(split.statements(), cancel)
    }

    /// Runs `statements` sequentially on one connection, stopping at the first
    /// failure. Cancellation is observed between statements only. An empty slice
    /// never opens a connection.
    pub fn execute_statements<S: AsRef<str>>(
        &self,
        statements: &[S],
        cancel: &CancellationToken,
    ) -> Result<()> {
        if statements.is_empty() {
            return Ok(());
        }

        let mut conn = self.factory.connect()?;
        for (i, statement) in statements.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            debug!("Executing Query {}...", i + 1);
            conn.execute(statement.as_ref())?;
        }

        Ok(())
    }

    pub fn execute_with_params(&self, sql: &str, params: &[SqlValue]) -> Result<usize> {
        let mut conn = self.factory.connect()?;
        conn.execute_with_params(sql, params)
    }

    /// Runs `read` on a connection to an existing database. Returns `None`
    /// without creating anything when there is no database yet.
    pub fn read_existing<T>(
        &self,
        read: impl FnOnce(&mut F::Connection) -> Result<T>,
    ) -> Result<Option<T>> {
        match self.factory.connect_existing()? {
            Some(mut conn) => read(&mut conn).map(Some),
            None => Ok(None),
        }
    }
}
