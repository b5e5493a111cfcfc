use scriptledger_common::{Error, Result};
use std::collections::HashMap;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::connection::{ConnectionFactory, DbConnection};
use crate::executor::StatementExecutor;
use crate::state_reader::SchemaStateReader;

/// Creates the tracking table and its sequence when they are missing.
pub struct Initializer<F> {
    executor: StatementExecutor<F>,
    reader: SchemaStateReader<F>,
}

impl<F: ConnectionFactory> Initializer<F> {
    pub fn new(executor: StatementExecutor<F>) -> Self {
        Self {
            reader: SchemaStateReader::new(executor.clone()),
            executor,
        }
    }

    /// No-op when already initialized. Otherwise the initialization statements run
    /// in order inside one transaction, so a failure leaves nothing behind.
    pub fn initialize_database(&self) -> Result<()> {
        if self.reader.get_state()?.is_initialized {
            info!("database already initialized");
            return Ok(());
        }

        let statements = self.executor.factory().dialect().initialize;
        let mut conn = self.executor.factory().connect()?;

        conn.begin()?;
        for (i, statement) in statements.iter().enumerate() {
            if let Err(e) = conn.execute(statement) {
                error!("initialization step {} failed: {e}", i + 1);
                if let Err(rollback) = conn.rollback() {
                    error!("rollback after failed initialization also failed: {rollback}");
                }
                return Err(e);
            }
        }
        conn.commit()?;

        info!("database initialized");
        Ok(())
    }

    /// Reconciling scripts against canonical GUIDs is not offered by this executor.
    pub fn upgrade_schema(&self, canonical_guids: &HashMap<i32, Uuid>) -> Result<()> {
        warn!(
            "schema upgrade requested for {} script(s); not supported",
            canonical_guids.len()
        );
        Err(Error::NotSupported("upgrading the change script schema".to_string()))
    }
}
