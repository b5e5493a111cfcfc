use async_trait::async_trait;
use scriptledger_common::{Error, Result};
use scriptledger_config::DatabaseConfig;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::connection::ConnectionFactory;
use crate::executor::StatementExecutor;
use crate::initializer::Initializer;
use crate::model::{ChangeScriptId, ChangeScriptState, LEDGER_SCHEMA_VERSION, ScriptRunOutcome};
use crate::runner::ChangeScriptRunner;
use crate::sqlite::SqliteConnectionFactory;
use crate::state_reader::SchemaStateReader;

/// Capability a host orchestrator drives to bring a database up to date.
#[async_trait]
pub trait ChangeScriptExecutor: Send + Sync {
    /// Highest tracking schema version this executor understands.
    fn max_change_script_version(&self) -> i32;

    async fn get_state(&self, cancel: &CancellationToken) -> Result<ChangeScriptState>;

    async fn execute_change_script(
        &self,
        id: ChangeScriptId,
        script_name: &str,
        script_text: &str,
        cancel: &CancellationToken,
    ) -> Result<ScriptRunOutcome>;

    async fn initialize_database(&self, cancel: &CancellationToken) -> Result<()>;

    async fn upgrade_schema(
        &self,
        canonical_guids: &HashMap<i32, Uuid>,
        cancel: &CancellationToken,
    ) -> Result<()>;

    /// Runs an arbitrary script outside the ledger. Failures propagate.
    async fn execute_query(&self, query: &str, cancel: &CancellationToken) -> Result<()>;
}

struct ProviderCore<F> {
    executor: StatementExecutor<F>,
    reader: SchemaStateReader<F>,
    runner: ChangeScriptRunner<F>,
    initializer: Initializer<F>,
}

/// [`ChangeScriptExecutor`] over any [`ConnectionFactory`]. Database work runs on
/// the blocking pool; nothing here waits on a future from synchronous code.
pub struct ChangeScriptProvider<F> {
    core: Arc<ProviderCore<F>>,
}

pub type SqliteChangeScriptProvider = ChangeScriptProvider<SqliteConnectionFactory>;

impl<F> Clone for ChangeScriptProvider<F> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<F: ConnectionFactory + 'static> ChangeScriptProvider<F> {
    pub fn new(factory: F) -> Self {
        let executor = StatementExecutor::new(Arc::new(factory));
        Self {
            core: Arc::new(ProviderCore {
                reader: SchemaStateReader::new(executor.clone()),
                runner: ChangeScriptRunner::new(executor.clone()),
                initializer: Initializer::new(executor.clone()),
                executor,
            }),
        }
    }

    pub fn factory(&self) -> &F {
        self.core.executor.factory()
    }

    async fn run_blocking<T, Op>(
        &self,
        operation: &'static str,
        cancel: &CancellationToken,
        op: Op,
    ) -> Result<T>
    where
        T: Send + 'static,
        Op: FnOnce(&ProviderCore<F>) -> Result<T> + Send + 'static,
    {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let core = Arc::clone(&self.core);
        tokio::task::spawn_blocking(move || op(&core))
            .await
            .map_err(|e| Error::Other(format!("{operation} task failed: {e}")))?
    }
}

impl SqliteChangeScriptProvider {
    /// `path` is the already resolved database file; `config` supplies the
    /// connection settings.
    pub fn open(path: impl Into<PathBuf>, config: &DatabaseConfig) -> Self {
        Self::new(
            SqliteConnectionFactory::new(path)
                .with_busy_timeout(Duration::from_millis(config.busy_timeout_ms)),
        )
    }
}

#[async_trait]
impl<F: ConnectionFactory + 'static> ChangeScriptExecutor for ChangeScriptProvider<F> {
    fn max_change_script_version(&self) -> i32 {
        LEDGER_SCHEMA_VERSION
    }

    async fn get_state(&self, cancel: &CancellationToken) -> Result<ChangeScriptState> {
        self.run_blocking("get_state", cancel, |core| core.reader.get_state())
            .await
    }

    async fn execute_change_script(
        &self,
        id: ChangeScriptId,
        script_name: &str,
        script_text: &str,
        cancel: &CancellationToken,
    ) -> Result<ScriptRunOutcome> {
        let script_name = script_name.to_string();
        let script_text = script_text.to_string();
        let token = cancel.clone();
        self.run_blocking("execute_change_script", cancel, move |core| {
            core.runner
                .run_change_script(id, &script_name, &script_text, &token)
        })
        .await
    }

    async fn initialize_database(&self, cancel: &CancellationToken) -> Result<()> {
        self.run_blocking("initialize_database", cancel, |core| {
            core.initializer.initialize_database()
        })
        .await
    }

    async fn upgrade_schema(
        &self,
        canonical_guids: &HashMap<i32, Uuid>,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        self.core.initializer.upgrade_schema(canonical_guids)
    }

    async fn execute_query(&self, query: &str, cancel: &CancellationToken) -> Result<()> {
        let query = query.to_string();
        let token = cancel.clone();
        self.run_blocking("execute_query", cancel, move |core| {
            core.executor.execute_script(&query, &token)
        })
        .await
    }
}
