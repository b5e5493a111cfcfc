use scriptledger_common::{Error, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::connection::{ConnectionFactory, SqlValue};
use crate::executor::StatementExecutor;
use crate::model::{ChangeScriptId, ExecutionOutcome, ScriptRunOutcome};
use crate::state_reader::SchemaStateReader;

/// Applies a change script at most once and writes its outcome to the ledger.
pub struct ChangeScriptRunner<F> {
    executor: StatementExecutor<F>,
    reader: SchemaStateReader<F>,
}

impl<F: ConnectionFactory> ChangeScriptRunner<F> {
    pub fn new(executor: StatementExecutor<F>) -> Self {
        Self {
            reader: SchemaStateReader::new(executor.clone()),
            executor,
        }
    }

    /// Runs `script_text` unless a record for `id.script_id` already exists.
    ///
    /// A failing script does not fail this call: the failure is logged and
    /// recorded with an `N` indicator. Errors returned here are an uninitialized
    /// database, a cancellation seen before any work started, a failure to read
    /// the ledger, or [`Error::LedgerWrite`] when the outcome row could not be
    /// stored.
    pub fn run_change_script(
        &self,
        id: ChangeScriptId,
        script_name: &str,
        script_text: &str,
        cancel: &CancellationToken,
    ) -> Result<ScriptRunOutcome> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let state = self.reader.get_state()?;
        if !state.is_initialized {
            return Err(Error::NotInitialized);
        }

        if state.find(id.script_id).is_some() {
            info!("{script_name} already executed. Skipping...");
            return Ok(ScriptRunOutcome::AlreadyExecuted);
        }

        debug!("running change script {id} ({script_name})");
        let outcome = match self.executor.execute_script(script_text, cancel) {
            Ok(()) => {
                info!("{script_name} executed successfully.");
                ExecutionOutcome::Success
            }
            Err(e) => {
                error!("{script_name} failed: {e}");
                ExecutionOutcome::Failure
            }
        };

        self.record(id, script_name, outcome)?;
        Ok(ScriptRunOutcome::Recorded(outcome))
    }

    fn record(
        &self,
        id: ChangeScriptId,
        script_name: &str,
        outcome: ExecutionOutcome,
    ) -> Result<()> {
        let sql = self.executor.factory().dialect();
        let params = [
            SqlValue::Integer(id.legacy_release_sequence),
            SqlValue::from(id.script_id),
            SqlValue::from(script_name),
            SqlValue::from(outcome.indicator()),
        ];

        self.executor
            .execute_with_params(sql.insert_record, &params)
            .map(|_| ())
            .map_err(|e| {
                error!(
                    "{script_name} ran with outcome {outcome} but recording it in the ledger failed: {e}"
                );
                Error::LedgerWrite {
                    script_name: script_name.to_string(),
                    outcome: outcome.to_string(),
                    message: e.to_string(),
                }
            })
    }
}
