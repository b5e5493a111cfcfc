use scriptledger_common::{Error, Result};
use tracing::debug;

use crate::connection::{ConnectionFactory, DataRow, DbConnection};
use crate::executor::StatementExecutor;
use crate::model::{
    ChangeScriptId, ChangeScriptState, ExecutionOutcome, ExecutionRecord, parse_timestamp,
};
use crate::schema::{COL_EXECUTED, COL_INDICATOR, COL_NAME, COL_RELEASE, COL_SCRIPT_ID};

/// Reads the tracking table into a [`ChangeScriptState`]. Read-only.
pub struct SchemaStateReader<F> {
    executor: StatementExecutor<F>,
}

impl<F: ConnectionFactory> SchemaStateReader<F> {
    pub fn new(executor: StatementExecutor<F>) -> Self {
        Self { executor }
    }

    pub fn get_state(&self) -> Result<ChangeScriptState> {
        let sql = self.executor.factory().dialect();

        let state = self.executor.read_existing(|conn| {
            if conn.query_scalar(sql.table_exists)? == 0 {
                debug!("tracking table not found, database is not initialized");
                return Ok(ChangeScriptState::uninitialized());
            }

            let table = conn.query_table(sql.select_records)?;
            let records = table
                .rows()
                .map(|row| row_to_record(&row))
                .collect::<Result<Vec<_>>>()?;

            debug!("loaded {} change script record(s)", records.len());
            Ok(ChangeScriptState::initialized(records))
        })?;

        Ok(state.unwrap_or_else(|| {
            debug!("database does not exist yet, nothing to read");
            ChangeScriptState::uninitialized()
        }))
    }
}

fn row_to_record(row: &DataRow<'_>) -> Result<ExecutionRecord> {
    let script_id = i32::try_from(row.get_i64(COL_SCRIPT_ID)?)
        .map_err(|e| Error::Database(format!("{COL_SCRIPT_ID} out of range: {e}")))?;

    Ok(ExecutionRecord {
        id: ChangeScriptId::new(script_id, row.get_i64(COL_RELEASE)?),
        name: row.get_str(COL_NAME)?.to_string(),
        executed_at: parse_timestamp(row.get_str(COL_EXECUTED)?)?,
        outcome: ExecutionOutcome::from_indicator(row.get_str(COL_INDICATOR)?),
    })
}

#[cfg(test)]
mod tests {
    use super::row_to_record;
    use crate::connection::{DataTable, SqlValue};
    use crate::model::ExecutionOutcome;

    fn ledger_row(indicator: &str) -> DataTable {
        DataTable {
            columns: [
                "Numeric_Release_Number",
                "Script_Id",
                "Script_Sequence",
                "Script_Name",
                "Executed_Date",
                "Success_Indicator",
            ]
            .map(String::from)
            .to_vec(),
            rows: vec![vec![
                SqlValue::Integer(100),
                SqlValue::Integer(5),
                SqlValue::Integer(1),
                SqlValue::Text("add-orders".into()),
                SqlValue::Text("2024-05-06 07:08:09".into()),
                SqlValue::Text(indicator.into()),
            ]],
        }
    }

    #[test]
    fn maps_every_ledger_column() {
        let table = ledger_row("Y");
        let row = table.rows().next().expect("row");
        let record = row_to_record(&row).expect("record should map");

        assert_eq!(record.id.script_id, 5);
        assert_eq!(record.id.legacy_release_sequence, 100);
        assert_eq!(record.name, "add-orders");
        assert_eq!(record.executed_at.to_rfc3339(), "2024-05-06T07:08:09+00:00");
        assert_eq!(record.outcome, ExecutionOutcome::Success);
    }

    #[test]
    fn unknown_indicator_maps_to_failure() {
        let table = ledger_row("?");
        let row = table.rows().next().expect("row");

        assert_eq!(
            row_to_record(&row).expect("record should map").outcome,
            ExecutionOutcome::Failure
        );
    }
}
