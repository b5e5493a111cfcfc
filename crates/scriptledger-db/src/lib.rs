pub mod connection;
pub mod executor;
pub mod initializer;
pub mod model;
pub mod provider;
pub mod runner;
pub mod schema;
pub mod splitter;
pub mod sqlite;
pub mod state_reader;

pub use connection::{ConnectionFactory, DataRow, DataTable, DbConnection, SqlValue};
pub use executor::StatementExecutor;
pub use initializer::Initializer;
pub use model::{
    ChangeScriptId, ChangeScriptState, ExecutionOutcome, ExecutionRecord, LEDGER_SCHEMA_VERSION,
    ScriptRunOutcome,
};
pub use provider::{ChangeScriptExecutor, ChangeScriptProvider, SqliteChangeScriptProvider};
pub use runner::ChangeScriptRunner;
pub use schema::LedgerSql;
pub use splitter::{SplitScript, split_script};
pub use sqlite::{SqliteConnection, SqliteConnectionFactory};
pub use state_reader::SchemaStateReader;

pub use tokio_util::sync::CancellationToken;
