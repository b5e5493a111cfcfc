use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scriptledger_common::Error;
use scriptledger_db::{
    CancellationToken, ChangeScriptExecutor, ChangeScriptId, ChangeScriptState, ExecutionRecord,
    ScriptRunOutcome, SqliteChangeScriptProvider,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "scriptledger",
    version,
    about = "scriptledger - apply and track database change scripts"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding config.yml / config.toml
    #[arg(long, global = true, env = "SCRIPTLEDGER_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Database file, overriding the configured path
    #[arg(long, global = true, env = "SCRIPTLEDGER_DATABASE")]
    database: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the tracking table if it does not exist
    Init,

    /// Show the tracking table
    Status {
        /// Print the state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run one change script unless it has already been recorded
    Run {
        /// Script id, unique across all change scripts
        #[arg(long)]
        id: i32,

        /// Release sequence the script belongs to
        #[arg(long)]
        release: i64,

        /// Name recorded in the ledger (defaults to the file name)
        #[arg(long)]
        name: Option<String>,

        file: PathBuf,
    },

    /// Run a script without recording it
    Exec { file: PathBuf },

    /// Reconcile scripts against canonical ids (not supported)
    Upgrade,
}

impl Commands {
    /// Commands that may create the database file. `status` only ever reads.
    fn writes_database(&self) -> bool {
        !matches!(self, Self::Status { .. } | Self::Upgrade)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = match &cli.config_dir {
        Some(dir) => scriptledger_config::ConfigLoader::with_dir(dir),
        None => scriptledger_config::ConfigLoader::new(),
    };
    let config = config_loader.load()?;

    let log_level = cli
        .log_level
        .or(config.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    match config_loader.config_file() {
        Some(path) => tracing::info!("loaded config from {}", path.display()),
        None => tracing::info!(
            "no config file in {}, using defaults",
            config_loader.config_dir().display()
        ),
    }

    let database = config_loader.database_path(&config.database, cli.database.as_deref())?;
    if cli.command.writes_database() {
        config_loader.ensure_database_dir(&database)?;
    }
    tracing::debug!("using database {}", database.display());
    let provider = SqliteChangeScriptProvider::open(database, &config.database);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current statement");
            on_interrupt.cancel();
        }
    });

    match cli.command {
        Commands::Init => {
            provider
                .initialize_database(&cancel)
                .await
                .map_err(explain)?;
            println!("Database initialized.");
        }
        Commands::Status { json } => {
            let state = provider.get_state(&cancel).await.map_err(explain)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                print_state(&state);
            }
        }
        Commands::Run {
            id,
            release,
            name,
            file,
        } => {
            let script = read_script(&file)?;
            let name = name.unwrap_or_else(|| default_script_name(&file));
            let outcome = provider
                .execute_change_script(ChangeScriptId::new(id, release), &name, &script, &cancel)
                .await
                .map_err(explain)?;

            match outcome {
                ScriptRunOutcome::AlreadyExecuted => {
                    println!("{name}: already executed, skipped")
                }
                ScriptRunOutcome::Recorded(result) => println!("{name}: recorded {result}"),
            }
        }
        Commands::Exec { file } => {
            let script = read_script(&file)?;
            provider
                .execute_query(&script, &cancel)
                .await
                .map_err(explain)?;
            println!("Executed {}.", file.display());
        }
        Commands::Upgrade => {
            provider
                .upgrade_schema(&HashMap::new(), &cancel)
                .await
                .map_err(explain)?;
        }
    }

    Ok(())
}

fn read_script(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn default_script_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn explain(err: Error) -> anyhow::Error {
    match err {
        Error::NotInitialized => {
            anyhow::anyhow!("{err}. Run `scriptledger init` first.")
        }
        err if err.is_caller_error() => anyhow::anyhow!("refused: {err}"),
        err => anyhow::Error::new(err),
    }
}

fn print_state(state: &ChangeScriptState) {
    if !state.is_initialized {
        println!("Database is not initialized.");
        return;
    }

    println!(
        "Tracking schema version {}, {} script(s) recorded",
        state.version.unwrap_or_default(),
        state.records.len()
    );
    for record in &state.records {
        println!("  {}", format_record(record));
    }
}

fn format_record(record: &ExecutionRecord) -> String {
    format!(
        "{:>6} release {:<6} {} {:<7} {}",
        record.id.script_id,
        record.id.legacy_release_sequence,
        record.executed_at.format("%Y-%m-%d %H:%M:%S"),
        record.outcome,
        record.name
    )
}

#[cfg(test)]
mod tests {
    use super::{Commands, default_script_name, explain, format_record};
    use chrono::{TimeZone, Utc};
    use scriptledger_common::Error;
    use scriptledger_db::{ChangeScriptId, ExecutionOutcome, ExecutionRecord};
    use std::path::{Path, PathBuf};

    #[test]
    fn script_name_defaults_to_file_name() {
        assert_eq!(
            default_script_name(Path::new("scripts/0007-add-orders.sql")),
            "0007-add-orders.sql"
        );
    }

    #[test]
    fn record_line_shows_id_release_date_outcome_and_name() {
        let record = ExecutionRecord {
            id: ChangeScriptId::new(7, 120),
            name: "add-orders".to_string(),
            executed_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
            outcome: ExecutionOutcome::Failure,
        };

        let line = format_record(&record);
        assert!(line.contains(" 7 release 120"));
        assert!(line.contains("2024-01-02 03:04:05"));
        assert!(line.contains("failure"));
        assert!(line.ends_with("add-orders"));
    }

    #[test]
    fn uninitialized_error_points_at_init() {
        let message = explain(Error::NotInitialized).to_string();
        assert!(message.contains("scriptledger init"));
    }

    #[test]
    fn only_status_and_upgrade_leave_the_filesystem_alone() {
        assert!(!Commands::Status { json: false }.writes_database());
        assert!(!Commands::Upgrade.writes_database());
        assert!(Commands::Init.writes_database());
        assert!(
            Commands::Exec {
                file: PathBuf::from("adhoc.sql")
            }
            .writes_database()
        );
    }
}
