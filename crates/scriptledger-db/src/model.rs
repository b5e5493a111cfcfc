use chrono::{DateTime, NaiveDateTime, Utc};
use scriptledger_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tracking schema version reported once the ledger exists.
pub const LEDGER_SCHEMA_VERSION: i32 = 1;

/// Identity of a change script. Two scripts are the same script when their
/// `script_id` matches; the release sequence is carried for the ledger only.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ChangeScriptId {
    pub script_id: i32,
    pub legacy_release_sequence: i64,
}

impl ChangeScriptId {
    pub fn new(script_id: i32, legacy_release_sequence: i64) -> Self {
        Self {
            script_id,
            legacy_release_sequence,
        }
    }
}

impl fmt::Display for ChangeScriptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.script_id, self.legacy_release_sequence)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Success,
    Failure,
}

impl ExecutionOutcome {
    /// Single-character value stored in `Success_Indicator`.
    pub fn indicator(&self) -> &'static str {
        match self {
            Self::Success => "Y",
            Self::Failure => "N",
        }
    }

    /// Only `Y` means success; anything else read back is a failure.
    pub fn from_indicator(value: &str) -> Self {
        if value == "Y" {
            Self::Success
        } else {
            Self::Failure
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

impl fmt::Display for ExecutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the tracking table. Never updated once written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionRecord {
    pub id: ChangeScriptId,
    pub name: String,
    pub executed_at: DateTime<Utc>,
    pub outcome: ExecutionOutcome,
}

/// Snapshot of the tracking table, recomputed on every request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeScriptState {
    pub is_initialized: bool,
    pub version: Option<i32>,
    pub records: Vec<ExecutionRecord>,
}

impl ChangeScriptState {
    pub fn uninitialized() -> Self {
        Self {
            is_initialized: false,
            version: None,
            records: Vec::new(),
        }
    }

    pub fn initialized(records: Vec<ExecutionRecord>) -> Self {
        Self {
            is_initialized: true,
            version: Some(LEDGER_SCHEMA_VERSION),
            records,
        }
    }

    /// Looks a script up by `script_id` alone.
    pub fn find(&self, script_id: i32) -> Option<&ExecutionRecord> {
        self.records.iter().find(|r| r.id.script_id == script_id)
    }
}

/// What a single change-script run ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptRunOutcome {
    AlreadyExecuted,
    Recorded(ExecutionOutcome),
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
    }

    Err(Error::Database(format!("invalid timestamp format: {raw}")))
}
