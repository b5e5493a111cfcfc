use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("database is not initialized")]
    NotInitialized,

    #[error("not supported: {0}")]
    NotSupported(String),

    /// The script attempt completed but its tracking row could not be written.
    /// `outcome` is what the ledger would have recorded.
    #[error("{script_name} finished ({outcome}) but the ledger write failed: {message}")]
    LedgerWrite {
        script_name: String,
        outcome: String,
        message: String,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for failures a caller should not retry without changing something first.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::NotInitialized | Self::NotSupported(_))
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn ledger_write_message_names_script_and_outcome() {
        let err = Error::LedgerWrite {
            script_name: "0005-add-index.sql".to_string(),
            outcome: "success".to_string(),
            message: "UNIQUE constraint failed".to_string(),
        };

        let text = err.to_string();
        assert!(text.contains("0005-add-index.sql"));
        assert!(text.contains("success"));
        assert!(text.contains("UNIQUE constraint failed"));
    }

    #[test]
    fn precondition_errors_are_caller_errors() {
        assert!(Error::NotInitialized.is_caller_error());
        assert!(Error::NotSupported("upgrade".into()).is_caller_error());
        assert!(!Error::Database("disk I/O error".into()).is_caller_error());
    }
}
