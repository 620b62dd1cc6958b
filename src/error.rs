use std::io;

use thiserror::Error;

/// Outcome of a failed snippet execution.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("invalid command: nothing to run")]
    InvalidCommand,

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{}", exit_text(.code))]
    ProcessFailed { code: Option<i32> },

    #[error("command cancelled")]
    Cancelled,

    #[error("I/O error while running command: {0}")]
    Io(#[from] io::Error),
}

fn exit_text(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("command failed with status {code}"),
        None => "command terminated by signal".to_string(),
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no snippet with id '{0}'")]
    NotFound(String),

    #[error("a snippet with id '{0}' already exists")]
    DuplicateId(String),

    #[error("invalid id '{0}': use letters, digits, '_' or '-'")]
    InvalidId(String),

    #[error("snippet store is inconsistent: key '{key}' holds snippet '{id}'")]
    MismatchedKey { key: String, id: String },

    #[error("snippet store I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("snippet store is corrupt: {0}")]
    Serde(#[from] serde_json::Error),
}
