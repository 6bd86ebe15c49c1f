//! Stress tester error types

use shared::SharedError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("Failed to spawn worker {seq} ({command}): {source}")]
    Spawn {
        seq: u64,
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker {seq} exited during startup with {exit} ({command})")]
    EarlyExit { seq: u64, command: String, exit: String },

    #[error("Alert payload could not be parsed: {0}")]
    PayloadParse(#[source] serde_json::Error),

    #[error("Failed to terminate worker {seq} (PID {pid}): {message}")]
    Terminate { seq: u64, pid: u32, message: String },

    #[error("Configuration error: {field}")]
    Config { field: String },

    #[error("Alert callback server failed to start on {address}: {source}")]
    ServerStartup {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Shared(#[from] SharedError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config file parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl HarnessError {
    pub fn config(field: impl Into<String>) -> Self {
        HarnessError::Config { field: field.into() }
    }

    /// Launch failures abort the whole run; everything else is contained
    pub fn is_fatal(&self) -> bool {
        matches!(self, HarnessError::Spawn { .. } | HarnessError::EarlyExit { .. })
    }
}

pub type HarnessResult<T> = Result<T, HarnessError>;
