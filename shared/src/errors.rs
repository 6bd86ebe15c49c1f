//! Shared error types for the stress tester

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },

    #[error("Failed to open log file {path}: {source}")]
    LogFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Logging already initialized: {message}")]
    LoggingInit { message: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
