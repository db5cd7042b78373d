// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Declining to resolve an expression is *not* an error; see
//! [`crate::resolve::Resolution::Declined`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcrunError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Expression error: {0}")]
    Expression(String),

    /// The child process could not be launched at all.
    #[error("failed to start '{program}': {source}")]
    StartFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran to completion but the exit-value policy rejected its
    /// exit code.
    #[error("process '{command}' exited with rejected code {code}")]
    ExitRejected { command: String, code: i32 },

    #[error("stream error: {0}")]
    Stream(#[source] std::io::Error),

    /// The process destroyer is shutting down; nothing new may run.
    #[error("shutdown in progress; '{0}' was not run")]
    ShutdownInProgress(String),

    #[error("watchdog is already monitoring another process")]
    WatchdogBusy,

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProcrunError {
    /// Exit code carried by the error, if the process got far enough to
    /// produce one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcrunError::ExitRejected { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProcrunError>;
