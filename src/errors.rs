// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RespawnError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// The registry store exists but could not be read.
    #[error("Registry store {path:?} is unavailable: {source}")]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A spawn attempt could not open its log file or start the shell.
    #[error("Failed to launch '{name}': {reason}")]
    LaunchFailed { name: String, reason: String },

    /// The process table could not be queried.
    #[error("Process table query failed: {0}")]
    ProbeError(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// A required on-disk location could not be created at startup.
    #[error("Failed to create {path:?}: {source}")]
    Bootstrap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RespawnError>;
