// src/error.rs

//! Error types for the APEX checker

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid combination of options, reported before any archive is opened
    #[error("{0}")]
    Usage(String),

    #[error("Failed to open APEX {path}: {reason}")]
    BadArchive { path: PathBuf, reason: String },

    #[error("APEX {path} does not contain {member}")]
    MissingPayload { path: PathBuf, member: &'static str },

    #[error("Failed to run {tool}: {source}")]
    ToolSpawn {
        tool: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: PathBuf,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("Failed to read rules {path}: {source}")]
    RulesFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse rules: {0}")]
    Rules(#[from] toml::de::Error),

    #[error("Unsupported rules version {found} (expected {expected})")]
    UnsupportedRules { found: u32, expected: u32 },

    #[error("Could not detect bitness, neither lib nor lib64 contained")]
    UndetectedBitness,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
