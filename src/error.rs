// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! Error types for LinMan

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for inventory operations
pub type Result<T> = std::result::Result<T, InventoryError>;

/// Error type shared by the data-source adapters.
///
/// Nothing in this enum ever escapes a refresh: the aggregator turns every
/// variant into an absent value at the adapter boundary.
#[derive(Error, Debug)]
pub enum InventoryError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// External tool missing from PATH
    #[error("Tool not available: {0}")]
    ToolUnavailable(String),

    /// External tool exited unsuccessfully
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// External tool exceeded its time budget
    #[error("Command timed out after {timeout:?}: {program}")]
    Timeout { program: String, timeout: Duration },

    /// Hot-plug channel error
    #[error("Hotplug channel error: {0}")]
    Hotplug(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl InventoryError {
    /// Classify an I/O error from spawning a tool.
    pub fn from_spawn(program: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::ToolUnavailable(program.to_string()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(program.to_string()),
            _ => Self::Io(err),
        }
    }
}

#[cfg(unix)]
impl From<nix::Error> for InventoryError {
    fn from(err: nix::Error) -> Self {
        match err {
            nix::Error::EACCES | nix::Error::EPERM => Self::PermissionDenied(err.to_string()),
            other => Self::Io(io::Error::from(other)),
        }
    }
}
