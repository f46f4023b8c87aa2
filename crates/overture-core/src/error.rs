//! Error taxonomy for reconciliation.
//!
//! Only configuration-load failures are fatal for a whole run. Everything else
//! is scoped to one MCP, one client or one scope and ends up in the aggregated
//! sync report instead of unwinding the run.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{ClientId, Transport};

pub type Result<T> = std::result::Result<T, OvertureError>;

#[derive(Debug, Error)]
pub enum OvertureError {
    #[error("No Overture configuration found (looked in: {})", format_paths(.searched))]
    ConfigNotFound { searched: Vec<PathBuf> },

    #[error("Failed to parse configuration {}: {message}", .path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("Invalid configuration for MCP '{name}': {message}")]
    ConfigInvalid { name: String, message: String },

    #[error("Failed to read {client} config {}: {message}", .path.display())]
    ClientRead {
        client: ClientId,
        path: PathBuf,
        message: String,
    },

    #[error("{client} does not support transport for: {}", format_transports(.mcps))]
    TransportIncompatibility {
        client: ClientId,
        mcps: Vec<(String, Transport)>,
    },

    #[error("Circular environment variable reference while expanding '{variable}' (depth {depth})")]
    CircularEnvReference { variable: String, depth: usize },

    #[error("Backup of {} failed: {message}", .path.display())]
    Backup { path: PathBuf, message: String },

    #[error("Nothing to back up: {} does not exist", .path.display())]
    BackupSourceMissing { path: PathBuf },

    #[error("No backups found for {client}")]
    BackupNotFound { client: String },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not determine config path for {client}")]
    ConfigPathUndetected { client: ClientId },

    #[error("No adapter registered for {client}")]
    AdapterMissing { client: ClientId },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OvertureError {
    /// Whether this error aborts the whole run before any client is touched.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            OvertureError::ConfigNotFound { .. }
                | OvertureError::ConfigParse { .. }
                | OvertureError::ConfigInvalid { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        OvertureError::Io {
            path: path.into(),
            source,
        }
    }
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_transports(mcps: &[(String, Transport)]) -> String {
    mcps.iter()
        .map(|(name, transport)| format!("{} ({})", name, transport))
        .collect::<Vec<_>>()
        .join(", ")
}
