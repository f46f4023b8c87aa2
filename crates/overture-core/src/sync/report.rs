//! Per-(client, scope) results and the aggregated run report.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::client::McpFailure;
use crate::diff::DiffResult;
use crate::discovery::DetectionResult;
use crate::types::{ClientId, ConfigScope, Transport};

/// Non-fatal findings attached to a result.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SyncWarning {
    #[error("{client} binary not detected")]
    BinaryNotDetected { client: ClientId },

    #[error("Unsupported transport for {client}: {}{}", format_mcps(.mcps), forced_suffix(.forced))]
    TransportIncompatible {
        client: ClientId,
        mcps: Vec<(String, Transport)>,
        forced: bool,
    },

    #[error("MCP '{mcp}' references undefined environment variables: {}", .names.join(", "))]
    EnvVarMissing { mcp: String, names: Vec<String> },

    #[error("Preserved {} unmanaged {}: {}", .names.len(), entries_noun(.names), .names.join(", "))]
    UnmanagedPreserved { names: Vec<String> },

    #[error("Kept previous entry for '{name}' after a conversion failure")]
    CarriedForward { name: String },

    #[error("Backup of {} failed: {message}", .path.display())]
    BackupFailed { path: PathBuf, message: String },
}

fn forced_suffix(forced: &bool) -> &'static str {
    if *forced { " (forced)" } else { "" }
}

fn entries_noun(names: &[String]) -> &'static str {
    if names.len() == 1 { "entry" } else { "entries" }
}

fn format_mcps(mcps: &[(String, Transport)]) -> String {
    mcps.iter()
        .map(|(name, transport)| format!("{name} ({transport})"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSyncResult {
    pub client: ClientId,
    pub scope: ConfigScope,
    pub config_path: Option<PathBuf>,
    pub success: bool,
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection: Option<DetectionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<DiffResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    /// Real path on commit, preview path on dry run; `None` when nothing
    /// was written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written_path: Option<PathBuf>,
    pub warnings: Vec<SyncWarning>,
    pub failures: Vec<McpFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClientSyncResult {
    pub fn new(client: ClientId, scope: ConfigScope, config_path: Option<PathBuf>) -> Self {
        Self {
            client,
            scope,
            config_path,
            success: true,
            skipped: false,
            detection: None,
            diff: None,
            backup_path: None,
            written_path: None,
            warnings: Vec::new(),
            failures: Vec::new(),
            error: None,
        }
    }

    pub fn fail(mut self, error: impl ToString) -> Self {
        self.success = false;
        self.error = Some(error.to_string());
        self
    }

    pub fn skip(mut self) -> Self {
        self.skipped = true;
        self
    }

    pub fn has_changes(&self) -> bool {
        self.diff.as_ref().is_some_and(|d| d.has_changes)
    }
}

/// A warning or error lifted out of one result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportMessage {
    pub client: ClientId,
    pub scope: ConfigScope,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub results: Vec<ClientSyncResult>,
    pub warnings: Vec<ReportMessage>,
    pub errors: Vec<ReportMessage>,
}

impl SyncReport {
    pub fn push(&mut self, result: ClientSyncResult) {
        let message = |text: String| ReportMessage {
            client: result.client,
            scope: result.scope,
            message: text,
        };
        self.warnings
            .extend(result.warnings.iter().map(|w| message(w.to_string())));
        if let Some(error) = &result.error {
            self.errors.push(message(error.clone()));
        }
        self.errors.extend(
            result
                .failures
                .iter()
                .map(|f| message(format!("{}: {}", f.name, f.error))),
        );
        self.results.push(result);
    }

    /// Every result succeeded and no MCP failed to convert.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && self.results.iter().all(|r| r.success)
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success && !r.skipped).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }

    pub fn skipped(&self) -> usize {
        self.results.iter().filter(|r| r.skipped).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_messages() {
        let warning = SyncWarning::TransportIncompatible {
            client: ClientId::ClaudeDesktop,
            mcps: vec![("api".to_string(), Transport::Http)],
            forced: true,
        };
        assert_eq!(
            warning.to_string(),
            "Unsupported transport for claude-desktop: api (http) (forced)"
        );

        let preserved = SyncWarning::UnmanagedPreserved {
            names: vec!["a".to_string()],
        };
        assert_eq!(preserved.to_string(), "Preserved 1 unmanaged entry: a");
    }

    #[test]
    fn test_report_aggregates_in_order() {
        let mut report = SyncReport::default();

        let mut ok = ClientSyncResult::new(ClientId::Cursor, ConfigScope::Global, None);
        ok.warnings.push(SyncWarning::BinaryNotDetected {
            client: ClientId::Cursor,
        });
        report.push(ok);
        report.push(ClientSyncResult::new(ClientId::VsCode, ConfigScope::Global, None).fail("boom"));

        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.errors[0].client, ClientId::VsCode);
        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn test_mcp_failure_fails_the_run() {
        let mut report = SyncReport::default();
        let mut result = ClientSyncResult::new(ClientId::Cursor, ConfigScope::Global, None);
        result.failures.push(McpFailure {
            name: "loop".to_string(),
            error: "cycle".to_string(),
        });
        report.push(result);

        assert!(report.results[0].success);
        assert!(!report.is_success());
    }

    #[test]
    fn test_skips_count_as_success() {
        let mut report = SyncReport::default();
        report.push(ClientSyncResult::new(ClientId::Cursor, ConfigScope::Global, None).skip());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.skipped(), 1);
    }
}
