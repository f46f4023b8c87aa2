//! Report client entries that the unified configuration does not manage.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{debug, warn};

use crate::client::{AdapterRegistry, ClientContext, configured_path};
use crate::config::OvertureConfig;
use crate::fs::FileSystem;
use crate::types::{ClientId, ConfigScope};

/// Unmanaged entries found in one (client, scope) document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub client: ClientId,
    pub scope: ConfigScope,
    pub path: PathBuf,
    pub unmanaged: Vec<String>,
    /// Set when the document could not be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditEntry {
    pub fn is_clean(&self) -> bool {
        self.unmanaged.is_empty() && self.error.is_none()
    }
}

/// Read every target client document and list the server names absent from
/// `config.mcp`. Missing files produce no entry.
pub async fn audit_clients(
    registry: &AdapterRegistry,
    fs: &dyn FileSystem,
    ctx: &ClientContext,
    config: &OvertureConfig,
    clients: &[ClientId],
) -> Vec<AuditEntry> {
    let mut entries = Vec::new();

    for adapter in registry.filter_by_targets(clients) {
        for (scope, path) in configured_path(adapter, ctx, config).targets() {
            if !fs.exists(&path).await {
                debug!(client = %adapter.id(), path = %path.display(), "Nothing to audit");
                continue;
            }

            let mut entry = AuditEntry {
                client: adapter.id(),
                scope,
                path: path.clone(),
                unmanaged: Vec::new(),
                error: None,
            };
            match adapter.read_config(fs, &path).await {
                Ok(document) => {
                    entry.unmanaged = document
                        .names()
                        .into_iter()
                        .filter(|name| !config.is_managed(name))
                        .collect();
                }
                Err(e) => {
                    warn!(client = %adapter.id(), "Audit read failed: {}", e);
                    entry.error = Some(e.to_string());
                }
            }
            entries.push(entry);
        }
    }

    entries
}
