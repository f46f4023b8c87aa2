//! Cursor client. Remote servers are written as url-only entries.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{
    ALL_TRANSPORTS, ClientAdapter, ClientCapabilities, ClientContext, ConfigPathResult,
    ImportedEntry,
};
use crate::resolve::ResolvedMcp;
use crate::types::{ClientId, Platform, Transport};

#[derive(Debug, Default, Clone, Copy)]
pub struct CursorClient;

impl CursorClient {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CursorEntry {
    Remote {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        env: Option<BTreeMap<String, String>>,
    },
    Local {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        env: Option<BTreeMap<String, String>>,
    },
}

impl From<&ResolvedMcp> for CursorEntry {
    fn from(mcp: &ResolvedMcp) -> Self {
        match (&mcp.url, mcp.transport.is_remote()) {
            (Some(url), true) => CursorEntry::Remote {
                url: url.clone(),
                env: mcp.env.clone(),
            },
            _ => CursorEntry::Local {
                command: mcp.command.clone(),
                args: mcp.args.clone(),
                env: mcp.env.clone(),
            },
        }
    }
}

impl ClientAdapter for CursorClient {
    fn id(&self) -> ClientId {
        ClientId::Cursor
    }

    fn capabilities(&self) -> ClientCapabilities {
        ClientCapabilities {
            transports: ALL_TRANSPORTS,
        }
    }

    fn detect_config_path(&self, ctx: &ClientContext) -> ConfigPathResult {
        ctx.user_and_project(ctx.home_dir.join(".cursor").join("mcp.json"), ".cursor/mcp.json")
    }

    fn needs_env_var_expansion(&self) -> bool {
        true
    }

    fn binary_names(&self) -> &'static [&'static str] {
        &["cursor"]
    }

    fn app_bundle_paths(&self, ctx: &ClientContext) -> Vec<PathBuf> {
        match ctx.platform {
            Platform::Darwin => vec![PathBuf::from("/Applications/Cursor.app")],
            Platform::Win32 => vec![ctx.home_dir.join("AppData/Local/Programs/cursor/Cursor.exe")],
            Platform::Linux => vec![ctx.home_dir.join("Applications/cursor.AppImage")],
        }
    }

    fn requires_binary(&self) -> bool {
        false
    }

    fn render_entry(&self, mcp: &ResolvedMcp) -> serde_json::Result<Value> {
        serde_json::to_value(CursorEntry::from(mcp))
    }

    fn import_entry(&self, entry: &Value) -> Option<ImportedEntry> {
        match serde_json::from_value(entry.clone()).ok()? {
            CursorEntry::Remote { url, env } => Some(ImportedEntry {
                command: String::new(),
                args: Vec::new(),
                env: env.unwrap_or_default(),
                transport: if url.trim_end_matches('/').ends_with("/sse") {
                    Transport::Sse
                } else {
                    Transport::Http
                },
                url: Some(url),
            }),
            CursorEntry::Local { command, args, env } => Some(ImportedEntry {
                command,
                args,
                env: env.unwrap_or_default(),
                transport: Transport::Stdio,
                url: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::{remote, resolved};
    use serde_json::json;

    #[test]
    fn test_paths() {
        let ctx = ClientContext::new(Platform::Darwin, "/Users/u").with_project_root("/p");
        assert_eq!(
            CursorClient.detect_config_path(&ctx),
            ConfigPathResult::Dual {
                user: PathBuf::from("/Users/u/.cursor/mcp.json"),
                project: PathBuf::from("/p/.cursor/mcp.json"),
            }
        );
    }

    #[test]
    fn test_remote_entry_is_url_only() {
        let value = CursorClient
            .render_entry(&remote("api", Transport::Http, "https://x/mcp"))
            .unwrap();
        assert_eq!(value, json!({"url": "https://x/mcp"}));
    }

    #[test]
    fn test_local_entry() {
        let value = CursorClient.render_entry(&resolved("fs", "mcp-fs", &["/"])).unwrap();
        assert_eq!(value, json!({"command": "mcp-fs", "args": ["/"]}));
    }

    #[test]
    fn test_import_guesses_sse_from_url() {
        let imported = CursorClient
            .import_entry(&json!({"url": "https://x/sse"}))
            .unwrap();
        assert_eq!(imported.transport, Transport::Sse);

        let imported = CursorClient
            .import_entry(&json!({"url": "https://x/mcp"}))
            .unwrap();
        assert_eq!(imported.transport, Transport::Http);
    }
}
