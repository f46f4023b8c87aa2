//! Claude Desktop client. Single user-scope file in the platform's
//! application-support directory, stdio only.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::client::{ClientAdapter, ClientCapabilities, ClientContext, ConfigPathResult, ImportedEntry};
use crate::resolve::ResolvedMcp;
use crate::types::{ClientId, Platform, Transport};

#[derive(Debug, Default, Clone, Copy)]
pub struct ClaudeDesktopClient;

impl ClaudeDesktopClient {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaudeDesktopEntry {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
}

impl ClientAdapter for ClaudeDesktopClient {
    fn id(&self) -> ClientId {
        ClientId::ClaudeDesktop
    }

    fn capabilities(&self) -> ClientCapabilities {
        ClientCapabilities {
            transports: &[Transport::Stdio],
        }
    }

    fn detect_config_path(&self, ctx: &ClientContext) -> ConfigPathResult {
        ConfigPathResult::Single(
            ctx.app_support_dir()
                .join("Claude")
                .join("claude_desktop_config.json"),
        )
    }

    fn needs_env_var_expansion(&self) -> bool {
        true
    }

    fn binary_names(&self) -> &'static [&'static str] {
        &["claude-desktop"]
    }

    fn app_bundle_paths(&self, ctx: &ClientContext) -> Vec<PathBuf> {
        match ctx.platform {
            Platform::Darwin => vec![
                PathBuf::from("/Applications/Claude.app"),
                ctx.home_dir.join("Applications/Claude.app"),
            ],
            Platform::Win32 => vec![ctx.home_dir.join("AppData/Local/AnthropicClaude/claude.exe")],
            Platform::Linux => Vec::new(),
        }
    }

    fn requires_binary(&self) -> bool {
        false
    }

    /// Claude Desktop has no remote entry shape. A forced remote MCP with no
    /// command renders as `{"command": "", "args": []}`, which the app will
    /// not start; the sync result carries a forced transport warning for it.
    fn render_entry(&self, mcp: &ResolvedMcp) -> serde_json::Result<Value> {
        if mcp.command.is_empty() {
            warn!(mcp = %mcp.name, url = ?mcp.url, "Claude Desktop entry has no command; writing placeholder");
        }
        serde_json::to_value(ClaudeDesktopEntry {
            command: mcp.command.clone(),
            args: mcp.args.clone(),
            env: mcp.env.clone(),
        })
    }

    fn import_entry(&self, entry: &Value) -> Option<ImportedEntry> {
        let entry: ClaudeDesktopEntry = serde_json::from_value(entry.clone()).ok()?;
        if entry.command.trim().is_empty() {
            return None;
        }
        Some(ImportedEntry {
            command: entry.command,
            args: entry.args,
            env: entry.env.unwrap_or_default(),
            transport: Transport::Stdio,
            url: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::{remote, resolved, with_env};
    use serde_json::json;

    #[test]
    fn test_config_path_per_platform() {
        let mac = ClientContext::new(Platform::Darwin, "/Users/u");
        assert_eq!(
            ClaudeDesktopClient.detect_config_path(&mac),
            ConfigPathResult::Single(PathBuf::from(
                "/Users/u/Library/Application Support/Claude/claude_desktop_config.json"
            ))
        );

        let linux = ClientContext::new(Platform::Linux, "/home/u");
        assert_eq!(
            ClaudeDesktopClient.detect_config_path(&linux),
            ConfigPathResult::Single(PathBuf::from("/home/u/.config/Claude/claude_desktop_config.json"))
        );
    }

    #[test]
    fn test_project_root_does_not_add_scope() {
        let ctx = ClientContext::new(Platform::Linux, "/home/u").with_project_root("/work");
        assert!(!ClaudeDesktopClient.detect_config_path(&ctx).is_dual());
    }

    #[test]
    fn test_stdio_only() {
        assert!(ClaudeDesktopClient.supports_transport(Transport::Stdio));
        assert!(!ClaudeDesktopClient.supports_transport(Transport::Http));
        assert!(!ClaudeDesktopClient.supports_transport(Transport::Sse));
    }

    #[test]
    fn test_render_entry() {
        let mcp = with_env(resolved("fs", "npx", &["-y", "fs"]), "ROOT", "/data");
        assert_eq!(
            ClaudeDesktopClient.render_entry(&mcp).unwrap(),
            json!({"command": "npx", "args": ["-y", "fs"], "env": {"ROOT": "/data"}})
        );
    }

    #[test]
    fn test_forced_remote_renders_placeholder_and_is_not_imported() {
        let mcp = remote("api", Transport::Http, "https://api.example.com/mcp");
        let rendered = ClaudeDesktopClient.render_entry(&mcp).unwrap();
        assert_eq!(rendered, json!({"command": "", "args": []}));

        assert!(ClaudeDesktopClient.import_entry(&rendered).is_none());
        assert!(
            ClaudeDesktopClient
                .import_entry(&json!({"command": "npx", "args": ["fs"]}))
                .is_some()
        );
    }
}
