//! Claude Code client.
//!
//! User scope lives in `~/.claude.json`, which also holds unrelated CLI state;
//! project scope is `.mcp.json` at the project root. References are left as
//! `${VAR}` because Claude Code expands them itself.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{
    ALL_TRANSPORTS, ClientAdapter, ClientCapabilities, ClientContext, ConfigPathResult,
    ImportedEntry,
};
use crate::resolve::ResolvedMcp;
use crate::types::{ClientId, Transport};

#[derive(Debug, Default, Clone, Copy)]
pub struct ClaudeCodeClient;

impl ClaudeCodeClient {
    pub fn new() -> Self {
        Self
    }
}

/// Entry under `mcpServers`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaudeCodeEntry {
    /// Omitted for stdio
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<&ResolvedMcp> for ClaudeCodeEntry {
    fn from(mcp: &ResolvedMcp) -> Self {
        match (mcp.transport, &mcp.url) {
            (Transport::Http | Transport::Sse, Some(url)) => Self {
                kind: Some(mcp.transport.as_str().to_string()),
                command: None,
                args: None,
                env: mcp.env.clone(),
                url: Some(url.clone()),
            },
            (transport, _) => Self {
                kind: transport.is_remote().then(|| transport.as_str().to_string()),
                command: Some(mcp.command.clone()),
                args: Some(mcp.args.clone()),
                env: mcp.env.clone(),
                url: None,
            },
        }
    }
}

impl ClientAdapter for ClaudeCodeClient {
    fn id(&self) -> ClientId {
        ClientId::ClaudeCode
    }

    fn capabilities(&self) -> ClientCapabilities {
        ClientCapabilities {
            transports: ALL_TRANSPORTS,
        }
    }

    fn detect_config_path(&self, ctx: &ClientContext) -> ConfigPathResult {
        ctx.user_and_project(ctx.home_dir.join(".claude.json"), ".mcp.json")
    }

    fn needs_env_var_expansion(&self) -> bool {
        false
    }

    fn binary_names(&self) -> &'static [&'static str] {
        &["claude"]
    }

    fn render_entry(&self, mcp: &ResolvedMcp) -> serde_json::Result<Value> {
        serde_json::to_value(ClaudeCodeEntry::from(mcp))
    }

    fn import_entry(&self, entry: &Value) -> Option<ImportedEntry> {
        let entry: ClaudeCodeEntry = serde_json::from_value(entry.clone()).ok()?;
        let transport = match entry.kind.as_deref() {
            None => Transport::Stdio,
            Some(kind) => kind.parse().ok()?,
        };
        if entry.command.is_none() && entry.url.is_none() {
            return None;
        }
        Some(ImportedEntry {
            command: entry.command.unwrap_or_default(),
            args: entry.args.unwrap_or_default(),
            env: entry.env.unwrap_or_default(),
            transport,
            url: entry.url,
        })
    }
}
