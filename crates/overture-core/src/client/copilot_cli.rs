//! GitHub Copilot CLI client. Stdio servers are `type: "local"` and every
//! entry exposes all of its tools.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{
    ALL_TRANSPORTS, ClientAdapter, ClientCapabilities, ClientContext, ConfigPathResult,
    ImportedEntry,
};
use crate::resolve::ResolvedMcp;
use crate::types::{ClientId, Transport};

const LOCAL: &str = "local";

#[derive(Debug, Default, Clone, Copy)]
pub struct CopilotCliClient;

impl CopilotCliClient {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopilotCliEntry {
    /// `local`, `http` or `sse`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default = "all_tools")]
    pub tools: Vec<String>,
}

fn all_tools() -> Vec<String> {
    vec!["*".to_string()]
}

impl From<&ResolvedMcp> for CopilotCliEntry {
    fn from(mcp: &ResolvedMcp) -> Self {
        match (&mcp.url, mcp.transport.is_remote()) {
            (Some(url), true) => Self {
                kind: mcp.transport.as_str().to_string(),
                command: None,
                args: None,
                env: mcp.env.clone(),
                url: Some(url.clone()),
                tools: all_tools(),
            },
            _ => Self {
                kind: LOCAL.to_string(),
                command: Some(mcp.command.clone()),
                args: Some(mcp.args.clone()),
                env: mcp.env.clone(),
                url: None,
                tools: all_tools(),
            },
        }
    }
}

impl ClientAdapter for CopilotCliClient {
    fn id(&self) -> ClientId {
        ClientId::CopilotCli
    }

    fn capabilities(&self) -> ClientCapabilities {
        ClientCapabilities {
            transports: ALL_TRANSPORTS,
        }
    }

    fn detect_config_path(&self, ctx: &ClientContext) -> ConfigPathResult {
        ConfigPathResult::Single(ctx.home_dir.join(".copilot").join("mcp-config.json"))
    }

    fn needs_env_var_expansion(&self) -> bool {
        true
    }

    fn binary_names(&self) -> &'static [&'static str] {
        &["copilot"]
    }

    fn render_entry(&self, mcp: &ResolvedMcp) -> serde_json::Result<Value> {
        serde_json::to_value(CopilotCliEntry::from(mcp))
    }

    fn import_entry(&self, entry: &Value) -> Option<ImportedEntry> {
        let entry: CopilotCliEntry = serde_json::from_value(entry.clone()).ok()?;
        let transport = match entry.kind.as_str() {
            LOCAL | "stdio" => Transport::Stdio,
            other => other.parse().ok()?,
        };
        Some(ImportedEntry {
            command: entry.command.unwrap_or_default(),
            args: entry.args.unwrap_or_default(),
            env: entry.env.unwrap_or_default(),
            transport,
            url: entry.url,
        })
    }
}
