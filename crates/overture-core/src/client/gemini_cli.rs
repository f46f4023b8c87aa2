//! Gemini CLI client. Settings files are shared with the rest of the CLI
//! configuration; streamable http endpoints go under `httpUrl`.

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
pub struct GeminiCliClient;

impl GeminiCliClient {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCliEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
    /// SSE endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Streamable HTTP endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_url: Option<String>,
}

impl From<&ResolvedMcp> for GeminiCliEntry {
    fn from(mcp: &ResolvedMcp) -> Self {
        let mut entry = Self {
            command: None,
            args: None,
            env: mcp.env.clone(),
            url: None,
            http_url: None,
        };
        match (mcp.transport, &mcp.url) {
            (Transport::Http, Some(url)) => entry.http_url = Some(url.clone()),
            (Transport::Sse, Some(url)) => entry.url = Some(url.clone()),
            _ => {
                entry.command = Some(mcp.command.clone());
                entry.args = Some(mcp.args.clone());
            }
        }
        entry
    }
}

impl ClientAdapter for GeminiCliClient {
    fn id(&self) -> ClientId {
        ClientId::GeminiCli
    }

    fn capabilities(&self) -> ClientCapabilities {
        ClientCapabilities {
            transports: ALL_TRANSPORTS,
        }
    }

    fn detect_config_path(&self, ctx: &ClientContext) -> ConfigPathResult {
        ctx.user_and_project(
            ctx.home_dir.join(".gemini").join("settings.json"),
            ".gemini/settings.json",
        )
    }

    fn needs_env_var_expansion(&self) -> bool {
        false
    }

    fn binary_names(&self) -> &'static [&'static str] {
        &["gemini"]
    }

    fn render_entry(&self, mcp: &ResolvedMcp) -> serde_json::Result<Value> {
        serde_json::to_value(GeminiCliEntry::from(mcp))
    }

    fn import_entry(&self, entry: &Value) -> Option<ImportedEntry> {
        let entry: GeminiCliEntry = serde_json::from_value(entry.clone()).ok()?;
        let (transport, url) = match (entry.http_url, entry.url, &entry.command) {
            (Some(http_url), _, _) => (Transport::Http, Some(http_url)),
            (None, Some(url), _) => (Transport::Sse, Some(url)),
            (None, None, Some(_)) => (Transport::Stdio, None),
            (None, None, None) => return None,
        };
        Some(ImportedEntry {
            command: entry.command.unwrap_or_default(),
            args: entry.args.unwrap_or_default(),
            env: entry.env.unwrap_or_default(),
            transport,
            url,
        })
    }
}
