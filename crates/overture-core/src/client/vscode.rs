//! VS Code client. Root key is `servers` and every entry carries an explicit
//! `type` discriminator.

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
pub struct VsCodeClient;

impl VsCodeClient {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VsCodeEntry {
    #[serde(rename = "type")]
    pub transport: Transport,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl From<&ResolvedMcp> for VsCodeEntry {
    fn from(mcp: &ResolvedMcp) -> Self {
        let url = mcp.url.clone().filter(|_| mcp.transport.is_remote());
        let launched = url.is_none();
        Self {
            transport: mcp.transport,
            command: launched.then(|| mcp.command.clone()),
            args: launched.then(|| mcp.args.clone()),
            env: mcp.env.clone(),
            url,
        }
    }
}

impl ClientAdapter for VsCodeClient {
    fn id(&self) -> ClientId {
        ClientId::VsCode
    }

    fn root_key(&self) -> &'static str {
        "servers"
    }

    fn capabilities(&self) -> ClientCapabilities {
        ClientCapabilities {
            transports: ALL_TRANSPORTS,
        }
    }

    fn detect_config_path(&self, ctx: &ClientContext) -> ConfigPathResult {
        let user = ctx.app_support_dir().join("Code").join("User").join("mcp.json");
        ctx.user_and_project(user, ".vscode/mcp.json")
    }

    fn needs_env_var_expansion(&self) -> bool {
        true
    }

    fn binary_names(&self) -> &'static [&'static str] {
        &["code"]
    }

    fn app_bundle_paths(&self, ctx: &ClientContext) -> Vec<PathBuf> {
        match ctx.platform {
            Platform::Darwin => vec![PathBuf::from("/Applications/Visual Studio Code.app")],
            Platform::Win32 => vec![ctx.home_dir.join("AppData/Local/Programs/Microsoft VS Code/Code.exe")],
            Platform::Linux => Vec::new(),
        }
    }

    fn requires_binary(&self) -> bool {
        false
    }

    fn render_entry(&self, mcp: &ResolvedMcp) -> serde_json::Result<Value> {
        serde_json::to_value(VsCodeEntry::from(mcp))
    }

    fn import_entry(&self, entry: &Value) -> Option<ImportedEntry> {
        let entry: VsCodeEntry = serde_json::from_value(entry.clone()).ok()?;
        if entry.command.is_none() && entry.url.is_none() {
            return None;
        }
        Some(ImportedEntry {
            command: entry.command.unwrap_or_default(),
            args: entry.args.unwrap_or_default(),
            env: entry.env.unwrap_or_default(),
            transport: entry.transport,
            url: entry.url,
        })
    }
}
