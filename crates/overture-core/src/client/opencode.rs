//! OpenCode client.
//!
//! - root key `mcp`, shared with the rest of `opencode.json`
//! - `command` is one array holding the executable and its arguments
//! - `environment` instead of `env`, with `{env:VAR}` references
//! - `type` is `local` or `remote`, and entries are written `enabled`

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{ClientAdapter, ClientCapabilities, ClientContext, ConfigPathResult, ImportedEntry};
use crate::env::{
    convert_env_map_from_opencode, convert_env_map_to_opencode, convert_from_opencode_env,
    convert_to_opencode_env,
};
use crate::resolve::ResolvedMcp;
use crate::types::{ClientId, Transport};

#[derive(Debug, Default, Clone, Copy)]
pub struct OpenCodeClient;

impl OpenCodeClient {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OpenCodeEntry {
    Local {
        command: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        environment: Option<BTreeMap<String, String>>,
        #[serde(default = "enabled")]
        enabled: bool,
    },
    Remote {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        headers: Option<BTreeMap<String, String>>,
        #[serde(default = "enabled")]
        enabled: bool,
    },
}

fn enabled() -> bool {
    true
}

impl From<&ResolvedMcp> for OpenCodeEntry {
    fn from(mcp: &ResolvedMcp) -> Self {
        match (&mcp.url, mcp.transport.is_remote()) {
            (Some(url), true) => OpenCodeEntry::Remote {
                url: convert_to_opencode_env(url),
                headers: None,
                enabled: true,
            },
            _ => OpenCodeEntry::Local {
                command: std::iter::once(&mcp.command)
                    .chain(mcp.args.iter())
                    .map(|part| convert_to_opencode_env(part))
                    .collect(),
                environment: mcp.env.as_ref().map(convert_env_map_to_opencode),
                enabled: true,
            },
        }
    }
}

impl ClientAdapter for OpenCodeClient {
    fn id(&self) -> ClientId {
        ClientId::OpenCode
    }

    fn root_key(&self) -> &'static str {
        "mcp"
    }

    fn capabilities(&self) -> ClientCapabilities {
        ClientCapabilities {
            transports: &[Transport::Stdio, Transport::Http],
        }
    }

    fn detect_config_path(&self, ctx: &ClientContext) -> ConfigPathResult {
        ctx.user_and_project(
            ctx.config_home().join("opencode").join("opencode.json"),
            "opencode.json",
        )
    }

    /// `{env:VAR}` is resolved by OpenCode itself.
    fn needs_env_var_expansion(&self) -> bool {
        false
    }

    fn binary_names(&self) -> &'static [&'static str] {
        &["opencode"]
    }

    fn render_entry(&self, mcp: &ResolvedMcp) -> serde_json::Result<Value> {
        serde_json::to_value(OpenCodeEntry::from(mcp))
    }

    fn import_entry(&self, entry: &Value) -> Option<ImportedEntry> {
        match serde_json::from_value(entry.clone()).ok()? {
            OpenCodeEntry::Local {
                command,
                environment,
                ..
            } => {
                let mut parts = command.iter().map(|part| convert_from_opencode_env(part));
                let executable = parts.next()?;
                Some(ImportedEntry {
                    command: executable,
                    args: parts.collect(),
                    env: environment
                        .as_ref()
                        .map(convert_env_map_from_opencode)
                        .unwrap_or_default(),
                    transport: Transport::Stdio,
                    url: None,
                })
            }
            OpenCodeEntry::Remote { url, .. } => Some(ImportedEntry {
                command: String::new(),
                args: Vec::new(),
                env: BTreeMap::new(),
                transport: Transport::Http,
                url: Some(convert_from_opencode_env(&url)),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::{remote, resolved, with_env};
    use crate::types::Platform;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_paths_follow_xdg() {
        let ctx = ClientContext::new(Platform::Linux, "/home/u")
            .with_xdg_config_home("/xdg")
            .with_project_root("/p");
        assert_eq!(
            OpenCodeClient.detect_config_path(&ctx),
            ConfigPathResult::Dual {
                user: PathBuf::from("/xdg/opencode/opencode.json"),
                project: PathBuf::from("/p/opencode.json"),
            }
        );
    }

    #[test]
    fn test_local_entry_merges_command_and_args() {
        let mcp = with_env(
            resolved("gh", "npx", &["-y", "@modelcontextprotocol/server-github"]),
            "GITHUB_TOKEN",
            "${GITHUB_TOKEN:-none}",
        );
        assert_eq!(
            OpenCodeClient.render_entry(&mcp).unwrap(),
            json!({
                "type": "local",
                "command": ["npx", "-y", "@modelcontextprotocol/server-github"],
                "environment": {"GITHUB_TOKEN": "{env:GITHUB_TOKEN:-none}"},
                "enabled": true
            })
        );
    }

    #[test]
    fn test_remote_entry() {
        assert_eq!(
            OpenCodeClient
                .render_entry(&remote("api", Transport::Http, "https://x/mcp"))
                .unwrap(),
            json!({"type": "remote", "url": "https://x/mcp", "enabled": true})
        );
    }

    #[test]
    fn test_sse_is_unsupported() {
        assert!(!OpenCodeClient.supports_transport(Transport::Sse));
    }

    #[test]
    fn test_import_translates_back() {
        let imported = OpenCodeClient
            .import_entry(&json!({
                "type": "local",
                "command": ["mcp-github", "--token", "{env:TOKEN}"],
                "environment": {"TOKEN": "{env:TOKEN}"}
            }))
            .unwrap();
        assert_eq!(imported.command, "mcp-github");
        assert_eq!(imported.args, vec!["--token".to_string(), "${TOKEN}".to_string()]);
        assert_eq!(imported.env["TOKEN"], "${TOKEN}");
    }

    #[test]
    fn test_import_empty_command_is_rejected() {
        assert!(
            OpenCodeClient
                .import_entry(&json!({"type": "local", "command": []}))
                .is_none()
        );
    }
}
