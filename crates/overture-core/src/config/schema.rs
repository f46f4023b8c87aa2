//! Configuration schema for the unified Overture file.
//!
//! Two layers share this shape:
//! - Global: ~/.config/overture.yml
//! - Project: ./.overture/config.yaml

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{OvertureError, Result};
use crate::types::{ClientId, ConfigScope, Platform, Transport};

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OvertureConfig {
    #[serde(default = "default_version")]
    pub version: String,

    /// MCP server definitions keyed by name
    #[serde(default)]
    pub mcp: BTreeMap<String, McpDefinition>,

    /// Per-client enable/override settings
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub clients: BTreeMap<ClientId, ClientSettings>,

    #[serde(default, skip_serializing_if = "SyncSettings::is_default")]
    pub sync: SyncSettings,

    #[serde(default, skip_serializing_if = "DiscoverySettings::is_default")]
    pub discovery: DiscoverySettings,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for OvertureConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            mcp: BTreeMap::new(),
            clients: BTreeMap::new(),
            sync: SyncSettings::default(),
            discovery: DiscoverySettings::default(),
        }
    }
}

impl OvertureConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy each map key into its definition's `name`.
    pub fn normalize_names(&mut self) {
        for (name, definition) in self.mcp.iter_mut() {
            definition.name = name.clone();
        }
    }

    /// Insert a definition under its own name.
    pub fn insert(&mut self, definition: McpDefinition) {
        self.mcp.insert(definition.name.clone(), definition);
    }

    /// Whether `name` is declared in the `mcp` map.
    pub fn is_managed(&self, name: &str) -> bool {
        self.mcp.contains_key(name)
    }

    /// Clients enabled for a default (untargeted) run, in declaration order.
    pub fn enabled_clients(&self) -> Vec<ClientId> {
        ClientId::ALL
            .into_iter()
            .filter(|id| self.clients.get(id).is_none_or(|settings| settings.enabled))
            .collect()
    }

    /// Copy of this configuration holding only the definitions `keep` accepts.
    pub fn filtered<F>(&self, keep: F) -> OvertureConfig
    where
        F: Fn(&McpDefinition) -> bool,
    {
        OvertureConfig {
            version: self.version.clone(),
            mcp: self
                .mcp
                .iter()
                .filter(|(_, definition)| keep(definition))
                .map(|(name, definition)| (name.clone(), definition.clone()))
                .collect(),
            clients: self.clients.clone(),
            sync: self.sync.clone(),
            discovery: self.discovery.clone(),
        }
    }

    /// Validate every definition.
    pub fn validate(&self) -> Result<()> {
        for definition in self.mcp.values() {
            definition.validate()?;
        }
        Ok(())
    }
}

/// One MCP server definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpDefinition {
    /// Unique key; mirrors the key in [`OvertureConfig::mcp`]
    #[serde(skip)]
    pub name: String,

    #[serde(default)]
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Values may contain `${VAR}` / `${VAR:-default}` references
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    pub transport: Transport,

    /// Endpoint for http/sse transports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Layer this definition was declared in. Never written back: the file
    /// a definition lives in is its scope.
    #[serde(default, skip_serializing)]
    pub scope: Option<ConfigScope>,

    #[serde(default, rename = "platforms", skip_serializing_if = "PlatformRules::is_empty")]
    pub platform_rules: PlatformRules,

    #[serde(default, rename = "clients", skip_serializing_if = "ClientRules::is_empty")]
    pub client_rules: ClientRules,
}

impl McpDefinition {
    /// A stdio definition with no rules attached.
    pub fn stdio(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args,
            env: BTreeMap::new(),
            transport: Transport::Stdio,
            url: None,
            scope: None,
            platform_rules: PlatformRules::default(),
            client_rules: ClientRules::default(),
        }
    }

    /// A remote (http/sse) definition with no rules attached.
    pub fn remote(name: impl Into<String>, transport: Transport, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: String::new(),
            args: Vec::new(),
            env: BTreeMap::new(),
            transport,
            url: Some(url.into()),
            scope: None,
            platform_rules: PlatformRules::default(),
            client_rules: ClientRules::default(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_scope(mut self, scope: ConfigScope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Declared scope, treating an untagged definition as global.
    pub fn effective_scope(&self) -> ConfigScope {
        self.scope.unwrap_or(ConfigScope::Global)
    }

    pub fn validate(&self) -> Result<()> {
        match self.transport {
            Transport::Stdio if self.command.trim().is_empty() => Err(OvertureError::ConfigInvalid {
                name: self.name.clone(),
                message: "stdio transport requires a command".to_string(),
            }),
            Transport::Http | Transport::Sse
                if self.command.trim().is_empty()
                    && self.url.as_deref().is_none_or(|u| u.trim().is_empty()) =>
            {
                Err(OvertureError::ConfigInvalid {
                    name: self.name.clone(),
                    message: format!("{} transport requires a url or a command", self.transport),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Platform exclusions and per-platform overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformRules {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<Platform>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub command_overrides: BTreeMap<Platform, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub args_overrides: BTreeMap<Platform, Vec<String>>,
}

impl PlatformRules {
    pub fn is_empty(&self) -> bool {
        self.exclude.is_empty() && self.command_overrides.is_empty() && self.args_overrides.is_empty()
    }
}

/// Client targeting and per-client overrides.
///
/// `include` and `exclude` are mutually exclusive; when both are present
/// `include` wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRules {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<ClientId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Vec<ClientId>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub overrides: BTreeMap<ClientId, ClientOverride>,
}

impl ClientRules {
    pub fn is_empty(&self) -> bool {
        self.exclude.is_empty() && self.include.is_none() && self.overrides.is_empty()
    }
}

/// Partial per-client override. `env` merges, everything else replaces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport: Option<Transport>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Client entry under the top-level `clients` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Replaces the detected config path (single scope)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            config_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    /// Back up client files before modifying them
    #[serde(default = "default_true")]
    pub backup: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,

    #[serde(default = "default_backup_retention")]
    pub backup_retention: usize,

    #[serde(default = "default_true")]
    pub detect_binaries: bool,
}

impl SyncSettings {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            backup: true,
            backup_dir: None,
            backup_retention: default_backup_retention(),
            detect_binaries: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverySettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Upper bound for every binary probe
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl DiscoverySettings {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_backup_retention() -> usize {
    10
}

fn default_timeout_ms() -> u64 {
    5000
}
