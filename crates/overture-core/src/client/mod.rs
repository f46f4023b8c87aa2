//! Client adapter layer.
//!
//! One adapter per supported client. Each declares where its config lives,
//! which transports it speaks and how a resolved MCP is rendered into its
//! own entry shape. Reading, writing and conversion share default
//! implementations on the trait.

pub mod claude_code;
pub mod claude_desktop;
pub mod copilot_cli;
pub mod cursor;
pub mod gemini_cli;
pub mod json;
pub mod opencode;
pub mod registry;
pub mod vscode;

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::OvertureConfig;
use crate::env::{EnvMap, expand_recursive, validate_env_vars};
use crate::error::Result;
use crate::fs::FileSystem;
use crate::resolve::{Resolution, ResolveTarget, ResolvedMcp, SkipReason, TransportPolicy, resolve};
use crate::types::{ClientId, ConfigScope, Platform, Transport};

pub use registry::AdapterRegistry;

/// Host facts adapters need to place their config files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientContext {
    pub platform: Platform,
    pub home_dir: PathBuf,
    pub project_root: Option<PathBuf>,
    /// `%APPDATA%` on Windows
    pub app_data: Option<PathBuf>,
    /// `$XDG_CONFIG_HOME`
    pub xdg_config_home: Option<PathBuf>,
}

impl ClientContext {
    pub fn new(platform: Platform, home_dir: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            home_dir: home_dir.into(),
            project_root: None,
            app_data: None,
            xdg_config_home: None,
        }
    }

    pub fn with_project_root(mut self, project_root: impl Into<PathBuf>) -> Self {
        self.project_root = Some(project_root.into());
        self
    }

    pub fn with_app_data(mut self, app_data: impl Into<PathBuf>) -> Self {
        self.app_data = Some(app_data.into());
        self
    }

    pub fn with_xdg_config_home(mut self, xdg_config_home: impl Into<PathBuf>) -> Self {
        self.xdg_config_home = Some(xdg_config_home.into());
        self
    }

    /// `$XDG_CONFIG_HOME`, falling back to `~/.config`.
    pub fn config_home(&self) -> PathBuf {
        self.xdg_config_home
            .clone()
            .unwrap_or_else(|| self.home_dir.join(".config"))
    }

    /// Per-platform directory desktop applications keep settings in.
    pub fn app_support_dir(&self) -> PathBuf {
        match self.platform {
            Platform::Darwin => self.home_dir.join("Library").join("Application Support"),
            Platform::Win32 => self
                .app_data
                .clone()
                .unwrap_or_else(|| self.home_dir.join("AppData").join("Roaming")),
            Platform::Linux => self.config_home(),
        }
    }

    /// `Single(user)` without a project root, `Dual` with one.
    pub fn user_and_project(&self, user: PathBuf, project_relative: &str) -> ConfigPathResult {
        match &self.project_root {
            Some(root) => ConfigPathResult::Dual {
                user,
                project: root.join(project_relative),
            },
            None => ConfigPathResult::Single(user),
        }
    }
}

/// Where a client keeps its configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigPathResult {
    Single(PathBuf),
    Dual { user: PathBuf, project: PathBuf },
    NotApplicable,
}

impl ConfigPathResult {
    /// Every (scope, path) pair, user scope first.
    pub fn targets(&self) -> Vec<(ConfigScope, PathBuf)> {
        match self {
            ConfigPathResult::Single(path) => vec![(ConfigScope::Global, path.clone())],
            ConfigPathResult::Dual { user, project } => vec![
                (ConfigScope::Global, user.clone()),
                (ConfigScope::Project, project.clone()),
            ],
            ConfigPathResult::NotApplicable => Vec::new(),
        }
    }

    pub fn for_scope(&self, scope: ConfigScope) -> Option<&Path> {
        match (self, scope) {
            (ConfigPathResult::Single(path), ConfigScope::Global) => Some(path),
            (ConfigPathResult::Dual { user, .. }, ConfigScope::Global) => Some(user),
            (ConfigPathResult::Dual { project, .. }, ConfigScope::Project) => Some(project),
            _ => None,
        }
    }

    pub fn is_dual(&self) -> bool {
        matches!(self, ConfigPathResult::Dual { .. })
    }
}

/// Static facts about a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientCapabilities {
    pub transports: &'static [Transport],
}

pub(crate) const ALL_TRANSPORTS: &[Transport] = &[Transport::Stdio, Transport::Http, Transport::Sse];

/// The servers under a client's root key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientDocument {
    pub root_key: String,
    pub servers: Map<String, Value>,
}

impl ClientDocument {
    pub fn new(root_key: impl Into<String>) -> Self {
        Self {
            root_key: root_key.into(),
            servers: Map::new(),
        }
    }

    pub fn with_servers(root_key: impl Into<String>, servers: Map<String, Value>) -> Self {
        Self {
            root_key: root_key.into(),
            servers,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.servers.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.servers.get(name)
    }

    /// `{ root_key: servers }`
    pub fn to_value(&self) -> Value {
        let mut root = Map::new();
        root.insert(self.root_key.clone(), Value::Object(self.servers.clone()));
        Value::Object(root)
    }
}

/// Inputs to [`ClientAdapter::convert_from_overture`].
#[derive(Debug, Clone, Copy)]
pub struct ConvertOptions<'a> {
    pub platform: Platform,
    pub env: &'a EnvMap,
    pub policy: TransportPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedMcp {
    pub name: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// An MCP dropped from a converted document because it could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct McpFailure {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingEnv {
    pub mcp: String,
    pub names: Vec<String>,
}

/// Result of converting the unified configuration for one client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversion {
    pub document: ClientDocument,
    pub skipped: Vec<SkippedMcp>,
    pub failures: Vec<McpFailure>,
    pub missing_env: Vec<MissingEnv>,
}

/// A client entry read back into unified terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedEntry {
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub transport: Transport,
    pub url: Option<String>,
}

#[async_trait]
pub trait ClientAdapter: Send + Sync + Debug {
    fn id(&self) -> ClientId;

    /// Top-level key holding the server map
    fn root_key(&self) -> &'static str {
        "mcpServers"
    }

    fn capabilities(&self) -> ClientCapabilities;

    /// Config location for this host. Pure: no filesystem access.
    fn detect_config_path(&self, ctx: &ClientContext) -> ConfigPathResult;

    fn supports_transport(&self, transport: Transport) -> bool {
        self.capabilities().transports.contains(&transport)
    }

    /// Whether `${VAR}` references must be resolved before writing.
    fn needs_env_var_expansion(&self) -> bool;

    fn binary_names(&self) -> &'static [&'static str];

    fn app_bundle_paths(&self, _ctx: &ClientContext) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Whether a missing binary means the client is not installed. Clients
    /// that ship as desktop apps or editors answer `false`.
    fn requires_binary(&self) -> bool {
        true
    }

    /// Render one resolved MCP into this client's entry shape.
    fn render_entry(&self, mcp: &ResolvedMcp) -> serde_json::Result<Value>;

    /// Read a client entry back into unified terms. `None` if the entry is
    /// not recognisable.
    fn import_entry(&self, entry: &Value) -> Option<ImportedEntry>;

    /// Missing file reads as an empty document.
    async fn read_config(&self, fs: &dyn FileSystem, path: &Path) -> Result<ClientDocument> {
        if !fs.exists(path).await {
            debug!(client = %self.id(), path = %path.display(), "Config file absent");
            return Ok(ClientDocument::new(self.root_key()));
        }
        let content = fs.read_to_string(path).await?;
        let root = json::parse_root(self.id(), path, &content)?;
        let servers = json::extract_servers(self.id(), path, &root, self.root_key())?;
        Ok(ClientDocument::with_servers(self.root_key(), servers))
    }

    /// Full file contents that writing `document` to `path` would produce.
    /// Every top-level key other than the root key is kept.
    async fn render_config(
        &self,
        fs: &dyn FileSystem,
        path: &Path,
        document: &ClientDocument,
    ) -> Result<String> {
        let root = if fs.exists(path).await {
            let content = fs.read_to_string(path).await?;
            json::parse_root(self.id(), path, &content)?
        } else {
            Map::new()
        };
        Ok(json::render_file(root, self.root_key(), &document.servers))
    }

    async fn write_config(
        &self,
        fs: &dyn FileSystem,
        path: &Path,
        document: &ClientDocument,
    ) -> Result<()> {
        let rendered = self.render_config(fs, path, document).await?;
        fs.write_atomic(path, rendered.as_bytes()).await
    }

    fn convert_from_overture(&self, config: &OvertureConfig, options: &ConvertOptions<'_>) -> Conversion {
        let capabilities = self.capabilities();
        let target = ResolveTarget::new(self.id(), options.platform, capabilities.transports)
            .with_policy(options.policy);

        let mut conversion = Conversion {
            document: ClientDocument::new(self.root_key()),
            ..Conversion::default()
        };

        for definition in config.mcp.values() {
            let resolved = match resolve(definition, &target) {
                Resolution::Resolved(resolved) => resolved,
                Resolution::Skip(reason) => {
                    conversion.skipped.push(SkippedMcp {
                        name: definition.name.clone(),
                        reason,
                    });
                    continue;
                }
            };

            let resolved = if self.needs_env_var_expansion() {
                let missing = missing_env_vars(&resolved, options.env);
                if !missing.is_empty() {
                    conversion.missing_env.push(MissingEnv {
                        mcp: resolved.name.clone(),
                        names: missing,
                    });
                }
                match expand_resolved(resolved, options.env) {
                    Ok(expanded) => expanded,
                    Err(e) => {
                        warn!(client = %self.id(), mcp = %definition.name, "Env expansion failed: {}", e);
                        conversion.failures.push(McpFailure {
                            name: definition.name.clone(),
                            error: e.to_string(),
                        });
                        continue;
                    }
                }
            } else {
                resolved
            };

            match self.render_entry(&resolved) {
                Ok(entry) => {
                    conversion.document.servers.insert(resolved.name.clone(), entry);
                }
                Err(e) => conversion.failures.push(McpFailure {
                    name: resolved.name.clone(),
                    error: e.to_string(),
                }),
            }
        }

        conversion
    }
}

/// Config location for `adapter`, honouring `clients.<id>.configPath`.
pub fn configured_path(
    adapter: &dyn ClientAdapter,
    ctx: &ClientContext,
    config: &OvertureConfig,
) -> ConfigPathResult {
    match config.clients.get(&adapter.id()).and_then(|s| s.config_path.as_ref()) {
        Some(path) => ConfigPathResult::Single(expand_home(path, &ctx.home_dir)),
        None => adapter.detect_config_path(ctx),
    }
}

fn expand_home(path: &Path, home_dir: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home_dir.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Names referenced by the resolved MCP that have no value and no default.
pub fn missing_env_vars(mcp: &ResolvedMcp, env: &EnvMap) -> Vec<String> {
    let mut missing: Vec<String> = std::iter::once(mcp.command.as_str())
        .chain(mcp.args.iter().map(String::as_str))
        .chain(mcp.env.iter().flat_map(|e| e.values().map(String::as_str)))
        .chain(mcp.url.as_deref())
        .flat_map(|template| validate_env_vars(template, env))
        .collect();
    missing.sort();
    missing.dedup();
    missing
}

/// Resolve every reference in command, args, env values and url.
pub fn expand_resolved(mut mcp: ResolvedMcp, env: &EnvMap) -> Result<ResolvedMcp> {
    mcp.command = expand_recursive(&mcp.command, env)?;
    mcp.args = mcp
        .args
        .iter()
        .map(|arg| expand_recursive(arg, env))
        .collect::<Result<_>>()?;
    if let Some(values) = mcp.env.as_mut() {
        for value in values.values_mut() {
            *value = expand_recursive(value, env)?;
        }
    }
    if let Some(url) = mcp.url.as_mut() {
        *url = expand_recursive(url, env)?;
    }
    Ok(mcp)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn resolved(name: &str, command: &str, args: &[&str]) -> ResolvedMcp {
        ResolvedMcp {
            name: name.to_string(),
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            env: None,
            transport: Transport::Stdio,
            url: None,
        }
    }

    pub fn remote(name: &str, transport: Transport, url: &str) -> ResolvedMcp {
        ResolvedMcp {
            name: name.to_string(),
            command: String::new(),
            args: Vec::new(),
            env: None,
            transport,
            url: Some(url.to_string()),
        }
    }

    pub fn with_env(mut mcp: ResolvedMcp, key: &str, value: &str) -> ResolvedMcp {
        mcp.env
            .get_or_insert_with(BTreeMap::new)
            .insert(key.to_string(), value.to_string());
        mcp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::claude_code::ClaudeCodeClient;
    use crate::client::claude_desktop::ClaudeDesktopClient;
    use crate::client::cursor::CursorClient;
    use crate::config::McpDefinition;
    use crate::fs::LocalFs;
    use serde_json::json;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> EnvMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn options(env: &EnvMap) -> ConvertOptions<'_> {
        ConvertOptions {
            platform: Platform::Linux,
            env,
            policy: TransportPolicy::Enforce,
        }
    }

    #[test]
    fn test_dual_paths_only_with_project_root() {
        let ctx = ClientContext::new(Platform::Linux, "/home/u");
        assert_eq!(
            ctx.user_and_project(PathBuf::from("/home/u/a.json"), ".a.json"),
            ConfigPathResult::Single(PathBuf::from("/home/u/a.json"))
        );

        let ctx = ctx.with_project_root("/work");
        let result = ctx.user_and_project(PathBuf::from("/home/u/a.json"), ".a.json");
        let targets = result.targets();
        assert_eq!(targets[0].0, ConfigScope::Global);
        assert_eq!(targets[1], (ConfigScope::Project, PathBuf::from("/work/.a.json")));
    }

    #[test]
    fn test_app_support_dir_per_platform() {
        let home = PathBuf::from("/h");
        let mac = ClientContext::new(Platform::Darwin, &home);
        assert_eq!(mac.app_support_dir(), home.join("Library/Application Support"));

        let win = ClientContext::new(Platform::Win32, &home).with_app_data("C:/Users/u/AppData/Roaming");
        assert_eq!(win.app_support_dir(), PathBuf::from("C:/Users/u/AppData/Roaming"));

        let linux = ClientContext::new(Platform::Linux, &home).with_xdg_config_home("/xdg");
        assert_eq!(linux.app_support_dir(), PathBuf::from("/xdg"));
    }

    #[test]
    fn test_convert_skips_unsupported_transport() {
        let mut config = OvertureConfig::new();
        config.insert(McpDefinition::stdio("fs", "mcp-fs", Vec::new()));
        config.insert(McpDefinition::remote("api", Transport::Http, "https://x/mcp"));

        let env = EnvMap::new();
        let conversion = ClaudeDesktopClient.convert_from_overture(&config, &options(&env));

        assert_eq!(conversion.document.names(), vec!["fs".to_string()]);
        assert_eq!(conversion.skipped.len(), 1);
        assert_eq!(conversion.skipped[0].name, "api");
    }

    #[test]
    fn test_convert_with_allow_policy_keeps_unsupported_transport() {
        let mut config = OvertureConfig::new();
        config.insert(McpDefinition::remote("api", Transport::Http, "https://x/mcp"));

        let env = EnvMap::new();
        let opts = ConvertOptions {
            policy: TransportPolicy::Allow,
            ..options(&env)
        };
        let conversion = ClaudeDesktopClient.convert_from_overture(&config, &opts);

        assert!(conversion.document.get("api").is_some());
    }

    #[test]
    fn test_convert_expands_for_expanding_clients() {
        let mut config = OvertureConfig::new();
        config.insert(
            McpDefinition::stdio("gh", "mcp-github", vec!["--token=${TOKEN}".into()])
                .with_env("TOKEN", "${TOKEN}")
                .with_env("HOST", "${GH_HOST:-github.com}"),
        );

        let env = env(&[("TOKEN", "abc")]);
        let conversion = CursorClient.convert_from_overture(&config, &options(&env));

        assert_eq!(
            conversion.document.get("gh"),
            Some(&json!({
                "command": "mcp-github",
                "args": ["--token=abc"],
                "env": {"HOST": "github.com", "TOKEN": "abc"}
            }))
        );
        assert!(conversion.missing_env.is_empty());
    }

    #[test]
    fn test_convert_leaves_references_for_native_clients() {
        let mut config = OvertureConfig::new();
        config.insert(McpDefinition::stdio("gh", "mcp-github", Vec::new()).with_env("TOKEN", "${TOKEN}"));

        let env = env(&[("TOKEN", "abc")]);
        let conversion = ClaudeCodeClient.convert_from_overture(&config, &options(&env));

        assert_eq!(conversion.document.get("gh").unwrap()["env"]["TOKEN"], "${TOKEN}");
    }

    #[test]
    fn test_convert_reports_missing_env() {
        let mut config = OvertureConfig::new();
        config.insert(McpDefinition::stdio("gh", "mcp-github", Vec::new()).with_env("TOKEN", "${NOPE}"));

        let env = EnvMap::new();
        let conversion = CursorClient.convert_from_overture(&config, &options(&env));

        assert_eq!(
            conversion.missing_env,
            vec![MissingEnv {
                mcp: "gh".to_string(),
                names: vec!["NOPE".to_string()]
            }]
        );
        assert_eq!(conversion.document.get("gh").unwrap()["env"]["TOKEN"], "");
    }

    #[test]
    fn test_convert_circular_reference_drops_only_that_mcp() {
        let mut config = OvertureConfig::new();
        config.insert(McpDefinition::stdio("loop", "x", Vec::new()).with_env("V", "${A}"));
        config.insert(McpDefinition::stdio("ok", "y", Vec::new()));

        let env = env(&[("A", "${B}"), ("B", "${A}")]);
        let conversion = CursorClient.convert_from_overture(&config, &options(&env));

        assert_eq!(conversion.document.names(), vec!["ok".to_string()]);
        assert_eq!(conversion.failures.len(), 1);
        assert_eq!(conversion.failures[0].name, "loop");
    }

    #[test]
    fn test_configured_path_overrides_detection() {
        let mut config = OvertureConfig::new();
        config.clients.insert(
            ClientId::ClaudeCode,
            crate::config::ClientSettings {
                enabled: true,
                config_path: Some(PathBuf::from("~/custom/.claude.json")),
            },
        );
        let ctx = ClientContext::new(Platform::Linux, "/home/u").with_project_root("/p");

        assert_eq!(
            configured_path(&ClaudeCodeClient, &ctx, &config),
            ConfigPathResult::Single(PathBuf::from("/home/u/custom/.claude.json"))
        );
        assert!(configured_path(&CursorClient, &ctx, &config).is_dual());
    }

    #[tokio::test]
    async fn test_read_missing_file_is_empty_document() {
        let temp = TempDir::new().unwrap();
        let doc = CursorClient
            .read_config(&LocalFs, &temp.path().join("mcp.json"))
            .await
            .unwrap();
        assert!(doc.is_empty());
        assert_eq!(doc.root_key, "mcpServers");
    }

    #[tokio::test]
    async fn test_read_invalid_file_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("mcp.json");
        std::fs::write(&path, "{\"mcpServers\": ").unwrap();

        let err = CursorClient.read_config(&LocalFs, &path).await.unwrap_err();
        assert!(matches!(err, crate::error::OvertureError::ClientRead { .. }));
    }

    #[tokio::test]
    async fn test_write_preserves_unrelated_top_level_keys() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".claude.json");
        std::fs::write(
            &path,
            r#"{"numStartups": 12, "projects": {"/w": {"allowedTools": []}}, "mcpServers": {"old": {"command": "o"}}}"#,
        )
        .unwrap();

        let mut servers = Map::new();
        servers.insert("new".to_string(), json!({"command": "n", "args": []}));
        let doc = ClientDocument::with_servers("mcpServers", servers);
        ClaudeCodeClient.write_config(&LocalFs, &path, &doc).await.unwrap();

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(
            written,
            json!({
                "numStartups": 12,
                "projects": {"/w": {"allowedTools": []}},
                "mcpServers": {"new": {"command": "n", "args": []}}
            })
        );
    }
}
