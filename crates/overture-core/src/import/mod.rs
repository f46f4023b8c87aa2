//! Import of hand-written client entries into the unified configuration.
//!
//! [`ImportScanner`] reads every client document, turns unmanaged entries
//! back into [`DiscoveredMcp`] values and runs [`detect_conflicts`] over them.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use anyhow::Context;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::{AdapterRegistry, ClientContext, configured_path};
use crate::config::{ConfigStore, McpDefinition, OvertureConfig};
use crate::fs::FileSystem;
use crate::types::{ClientId, ConfigScope, Transport};

/// Where a discovered entry was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McpSource {
    pub client: ClientId,
    pub location_type: ConfigScope,
    pub file_path: PathBuf,
}

/// One (client, location) occurrence of a server name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredMcp {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    pub transport: Transport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub source: McpSource,
    pub suggested_scope: ConfigScope,
}

impl DiscoveredMcp {
    pub fn shape(&self) -> ComparedShape {
        ComparedShape {
            command: self.command.clone(),
            args: self.args.clone(),
            env: self.env.clone(),
        }
    }

    /// The unified definition for this entry. Scope is left unset: the
    /// layer the definition is written to decides it.
    pub fn to_definition(&self) -> McpDefinition {
        McpDefinition {
            name: self.name.clone(),
            command: self.command.clone(),
            args: self.args.clone(),
            env: self.env.clone(),
            transport: self.transport,
            url: self.url.clone(),
            scope: None,
            platform_rules: Default::default(),
            client_rules: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictReason {
    DifferentCommand,
    DifferentArgs,
    DifferentEnv,
}

/// The fields conflict detection compares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparedShape {
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub name: String,
    pub sources: Vec<McpSource>,
    pub configs: Vec<ComparedShape>,
    pub reason: ConflictReason,
}

/// Group by name and report every group whose members disagree.
///
/// Command is checked across the whole group before args, and args before
/// env, so the reported reason is the highest-priority difference. Output
/// is sorted by name.
pub fn detect_conflicts(discovered: &[DiscoveredMcp]) -> Vec<Conflict> {
    let mut groups: BTreeMap<&str, Vec<&DiscoveredMcp>> = BTreeMap::new();
    for mcp in discovered {
        groups.entry(mcp.name.as_str()).or_default().push(mcp);
    }

    groups
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .filter_map(|(name, members)| {
            let first = members[0];
            let reason = if members.iter().any(|m| m.command != first.command) {
                ConflictReason::DifferentCommand
            } else if members.iter().any(|m| m.args != first.args) {
                ConflictReason::DifferentArgs
            } else if members.iter().any(|m| m.env != first.env) {
                ConflictReason::DifferentEnv
            } else {
                return None;
            };
            Some(Conflict {
                name: name.to_string(),
                sources: members.iter().map(|m| m.source.clone()).collect(),
                configs: members.iter().map(|m| m.shape()).collect(),
                reason,
            })
        })
        .collect()
}

/// A client file that could not be read, or an entry that could not be
/// understood.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportParseError {
    pub client: ClientId,
    pub file_path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPlan {
    pub importable: Vec<DiscoveredMcp>,
    pub conflicts: Vec<Conflict>,
    pub parse_errors: Vec<ImportParseError>,
}

impl ImportPlan {
    pub fn is_empty(&self) -> bool {
        self.importable.is_empty() && self.conflicts.is_empty() && self.parse_errors.is_empty()
    }

    /// Detect-mode exit status: 1 for parse errors, 2 for conflicts.
    pub fn exit_code(&self) -> i32 {
        if !self.parse_errors.is_empty() {
            1
        } else if !self.conflicts.is_empty() {
            2
        } else {
            0
        }
    }

    /// Add every non-conflicting discovery to `config`. The first source of
    /// a name wins. Returns the names added.
    pub fn apply_to(&self, config: &mut OvertureConfig) -> Vec<String> {
        let conflicted: BTreeSet<&str> = self.conflicts.iter().map(|c| c.name.as_str()).collect();
        let mut added = Vec::new();
        for mcp in &self.importable {
            if conflicted.contains(mcp.name.as_str()) || config.is_managed(&mcp.name) {
                continue;
            }
            config.insert(mcp.to_definition());
            added.push(mcp.name.clone());
        }
        info!(count = added.len(), "Imported MCP definitions");
        added
    }

    /// Write each first-source definition into the layer of its suggested
    /// scope and save the touched layers. Project suggestions land in the
    /// user layer when the store has no project.
    pub async fn apply_to_store(&self, store: &ConfigStore) -> anyhow::Result<Vec<String>> {
        let mut seen = BTreeSet::new();
        let first_sources: Vec<&DiscoveredMcp> = self
            .importable
            .iter()
            .filter(|mcp| seen.insert(mcp.name.as_str()))
            .collect();

        let mut added = Vec::new();
        for scope in [ConfigScope::Global, ConfigScope::Project] {
            let importable: Vec<DiscoveredMcp> = first_sources
                .iter()
                .filter(|mcp| {
                    let target = if store.project_path().is_some() {
                        mcp.suggested_scope
                    } else {
                        ConfigScope::Global
                    };
                    target == scope
                })
                .map(|mcp| (*mcp).clone())
                .collect();
            if importable.is_empty() {
                continue;
            }

            let mut layer = store
                .load_layer(scope)
                .await
                .with_context(|| format!("Failed to load {scope} configuration"))?
                .unwrap_or_else(OvertureConfig::new);
            let scoped = ImportPlan {
                importable,
                conflicts: self.conflicts.clone(),
                parse_errors: Vec::new(),
            };
            added.extend(scoped.apply_to(&mut layer));
            store.save_layer(scope, &layer).await?;
        }
        Ok(added)
    }
}

/// Reads client documents and collects unmanaged entries.
#[derive(Debug)]
pub struct ImportScanner<'a> {
    registry: &'a AdapterRegistry,
    fs: &'a dyn FileSystem,
    ctx: &'a ClientContext,
}

impl<'a> ImportScanner<'a> {
    pub fn new(registry: &'a AdapterRegistry, fs: &'a dyn FileSystem, ctx: &'a ClientContext) -> Self {
        Self { registry, fs, ctx }
    }

    /// Scan `clients` (in order). Names already present in `config` are
    /// skipped.
    pub async fn scan(&self, clients: &[ClientId], config: &OvertureConfig) -> ImportPlan {
        let mut plan = ImportPlan::default();

        for adapter in self.registry.filter_by_targets(clients) {
            for (scope, path) in configured_path(adapter, self.ctx, config).targets() {
                if !self.fs.exists(&path).await {
                    continue;
                }
                let document = match adapter.read_config(self.fs, &path).await {
                    Ok(document) => document,
                    Err(e) => {
                        warn!(client = %adapter.id(), path = %path.display(), "Unreadable client config: {}", e);
                        plan.parse_errors.push(ImportParseError {
                            client: adapter.id(),
                            file_path: path.clone(),
                            message: e.to_string(),
                        });
                        continue;
                    }
                };

                for (name, entry) in &document.servers {
                    if config.is_managed(name) {
                        continue;
                    }
                    let Some(imported) = adapter.import_entry(entry) else {
                        plan.parse_errors.push(ImportParseError {
                            client: adapter.id(),
                            file_path: path.clone(),
                            message: format!("unrecognised entry '{name}'"),
                        });
                        continue;
                    };
                    debug!(client = %adapter.id(), mcp = %name, ?scope, "Discovered MCP");
                    plan.importable.push(DiscoveredMcp {
                        name: name.clone(),
                        command: imported.command,
                        args: imported.args,
                        env: imported.env,
                        transport: imported.transport,
                        url: imported.url,
                        source: McpSource {
                            client: adapter.id(),
                            location_type: scope,
                            file_path: path.clone(),
                        },
                        suggested_scope: scope,
                    });
                }
            }
        }

        plan.conflicts = detect_conflicts(&plan.importable);
        plan
    }
}
