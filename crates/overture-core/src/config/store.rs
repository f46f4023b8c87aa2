//! Config store for loading and saving the unified YAML layers.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use tracing::debug;

use super::{OvertureConfig, merge::merge_layers, paths};
use crate::error::{OvertureError, Result};
use crate::types::ConfigScope;

/// Source of the unified configuration for one invocation.
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// Load, merge and validate the configuration.
    async fn load(&self) -> Result<OvertureConfig>;
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    global_path: PathBuf,
    project_path: Option<PathBuf>,
}

impl ConfigStore {
    pub fn from_paths(home_dir: &Path, project_root: Option<&Path>) -> Self {
        Self {
            global_path: paths::global_config_path(home_dir),
            project_path: project_root.map(paths::project_config_path),
        }
    }

    /// Store with explicit file locations.
    pub fn with_files(global_path: PathBuf, project_path: Option<PathBuf>) -> Self {
        Self {
            global_path,
            project_path,
        }
    }

    pub fn global_path(&self) -> &Path {
        &self.global_path
    }

    pub fn project_path(&self) -> Option<&Path> {
        self.project_path.as_deref()
    }

    pub fn path_for_scope(&self, scope: ConfigScope) -> Option<&Path> {
        match scope {
            ConfigScope::Global => Some(&self.global_path),
            ConfigScope::Project => self.project_path.as_deref(),
        }
    }

    /// Load a single layer without merging. `None` when the file is absent.
    pub async fn load_layer(&self, scope: ConfigScope) -> Result<Option<OvertureConfig>> {
        match self.path_for_scope(scope) {
            Some(path) => read_layer(path).await,
            None => Ok(None),
        }
    }

    /// Write a single layer back to disk.
    pub async fn save_layer(&self, scope: ConfigScope, config: &OvertureConfig) -> anyhow::Result<()> {
        let path = self
            .path_for_scope(scope)
            .ok_or_else(|| anyhow::anyhow!("No {} config path (no project root)", scope))?;
        let content = to_yaml(config).context("Failed to serialize config to YAML")?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        tokio::fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }
}

#[async_trait]
impl ConfigLoader for ConfigStore {
    async fn load(&self) -> Result<OvertureConfig> {
        let global = read_layer(&self.global_path).await?;
        let project = match &self.project_path {
            Some(path) => read_layer(path).await?,
            None => None,
        };

        if global.is_none() && project.is_none() {
            let mut searched = vec![self.global_path.clone()];
            searched.extend(self.project_path.clone());
            return Err(OvertureError::ConfigNotFound { searched });
        }

        let merged = merge_layers(global, project);
        merged.validate()?;
        debug!(mcp_count = merged.mcp.len(), "Loaded unified configuration");
        Ok(merged)
    }
}

/// Parse one YAML layer.
pub fn parse_config_str(content: &str, path: &Path) -> Result<OvertureConfig> {
    if content.trim().is_empty() {
        return Ok(OvertureConfig::new());
    }
    let mut config: OvertureConfig =
        serde_yaml::from_str(content).map_err(|err| OvertureError::ConfigParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
    config.normalize_names();
    Ok(config)
}

pub fn to_yaml(config: &OvertureConfig) -> std::result::Result<String, serde_yaml::Error> {
    serde_yaml::to_string(config)
}

async fn read_layer(path: &Path) -> Result<Option<OvertureConfig>> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            debug!(path = %path.display(), "Reading configuration layer");
            parse_config_str(&content, path).map(Some)
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(OvertureError::ConfigParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        }),
    }
}

/// In-memory loader, handy for embedding and tests.
#[derive(Debug, Clone)]
pub struct StaticLoader(pub OvertureConfig);

#[async_trait]
impl ConfigLoader for StaticLoader {
    async fn load(&self) -> Result<OvertureConfig> {
        let mut config = self.0.clone();
        config.normalize_names();
        config.validate()?;
        Ok(config)
    }
}
