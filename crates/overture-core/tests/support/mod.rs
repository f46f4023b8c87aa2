#![allow(dead_code)]

use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;

use overture_core::config::{McpDefinition, OvertureConfig};
use overture_core::context::AppContext;
use overture_core::types::Platform;

/// A throwaway home directory, optional project root and state dir.
pub struct Sandbox {
    pub home: TempDir,
    pub project: Option<TempDir>,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            home: TempDir::new().unwrap(),
            project: None,
        }
    }

    pub fn with_project() -> Self {
        Self {
            home: TempDir::new().unwrap(),
            project: Some(TempDir::new().unwrap()),
        }
    }

    pub fn home(&self) -> &Path {
        self.home.path()
    }

    pub fn project(&self) -> &Path {
        self.project.as_ref().unwrap().path()
    }

    pub fn state_dir(&self) -> PathBuf {
        AppContext::default_state_dir(self.home())
    }

    pub fn context(&self) -> AppContext {
        AppContext::new(
            self.home().to_path_buf(),
            self.project.as_ref().map(|p| p.path().to_path_buf()),
            self.state_dir(),
        )
        .with_platform(Platform::Linux)
    }

    pub fn write_json(&self, path: &Path, value: &Value) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    }

    pub fn backups(&self) -> Vec<PathBuf> {
        let dir = self.state_dir().join("backups");
        let mut paths: Vec<_> = match std::fs::read_dir(&dir) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        };
        paths.sort();
        paths
    }
}

pub fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

pub fn config_with(definitions: Vec<McpDefinition>) -> OvertureConfig {
    let mut config = OvertureConfig::new();
    for definition in definitions {
        config.insert(definition);
    }
    config
}

pub fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
