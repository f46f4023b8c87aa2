//! Unified config path resolution helpers.

use std::path::{Path, PathBuf};

pub const GLOBAL_CONFIG_FILE: &str = ".config/overture.yml";
pub const PROJECT_CONFIG_DIR: &str = ".overture";
pub const PROJECT_CONFIG_FILE: &str = "config.yaml";

pub fn global_config_path(home_dir: &Path) -> PathBuf {
    home_dir.join(GLOBAL_CONFIG_FILE)
}

pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_CONFIG_DIR).join(PROJECT_CONFIG_FILE)
}
