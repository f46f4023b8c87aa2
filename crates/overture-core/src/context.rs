//! Application context for dependency injection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backup::BackupService;
use crate::client::ClientContext;
use crate::config::{ConfigStore, SyncSettings};
use crate::fs::{FileSystem, LocalFs};
use crate::types::Platform;

/// Paths and services shared by every command of one invocation.
///
/// The CLI creates this once and passes it down.
#[derive(Debug, Clone)]
pub struct AppContext {
    home_dir: PathBuf,
    project_root: Option<PathBuf>,
    state_dir: PathBuf,
    platform: Platform,
    app_data: Option<PathBuf>,
    xdg_config_home: Option<PathBuf>,
    fs: Arc<dyn FileSystem>,
}

impl AppContext {
    pub fn new(home_dir: PathBuf, project_root: Option<PathBuf>, state_dir: PathBuf) -> Self {
        Self {
            home_dir,
            project_root,
            state_dir,
            platform: Platform::current(),
            app_data: None,
            xdg_config_home: None,
            fs: Arc::new(LocalFs),
        }
    }

    /// `~/.config/overture`
    pub fn default_state_dir(home_dir: &Path) -> PathBuf {
        home_dir.join(".config").join("overture")
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// `%APPDATA%` and `$XDG_CONFIG_HOME`, when set.
    pub fn with_platform_dirs(mut self, app_data: Option<PathBuf>, xdg_config_home: Option<PathBuf>) -> Self {
        self.app_data = app_data;
        self.xdg_config_home = xdg_config_home;
        self
    }

    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn fs(&self) -> Arc<dyn FileSystem> {
        Arc::clone(&self.fs)
    }

    /// Where dry runs write their previews.
    pub fn dry_run_dir(&self) -> PathBuf {
        self.state_dir.join("dry-run")
    }

    /// Get a ClientContext for adapter calls.
    pub fn client_context(&self) -> ClientContext {
        ClientContext {
            platform: self.platform,
            home_dir: self.home_dir.clone(),
            project_root: self.project_root.clone(),
            app_data: self.app_data.clone(),
            xdg_config_home: self.xdg_config_home.clone(),
        }
    }

    pub fn config_store(&self) -> ConfigStore {
        ConfigStore::from_paths(&self.home_dir, self.project_root.as_deref())
    }

    /// Backup service honouring `sync.backupDir` and `sync.backupRetention`.
    pub fn backup_service(&self, settings: &SyncSettings) -> BackupService {
        let backup_dir = match &settings.backup_dir {
            Some(dir) => match dir.strip_prefix("~") {
                Ok(rest) => self.home_dir.join(rest),
                Err(_) => dir.clone(),
            },
            None => self.state_dir.join("backups"),
        };
        BackupService::new(self.fs(), backup_dir).with_retention(settings.backup_retention)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> AppContext {
        AppContext::new(
            PathBuf::from("/home/u"),
            Some(PathBuf::from("/work")),
            PathBuf::from("/home/u/.config/overture"),
        )
    }

    #[test]
    fn test_backup_dir_defaults_under_state_dir() {
        let service = context().backup_service(&SyncSettings::default());
        assert_eq!(service.backup_dir(), Path::new("/home/u/.config/overture/backups"));
        assert_eq!(service.retention(), 10);
    }

    #[test]
    fn test_backup_dir_expands_home() {
        let settings = SyncSettings {
            backup_dir: Some(PathBuf::from("~/bk")),
            backup_retention: 3,
            ..SyncSettings::default()
        };
        let service = context().backup_service(&settings);
        assert_eq!(service.backup_dir(), Path::new("/home/u/bk"));
        assert_eq!(service.retention(), 3);
    }

    #[test]
    fn test_client_context_carries_overrides() {
        let ctx = context()
            .with_platform(Platform::Win32)
            .with_platform_dirs(Some(PathBuf::from("C:/AppData")), None)
            .client_context();
        assert_eq!(ctx.platform, Platform::Win32);
        assert_eq!(ctx.project_root, Some(PathBuf::from("/work")));
        assert_eq!(ctx.app_data, Some(PathBuf::from("C:/AppData")));
    }

    #[test]
    fn test_config_store_paths() {
        let store = context().config_store();
        assert_eq!(store.global_path(), Path::new("/home/u/.config/overture.yml"));
        assert_eq!(store.project_path(), Some(Path::new("/work/.overture/config.yaml")));
    }
}
