//! Timestamped backups of client configuration files.
//!
//! Backups live flat in one directory and are named
//! `{client}-{YYYY-MM-DDTHH-MM-SS-mmmZ}.json`: an ISO 8601 UTC timestamp with
//! `:` and `.` replaced by `-`. Listing, retention and restore all work from
//! the filename alone, so lexicographic order of the timestamp part is
//! chronological order. Retention is applied per client prefix; pruning one
//! client never touches another client's files.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{OvertureError, Result};
use crate::fs::FileSystem;
use crate::types::ClientId;

/// Backups kept per client.
pub const DEFAULT_RETENTION: usize = 10;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S-%3fZ";

static BACKUP_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<client>[a-z0-9][a-z0-9-]*)-(?P<timestamp>\d{4}-\d{2}-\d{2}T\d{2}-\d{2}-\d{2}-\d{3}Z)\.json$")
        .expect("backup filename pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupMetadata {
    pub client: String,
    /// Timestamp exactly as it appears in the filename
    pub timestamp: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Format `time` the way backup filenames carry it.
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Split a backup filename into `(client, timestamp)`.
pub fn parse_backup_name(file_name: &str) -> Option<(String, String)> {
    let captures = BACKUP_NAME.captures(file_name)?;
    Some((
        captures["client"].to_string(),
        captures["timestamp"].to_string(),
    ))
}

#[derive(Debug, Clone)]
pub struct BackupService {
    fs: Arc<dyn FileSystem>,
    backup_dir: PathBuf,
    retention: usize,
    clock: fn() -> DateTime<Utc>,
}

impl BackupService {
    pub fn new(fs: Arc<dyn FileSystem>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            backup_dir: backup_dir.into(),
            retention: DEFAULT_RETENTION,
            clock: Utc::now,
        }
    }

    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Copy `config_path` into the backup directory and prune old backups
    /// for `client`.
    ///
    /// # Errors
    ///
    /// - [`OvertureError::BackupSourceMissing`] when `config_path` does not
    ///   exist; there is nothing to protect.
    /// - [`OvertureError::Backup`] when the copy fails.
    ///
    /// A failure while pruning is logged and does not fail the backup.
    pub async fn backup(&self, client: ClientId, config_path: &Path) -> Result<PathBuf> {
        if !self.fs.exists(config_path).await {
            return Err(OvertureError::BackupSourceMissing {
                path: config_path.to_path_buf(),
            });
        }

        self.fs
            .create_dir_all(&self.backup_dir)
            .await
            .map_err(|e| self.backup_error(config_path, e))?;

        let backup_path = self.unique_backup_path(client).await;
        self.fs
            .copy(config_path, &backup_path)
            .await
            .map_err(|e| self.backup_error(config_path, e))?;
        info!(client = %client, backup = %backup_path.display(), "Created backup");

        if let Err(e) = self.prune(client.as_str()).await {
            warn!(client = %client, "Failed to prune old backups: {}", e);
        }

        Ok(backup_path)
    }

    /// First free `{client}-{timestamp}.json`, moving forward one
    /// millisecond per collision.
    async fn unique_backup_path(&self, client: ClientId) -> PathBuf {
        let mut time = (self.clock)();
        loop {
            let candidate = self
                .backup_dir
                .join(format!("{}-{}.json", client.as_str(), format_timestamp(time)));
            if !self.fs.exists(&candidate).await {
                return candidate;
            }
            time += Duration::milliseconds(1);
        }
    }

    fn backup_error(&self, source: &Path, error: OvertureError) -> OvertureError {
        OvertureError::Backup {
            path: source.to_path_buf(),
            message: error.to_string(),
        }
    }

    /// Backups in the directory, oldest first. Files that do not match the
    /// naming pattern are ignored.
    pub async fn list_backups(&self, client: Option<ClientId>) -> Result<Vec<BackupMetadata>> {
        let mut backups = Vec::new();
        for path in self.fs.list_dir(&self.backup_dir).await? {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some((name, timestamp)) = parse_backup_name(file_name) else {
                continue;
            };
            if client.is_some_and(|c| c.as_str() != name) {
                continue;
            }
            let size = self.fs.file_size(&path).await?;
            backups.push(BackupMetadata {
                client: name,
                timestamp,
                path,
                size,
            });
        }
        backups.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.client.cmp(&b.client)));
        Ok(backups)
    }

    pub async fn get_latest_backup(&self, client: ClientId) -> Result<Option<BackupMetadata>> {
        Ok(self.list_backups(Some(client)).await?.pop())
    }

    pub async fn delete_backup(&self, path: &Path) -> Result<()> {
        self.fs.remove_file(path).await?;
        debug!(backup = %path.display(), "Deleted backup");
        Ok(())
    }

    /// Copy `backup_path` back over `target` in one atomic write.
    pub async fn restore(&self, backup_path: &Path, target: &Path) -> Result<()> {
        let contents = self.fs.read(backup_path).await?;
        self.fs.write_atomic(target, &contents).await?;
        info!(backup = %backup_path.display(), target = %target.display(), "Restored backup");
        Ok(())
    }

    /// Restore the newest backup of `client` over `target`.
    pub async fn restore_latest(&self, client: ClientId, target: &Path) -> Result<BackupMetadata> {
        let latest = self
            .get_latest_backup(client)
            .await?
            .ok_or_else(|| OvertureError::BackupNotFound {
                client: client.to_string(),
            })?;
        self.restore(&latest.path, target).await?;
        Ok(latest)
    }

    /// Delete the oldest backups of `client` beyond the retention count.
    pub async fn prune(&self, client: &str) -> Result<Vec<PathBuf>> {
        let backups: Vec<_> = self
            .list_backups(None)
            .await?
            .into_iter()
            .filter(|b| b.client == client)
            .collect();

        let excess = backups.len().saturating_sub(self.retention);
        let mut removed = Vec::with_capacity(excess);
        for backup in backups.into_iter().take(excess) {
            self.delete_backup(&backup.path).await?;
            removed.push(backup.path);
        }
        if !removed.is_empty() {
            debug!(client, count = removed.len(), "Pruned old backups");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFs;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn fixed_clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap() + Duration::milliseconds(678)
    }

    fn service(temp: &TempDir) -> BackupService {
        BackupService::new(Arc::new(LocalFs), temp.path().join("backups")).with_clock(fixed_clock)
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(format_timestamp(fixed_clock()), "2025-01-02T03-04-05-678Z");
    }

    #[test]
    fn test_parse_backup_name() {
        assert_eq!(
            parse_backup_name("claude-code-2025-01-02T03-04-05-678Z.json"),
            Some(("claude-code".to_string(), "2025-01-02T03-04-05-678Z".to_string()))
        );
        assert_eq!(parse_backup_name("claude-code-2025-01-02T03:04:05.678Z.json"), None);
        assert_eq!(parse_backup_name("notes.txt"), None);
    }

    #[tokio::test]
    async fn test_backup_missing_source_fails() {
        let temp = TempDir::new().unwrap();
        let err = service(&temp)
            .backup(ClientId::Cursor, &temp.path().join("missing.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, OvertureError::BackupSourceMissing { .. }));
    }

    #[tokio::test]
    async fn test_backup_is_byte_identical() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("mcp.json");
        std::fs::write(&config, "{\n  \"mcpServers\": {}\n}\n").unwrap();

        let backup = service(&temp).backup(ClientId::Cursor, &config).await.unwrap();

        assert_eq!(
            backup.file_name().unwrap().to_str().unwrap(),
            "cursor-2025-01-02T03-04-05-678Z.json"
        );
        assert_eq!(std::fs::read(&config).unwrap(), std::fs::read(&backup).unwrap());
    }

    #[tokio::test]
    async fn test_collisions_bump_one_millisecond() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("mcp.json");
        std::fs::write(&config, "{}").unwrap();
        let service = service(&temp);

        let first = service.backup(ClientId::Cursor, &config).await.unwrap();
        let second = service.backup(ClientId::Cursor, &config).await.unwrap();

        assert_ne!(first, second);
        assert!(second.ends_with("cursor-2025-01-02T03-04-05-679Z.json"));
    }

    #[tokio::test]
    async fn test_retention_is_per_client() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("mcp.json");
        std::fs::write(&config, "{}").unwrap();
        let service = service(&temp).with_retention(3);

        for _ in 0..5 {
            service.backup(ClientId::ClaudeCode, &config).await.unwrap();
        }
        service.backup(ClientId::ClaudeDesktop, &config).await.unwrap();

        let code = service.list_backups(Some(ClientId::ClaudeCode)).await.unwrap();
        assert_eq!(code.len(), 3);
        assert_eq!(code[0].timestamp, "2025-01-02T03-04-05-680Z");
        assert_eq!(service.list_backups(Some(ClientId::ClaudeDesktop)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_ignores_foreign_files() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("backups");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("README.md"), "x").unwrap();
        std::fs::write(dir.join("vscode-2024-12-31T23-59-59-999Z.json"), "{}").unwrap();

        let backups = service(&temp).list_backups(None).await.unwrap();

        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].client, "vscode");
        assert_eq!(backups[0].size, 2);
    }

    #[tokio::test]
    async fn test_restore_latest() {
        let temp = TempDir::new().unwrap();
        let config = temp.path().join("opencode.json");
        std::fs::write(&config, "{\"v\": 1}").unwrap();
        let service = service(&temp);
        service.backup(ClientId::OpenCode, &config).await.unwrap();
        std::fs::write(&config, "{\"v\": 2}").unwrap();
        service.backup(ClientId::OpenCode, &config).await.unwrap();
        std::fs::write(&config, "broken").unwrap();

        let restored = service.restore_latest(ClientId::OpenCode, &config).await.unwrap();

        assert_eq!(restored.timestamp, "2025-01-02T03-04-05-679Z");
        assert_eq!(std::fs::read_to_string(&config).unwrap(), "{\"v\": 2}");
    }

    #[tokio::test]
    async fn test_restore_without_backups() {
        let temp = TempDir::new().unwrap();
        let err = service(&temp)
            .restore_latest(ClientId::GeminiCli, &temp.path().join("settings.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, OvertureError::BackupNotFound { .. }));
    }
}
