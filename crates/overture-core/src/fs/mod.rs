//! Filesystem port.
//!
//! Every read and write the engine performs goes through [`FileSystem`] so the
//! orchestrator can be driven against temp directories in tests.

use std::fmt::Debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{OvertureError, Result};

#[async_trait]
pub trait FileSystem: Send + Sync + Debug {
    async fn exists(&self, path: &Path) -> bool;

    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    async fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Replace `path` with `contents` in one step. Parent directories are
    /// created. Readers see either the old file or the new one.
    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Byte-for-byte copy; returns the number of bytes copied.
    async fn copy(&self, from: &Path, to: &Path) -> Result<u64>;

    async fn remove_file(&self, path: &Path) -> Result<()>;

    /// Entries of `path`. A missing directory lists as empty.
    async fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    async fn file_size(&self, path: &Path) -> Result<u64>;

    async fn create_dir_all(&self, path: &Path) -> Result<()>;
}

/// [`FileSystem`] backed by `tokio::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "overture".to_string());
    path.with_file_name(format!(".{file_name}.{}.tmp", std::process::id()))
}

#[async_trait]
impl FileSystem for LocalFs {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .map_err(|e| OvertureError::io(path, e))
    }

    async fn read_to_string(&self, path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| OvertureError::io(path, e))
    }

    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let write_err = |source| OvertureError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let temp_path = temp_path_for(path);
        let result = async {
            let mut file = tokio::fs::File::create(&temp_path).await?;
            file.write_all(contents).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&temp_path, path).await
        }
        .await;

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(write_err(e));
        }

        debug!(path = %path.display(), bytes = contents.len(), "Wrote file");
        Ok(())
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<u64> {
        if let Some(parent) = to.parent() {
            self.create_dir_all(parent).await?;
        }
        tokio::fs::copy(from, to)
            .await
            .map_err(|e| OvertureError::io(from, e))
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| OvertureError::io(path, e))
    }

    async fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(OvertureError::io(path, e)),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| OvertureError::io(path, e))?
        {
            paths.push(entry.path());
        }
        paths.sort();
        Ok(paths)
    }

    async fn file_size(&self, path: &Path) -> Result<u64> {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.len())
            .map_err(|e| OvertureError::io(path, e))
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| OvertureError::io(path, e))
    }
}
