//! Binary detection port.
//!
//! Detection is advisory: the orchestrator only consults it to decide whether
//! to skip undetected clients when asked to. Every probe is bounded by a
//! timeout that resolves to "not found".

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::process::Command;
use tracing::debug;

use crate::client::{ClientAdapter, ClientContext};
use crate::fs::FileSystem;

pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DetectionStatus {
    Found,
    NotFound,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub status: DetectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_bundle: Option<PathBuf>,
}

impl DetectionResult {
    pub fn not_found() -> Self {
        Self::with_status(DetectionStatus::NotFound)
    }

    pub fn skipped() -> Self {
        Self::with_status(DetectionStatus::Skipped)
    }

    fn with_status(status: DetectionStatus) -> Self {
        Self {
            status,
            binary_path: None,
            version: None,
            app_bundle: None,
        }
    }

    pub fn is_found(&self) -> bool {
        self.status == DetectionStatus::Found
    }
}

#[async_trait]
pub trait BinaryDetector: Send + Sync + Debug {
    async fn detect(&self, adapter: &dyn ClientAdapter, ctx: &ClientContext) -> DetectionResult;
}

/// Looks binaries up on `PATH` and falls back to the adapter's app bundles.
#[derive(Debug, Clone)]
pub struct PathDetector {
    fs: Arc<dyn FileSystem>,
    timeout: Duration,
}

impl PathDetector {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn locate(&self, name: &'static str) -> Option<PathBuf> {
        let lookup = tokio::task::spawn_blocking(move || which::which(name).ok());
        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(Ok(found)) => found,
            Ok(Err(e)) => {
                debug!(binary = name, "PATH lookup task failed: {}", e);
                None
            }
            Err(_) => {
                debug!(binary = name, timeout = ?self.timeout, "PATH lookup timed out");
                None
            }
        }
    }

    /// First line of `<binary> --version`, if it answers in time.
    async fn probe_version(&self, binary: &Path) -> Option<String> {
        let probe = Command::new(binary)
            .arg("--version")
            .kill_on_drop(true)
            .output();
        let output = match tokio::time::timeout(self.timeout, probe).await {
            Ok(Ok(output)) if output.status.success() => output,
            Ok(_) => return None,
            Err(_) => {
                debug!(binary = %binary.display(), "Version probe timed out");
                return None;
            }
        };
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    }
}

#[async_trait]
impl BinaryDetector for PathDetector {
    async fn detect(&self, adapter: &dyn ClientAdapter, ctx: &ClientContext) -> DetectionResult {
        for &name in adapter.binary_names() {
            if let Some(path) = self.locate(name).await {
                let version = self.probe_version(&path).await;
                debug!(client = %adapter.id(), binary = %path.display(), ?version, "Binary found");
                return DetectionResult {
                    status: DetectionStatus::Found,
                    binary_path: Some(path),
                    version,
                    app_bundle: None,
                };
            }
        }

        for bundle in adapter.app_bundle_paths(ctx) {
            if self.fs.exists(&bundle).await {
                debug!(client = %adapter.id(), bundle = %bundle.display(), "App bundle found");
                return DetectionResult {
                    status: DetectionStatus::Found,
                    binary_path: None,
                    version: None,
                    app_bundle: Some(bundle),
                };
            }
        }

        DetectionResult::not_found()
    }
}

/// Detector that answers the same for every client.
#[derive(Debug, Clone)]
pub struct StaticDetector {
    result: DetectionResult,
}

impl StaticDetector {
    pub fn found() -> Self {
        Self {
            result: DetectionResult::with_status(DetectionStatus::Found),
        }
    }

    pub fn not_found() -> Self {
        Self {
            result: DetectionResult::not_found(),
        }
    }
}

#[async_trait]
impl BinaryDetector for StaticDetector {
    async fn detect(&self, _adapter: &dyn ClientAdapter, _ctx: &ClientContext) -> DetectionResult {
        self.result.clone()
    }
}
