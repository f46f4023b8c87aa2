//! Sync orchestration.
//!
//! Each (client, scope) pair runs through the same sequence:
//!
//! ```text
//! start -> binary detected? -> config path resolved -> transport validated
//!       -> mcps filtered -> old config read -> new config computed
//!       -> dry run: write preview | commit: backup old, write new -> done
//! ```
//!
//! Clients run one after another in the order requested, and a dual-scope
//! client's user result always precedes its project result. Only a failure
//! to load the unified configuration ends the run early; everything else is
//! recorded on the affected result.

pub mod merge;
pub mod report;

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::backup::BackupService;
use crate::client::{
    AdapterRegistry, ClientAdapter, ClientDocument, ConvertOptions, configured_path,
};
use crate::config::{ConfigLoader, OvertureConfig};
use crate::context::AppContext;
use crate::diff::diff_servers;
use crate::discovery::{BinaryDetector, DetectionResult, DetectionStatus};
use crate::env::EnvMap;
use crate::error::{OvertureError, Result};
use crate::resolve::{TransportPolicy, effective_transport, exclusion};
use crate::types::{ClientId, ConfigScope, Platform, Transport};

pub use merge::{MergeOutcome, carry_forward, merge_preserving};
pub use report::{ClientSyncResult, ReportMessage, SyncReport, SyncWarning};

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// Clients to sync; `None` means every client enabled in the config
    pub clients: Option<Vec<ClientId>>,
    pub dry_run: bool,
    /// Restrict to one scope
    pub scope: Option<ConfigScope>,
    /// Resolve as if running on this platform
    pub platform: Option<Platform>,
    /// Write MCPs the client cannot speak instead of failing the client
    pub force: bool,
    pub skip_binary_detection: bool,
    /// Mark clients whose binary is not found as skipped
    pub skip_undetected: bool,
}

/// Drives a sync run across clients.
#[derive(Debug)]
pub struct SyncOrchestrator<'a> {
    registry: &'a AdapterRegistry,
    detector: &'a dyn BinaryDetector,
    ctx: &'a AppContext,
    env: &'a EnvMap,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(
        registry: &'a AdapterRegistry,
        detector: &'a dyn BinaryDetector,
        ctx: &'a AppContext,
        env: &'a EnvMap,
    ) -> Self {
        Self {
            registry,
            detector,
            ctx,
            env,
        }
    }

    /// Load the configuration and sync. Errors only for a configuration that
    /// cannot be loaded.
    pub async fn run(&self, loader: &dyn ConfigLoader, options: &SyncOptions) -> Result<SyncReport> {
        let config = loader.load().await.inspect_err(|e| {
            if e.is_fatal() {
                error!("Aborting sync before touching any client: {}", e);
            }
        })?;
        Ok(self.sync(&config, options).await)
    }

    pub async fn sync(&self, config: &OvertureConfig, options: &SyncOptions) -> SyncReport {
        let targets = options
            .clients
            .clone()
            .unwrap_or_else(|| config.enabled_clients());
        let backups = self.ctx.backup_service(&config.sync);

        info!(
            clients = targets.len(),
            mcps = config.mcp.len(),
            dry_run = options.dry_run,
            force = options.force,
            "Starting sync"
        );

        let mut report = SyncReport::default();
        for client in targets {
            for result in self.sync_client(client, config, options, &backups).await {
                if result.success {
                    debug!(client = %result.client, scope = %result.scope, "Client sync done");
                } else {
                    warn!(client = %result.client, scope = %result.scope, error = ?result.error, "Client sync failed");
                }
                report.push(result);
            }
        }

        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            skipped = report.skipped(),
            "Sync finished"
        );
        report
    }

    fn platform(&self, options: &SyncOptions) -> Platform {
        options.platform.unwrap_or_else(|| self.ctx.platform())
    }

    async fn sync_client(
        &self,
        client: ClientId,
        config: &OvertureConfig,
        options: &SyncOptions,
        backups: &BackupService,
    ) -> Vec<ClientSyncResult> {
        let default_scope = options.scope.unwrap_or(ConfigScope::Global);

        let Some(adapter) = self.registry.get(client) else {
            return vec![
                ClientSyncResult::new(client, default_scope, None)
                    .fail(OvertureError::AdapterMissing { client }),
            ];
        };

        let mut client_ctx = self.ctx.client_context();
        client_ctx.platform = self.platform(options);

        let detection = if options.skip_binary_detection || !config.sync.detect_binaries {
            DetectionResult::skipped()
        } else {
            self.detector.detect(adapter, &client_ctx).await
        };
        debug!(client = %client, status = ?detection.status, "Binary detection");

        // Clients that can be configured without a binary never count as undetected
        let undetected = detection.status == DetectionStatus::NotFound && adapter.requires_binary();
        if undetected && options.skip_undetected {
            info!(client = %client, "Skipping undetected client");
            let mut result = ClientSyncResult::new(client, default_scope, None).skip();
            result.detection = Some(detection);
            return vec![result];
        }

        let paths = configured_path(adapter, &client_ctx, config);
        let all_targets = paths.targets();
        if all_targets.is_empty() {
            return vec![
                ClientSyncResult::new(client, default_scope, None)
                    .fail(OvertureError::ConfigPathUndetected { client }),
            ];
        }

        let targets: Vec<_> = all_targets
            .into_iter()
            .filter(|(scope, _)| options.scope.is_none_or(|s| s == *scope))
            .collect();
        if targets.is_empty() {
            debug!(client = %client, scope = ?options.scope, "Client has no config for requested scope");
            return vec![ClientSyncResult::new(client, default_scope, None).skip()];
        }

        let mut results = Vec::with_capacity(targets.len());
        for (scope, path) in targets {
            let mut result = ClientSyncResult::new(client, scope, Some(path.clone()));
            result.detection = Some(detection.clone());
            if undetected {
                result.warnings.push(SyncWarning::BinaryNotDetected { client });
            }
            let scoped = if paths.is_dual() {
                config.filtered(|definition| definition.effective_scope() == scope)
            } else {
                config.clone()
            };
            results.push(
                self.sync_scope(adapter, config, &scoped, &path, result, options, backups)
                    .await,
            );
        }
        results
    }

    #[allow(clippy::too_many_arguments)]
    async fn sync_scope(
        &self,
        adapter: &dyn ClientAdapter,
        config: &OvertureConfig,
        scoped: &OvertureConfig,
        path: &Path,
        mut result: ClientSyncResult,
        options: &SyncOptions,
        backups: &BackupService,
    ) -> ClientSyncResult {
        let client = adapter.id();
        let platform = self.platform(options);
        let fs = self.ctx.fs();

        // transport validated
        let violations = transport_violations(adapter, scoped, platform);
        if !violations.is_empty() {
            warn!(client = %client, count = violations.len(), force = options.force, "Transport incompatibility");
            result.warnings.push(SyncWarning::TransportIncompatible {
                client,
                mcps: violations.clone(),
                forced: options.force,
            });
            if !options.force {
                return result.fail(OvertureError::TransportIncompatibility {
                    client,
                    mcps: violations,
                });
            }
        }

        // old config read
        let existed = fs.exists(path).await;
        let old = match adapter.read_config(fs.as_ref(), path).await {
            Ok(document) => document,
            Err(e) => return result.fail(e),
        };
        debug!(client = %client, path = %path.display(), entries = old.servers.len(), "Read client config");

        // new config computed
        let policy = if options.force {
            TransportPolicy::Allow
        } else {
            TransportPolicy::Enforce
        };
        let conversion = adapter.convert_from_overture(
            scoped,
            &ConvertOptions {
                platform,
                env: self.env,
                policy,
            },
        );
        for skipped in &conversion.skipped {
            debug!(client = %client, mcp = %skipped.name, reason = ?skipped.reason, "MCP not targeted");
        }
        for missing in conversion.missing_env {
            result.warnings.push(SyncWarning::EnvVarMissing {
                mcp: missing.mcp,
                names: missing.names,
            });
        }

        let mut computed = conversion.document.servers;
        let carried = carry_forward(
            &old.servers,
            &mut computed,
            conversion.failures.iter().map(|f| f.name.as_str()),
        );
        result
            .warnings
            .extend(carried.into_iter().map(|name| SyncWarning::CarriedForward { name }));
        result.failures = conversion.failures;

        let outcome = merge_preserving(&old.servers, &computed, |name| config.is_managed(name));
        if !outcome.preserved.is_empty() {
            info!(client = %client, count = outcome.preserved.len(), "Preserving unmanaged entries");
            result.warnings.push(SyncWarning::UnmanagedPreserved {
                names: outcome.preserved,
            });
        }

        let diff = diff_servers(&old.servers, &outcome.merged);
        let document = ClientDocument::with_servers(adapter.root_key(), outcome.merged);
        let has_changes = diff.has_changes;
        result.diff = Some(diff);

        if options.dry_run {
            let preview = preview_path(&self.ctx.dry_run_dir(), client, result.scope);
            let written = async {
                let rendered = adapter.render_config(fs.as_ref(), path, &document).await?;
                fs.write_atomic(&preview, rendered.as_bytes()).await
            }
            .await;
            return match written {
                Ok(()) => {
                    info!(client = %client, preview = %preview.display(), "Wrote dry-run preview");
                    result.written_path = Some(preview);
                    result
                }
                Err(e) => result.fail(e),
            };
        }

        if !has_changes && (existed || document.is_empty()) {
            debug!(client = %client, path = %path.display(), "No changes");
            return result;
        }

        if existed && config.sync.backup {
            match backups.backup(client, path).await {
                Ok(backup_path) => result.backup_path = Some(backup_path),
                Err(e) => {
                    warn!(client = %client, "Backup failed, writing anyway: {}", e);
                    result.warnings.push(SyncWarning::BackupFailed {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    });
                }
            }
        }

        match adapter.write_config(fs.as_ref(), path, &document).await {
            Ok(()) => {
                info!(client = %client, path = %path.display(), "Wrote client config");
                result.written_path = Some(path.to_path_buf());
                result
            }
            Err(e) => result.fail(e),
        }
    }
}

/// MCPs targeted at `adapter` whose effective transport it cannot speak.
pub fn transport_violations(
    adapter: &dyn ClientAdapter,
    config: &OvertureConfig,
    platform: Platform,
) -> Vec<(String, Transport)> {
    config
        .mcp
        .values()
        .filter(|definition| exclusion(definition, adapter.id(), platform).is_none())
        .map(|definition| (definition.name.clone(), effective_transport(definition, adapter.id())))
        .filter(|(_, transport)| !adapter.supports_transport(*transport))
        .collect()
}

/// `<dir>/<client>.json` for the user scope, `<dir>/<client>-project.json`
/// for the project scope.
pub fn preview_path(dry_run_dir: &Path, client: ClientId, scope: ConfigScope) -> PathBuf {
    match scope {
        ConfigScope::Global => dry_run_dir.join(format!("{client}.json")),
        ConfigScope::Project => dry_run_dir.join(format!("{client}-project.json")),
    }
}
