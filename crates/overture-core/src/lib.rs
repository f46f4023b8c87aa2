//! Overture Core Library
//!
//! Keeps one unified MCP configuration and reconciles it into the
//! configuration files of every supported client, with backups, dry runs
//! and preservation of entries the user added by hand.

pub mod audit;
pub mod backup;
pub mod client;
pub mod config;
pub mod context;
pub mod diff;
pub mod discovery;
pub mod env;
pub mod error;
pub mod fs;
pub mod import;
pub mod resolve;
pub mod sync;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{
        ClientRules, ClientSettings, ConfigLoader, ConfigStore, McpDefinition, OvertureConfig,
        PlatformRules,
    };

    // Client
    pub use crate::client::{
        AdapterRegistry, ClientAdapter, ClientContext, ClientDocument, ConfigPathResult,
    };

    // Reconciliation
    pub use crate::diff::{DiffResult, diff_documents};
    pub use crate::import::{Conflict, ConflictReason, DiscoveredMcp, detect_conflicts};
    pub use crate::resolve::{Resolution, ResolvedMcp, TransportPolicy, resolve};
    pub use crate::sync::{ClientSyncResult, SyncOptions, SyncOrchestrator, SyncReport};

    // Services and ports
    pub use crate::backup::{BackupMetadata, BackupService};
    pub use crate::context::AppContext;
    pub use crate::discovery::{BinaryDetector, DetectionResult, PathDetector};
    pub use crate::fs::{FileSystem, LocalFs};

    // Shared
    pub use crate::error::{OvertureError, Result};
    pub use crate::types::{ClientId, ConfigScope, Platform, Transport};
}
