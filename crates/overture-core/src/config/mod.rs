//! Unified configuration: schema, layers and loading.

pub mod merge;
pub mod paths;
pub mod schema;
pub mod store;

pub use merge::merge_layers;
pub use schema::{
    ClientOverride, ClientRules, ClientSettings, DiscoverySettings, McpDefinition, OvertureConfig,
    PlatformRules, SyncSettings,
};
pub use store::{ConfigLoader, ConfigStore, StaticLoader, parse_config_str, to_yaml};
