//! Configuration layer merging logic
//!
//! Global -> Project. Every definition is tagged with the layer it came
//! from; project definitions replace global ones of the same name.

use super::schema::OvertureConfig;
use crate::types::ConfigScope;

/// Merge the global and project layers into one configuration.
///
/// `sync` and `discovery` settings come from the global layer when it
/// exists, otherwise from the project layer.
pub fn merge_layers(
    global: Option<OvertureConfig>,
    project: Option<OvertureConfig>,
) -> OvertureConfig {
    let had_global = global.is_some();
    let mut merged = match global {
        Some(mut global) => {
            tag_scope(&mut global, ConfigScope::Global);
            global
        }
        None => OvertureConfig::new(),
    };

    if let Some(mut project) = project {
        tag_scope(&mut project, ConfigScope::Project);
        merged.version = project.version;
        for (name, definition) in project.mcp {
            merged.mcp.insert(name, definition);
        }
        for (client, settings) in project.clients {
            merged.clients.insert(client, settings);
        }
        if !had_global {
            merged.sync = project.sync;
            merged.discovery = project.discovery;
        }
    }

    merged.normalize_names();
    merged
}

fn tag_scope(config: &mut OvertureConfig, scope: ConfigScope) {
    for definition in config.mcp.values_mut() {
        if definition.scope.is_none() {
            definition.scope = Some(scope);
        }
    }
}
