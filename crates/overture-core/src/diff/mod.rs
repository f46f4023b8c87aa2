//! Structural diff of two client documents.
//!
//! Every name lands in exactly one of `added`, `removed`, `modified` or
//! `unchanged`, and every list is sorted by name.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::{Map, Value};

/// Fields compared first, in this order; anything else follows sorted.
const KNOWN_FIELDS: [&str; 3] = ["command", "args", "env"];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub modified: Vec<ModifiedEntry>,
    pub unchanged: Vec<String>,
    pub has_changes: bool,
}

impl DiffResult {
    pub fn change_count(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifiedEntry {
    pub name: String,
    pub field_changes: Vec<FieldChange>,
}

/// One field that differs. `None` means the field is absent on that side,
/// which is distinct from `Some(Value::Null)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
}

/// Diff the maps under `root_key` of two whole documents. A document
/// without the key (or one that is not an object) contributes no entries.
pub fn diff_documents(old: &Value, new: &Value, root_key: &str) -> DiffResult {
    let empty = Map::new();
    let servers = |doc: &'_ Value| -> Option<Map<String, Value>> {
        doc.get(root_key).and_then(Value::as_object).cloned()
    };
    let old_servers = servers(old);
    let new_servers = servers(new);
    diff_servers(
        old_servers.as_ref().unwrap_or(&empty),
        new_servers.as_ref().unwrap_or(&empty),
    )
}

/// Diff two name → entry maps.
pub fn diff_servers(old: &Map<String, Value>, new: &Map<String, Value>) -> DiffResult {
    let mut result = DiffResult::default();

    let names: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    for name in names {
        match (old.get(name), new.get(name)) {
            (None, Some(_)) => result.added.push(name.clone()),
            (Some(_), None) => result.removed.push(name.clone()),
            (Some(before), Some(after)) if before == after => result.unchanged.push(name.clone()),
            (Some(before), Some(after)) => result.modified.push(ModifiedEntry {
                name: name.clone(),
                field_changes: field_changes(before, after),
            }),
            (None, None) => {}
        }
    }

    result.has_changes =
        !result.added.is_empty() || !result.removed.is_empty() || !result.modified.is_empty();
    result
}

fn field_changes(before: &Value, after: &Value) -> Vec<FieldChange> {
    let (Some(before_map), Some(after_map)) = (before.as_object(), after.as_object()) else {
        // Non-object entries compare as a whole
        return vec![FieldChange {
            field: String::new(),
            old_value: Some(before.clone()),
            new_value: Some(after.clone()),
        }];
    };

    let others: BTreeSet<&str> = before_map
        .keys()
        .chain(after_map.keys())
        .map(String::as_str)
        .filter(|field| !KNOWN_FIELDS.contains(field))
        .collect();

    KNOWN_FIELDS
        .into_iter()
        .chain(others)
        .filter_map(|field| {
            let old_value = before_map.get(field);
            let new_value = after_map.get(field);
            (old_value != new_value).then(|| FieldChange {
                field: field.to_string(),
                old_value: old_value.cloned(),
                new_value: new_value.cloned(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_add() {
        let result = diff_documents(
            &json!({}),
            &json!({"mcpServers": {"github": {"command": "mcp-github", "args": []}}}),
            "mcpServers",
        );

        assert_eq!(result.added, vec!["github".to_string()]);
        assert!(result.removed.is_empty());
        assert!(result.modified.is_empty());
        assert!(result.has_changes);
    }

    #[test]
    fn test_identical_documents_have_no_changes() {
        let doc = json!({"mcp": {"a": {"type": "local", "command": ["x"]}}});
        let result = diff_documents(&doc, &doc, "mcp");

        assert!(!result.has_changes);
        assert_eq!(result.unchanged, vec!["a".to_string()]);
    }

    #[test]
    fn test_partition_is_sorted_and_complete() {
        let old = json!({"servers": {
            "zeta": {"command": "z"},
            "alpha": {"command": "a"},
            "gone": {"command": "g"},
            "same": {"command": "s"}
        }});
        let new = json!({"servers": {
            "zeta": {"command": "z2"},
            "alpha": {"command": "a", "args": ["-v"]},
            "beta": {"command": "b"},
            "same": {"command": "s"}
        }});

        let result = diff_documents(&old, &new, "servers");

        assert_eq!(result.added, vec!["beta".to_string()]);
        assert_eq!(result.removed, vec!["gone".to_string()]);
        let modified: Vec<_> = result.modified.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(modified, vec!["alpha", "zeta"]);
        assert_eq!(result.unchanged, vec!["same".to_string()]);
        assert_eq!(result.change_count(), 4);
    }

    #[test]
    fn test_absent_field_is_a_change() {
        let old = json!({"mcpServers": {"a": {"command": "x", "env": {"K": "v"}}}});
        let new = json!({"mcpServers": {"a": {"command": "x"}}});

        let result = diff_documents(&old, &new, "mcpServers");
        let changes = &result.modified[0].field_changes;

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, "env");
        assert_eq!(changes[0].old_value, Some(json!({"K": "v"})));
        assert_eq!(changes[0].new_value, None);
    }

    #[test]
    fn test_null_is_distinct_from_absent() {
        let old = json!({"mcpServers": {"a": {"command": "x", "url": null}}});
        let new = json!({"mcpServers": {"a": {"command": "x"}}});

        let result = diff_documents(&old, &new, "mcpServers");
        let change = &result.modified[0].field_changes[0];

        assert_eq!(change.old_value, Some(Value::Null));
        assert_eq!(change.new_value, None);
        let rendered = serde_json::to_value(change).unwrap();
        assert_eq!(rendered, json!({"field": "url", "oldValue": null}));
    }

    #[test]
    fn test_known_fields_come_first() {
        let old = json!({"s": {"a": {"type": "stdio", "command": "x", "args": [], "tools": []}}});
        let new = json!({"s": {"a": {"type": "http", "command": "y", "args": ["1"], "tools": ["*"]}}});

        let result = diff_documents(&old, &new, "s");
        let fields: Vec<_> = result.modified[0]
            .field_changes
            .iter()
            .map(|c| c.field.as_str())
            .collect();

        assert_eq!(fields, vec!["command", "args", "tools", "type"]);
    }

    #[test]
    fn test_env_compared_structurally() {
        let old = json!({"s": {"a": {"env": {"A": "1", "B": "2"}}}});
        let new = json!({"s": {"a": {"env": {"B": "2", "A": "1"}}}});

        assert!(!diff_documents(&old, &new, "s").has_changes);
    }

    #[test]
    fn test_missing_root_key_is_empty() {
        let result = diff_documents(&json!({"other": 1}), &json!({"other": 2}), "mcpServers");
        assert!(!result.has_changes);
        assert!(result.unchanged.is_empty());
    }
}
