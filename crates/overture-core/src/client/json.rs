//! JSON helpers shared by the adapters: root-key extraction, read-merge-write
//! rendering and loose field access for imports.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{OvertureError, Result};
use crate::types::ClientId;

/// Parse a client file into its top-level object. Whitespace-only files
/// count as empty.
pub fn parse_root(client: ClientId, path: &Path, content: &str) -> Result<Map<String, Value>> {
    if content.trim().is_empty() {
        return Ok(Map::new());
    }
    let value: Value = serde_json::from_str(content).map_err(|e| OvertureError::ClientRead {
        client,
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(OvertureError::ClientRead {
            client,
            path: path.to_path_buf(),
            message: format!("expected a JSON object at the root, found {}", kind(&other)),
        }),
    }
}

/// The map under `root_key`. A missing key is an empty map.
pub fn extract_servers(
    client: ClientId,
    path: &Path,
    root: &Map<String, Value>,
    root_key: &str,
) -> Result<Map<String, Value>> {
    match root.get(root_key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(other) => Err(OvertureError::ClientRead {
            client,
            path: path.to_path_buf(),
            message: format!("expected '{root_key}' to be an object, found {}", kind(other)),
        }),
    }
}

/// Replace `root_key` in `root` and render the whole file.
pub fn render_file(mut root: Map<String, Value>, root_key: &str, servers: &Map<String, Value>) -> String {
    root.insert(root_key.to_string(), Value::Object(servers.clone()));
    let mut rendered =
        serde_json::to_string_pretty(&Value::Object(root)).unwrap_or_else(|_| "{}".to_string());
    rendered.push('\n');
    rendered
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub fn str_field<'a>(entry: &'a Value, key: &str) -> Option<&'a str> {
    entry.get(key).and_then(Value::as_str)
}

/// String array field; non-string elements are dropped.
pub fn string_list(entry: &Value, key: &str) -> Vec<String> {
    entry
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// String-to-string object field; scalar values are stringified.
pub fn string_map(entry: &Value, key: &str) -> BTreeMap<String, String> {
    entry
        .get(key)
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| {
                    let value = match v {
                        Value::String(s) => s.clone(),
                        Value::Number(n) => n.to_string(),
                        Value::Bool(b) => b.to_string(),
                        _ => return None,
                    };
                    Some((k.clone(), value))
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn non_empty(env: &BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
    if env.is_empty() { None } else { Some(env.clone()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn path() -> PathBuf {
        PathBuf::from("/tmp/client.json")
    }

    #[test]
    fn empty_file_parses_as_empty_root() {
        let root = parse_root(ClientId::Cursor, &path(), "  \n").unwrap();
        assert!(root.is_empty());
    }

    #[test]
    fn invalid_json_is_client_read_error() {
        let err = parse_root(ClientId::Cursor, &path(), "{ not json").unwrap_err();
        assert!(matches!(err, OvertureError::ClientRead { client: ClientId::Cursor, .. }));
    }

    #[test]
    fn array_root_is_rejected() {
        let err = parse_root(ClientId::VsCode, &path(), "[]").unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn root_key_must_be_object() {
        let root = parse_root(ClientId::ClaudeCode, &path(), r#"{"mcpServers": [1]}"#).unwrap();
        assert!(extract_servers(ClientId::ClaudeCode, &path(), &root, "mcpServers").is_err());
    }

    #[test]
    fn render_file_keeps_other_keys() {
        let root = json!({"theme": "dark", "mcpServers": {"old": {}}});
        let Value::Object(root) = root else { unreachable!() };
        let mut servers = Map::new();
        servers.insert("new".to_string(), json!({"command": "x"}));

        let rendered = render_file(root, "mcpServers", &servers);
        let parsed: Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(
            parsed,
            json!({"theme": "dark", "mcpServers": {"new": {"command": "x"}}})
        );
        assert!(rendered.ends_with('\n'));
    }

    #[test]
    fn string_map_stringifies_scalars() {
        let entry = json!({"env": {"A": "1", "B": 2, "C": true, "D": null}});
        let map = string_map(&entry, "env");
        assert_eq!(map.len(), 3);
        assert_eq!(map["B"], "2");
    }
}
