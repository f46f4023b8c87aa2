//! Preserve-unmanaged merge of an old client document into a computed one.

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub merged: Map<String, Value>,
    /// Unmanaged names carried over from the old document, sorted
    pub preserved: Vec<String>,
}

/// Start from `computed` and carry over every entry of `old` whose name is
/// not managed. Those entries keep their old value even if `computed` holds
/// the same name.
pub fn merge_preserving<F>(old: &Map<String, Value>, computed: &Map<String, Value>, is_managed: F) -> MergeOutcome
where
    F: Fn(&str) -> bool,
{
    let mut merged = computed.clone();
    let mut preserved = Vec::new();
    for (name, value) in old {
        if is_managed(name) {
            continue;
        }
        merged.insert(name.clone(), value.clone());
        preserved.push(name.clone());
    }
    preserved.sort();
    MergeOutcome { merged, preserved }
}

/// Copy the old entries for `names` into `computed`, for MCPs that could
/// not be converted this run. Returns the names that were carried.
pub fn carry_forward<'a, I>(old: &Map<String, Value>, computed: &mut Map<String, Value>, names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut carried = Vec::new();
    for name in names {
        if let Some(value) = old.get(name) {
            computed.insert(name.to_string(), value.clone());
            carried.push(name.to_string());
        }
    }
    carried
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_unmanaged_entries_survive() {
        let old = map(json!({"manual": {"command": "m"}, "github": {"command": "old"}}));
        let computed = map(json!({"github": {"command": "new"}}));

        let outcome = merge_preserving(&old, &computed, |name| name == "github");

        assert_eq!(
            Value::Object(outcome.merged),
            json!({"manual": {"command": "m"}, "github": {"command": "new"}})
        );
        assert_eq!(outcome.preserved, vec!["manual".to_string()]);
    }

    #[test]
    fn test_managed_entries_absent_from_computed_are_removed() {
        let old = map(json!({"gone": {"command": "g"}}));
        let outcome = merge_preserving(&old, &Map::new(), |name| name == "gone");

        assert!(outcome.merged.is_empty());
        assert!(outcome.preserved.is_empty());
    }

    #[test]
    fn test_old_value_wins_for_unmanaged_collision() {
        let old = map(json!({"x": {"command": "old"}}));
        let computed = map(json!({"x": {"command": "new"}}));

        let outcome = merge_preserving(&old, &computed, |_| false);
        assert_eq!(outcome.merged["x"], json!({"command": "old"}));
    }

    #[test]
    fn test_carry_forward_only_existing() {
        let old = map(json!({"broken": {"command": "b"}}));
        let mut computed = Map::new();

        let carried = carry_forward(&old, &mut computed, ["broken", "new-and-broken"]);

        assert_eq!(carried, vec!["broken".to_string()]);
        assert_eq!(computed["broken"], json!({"command": "b"}));
    }
}
