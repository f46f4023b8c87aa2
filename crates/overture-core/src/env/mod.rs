//! Environment variable reference expansion.
//!
//! The unified syntax is `${NAME}` and `${NAME:-default}`. A default may hold
//! further references; the single-pass [`expand`] inserts it literally while
//! [`expand_recursive`] keeps rescanning until nothing is left to resolve.

pub mod syntax;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::error::{OvertureError, Result};

pub use syntax::{
    EnvSyntax, convert_env_map_from_opencode, convert_env_map_to_opencode,
    convert_from_opencode_env, convert_to_opencode_env,
};

/// Environment captured once per invocation.
pub type EnvMap = HashMap<String, String>;

/// Rescan bound for [`expand_recursive`].
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Snapshot of the process environment.
pub fn process_env() -> EnvMap {
    std::env::vars().collect()
}

/// Piece of a template: literal text or a variable reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Text(&'a str),
    Reference {
        name: &'a str,
        default: Option<&'a str>,
    },
}

/// Split `template` into text and references written in `syntax`.
///
/// Anything that does not form a complete reference (bad name, missing
/// closing brace) stays literal text.
pub(crate) fn parse_segments(template: &str, syntax: EnvSyntax) -> Vec<Segment<'_>> {
    let open = syntax.open();
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut cursor = 0;

    while let Some(offset) = template[cursor..].find(open) {
        let start = cursor + offset;
        match parse_reference(template, start + open.len(), open) {
            Some((name, default, end)) => {
                if start > text_start {
                    segments.push(Segment::Text(&template[text_start..start]));
                }
                segments.push(Segment::Reference { name, default });
                text_start = end;
                cursor = end;
            }
            None => cursor = start + open.len(),
        }
    }

    if text_start < template.len() {
        segments.push(Segment::Text(&template[text_start..]));
    }
    segments
}

/// Parse `NAME}` or `NAME:-default}` starting at `body`. Returns the name,
/// the default and the index just past the closing brace.
fn parse_reference<'a>(
    template: &'a str,
    body: usize,
    open: &str,
) -> Option<(&'a str, Option<&'a str>, usize)> {
    let rest = &template[body..];
    let name_len = rest
        .char_indices()
        .take_while(|(idx, ch)| {
            ch.is_ascii_alphabetic() || *ch == '_' || (*idx > 0 && ch.is_ascii_digit())
        })
        .count();
    if name_len == 0 {
        return None;
    }
    let name = &rest[..name_len];
    let after = &rest[name_len..];

    if after.starts_with('}') {
        return Some((name, None, body + name_len + 1));
    }
    if !after.starts_with(":-") {
        return None;
    }

    let default_start = body + name_len + 2;
    let mut depth = 0usize;
    let mut idx = default_start;
    while idx < template.len() {
        let tail = &template[idx..];
        if tail.starts_with(open) {
            depth += 1;
            idx += open.len();
            continue;
        }
        let ch = tail.chars().next()?;
        if ch == '}' {
            if depth == 0 {
                return Some((name, Some(&template[default_start..idx]), idx + 1));
            }
            depth -= 1;
        }
        idx += ch.len_utf8();
    }
    None
}

fn lookup<'a>(env: &'a EnvMap, name: &str, default: Option<&'a str>) -> &'a str {
    match (env.get(name), default) {
        (Some(value), Some(fallback)) if value.is_empty() => fallback,
        (Some(value), _) => value.as_str(),
        (None, Some(fallback)) => fallback,
        (None, None) => "",
    }
}

/// Single substitution pass. Missing variables become empty strings; a
/// default is inserted verbatim, without expanding references inside it.
pub fn expand(template: &str, env: &EnvMap) -> String {
    let mut out = String::with_capacity(template.len());
    for segment in parse_segments(template, EnvSyntax::DollarBrace) {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Reference { name, default } => out.push_str(lookup(env, name, default)),
        }
    }
    out
}

/// Expand until no references remain, following values that reference other
/// variables of the same map.
pub fn expand_recursive(template: &str, env: &EnvMap) -> Result<String> {
    expand_recursive_with_depth(template, env, DEFAULT_MAX_DEPTH)
}

/// [`expand_recursive`] with an explicit bound.
///
/// Fails with [`OvertureError::CircularEnvReference`] when a state repeats,
/// when a pass makes no progress, or when `max_depth` passes are not enough.
pub fn expand_recursive_with_depth(
    template: &str,
    env: &EnvMap,
    max_depth: usize,
) -> Result<String> {
    let mut current = template.to_string();
    let mut seen: HashSet<String> = HashSet::new();

    for depth in 0..max_depth {
        if !has_env_vars(&current) {
            return Ok(current);
        }
        if !seen.insert(current.clone()) {
            return Err(circular(&current, depth));
        }
        let next = expand(&current, env);
        if next == current {
            return Err(circular(&current, depth));
        }
        current = next;
    }

    if has_env_vars(&current) {
        return Err(circular(&current, max_depth));
    }
    Ok(current)
}

fn circular(current: &str, depth: usize) -> OvertureError {
    let variable = parse_segments(current, EnvSyntax::DollarBrace)
        .into_iter()
        .find_map(|segment| match segment {
            Segment::Reference { name, .. } => Some(name.to_string()),
            Segment::Text(_) => None,
        })
        .unwrap_or_default();
    OvertureError::CircularEnvReference { variable, depth }
}

/// Whether `template` contains at least one reference.
pub fn has_env_vars(template: &str) -> bool {
    parse_segments(template, EnvSyntax::DollarBrace)
        .iter()
        .any(|segment| matches!(segment, Segment::Reference { .. }))
}

/// Every referenced name, including names inside defaults. Sorted, unique.
pub fn extract_env_var_names(template: &str) -> Vec<String> {
    let mut names = BTreeSet::new();
    collect_names(template, &mut names);
    names.into_iter().collect()
}

fn collect_names(template: &str, names: &mut BTreeSet<String>) {
    for segment in parse_segments(template, EnvSyntax::DollarBrace) {
        if let Segment::Reference { name, default } = segment {
            names.insert(name.to_string());
            if let Some(default) = default {
                collect_names(default, names);
            }
        }
    }
}

/// Referenced names that have neither a value in `env` nor a usable default.
pub fn validate_env_vars(template: &str, env: &EnvMap) -> Vec<String> {
    let mut missing = BTreeSet::new();
    collect_missing(template, env, &mut missing);
    missing.into_iter().collect()
}

fn collect_missing(template: &str, env: &EnvMap, missing: &mut BTreeSet<String>) {
    for segment in parse_segments(template, EnvSyntax::DollarBrace) {
        if let Segment::Reference { name, default } = segment {
            if env.contains_key(name) {
                continue;
            }
            match default {
                Some(default) => collect_missing(default, env, missing),
                None => {
                    missing.insert(name.to_string());
                }
            }
        }
    }
}

/// [`validate_env_vars`] across every value of a map.
pub fn validate_env_map(values: &BTreeMap<String, String>, env: &EnvMap) -> Vec<String> {
    let mut missing = BTreeSet::new();
    for value in values.values() {
        collect_missing(value, env, &mut missing);
    }
    missing.into_iter().collect()
}

/// [`expand_recursive`] across every value of a map.
pub fn expand_env_map(
    values: &BTreeMap<String, String>,
    env: &EnvMap,
) -> Result<BTreeMap<String, String>> {
    values
        .iter()
        .map(|(key, value)| Ok((key.clone(), expand_recursive(value, env)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> EnvMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn expand_replaces_known_and_blanks_unknown() {
        let vars = env(&[("HOME", "/home/me")]);
        assert_eq!(expand("${HOME}/bin:${NOPE}", &vars), "/home/me/bin:");
    }

    #[test]
    fn expand_uses_default_when_missing_or_empty() {
        let vars = env(&[("EMPTY", "")]);
        assert_eq!(expand("${PORT:-8080}", &vars), "8080");
        assert_eq!(expand("${EMPTY:-fallback}", &vars), "fallback");
        assert_eq!(expand("${EMPTY}", &vars), "");
    }

    #[test]
    fn expand_keeps_nested_default_literal() {
        let vars = env(&[("B", "b")]);
        assert_eq!(expand("${A:-${B}}", &vars), "${B}");
    }

    #[test]
    fn expand_leaves_malformed_references_alone() {
        let vars = env(&[("A", "x")]);
        assert_eq!(expand("${1A} ${} ${A", &vars), "${1A} ${} ${A");
        assert_eq!(expand("$A ${A}", &vars), "$A x");
    }

    #[test]
    fn expand_recursive_follows_chains() {
        let vars = env(&[("A", "${B}/a"), ("B", "${C}/b"), ("C", "root")]);
        assert_eq!(expand_recursive("${A}", &vars).unwrap(), "root/b/a");
    }

    #[test]
    fn expand_recursive_resolves_nested_default() {
        let vars = env(&[("B", "b")]);
        assert_eq!(expand_recursive("${A:-${B}}", &vars).unwrap(), "b");
    }

    #[test]
    fn expand_recursive_detects_two_cycle() {
        let vars = env(&[("A", "${B}"), ("B", "${A}")]);
        let err = expand_recursive("${A}", &vars).unwrap_err();
        assert!(matches!(err, OvertureError::CircularEnvReference { .. }));
    }

    #[test]
    fn expand_recursive_detects_self_reference() {
        let vars = env(&[("A", "${A}")]);
        let err = expand_recursive("${A}", &vars).unwrap_err();
        match err {
            OvertureError::CircularEnvReference { variable, .. } => assert_eq!(variable, "A"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn expand_recursive_detects_growing_reference() {
        let vars = env(&[("A", "x${A}")]);
        assert!(expand_recursive("${A}", &vars).is_err());
    }

    #[test]
    fn expand_recursive_fails_past_depth() {
        let vars = env(&[("A", "${B}"), ("B", "${C}"), ("C", "done")]);
        assert!(expand_recursive_with_depth("${A}", &vars, 2).is_err());
        assert_eq!(
            expand_recursive_with_depth("${A}", &vars, 3).unwrap(),
            "done"
        );
    }

    #[test]
    fn introspection_helpers() {
        assert!(has_env_vars("x ${A} y"));
        assert!(!has_env_vars("plain $A"));
        assert_eq!(
            extract_env_var_names("${B} ${A:-${C}} ${B}"),
            vec!["A".to_string(), "B".to_string(), "C".to_string()]
        );
    }

    #[test]
    fn validate_reports_only_names_without_value_or_default() {
        let vars = env(&[("SET", "1")]);
        let missing = validate_env_vars("${SET} ${UNSET} ${WITH:-d} ${OUTER:-${INNER}}", &vars);
        assert_eq!(missing, vec!["INNER".to_string(), "UNSET".to_string()]);
    }

    #[test]
    fn map_helpers_expand_and_validate_each_value() {
        let vars = env(&[("TOKEN", "abc")]);
        let mut values = BTreeMap::new();
        values.insert("AUTH".to_string(), "Bearer ${TOKEN}".to_string());
        values.insert("OTHER".to_string(), "${MISSING}".to_string());

        assert_eq!(validate_env_map(&values, &vars), vec!["MISSING".to_string()]);
        let expanded = expand_env_map(&values, &vars).unwrap();
        assert_eq!(expanded["AUTH"], "Bearer abc");
        assert_eq!(expanded["OTHER"], "");
    }
}
