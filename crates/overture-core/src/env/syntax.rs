//! Client-native reference syntaxes.
//!
//! OpenCode writes `{env:VAR}` / `{env:VAR:-default}` where the unified file
//! writes `${VAR}` / `${VAR:-default}`. Conversion works in both directions.
//! A unified value round-trips exactly unless it already contains literal
//! `{env:...}` text: that text reads back as a `${...}` reference.

use std::collections::BTreeMap;

use super::{Segment, parse_segments};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvSyntax {
    /// `${VAR}` and `${VAR:-default}`
    DollarBrace,
    /// `{env:VAR}` and `{env:VAR:-default}`
    OpenCode,
}

impl EnvSyntax {
    pub(crate) fn open(&self) -> &'static str {
        match self {
            EnvSyntax::DollarBrace => "${",
            EnvSyntax::OpenCode => "{env:",
        }
    }
}

/// Rewrite every reference of `from` syntax into `to` syntax, defaults
/// included. Literal text is copied unchanged.
pub fn translate(template: &str, from: EnvSyntax, to: EnvSyntax) -> String {
    let mut out = String::with_capacity(template.len());
    for segment in parse_segments(template, from) {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Reference { name, default } => {
                out.push_str(to.open());
                out.push_str(name);
                if let Some(default) = default {
                    out.push_str(":-");
                    out.push_str(&translate(default, from, to));
                }
                out.push('}');
            }
        }
    }
    out
}

pub fn convert_to_opencode_env(template: &str) -> String {
    translate(template, EnvSyntax::DollarBrace, EnvSyntax::OpenCode)
}

pub fn convert_from_opencode_env(template: &str) -> String {
    translate(template, EnvSyntax::OpenCode, EnvSyntax::DollarBrace)
}

pub fn convert_env_map_to_opencode(values: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    values
        .iter()
        .map(|(key, value)| (key.clone(), convert_to_opencode_env(value)))
        .collect()
}

pub fn convert_env_map_from_opencode(
    values: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    values
        .iter()
        .map(|(key, value)| (key.clone(), convert_from_opencode_env(value)))
        .collect()
}
