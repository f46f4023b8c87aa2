//! Override resolution: one definition, one client, one platform.
//!
//! Order of application:
//! 1. platform / client exclusion (include list wins over exclude)
//! 2. transport support for the target client
//! 3. base command, args, env
//! 4. platform command/args overrides (full replacement)
//! 5. client override (command/args/transport replace, env merges)

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::config::McpDefinition;
use crate::types::{ClientId, Platform, Transport};

/// Whether an unsupported transport skips the definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportPolicy {
    /// Skip definitions the client cannot speak
    #[default]
    Enforce,
    /// Keep them anyway (`--force`)
    Allow,
}

/// The client a definition is being resolved for.
#[derive(Debug, Clone, Copy)]
pub struct ResolveTarget<'a> {
    pub client: ClientId,
    pub platform: Platform,
    pub transports: &'a [Transport],
    pub policy: TransportPolicy,
}

impl<'a> ResolveTarget<'a> {
    pub fn new(client: ClientId, platform: Platform, transports: &'a [Transport]) -> Self {
        Self {
            client,
            platform,
            transports,
            policy: TransportPolicy::Enforce,
        }
    }

    pub fn with_policy(mut self, policy: TransportPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn supports(&self, transport: Transport) -> bool {
        self.transports.contains(&transport)
    }
}

/// Effective launch settings for one (client, platform) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMcp {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    /// `None` when nothing is left after merging
    pub env: Option<BTreeMap<String, String>>,
    pub transport: Transport,
    pub url: Option<String>,
}

impl ResolvedMcp {
    pub fn env_or_empty(&self) -> BTreeMap<String, String> {
        self.env.clone().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum SkipReason {
    PlatformExcluded { platform: Platform },
    ClientExcluded,
    NotIncluded,
    UnsupportedTransport { transport: Transport },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolvedMcp),
    Skip(SkipReason),
}

impl Resolution {
    pub fn resolved(self) -> Option<ResolvedMcp> {
        match self {
            Resolution::Resolved(resolved) => Some(resolved),
            Resolution::Skip(_) => None,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Resolution::Skip(_))
    }
}

/// Exclusion rules alone, without transport or overrides.
pub fn exclusion(definition: &McpDefinition, client: ClientId, platform: Platform) -> Option<SkipReason> {
    if definition.platform_rules.exclude.contains(&platform) {
        return Some(SkipReason::PlatformExcluded { platform });
    }
    let rules = &definition.client_rules;
    match &rules.include {
        Some(include) if !include.contains(&client) => Some(SkipReason::NotIncluded),
        Some(_) => None,
        None if rules.exclude.contains(&client) => Some(SkipReason::ClientExcluded),
        None => None,
    }
}

/// Transport the client will actually see: the client override's, if any.
pub fn effective_transport(definition: &McpDefinition, client: ClientId) -> Transport {
    definition
        .client_rules
        .overrides
        .get(&client)
        .and_then(|o| o.transport)
        .unwrap_or(definition.transport)
}

pub fn resolve(definition: &McpDefinition, target: &ResolveTarget<'_>) -> Resolution {
    if let Some(reason) = exclusion(definition, target.client, target.platform) {
        debug!(mcp = %definition.name, client = %target.client, ?reason, "Skipping MCP");
        return Resolution::Skip(reason);
    }

    let transport = effective_transport(definition, target.client);
    if !target.supports(transport) && target.policy == TransportPolicy::Enforce {
        debug!(mcp = %definition.name, client = %target.client, %transport, "Unsupported transport");
        return Resolution::Skip(SkipReason::UnsupportedTransport { transport });
    }

    let mut command = definition.command.clone();
    let mut args = definition.args.clone();
    let mut env = definition.env.clone();
    let mut url = definition.url.clone();

    let platform_rules = &definition.platform_rules;
    if let Some(platform_command) = platform_rules.command_overrides.get(&target.platform) {
        command = platform_command.clone();
    }
    if let Some(platform_args) = platform_rules.args_overrides.get(&target.platform) {
        args = platform_args.clone();
    }

    if let Some(client_override) = definition.client_rules.overrides.get(&target.client) {
        if let Some(override_command) = &client_override.command {
            command = override_command.clone();
        }
        if let Some(override_args) = &client_override.args {
            args = override_args.clone();
        }
        for (key, value) in &client_override.env {
            env.insert(key.clone(), value.clone());
        }
        if let Some(override_url) = &client_override.url {
            url = Some(override_url.clone());
        }
    }

    Resolution::Resolved(ResolvedMcp {
        name: definition.name.clone(),
        command,
        args,
        env: if env.is_empty() { None } else { Some(env) },
        transport,
        url,
    })
}
