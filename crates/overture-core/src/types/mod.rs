//! Shared core types used across configuration, adapters and sync.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Configuration scope levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigScope {
    /// User-wide configuration.
    Global,
    /// Per-project configuration.
    Project,
}

impl ConfigScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigScope::Global => "global",
            ConfigScope::Project => "project",
        }
    }
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ConfigScope {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "global" | "user" => Ok(ConfigScope::Global),
            "project" => Ok(ConfigScope::Project),
            _ => Err(format!(
                "Invalid scope: '{}'. Valid values: global, project",
                value
            )),
        }
    }
}

/// Transport used by an MCP server to talk to its client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Stdio,
    Http,
    Sse,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Stdio => "stdio",
            Transport::Http => "http",
            Transport::Sse => "sse",
        }
    }

    /// Remote transports talk to a URL instead of a spawned process.
    pub fn is_remote(&self) -> bool {
        matches!(self, Transport::Http | Transport::Sse)
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "stdio" => Ok(Transport::Stdio),
            "http" => Ok(Transport::Http),
            "sse" => Ok(Transport::Sse),
            _ => Err(format!(
                "Invalid transport: '{}'. Valid values: stdio, http, sse",
                value
            )),
        }
    }
}

/// Operating system family, named the way the unified config names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Darwin,
    Win32,
}

impl Platform {
    /// Platform of the running process.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::Darwin
        } else if cfg!(target_os = "windows") {
            Platform::Win32
        } else {
            Platform::Linux
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Darwin => "darwin",
            Platform::Win32 => "win32",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "darwin" | "macos" => Ok(Platform::Darwin),
            "win32" | "windows" => Ok(Platform::Win32),
            _ => Err(format!(
                "Invalid platform: '{}'. Valid values: linux, darwin, win32",
                value
            )),
        }
    }
}

/// Identifier of a supported client. The set is closed: every variant maps
/// to exactly one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClientId {
    ClaudeCode,
    ClaudeDesktop,
    Cursor,
    #[serde(rename = "vscode")]
    VsCode,
    CopilotCli,
    #[serde(rename = "opencode")]
    OpenCode,
    GeminiCli,
}

impl ClientId {
    pub const ALL: [ClientId; 7] = [
        ClientId::ClaudeCode,
        ClientId::ClaudeDesktop,
        ClientId::Cursor,
        ClientId::VsCode,
        ClientId::CopilotCli,
        ClientId::OpenCode,
        ClientId::GeminiCli,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClientId::ClaudeCode => "claude-code",
            ClientId::ClaudeDesktop => "claude-desktop",
            ClientId::Cursor => "cursor",
            ClientId::VsCode => "vscode",
            ClientId::CopilotCli => "copilot-cli",
            ClientId::OpenCode => "opencode",
            ClientId::GeminiCli => "gemini-cli",
        }
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ClientId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ClientId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == value)
            .ok_or_else(|| {
                let valid: Vec<_> = ClientId::ALL.iter().map(|id| id.as_str()).collect();
                format!(
                    "Unknown client: '{}'. Valid values: {}",
                    value,
                    valid.join(", ")
                )
            })
    }
}
