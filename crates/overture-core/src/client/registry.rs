//! Explicit, caller-constructed adapter registry.

use crate::types::ClientId;

use super::{
    ClientAdapter, claude_code::ClaudeCodeClient, claude_desktop::ClaudeDesktopClient,
    copilot_cli::CopilotCliClient, cursor::CursorClient, gemini_cli::GeminiCliClient,
    opencode::OpenCodeClient, vscode::VsCodeClient,
};

/// Adapters available to a run, in registration order.
#[derive(Debug)]
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn ClientAdapter>>,
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_default_clients()
    }
}

impl AdapterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// One adapter per supported client.
    pub fn with_default_clients() -> Self {
        let adapters: Vec<Box<dyn ClientAdapter>> = vec![
            Box::new(ClaudeCodeClient::new()),
            Box::new(ClaudeDesktopClient::new()),
            Box::new(CursorClient::new()),
            Box::new(VsCodeClient::new()),
            Box::new(CopilotCliClient::new()),
            Box::new(OpenCodeClient::new()),
            Box::new(GeminiCliClient::new()),
        ];
        Self { adapters }
    }

    /// Register an adapter, replacing any existing one for the same client.
    pub fn register(&mut self, adapter: Box<dyn ClientAdapter>) {
        self.adapters.retain(|a| a.id() != adapter.id());
        self.adapters.push(adapter);
    }

    pub fn all(&self) -> &[Box<dyn ClientAdapter>] {
        &self.adapters
    }

    pub fn get(&self, id: ClientId) -> Option<&dyn ClientAdapter> {
        self.adapters
            .iter()
            .find(|a| a.id() == id)
            .map(|a| a.as_ref())
    }

    /// Adapters for `targets`, in the order given. Unknown ids are dropped.
    pub fn filter_by_targets<'a>(&'a self, targets: &[ClientId]) -> Vec<&'a dyn ClientAdapter> {
        targets.iter().filter_map(|id| self.get(*id)).collect()
    }

    pub fn client_ids(&self) -> Vec<ClientId> {
        self.adapters.iter().map(|a| a.id()).collect()
    }
}
