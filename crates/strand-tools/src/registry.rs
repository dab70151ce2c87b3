//! Tool registry — immutable name → spec/handler mapping.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use strand_core::tools::ToolSpec;

use crate::errors::ToolError;
use crate::traits::Tool;

/// Registry of all tools available to a process.
///
/// Populated once at startup, then shared read-only across sessions via
/// `Arc`. The catalogue is constant for the process lifetime, so it is
/// computed on first use and cached.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    catalogue: OnceLock<Vec<ToolSpec>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            catalogue: OnceLock::new(),
        }
    }

    /// Register a tool. Fails if the name is already taken.
    ///
    /// Must only be called during startup, before the registry is shared
    /// and before [`ToolRegistry::catalogue`] is first used.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_owned();
        if self.tools.contains_key(&name) {
            return Err(ToolError::DuplicateTool(name));
        }
        let _ = self.tools.insert(name, tool);
        Ok(())
    }

    /// Look up a tool by exact name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Full catalogue for inclusion in every model gateway call.
    ///
    /// Computed once, sorted by name for a stable order, then reused.
    pub fn catalogue(&self) -> &[ToolSpec] {
        self.catalogue.get_or_init(|| {
            let mut specs: Vec<ToolSpec> = self.tools.values().map(|t| t.spec()).collect();
            specs.sort_by(|a, b| a.name.cmp(&b.name));
            specs
        })
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registered tool names (unordered).
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Notify every tool that a session has ended so per-session state
    /// (e.g. retry attempt counters) is released.
    pub fn session_closed(&self, session_id: &str) {
        for tool in self.tools.values() {
            tool.session_closed(session_id);
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
