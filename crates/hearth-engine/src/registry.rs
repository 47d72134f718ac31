use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use hearth_core::tools::{Tool, ToolContext, ToolDefinition, ToolError, ToolResult};
use tracing::debug;

/// Plugin a registered tool belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ToolSource {
    Plugin(String),
    Custom,
}

impl ToolSource {
    pub fn plugin(name: &str) -> Self {
        Self::Plugin(name.to_string())
    }
}

struct ToolEntry {
    tool: Arc<dyn Tool>,
    source: ToolSource,
}

/// Filter for carving per-agent registries out of the session registry.
#[derive(Clone, Debug)]
pub enum ToolFilter {
    InheritAll,
    /// Only tools from these plugins.
    Plugins(HashSet<String>),
    /// Only these tools.
    Explicit(HashSet<String>),
}

/// Registry of tools the engine may invoke.
pub struct ToolRegistry {
    tools: HashMap<String, ToolEntry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>, source: ToolSource) {
        let name = tool.name().to_string();
        self.tools.insert(name, ToolEntry { tool, source });
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|e| Arc::clone(&e.tool))
    }

    pub fn source(&self, name: &str) -> Option<&ToolSource> {
        self.tools.get(name).map(|e| &e.source)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Tool definitions for the engine, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|e| e.tool.to_definition())
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn count(&self) -> usize {
        self.tools.len()
    }

    /// Look up and run a tool by name.
    pub async fn execute(
        &self,
        name: &str,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        if ctx.abort_signal.is_cancelled() {
            return Err(ToolError::Cancelled);
        }
        debug!(tool = name, session_id = %ctx.session_id, agent = %ctx.agent, "executing tool");
        tool.execute(args, ctx).await
    }

    /// Create a filtered copy for one agent.
    pub fn clone_filtered(&self, filter: &ToolFilter) -> Self {
        let mut new = Self::new();
        for (name, entry) in &self.tools {
            let include = match filter {
                ToolFilter::InheritAll => true,
                ToolFilter::Plugins(plugins) => match &entry.source {
                    ToolSource::Plugin(p) => plugins.contains(p),
                    ToolSource::Custom => false,
                },
                ToolFilter::Explicit(included) => included.contains(name),
            };
            if include {
                new.tools.insert(
                    name.clone(),
                    ToolEntry {
                        tool: Arc::clone(&entry.tool),
                        source: entry.source.clone(),
                    },
                );
            }
        }
        new
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
