use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::ids::SessionId;
use crate::state::SharedDomainState;

/// Context available to tools during execution.
///
/// `state` is the session's own domain state; tools never reach for
/// anything process-wide.
pub struct ToolContext {
    pub session_id: SessionId,
    /// Participant invoking the tool.
    pub agent: String,
    pub state: SharedDomainState,
    pub abort_signal: CancellationToken,
}

/// Result returned by a tool execution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

impl ToolResult {
    pub fn text(content: impl Into<String>, duration: Duration) -> Self {
        Self {
            content: content.into(),
            is_error: false,
            duration,
        }
    }

    /// Serialize a structured result as JSON text.
    pub fn json<T: Serialize>(value: &T, duration: Duration) -> Result<Self, ToolError> {
        let content = serde_json::to_string(value)
            .map_err(|e| ToolError::ExecutionFailed(format!("serialize result: {e}")))?;
        Ok(Self::text(content, duration))
    }

    /// A user-facing validation failure: reported back to the engine as text.
    pub fn rejected(content: impl Into<String>, duration: Duration) -> Self {
        Self {
            content: content.into(),
            is_error: true,
            duration,
        }
    }
}

/// Tool definition handed to the engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters_schema: serde_json::Value,
}

impl ToolDefinition {
    /// Argument names from the schema, required ones first.
    pub fn argument_names(&self) -> Vec<&str> {
        let required: Vec<&str> = self.parameters_schema["required"]
            .as_array()
            .map(|names| names.iter().filter_map(|n| n.as_str()).collect())
            .unwrap_or_default();
        let mut names = required.clone();
        if let Some(properties) = self.parameters_schema["properties"].as_object() {
            names.extend(
                properties
                    .keys()
                    .map(String::as_str)
                    .filter(|name| !required.contains(name)),
            );
        }
        names
    }
}

/// Trait implemented by each plugin tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> serde_json::Value;

    async fn execute(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError>;

    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters_schema: self.parameters_schema(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("cancelled")]
    Cancelled,
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}
