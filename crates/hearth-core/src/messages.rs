use serde::{Deserialize, Serialize};

use crate::ids::ToolCallId;

/// Participant name reserved for the human end of the conversation.
pub const USER: &str = "user";

/// One transcript record. The `type` tag and field names double as the
/// websocket wire format, so renaming anything here is a protocol change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChatMessage {
    TextMessage {
        source: String,
        content: String,
    },
    HandoffMessage {
        source: String,
        target: String,
        content: String,
    },
    ToolCallRequestEvent {
        source: String,
        content: Vec<ToolCallBlock>,
    },
    ToolCallExecutionEvent {
        source: String,
        content: Vec<ToolCallOutcome>,
    },
    /// Emitted by a termination condition; never a routing source.
    StopMessage {
        source: String,
        content: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallBlock {
    pub id: ToolCallId,
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallOutcome {
    pub call_id: ToolCallId,
    pub content: String,
    pub is_error: bool,
}

impl ChatMessage {
    pub fn text(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self::TextMessage {
            source: source.into(),
            content: content.into(),
        }
    }

    pub fn handoff(
        source: impl Into<String>,
        target: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::HandoffMessage {
            source: source.into(),
            target: target.into(),
            content: content.into(),
        }
    }

    pub fn stop(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self::StopMessage {
            source: source.into(),
            content: content.into(),
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Self::TextMessage { source, .. }
            | Self::HandoffMessage { source, .. }
            | Self::ToolCallRequestEvent { source, .. }
            | Self::ToolCallExecutionEvent { source, .. }
            | Self::StopMessage { source, .. } => source,
        }
    }

    /// The declared handoff target, if this message is a handoff.
    pub fn handoff_target(&self) -> Option<&str> {
        match self {
            Self::HandoffMessage { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::StopMessage { .. })
    }

    pub fn message_type(&self) -> &'static str {
        match self {
            Self::TextMessage { .. } => "TextMessage",
            Self::HandoffMessage { .. } => "HandoffMessage",
            Self::ToolCallRequestEvent { .. } => "ToolCallRequestEvent",
            Self::ToolCallExecutionEvent { .. } => "ToolCallExecutionEvent",
            Self::StopMessage { .. } => "StopMessage",
        }
    }
}
