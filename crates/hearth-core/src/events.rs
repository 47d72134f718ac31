use serde::{Deserialize, Serialize};

use crate::messages::ChatMessage;

/// Events streamed by an engine during one exchange.
///
/// Ordering contract: `Message*` then exactly one `Completed`. Nothing
/// follows `Completed`; a stream that ends without it did not complete.
#[derive(Clone, Debug, PartialEq)]
pub enum ExchangeEvent {
    Message(ChatMessage),
    Completed(TaskResult),
}

/// Terminal marker of an exchange.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Every message the exchange produced, in order, including the inbound one.
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

impl ExchangeEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// JSON frame sent to websocket clients for this event.
    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            Self::Message(msg) => serde_json::to_value(msg).unwrap_or_else(|e| {
                serde_json::json!({"type": "Error", "message": format!("unserializable message: {e}")})
            }),
            Self::Completed(result) => {
                let mut frame = serde_json::json!({"type": "TaskResult"});
                if let Some(reason) = &result.stop_reason {
                    frame["stop_reason"] = serde_json::Value::String(reason.clone());
                }
                frame
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_is_terminal() {
        assert!(ExchangeEvent::Completed(TaskResult::default()).is_terminal());
        assert!(!ExchangeEvent::Message(ChatMessage::text("a", "b")).is_terminal());
    }

    #[test]
    fn task_result_frame() {
        let frame = ExchangeEvent::Completed(TaskResult::default()).to_wire();
        assert_eq!(frame, serde_json::json!({"type": "TaskResult"}));

        let frame = ExchangeEvent::Completed(TaskResult {
            messages: vec![],
            stop_reason: Some("Handoff to user from meals_agent detected.".into()),
        })
        .to_wire();
        assert_eq!(frame["type"], "TaskResult");
        assert_eq!(frame["stop_reason"], "Handoff to user from meals_agent detected.");
    }

    #[test]
    fn message_frame_is_the_message() {
        let msg = ChatMessage::text("triage_agent", "Hi!");
        let frame = ExchangeEvent::Message(msg.clone()).to_wire();
        assert_eq!(frame, serde_json::to_value(&msg).unwrap());
    }
}
