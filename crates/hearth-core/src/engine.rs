//! Boundary to the multi-agent orchestration engine.
//!
//! The session layer only needs four things from an engine: submit an
//! addressed or unaddressed message, detect that the exchange completed,
//! read the source/target of the produced messages, and save/restore the
//! engine's own state as an opaque blob.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use tokio_util::sync::CancellationToken;

use crate::errors::EngineError;
use crate::events::ExchangeEvent;
use crate::ids::SessionId;
use crate::messages::{ChatMessage, USER};
use crate::state::SharedDomainState;

pub type EventStream = Pin<Box<dyn Stream<Item = ExchangeEvent> + Send>>;

/// The message that starts an exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExchangeInput {
    /// A fresh task; the engine picks the first speaker.
    Unaddressed { content: String },
    /// A handoff from the user back to a specific participant.
    Addressed { target: String, content: String },
}

impl ExchangeInput {
    pub fn content(&self) -> &str {
        match self {
            Self::Unaddressed { content } | Self::Addressed { content, .. } => content,
        }
    }

    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Addressed { target, .. } => Some(target),
            Self::Unaddressed { .. } => None,
        }
    }

    /// Transcript form of the input, attributed to the user.
    pub fn to_message(&self) -> ChatMessage {
        match self {
            Self::Unaddressed { content } => ChatMessage::text(USER, content.clone()),
            Self::Addressed { target, content } => {
                ChatMessage::handoff(USER, target.clone(), content.clone())
            }
        }
    }
}

/// Per-exchange collaborators handed to the engine.
#[derive(Clone)]
pub struct ExchangeContext {
    pub session_id: SessionId,
    pub state: SharedDomainState,
    /// Owned by the caller. Engines observe it; they never create their own.
    pub cancel: CancellationToken,
}

#[async_trait]
pub trait OrchestrationEngine: Send + Sync {
    /// Re-arm termination evaluation so the next exchange terminates on its own.
    async fn prepare_exchange(&self);

    /// Run one exchange. The stream yields produced messages and ends with a
    /// single `ExchangeEvent::Completed`. The inbound message itself is not
    /// echoed.
    async fn run_exchange(
        &self,
        input: ExchangeInput,
        ctx: ExchangeContext,
    ) -> Result<EventStream, EngineError>;

    async fn save_state(&self) -> Result<serde_json::Value, EngineError>;

    async fn load_state(&self, state: serde_json::Value) -> Result<(), EngineError>;
}

/// Builds one engine instance per session.
pub trait EngineFactory: Send + Sync {
    fn create(&self, session_id: &SessionId) -> Arc<dyn OrchestrationEngine>;
}

/// Tracks whether an engine's termination condition has fired.
#[derive(Debug, Default)]
pub struct TerminationLatch {
    terminated: AtomicBool,
}

impl TerminationLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&self) {
        self.terminated.store(false, Ordering::SeqCst);
    }

    /// Fails if the previous exchange terminated and nobody re-armed the latch.
    pub fn check(&self) -> Result<(), EngineError> {
        if self.terminated.load(Ordering::SeqCst) {
            Err(EngineError::AlreadyTerminated)
        } else {
            Ok(())
        }
    }

    pub fn trip(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unaddressed_input_is_plain_user_text() {
        let input = ExchangeInput::Unaddressed { content: "hi".into() };
        assert_eq!(input.to_message(), ChatMessage::text(USER, "hi"));
        assert!(input.target().is_none());
    }

    #[test]
    fn addressed_input_is_user_handoff() {
        let input = ExchangeInput::Addressed {
            target: "meals_agent".into(),
            content: "add pasta".into(),
        };
        let msg = input.to_message();
        assert_eq!(msg.source(), USER);
        assert_eq!(msg.handoff_target(), Some("meals_agent"));
        assert_eq!(input.content(), "add pasta");
    }

    #[test]
    fn latch_lifecycle() {
        let latch = TerminationLatch::new();
        assert!(latch.check().is_ok());

        latch.trip();
        assert!(matches!(latch.check(), Err(EngineError::AlreadyTerminated)));

        latch.arm();
        assert!(latch.check().is_ok());
        assert!(!latch.is_terminated());
    }
}
